pub mod health;
pub mod place;
pub mod plan;

use std::sync::Arc;

use crate::db::spot_store::SpotStore;
use crate::services::llm_service::LlmService;
use crate::services::places_service::AnyProvider;
use crate::services::plan_generation_service::PlanGenerator;

/// Shared per-process state handed to every handler.
pub struct AppState {
    pub store: Arc<SpotStore>,
    pub places: Arc<AnyProvider>,
    pub llm: Option<LlmService>,
    pub generator: PlanGenerator<AnyProvider>,
}

impl AppState {
    pub fn new(store: Arc<SpotStore>, places: Arc<AnyProvider>, llm: Option<LlmService>) -> Self {
        let generator = PlanGenerator::new(store.clone(), places.clone());
        AppState {
            store,
            places,
            llm,
            generator,
        }
    }
}

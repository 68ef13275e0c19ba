use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::routes::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // Spot database: a missing CSV degrades the service but does not break it.
    let stats = data.store.stats();
    let store_status = if stats.total > 0 {
        ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!(
                "{} spots loaded ({} with coordinates)",
                stats.total, stats.with_coordinates
            )),
        }
    } else {
        ServiceStatus {
            status: "degraded".to_string(),
            details: Some("spot database empty or not found".to_string()),
        }
    };
    health.services.insert("spot_database".to_string(), store_status.clone());

    // Places provider: offline means plans fall back to curated data and
    // placeholders only.
    let places_status = if data.places.is_online() {
        ServiceStatus {
            status: "ok".to_string(),
            details: Some("Google Places client configured".to_string()),
        }
    } else {
        ServiceStatus {
            status: "degraded".to_string(),
            details: Some("GOOGLE_MAPS_API_KEY not configured, running offline".to_string()),
        }
    };
    health.services.insert("places".to_string(), places_status.clone());

    let llm_status = if data.llm.is_some() {
        ServiceStatus {
            status: "ok".to_string(),
            details: Some("LLM plan generation enabled".to_string()),
        }
    } else {
        ServiceStatus {
            status: "degraded".to_string(),
            details: Some("OPENAI_API_KEY not configured, rule-based plans only".to_string()),
        }
    };
    health.services.insert("llm".to_string(), llm_status.clone());

    if store_status.status != "ok" || places_status.status != "ok" || llm_status.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

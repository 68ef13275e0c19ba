use std::time::{Duration, Instant};

use actix_web::{web, HttpResponse, Responder};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;

use crate::db::spot_store::{normalize_budget_level, SpotQuery};
use crate::models::conditions::{BudgetLevel, Conditions, DatePhase, NgCondition, WizardData};
use crate::routes::AppState;

/// Overall wall-clock budget for one plan construction. Exceeding it switches
/// to the fully offline build, which performs no further external calls.
const PLAN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct GeneratePlanRequest {
    pub conditions: Option<Conditions>,
    pub wizard_data: Option<WizardData>,
    pub adjustment: Option<String>,
}

/*
    POST /api/generate-plan
*/
pub async fn generate_plan(
    body: web::Json<GeneratePlanRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let started = Instant::now();
    let request = body.into_inner();

    let mut conditions = match (request.conditions, request.wizard_data) {
        (Some(conditions), _) => conditions,
        (None, Some(wizard)) => wizard.into_conditions(),
        (None, None) => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "error": "conditions or wizard_data required" }));
        }
    };
    // Resolve the movement policy once so the response echoes it back.
    conditions.movement_preferences = Some(conditions.movement());

    let adjustment = request.adjustment.as_deref();
    println!("Received generate-plan request, area: {}", conditions.area);

    let allow_external = data.places.is_online();
    let build = async {
        // LLM-backed skeleton when configured; its output still runs through
        // the assembler stages. Failure falls back to rule-based filling.
        let skeleton = match (&data.llm, allow_external) {
            (Some(llm), true) => match llm.generate_skeleton(&conditions, adjustment).await {
                Ok(items) => Some(items),
                Err(err) => {
                    eprintln!("LLM generation failed, using rule-based fill: {}", err);
                    None
                }
            },
            _ => None,
        };
        data.generator
            .build_plan(&conditions, adjustment, allow_external, skeleton, started)
            .await
    };

    let plan = match tokio::time::timeout(PLAN_TIMEOUT, build).await {
        Ok(plan) => plan,
        Err(_) => {
            eprintln!(
                "Plan generation exceeded {}ms, switching to offline build",
                PLAN_TIMEOUT.as_millis()
            );
            data.generator
                .build_plan(&conditions, adjustment, false, None, started)
                .await
        }
    };

    HttpResponse::Ok().json(json!({
        "success": true,
        "plan": plan,
        "conditions": conditions,
    }))
}

fn default_category() -> String {
    "restaurant".to_string()
}

fn default_area() -> String {
    "shibuya".to_string()
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct AlternativeSpotsRequest {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_area")]
    pub area: String,
    #[serde(default)]
    pub budget: BudgetLevel,
    #[serde(default)]
    pub date_phase: DatePhase,
    #[serde(default)]
    pub ng_conditions: Vec<NgCondition>,
    #[serde(default)]
    pub exclude_spots: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/*
    POST /api/get-alternative-spots

    Curated-store alternatives for one schedule slot: budget match scores 10,
    phase suitability 5, ties break randomly.
*/
pub async fn get_alternative_spots(
    body: web::Json<AlternativeSpotsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = body.into_inner();
    println!(
        "Fetching alternatives for {} in {} (excluding {})",
        request.category,
        request.area,
        request.exclude_spots.join(", ")
    );

    let query = SpotQuery {
        area: Some(request.area.clone()),
        category: Some(request.category.clone()),
        ng_conditions: request.ng_conditions.clone(),
        exclude_spots: request.exclude_spots.clone(),
        require_coordinates: true,
        ..SpotQuery::default()
    };

    let mut scored: Vec<(i32, crate::db::spot_store::Spot)> = data
        .store
        .search(&query)
        .into_iter()
        .map(|spot| {
            let mut score = 0;
            if normalize_budget_level(&spot.budget_level) == request.budget.as_str() {
                score += 10;
            }
            let recommended = spot.recommended_for_list();
            let phase_ja = match request.date_phase {
                DatePhase::First => "初デート",
                DatePhase::Second => "2回目以降",
                DatePhase::Anniversary => "記念日",
                DatePhase::Casual => "カジュアル",
            };
            if recommended.contains(&request.date_phase.as_str())
                || recommended.contains(&phase_ja)
                || recommended.contains(&"全て")
                || recommended.contains(&"all")
            {
                score += 5;
            }
            (score, spot.clone())
        })
        .collect();

    scored.shuffle(&mut rand::thread_rng());
    scored.sort_by_key(|(score, _)| -score);

    let alternatives: Vec<_> = scored
        .into_iter()
        .take(request.limit)
        .map(|(_, spot)| data.store.format_for_plan(&spot))
        .collect();

    println!("Found {} alternatives from database", alternatives.len());

    HttpResponse::Ok().json(json!({
        "success": true,
        "count": alternatives.len(),
        "alternatives": alternatives,
    }))
}

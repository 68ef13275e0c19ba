use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

mod db;
mod models;
mod routes;
mod services;

use db::spot_store::SpotStore;
use routes::AppState;
use services::llm_service::LlmService;
use services::places_service::AnyProvider;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    // Spot database instance; the CSV itself loads lazily on first access.
    let store = Arc::new(SpotStore::from_env());
    println!("Spot database instance created (lazy loading enabled)");

    let places = Arc::new(AnyProvider::from_env());
    let llm = LlmService::from_env();
    if llm.is_some() {
        println!("LLM plan generation enabled");
    } else {
        println!("LLM not configured, rule-based plan generation only");
    }

    let state = web::Data::new(AppState::new(store, places, llm));

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allow_any_header(),
            )
            .app_data(state.clone())
            .route("/health", web::get().to(routes::health::health_check))
            // The plan generator answers with or without the /api prefix so
            // reverse-proxy rewrites keep working.
            .route("/generate-plan", web::post().to(routes::plan::generate_plan))
            .service(
                web::scope("/api")
                    .route("/generate-plan", web::post().to(routes::plan::generate_plan))
                    .route(
                        "/get-alternative-spots",
                        web::post().to(routes::plan::get_alternative_spots),
                    )
                    .route("/search-place", web::post().to(routes::place::search_place))
                    .route("/place-details", web::post().to(routes::place::place_details)),
            )
    })
    .bind((host, port))?
    .run()
    .await
}

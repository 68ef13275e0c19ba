use actix_web::{test, web, App, HttpResponse};
use serde_json::json;

async fn health_check() -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "degraded",
        "services": {
            "spot_database": { "status": "ok", "details": "13 spots loaded" },
            "places": { "status": "degraded", "details": "GOOGLE_MAPS_API_KEY not configured, running offline" },
            "llm": { "status": "degraded", "details": "OPENAI_API_KEY not configured, rule-based plans only" }
        },
        "environment": "development",
        "version": "0.1.0"
    })))
}

async fn search_place_offline(_body: web::Json<serde_json::Value>) -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok()
        .json(json!({ "success": false, "message": "Google Maps API key not configured" })))
}

async fn place_details_mocked(_body: web::Json<serde_json::Value>) -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "name": null,
            "address": null,
            "opening_hours": [],
            "website": null,
            "rating": null,
            "phone": null,
            "photos": [],
            "reviews": [],
            "mocked": true
        }
    })))
}

#[actix_web::test]
async fn test_health_reports_per_service_status() {
    let app =
        test::init_service(App::new().route("/health", web::get().to(health_check))).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["services"]["spot_database"]["status"].is_string());
    assert!(body["services"]["places"]["status"].is_string());
}

#[actix_web::test]
async fn test_search_place_reports_missing_key() {
    let app = test::init_service(
        App::new().route("/api/search-place", web::post().to(search_place_offline)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/search-place")
        .set_json(&json!({ "query": "浅草寺" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_place_details_falls_back_to_mock_payload() {
    let app = test::init_service(
        App::new().route("/api/place-details", web::post().to(place_details_mocked)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/place-details")
        .set_json(&json!({ "place_id": "places/abc123" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["mocked"], true);
    assert!(body["data"]["opening_hours"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_unknown_route_is_404() {
    let app =
        test::init_service(App::new().route("/health", web::get().to(health_check))).await;

    let req = test::TestRequest::get().uri("/api/does-not-exist").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

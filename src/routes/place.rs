use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::models::venue::search_url;
use crate::routes::AppState;
use crate::services::places_service::{PlacesProvider, SearchOptions};

fn default_location() -> String {
    "東京都".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SearchPlaceRequest {
    pub query: String,
    #[serde(default = "default_location")]
    pub location: String,
}

/*
    POST /api/search-place
*/
pub async fn search_place(
    body: web::Json<SearchPlaceRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    if !data.places.is_online() {
        return HttpResponse::Ok()
            .json(json!({ "success": false, "message": "Google Maps API key not configured" }));
    }

    let request = body.into_inner();
    let found = data
        .places
        .search_venue(&request.query, &request.location, &SearchOptions::default())
        .await;

    // Fall back to a mock entry so the caller always has something to show.
    let place = match found {
        Some(venue) => serde_json::to_value(&venue).unwrap_or_default(),
        None => json!({
            "name": format!("{}（{}）", request.query, request.location),
            "address": request.location,
            "lat": null,
            "lng": null,
            "rating": null,
            "place_id": null,
            "url": search_url(&format!("{} {}", request.query, request.location)),
            "mocked": true,
        }),
    };

    HttpResponse::Ok().json(json!({ "success": true, "data": place }))
}

#[derive(Debug, Deserialize)]
pub struct PlaceDetailsRequest {
    pub place_id: String,
}

/*
    POST /api/place-details
*/
pub async fn place_details(
    body: web::Json<PlaceDetailsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    if !data.places.is_online() {
        return HttpResponse::Ok()
            .json(json!({ "success": false, "message": "Google Maps API key not configured" }));
    }

    let detail = data.places.venue_detail(&body.place_id).await;
    let payload = match detail {
        Some(detail) => json!({
            "name": detail.name,
            "address": detail.address,
            "opening_hours": detail.opening_hours,
            "website": detail.website,
            "rating": detail.rating,
            "phone": detail.phone,
            "photos": detail.photos,
            "reviews": detail.reviews,
            "parking_info": detail.parking_info,
        }),
        None => json!({
            "name": null,
            "address": null,
            "opening_hours": [],
            "website": null,
            "rating": null,
            "phone": null,
            "photos": [],
            "reviews": [],
            "mocked": true,
        }),
    };

    HttpResponse::Ok().json(json!({ "success": true, "data": payload }))
}

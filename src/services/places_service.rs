//! Places provider integration (Google Places New Text Search, Place Details,
//! Geocoding, Directions transit).
//!
//! The provider is consumed through the `PlacesProvider` trait so the plan
//! pipeline can run against a fake in tests and stay fully offline when
//! external calls are forbidden. Every provider error is consumed here and
//! surfaces to callers as `None` — lookups degrade to data absence, they
//! never fail the request.
//!
//! ## Setup
//! 1. Get a Google Maps API key from Google Cloud Console
//! 2. Enable Places API (New), Geocoding API and Directions API
//! 3. Set the environment variable: `GOOGLE_MAPS_API_KEY=your_api_key_here`

use std::{env, time::Duration};

use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use crate::models::conditions::{BudgetLevel, DatePhase, TimeSlot};
use crate::models::plan::{TransitRoute, TransitStep};
use crate::models::venue::{Review, Venue};
use crate::services::geo::{self, Coordinate};

const SEARCH_RADIUS_M: f64 = 2500.0;
const RANDOM_PICK_POOL: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub category: Option<String>,
    pub budget: Option<BudgetLevel>,
    pub date_phase: Option<DatePhase>,
    pub time_slot: Option<TimeSlot>,
    pub exclude_names: Vec<String>,
    /// Pick randomly among the top results instead of always the first.
    pub random_pick: bool,
    /// Bias the search around this point instead of the area center, e.g.
    /// cafe/dinner lookups anchored near the resolved lunch venue.
    pub anchor: Option<Coordinate>,
}

#[derive(Debug, Clone, Default)]
pub struct VenueDetail {
    pub name: Option<String>,
    pub address: Option<String>,
    pub opening_hours: Vec<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub phone: Option<String>,
    pub photos: Vec<String>,
    pub reviews: Vec<Review>,
    pub parking_info: Option<String>,
}

/// External search/detail/geocode/transit collaborator consumed by the plan
/// pipeline. Implementations must never panic or propagate transport errors.
pub trait PlacesProvider {
    fn search_venue(
        &self,
        query: &str,
        area: &str,
        options: &SearchOptions,
    ) -> impl std::future::Future<Output = Option<Venue>>;

    fn venue_detail(&self, place_id: &str) -> impl std::future::Future<Output = Option<VenueDetail>>;

    /// Resolve an area name to a reference coordinate. `None` means
    /// unresolved — callers decide the fallback, there is no sentinel value.
    fn geocode_area(&self, area: &str) -> impl std::future::Future<Output = Option<Coordinate>>;

    fn transit_summary(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl std::future::Future<Output = Option<TransitRoute>>;
}

pub struct GooglePlacesClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let api_key = env::var("GOOGLE_MAPS_API_KEY")
            .map_err(|_| "GOOGLE_MAPS_API_KEY environment variable not set")?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { http_client, api_key })
    }

    /// Append budget/phase/time-slot flavor keywords to the raw query so the
    /// text search leans toward suitable venues.
    fn enhance_query(query: &str, options: &SearchOptions) -> String {
        let mut enhanced = query.to_string();

        if let Some(budget) = options.budget {
            enhanced.push(' ');
            enhanced.push_str(match budget {
                BudgetLevel::Low => "カジュアル リーズナブル",
                BudgetLevel::Medium => "人気 おすすめ",
                BudgetLevel::High => "高級 上質 ハイクラス",
            });
        }

        if let Some(phase) = options.date_phase {
            enhanced.push(' ');
            enhanced.push_str(match phase {
                DatePhase::First => "落ち着いた 個室 静か",
                DatePhase::Second => "おしゃれ 雰囲気",
                DatePhase::Casual => "人気 話題",
                DatePhase::Anniversary => "特別 記念日 高級",
            });
        }

        match options.time_slot {
            Some(TimeSlot::Lunch) => {
                enhanced.push_str(" ランチ");
            }
            Some(TimeSlot::Dinner) => {
                enhanced.push_str(" ディナー");
            }
            _ => {}
        }

        enhanced
    }

    async fn text_search(
        &self,
        query: &str,
        area: &str,
        options: &SearchOptions,
    ) -> Result<Option<Venue>, Box<dyn std::error::Error>> {
        let enhanced = Self::enhance_query(query, options);

        let mut body = json!({
            "textQuery": format!("{} {}", enhanced, area),
            "languageCode": "ja",
            "maxResultCount": 10,
            "rankPreference": "RELEVANCE",
        });

        // Bias results toward the anchor point, or the area center when one
        // is known.
        let bias = match options.anchor {
            Some(anchor) => Some(anchor),
            None => match geo::cached_area_center(area) {
                Some(center) => Some(center),
                None => self.geocode(area).await.unwrap_or(None),
            },
        };
        if let Some(center) = bias {
            body["locationBias"] = json!({
                "circle": {
                    "center": { "latitude": center.lat, "longitude": center.lng },
                    "radius": SEARCH_RADIUS_M,
                }
            });
        }

        if let Some(category) = &options.category {
            body["includedType"] = json!(category);
        }
        if options.budget.is_some() {
            body["minRating"] = json!(3.5);
        }

        let response = self
            .http_client
            .post("https://places.googleapis.com/v1/places:searchText")
            .header("X-Goog-Api-Key", &self.api_key)
            .header(
                "X-Goog-FieldMask",
                "places.displayName,places.formattedAddress,places.location,places.rating,\
                 places.name,places.googleMapsUri,places.types,places.photos",
            )
            .json(&body)
            .send()
            .await?;

        let parsed: TextSearchResponse = response.json().await?;
        let mut places = parsed.places.unwrap_or_default();
        places.retain(|p| {
            let name = p.display_name.as_ref().and_then(|d| d.text.as_deref());
            name.map(|n| !options.exclude_names.iter().any(|ex| ex == n))
                .unwrap_or(true)
        });
        if places.is_empty() {
            return Ok(None);
        }

        let pool = places.len().min(RANDOM_PICK_POOL);
        let index = if options.random_pick {
            rand::thread_rng().gen_range(0..pool)
        } else {
            0
        };
        let place = &places[index];

        let name = place
            .display_name
            .as_ref()
            .and_then(|d| d.text.clone())
            .or_else(|| place.name.clone())
            .unwrap_or_else(|| query.to_string());
        let coords = place.location.as_ref();

        // Prefer the venue's real map link; fall back to a coordinate search.
        let map_url = place.google_maps_uri.clone().or_else(|| {
            coords.map(|c| {
                format!(
                    "https://www.google.com/maps/search/?api=1&query={},{}",
                    c.latitude, c.longitude
                )
            })
        });

        Ok(Some(Venue {
            name,
            category: options.category.clone().unwrap_or_default(),
            area: Some(area.to_string()),
            lat: coords.map(|c| c.latitude),
            lng: coords.map(|c| c.longitude),
            address: place.formatted_address.clone(),
            rating: place.rating,
            url: map_url,
            official_url: None,
            place_id: place.name.clone(),
            opening_hours: Vec::new(),
            photos: place
                .photos
                .as_ref()
                .map(|photos| photos.iter().filter_map(|p| p.name.clone()).collect())
                .unwrap_or_default(),
            reviews: Vec::new(),
            price_range: None,
            stay_minutes: None,
            reason: None,
        }))
    }

    async fn fetch_detail(
        &self,
        place_id: &str,
    ) -> Result<VenueDetail, Box<dyn std::error::Error>> {
        let url = format!("https://places.googleapis.com/v1/{}?languageCode=ja", place_id);
        let response = self
            .http_client
            .get(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header(
                "X-Goog-FieldMask",
                "displayName,formattedAddress,regularOpeningHours,websiteUri,rating,photos,\
                 internationalPhoneNumber,reviews,parkingOptions",
            )
            .send()
            .await?;

        let parsed: PlaceDetailResponse = response.json().await?;

        let raw_reviews = parsed.reviews.unwrap_or_default();
        // Japanese reviews first; anything if none are Japanese.
        let ja_reviews: Vec<&ReviewPayload> = raw_reviews
            .iter()
            .filter(|r| {
                r.text
                    .as_ref()
                    .and_then(|t| t.language_code.as_deref())
                    .map(|lang| lang == "ja")
                    .unwrap_or(false)
            })
            .collect();
        let picked: Vec<&ReviewPayload> = if ja_reviews.is_empty() {
            raw_reviews.iter().collect()
        } else {
            ja_reviews
        };
        let reviews = picked
            .into_iter()
            .map(|r| Review {
                author: r
                    .author_attribution
                    .as_ref()
                    .and_then(|a| a.display_name.clone())
                    .unwrap_or_else(|| "匿名".to_string()),
                rating: r.rating,
                text: r.text.as_ref().and_then(|t| t.text.clone()).unwrap_or_default(),
            })
            .collect();

        let parking_info = parsed.parking_options.as_ref().and_then(|p| {
            if p.free_parking_lot == Some(true) {
                Some("無料駐車場あり".to_string())
            } else if p.paid_parking_lot == Some(true) {
                Some("有料駐車場あり".to_string())
            } else {
                None
            }
        });

        Ok(VenueDetail {
            name: parsed.display_name.and_then(|d| d.text),
            address: parsed.formatted_address,
            opening_hours: parsed
                .regular_opening_hours
                .and_then(|h| h.weekday_descriptions)
                .unwrap_or_default(),
            website: parsed.website_uri,
            rating: parsed.rating,
            phone: parsed.international_phone_number,
            photos: parsed
                .photos
                .map(|photos| photos.into_iter().filter_map(|p| p.name).collect())
                .unwrap_or_default(),
            reviews,
            parking_info,
        })
    }

    async fn geocode(&self, area: &str) -> Result<Option<Coordinate>, Box<dyn std::error::Error>> {
        let response = self
            .http_client
            .get("https://maps.googleapis.com/maps/api/geocode/json")
            .query(&[
                ("address", format!("{} 日本", area)),
                ("key", self.api_key.clone()),
                ("language", "ja".to_string()),
            ])
            .send()
            .await?;

        let parsed: GeocodeResponse = response.json().await?;
        let location = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|r| r.geometry.location);

        Ok(location.map(|l| {
            let center = Coordinate::new(l.lat, l.lng);
            geo::remember_area_center(area, center);
            println!("Geocoded \"{}\": {}, {}", area, center.lat, center.lng);
            center
        }))
    }

    async fn fetch_transit(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<TransitRoute>, Box<dyn std::error::Error>> {
        let response = self
            .http_client
            .get("https://maps.googleapis.com/maps/api/directions/json")
            .query(&[
                ("origin", format!("{},{}", origin.lat, origin.lng)),
                ("destination", format!("{},{}", destination.lat, destination.lng)),
                ("mode", "transit".to_string()),
                ("language", "ja".to_string()),
                ("alternatives", "false".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?;

        let parsed: DirectionsResponse = response.json().await?;
        if parsed.status.as_deref() != Some("OK") {
            println!("No transit route found: {:?}", parsed.status);
            return Ok(None);
        }

        let Some(route) = parsed.routes.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };
        let Some(leg) = route.legs.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        let steps = leg
            .steps
            .unwrap_or_default()
            .into_iter()
            .filter(|s| s.travel_mode.as_deref() == Some("TRANSIT") || s.transit_details.is_some())
            .map(|s| {
                let transit = s.transit_details.unwrap_or_default();
                let line = transit.line.unwrap_or_default();
                TransitStep {
                    mode: "transit".to_string(),
                    line_name: line.short_name.or(line.name),
                    agency: line
                        .agencies
                        .unwrap_or_default()
                        .into_iter()
                        .next()
                        .and_then(|a| a.name),
                    headsign: transit.headsign,
                    num_stops: transit.num_stops,
                    departure_stop: transit.departure_stop.and_then(|s| s.name),
                    arrival_stop: transit.arrival_stop.and_then(|s| s.name),
                    departure_time: transit.departure_time.and_then(|t| t.text),
                    arrival_time: transit.arrival_time.and_then(|t| t.text),
                }
            })
            .collect();

        Ok(Some(TransitRoute {
            summary: route.summary,
            duration_minutes: leg.duration.and_then(|d| d.value).map(|secs| (secs / 60) as i64),
            steps,
        }))
    }
}

impl PlacesProvider for GooglePlacesClient {
    async fn search_venue(&self, query: &str, area: &str, options: &SearchOptions) -> Option<Venue> {
        match self.text_search(query, area, options).await {
            Ok(result) => result,
            Err(err) => {
                eprintln!("Places search failed for '{}': {}", query, err);
                None
            }
        }
    }

    async fn venue_detail(&self, place_id: &str) -> Option<VenueDetail> {
        match self.fetch_detail(place_id).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                eprintln!("Place detail fetch failed for '{}': {}", place_id, err);
                None
            }
        }
    }

    async fn geocode_area(&self, area: &str) -> Option<Coordinate> {
        if let Some(center) = geo::cached_area_center(area) {
            return Some(center);
        }
        match self.geocode(area).await {
            Ok(center) => center,
            Err(err) => {
                eprintln!("Geocoding failed for '{}': {}", area, err);
                None
            }
        }
    }

    async fn transit_summary(&self, origin: Coordinate, destination: Coordinate) -> Option<TransitRoute> {
        match self.fetch_transit(origin, destination).await {
            Ok(route) => route,
            Err(err) => {
                eprintln!("Transit lookup failed: {}", err);
                None
            }
        }
    }
}

// ---- Places (New) response payloads ----

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    places: Option<Vec<PlaceResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceResult {
    /// Resource name ("places/..."), used as the place id.
    name: Option<String>,
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    rating: Option<f64>,
    google_maps_uri: Option<String>,
    #[allow(dead_code)]
    types: Option<Vec<String>>,
    photos: Option<Vec<PhotoRef>>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct PhotoRef {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceDetailResponse {
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    regular_opening_hours: Option<OpeningHoursPayload>,
    website_uri: Option<String>,
    rating: Option<f64>,
    photos: Option<Vec<PhotoRef>>,
    international_phone_number: Option<String>,
    reviews: Option<Vec<ReviewPayload>>,
    parking_options: Option<ParkingOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpeningHoursPayload {
    weekday_descriptions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewPayload {
    author_attribution: Option<AuthorAttribution>,
    rating: Option<f64>,
    text: Option<LocalizedTextWithLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorAttribution {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizedTextWithLanguage {
    text: Option<String>,
    language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParkingOptions {
    free_parking_lot: Option<bool>,
    paid_parking_lot: Option<bool>,
}

// ---- Geocoding / Directions payloads ----

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Option<Vec<GeocodeResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: Option<String>,
    routes: Option<Vec<DirectionsRoute>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    summary: Option<String>,
    legs: Option<Vec<DirectionsLeg>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    duration: Option<DirectionsValue>,
    steps: Option<Vec<DirectionsStep>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsValue {
    value: Option<u64>,
    #[allow(dead_code)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    travel_mode: Option<String>,
    transit_details: Option<TransitDetails>,
}

#[derive(Debug, Deserialize, Default)]
struct TransitDetails {
    line: Option<TransitLine>,
    headsign: Option<String>,
    num_stops: Option<u32>,
    departure_stop: Option<NamedStop>,
    arrival_stop: Option<NamedStop>,
    departure_time: Option<TimeText>,
    arrival_time: Option<TimeText>,
}

#[derive(Debug, Deserialize, Default)]
struct TransitLine {
    short_name: Option<String>,
    name: Option<String>,
    agencies: Option<Vec<TransitAgency>>,
}

#[derive(Debug, Deserialize)]
struct TransitAgency {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedStop {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeText {
    text: Option<String>,
}

/// Provider used when no API key is configured: every lookup is data-absent,
/// area resolution falls back to the static tables.
pub struct OfflineProvider;

impl PlacesProvider for OfflineProvider {
    async fn search_venue(&self, _: &str, _: &str, _: &SearchOptions) -> Option<Venue> {
        None
    }

    async fn venue_detail(&self, _: &str) -> Option<VenueDetail> {
        None
    }

    async fn geocode_area(&self, area: &str) -> Option<Coordinate> {
        geo::cached_area_center(area)
    }

    async fn transit_summary(&self, _: Coordinate, _: Coordinate) -> Option<TransitRoute> {
        None
    }
}

/// Static-dispatch wrapper so the server state holds one concrete provider
/// type whether or not the Google client could be constructed.
pub enum AnyProvider {
    Google(GooglePlacesClient),
    Offline(OfflineProvider),
}

impl AnyProvider {
    pub fn from_env() -> Self {
        match GooglePlacesClient::new() {
            Ok(client) => {
                println!("GooglePlacesClient initialized");
                AnyProvider::Google(client)
            }
            Err(err) => {
                println!("Places provider not available: {}. Running offline.", err);
                AnyProvider::Offline(OfflineProvider)
            }
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, AnyProvider::Google(_))
    }
}

impl PlacesProvider for AnyProvider {
    async fn search_venue(&self, query: &str, area: &str, options: &SearchOptions) -> Option<Venue> {
        match self {
            AnyProvider::Google(client) => client.search_venue(query, area, options).await,
            AnyProvider::Offline(offline) => offline.search_venue(query, area, options).await,
        }
    }

    async fn venue_detail(&self, place_id: &str) -> Option<VenueDetail> {
        match self {
            AnyProvider::Google(client) => client.venue_detail(place_id).await,
            AnyProvider::Offline(offline) => offline.venue_detail(place_id).await,
        }
    }

    async fn geocode_area(&self, area: &str) -> Option<Coordinate> {
        match self {
            AnyProvider::Google(client) => client.geocode_area(area).await,
            AnyProvider::Offline(offline) => offline.geocode_area(area).await,
        }
    }

    async fn transit_summary(&self, origin: Coordinate, destination: Coordinate) -> Option<TransitRoute> {
        match self {
            AnyProvider::Google(client) => client.transit_summary(origin, destination).await,
            AnyProvider::Offline(offline) => offline.transit_summary(origin, destination).await,
        }
    }
}

/// Offline provider used by unit tests: canned venues keyed by query
/// substring, no network.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeProvider {
        pub venues: HashMap<String, Venue>,
        pub details: HashMap<String, VenueDetail>,
        pub centers: HashMap<String, Coordinate>,
    }

    impl FakeProvider {
        pub fn with_venue(mut self, key: &str, venue: Venue) -> Self {
            self.venues.insert(key.to_string(), venue);
            self
        }
    }

    impl PlacesProvider for FakeProvider {
        async fn search_venue(
            &self,
            query: &str,
            _area: &str,
            options: &SearchOptions,
        ) -> Option<Venue> {
            self.venues
                .iter()
                .find(|(key, venue)| {
                    query.contains(key.as_str())
                        && !options.exclude_names.contains(&venue.name)
                })
                .map(|(_, venue)| venue.clone())
        }

        async fn venue_detail(&self, place_id: &str) -> Option<VenueDetail> {
            self.details.get(place_id).cloned()
        }

        async fn geocode_area(&self, area: &str) -> Option<Coordinate> {
            self.centers
                .get(area)
                .copied()
                .or_else(|| geo::cached_area_center(area))
        }

        async fn transit_summary(&self, _: Coordinate, _: Coordinate) -> Option<TransitRoute> {
            None
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Review {
    pub author: String,
    pub rating: Option<f64>,
    pub text: String,
}

/// A concrete place filling one itinerary slot. Value object: created fresh
/// per request from the curated store, the places provider, or as a synthetic
/// placeholder; only the hydration pass attaches detail fields afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Venue {
    pub name: String,
    pub category: String,
    pub area: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    /// Map/search reference link for the venue.
    pub url: Option<String>,
    pub official_url: Option<String>,
    pub place_id: Option<String>,
    pub opening_hours: Vec<String>,
    pub photos: Vec<String>,
    pub reviews: Vec<Review>,
    pub price_range: Option<String>,
    pub stay_minutes: Option<i64>,
    /// Curated description used as the slot's reason text when present.
    pub reason: Option<String>,
}

impl Venue {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Fallback order for the link shown to the user: official site, then the
    /// provider's map link, then a plain web search for the name.
    pub fn display_url(&self) -> String {
        if let Some(url) = &self.official_url {
            return url.clone();
        }
        if let Some(url) = &self.url {
            return url.clone();
        }
        search_url(&self.name)
    }
}

/// Generic web-search link for a venue name. Used whenever no provider link
/// could be resolved.
pub fn search_url(name: &str) -> String {
    let mut link = url::Url::parse("https://www.google.com/search").unwrap();
    link.query_pairs_mut().append_pair("q", name);
    link.to_string()
}

/// Google Maps search link scoped to an area, matching the curated store's
/// reference links.
pub fn map_search_url(name: &str, area: &str) -> String {
    let mut link = url::Url::parse("https://www.google.com/maps/search/").unwrap();
    link.query_pairs_mut()
        .append_pair("api", "1")
        .append_pair("query", &format!("{} {}", name, area));
    link.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_url_prefers_official_then_map_then_search() {
        let mut venue = Venue {
            name: "喫茶 木漏れ日".to_string(),
            official_url: Some("https://example.jp".to_string()),
            url: Some("https://maps.example/abc".to_string()),
            ..Venue::default()
        };
        assert_eq!(venue.display_url(), "https://example.jp");

        venue.official_url = None;
        assert_eq!(venue.display_url(), "https://maps.example/abc");

        venue.url = None;
        assert!(venue.display_url().starts_with("https://www.google.com/search"));
    }
}

//! Curated spot database.
//!
//! A hand-maintained CSV of date spots, loaded once per process (lazily, on
//! first access) and read-only afterwards, so concurrent requests can search
//! it without coordination. The store is injected as `Arc<SpotStore>` rather
//! than reached for as a global.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::models::conditions::{BudgetLevel, DatePhase, Mood, NgCondition};
use crate::models::venue::{map_search_url, Venue};

const DEFAULT_CSV_PATH: &str = "data/spot_database.csv";
const DEFAULT_STAY_MINUTES: i64 = 60;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Spot {
    pub spot_name: String,
    #[serde(default)]
    pub area_id: String,
    #[serde(default)]
    pub area_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub budget_level: String,
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub mood_tags: String,
    /// Pipe- or comma-separated phase labels (e.g. "first|casual" or "全て").
    #[serde(default)]
    pub recommended_for: String,
    #[serde(default)]
    pub best_time_slot: String,
    #[serde(default)]
    pub interest_tags: String,
    #[serde(default)]
    pub indoor_outdoor: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub stay_minutes: Option<i64>,
    #[serde(default)]
    pub weather_ok: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub tips: String,
    #[serde(default)]
    pub official_url: String,
    #[serde(default)]
    pub source_url: String,
}

impl Spot {
    pub fn stay_minutes(&self) -> i64 {
        self.stay_minutes.unwrap_or(DEFAULT_STAY_MINUTES)
    }

    pub fn weather_ok(&self) -> bool {
        self.weather_ok.eq_ignore_ascii_case("true")
    }

    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }

    pub fn recommended_for_list(&self) -> Vec<&str> {
        split_list(&self.recommended_for)
    }

    pub fn best_time_slot_list(&self) -> Vec<&str> {
        split_list(&self.best_time_slot)
    }

    pub fn interest_tags_list(&self) -> Vec<&str> {
        split_list(&self.interest_tags)
    }
}

/// Pipe-separated lists take precedence; comma-separated as a fallback.
fn split_list(raw: &str) -> Vec<&str> {
    let separator = if raw.contains('|') { '|' } else { ',' };
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// "mid"/"middle"/"中" → medium, "free" → low; everything else lowercased
/// as-is.
pub fn normalize_budget_level(level: &str) -> String {
    let normalized = level.to_lowercase();
    match normalized.as_str() {
        "mid" | "middle" | "中" => "medium".to_string(),
        "free" => "low".to_string(),
        _ => normalized,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpotQuery {
    pub area: Option<String>,
    pub category: Option<String>,
    pub budget: Option<BudgetLevel>,
    pub date_phase: Option<DatePhase>,
    /// Store slot vocabulary: "lunch", "afternoon", "evening", "anytime".
    pub time_slot: Option<String>,
    pub mood: Option<Mood>,
    pub ng_conditions: Vec<NgCondition>,
    pub interests: Vec<String>,
    pub weather_proof: bool,
    pub require_coordinates: bool,
    pub exclude_spots: Vec<String>,
}

#[derive(Debug, Default)]
pub struct StoreStats {
    pub total: usize,
    pub by_area: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub with_coordinates: usize,
    pub without_coordinates: usize,
}

pub struct SpotStore {
    csv_path: PathBuf,
    spots: OnceLock<Vec<Spot>>,
}

impl SpotStore {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        SpotStore {
            csv_path: csv_path.into(),
            spots: OnceLock::new(),
        }
    }

    pub fn from_env() -> Self {
        let path = env::var("SPOT_DB_PATH").unwrap_or_else(|_| DEFAULT_CSV_PATH.to_string());
        SpotStore::new(path)
    }

    /// Build a store from in-memory records (tests, embedding).
    pub fn from_spots(spots: Vec<Spot>) -> Self {
        let store = SpotStore::new(DEFAULT_CSV_PATH);
        let _ = store.spots.set(spots);
        store
    }

    fn spots(&self) -> &[Spot] {
        self.spots.get_or_init(|| match self.load_csv() {
            Ok(spots) => {
                println!("Spot database loaded: {} spots from {:?}", spots.len(), self.csv_path);
                spots
            }
            Err(err) => {
                eprintln!("Spot database unavailable ({:?}): {}", self.csv_path, err);
                Vec::new()
            }
        })
    }

    fn load_csv(&self) -> Result<Vec<Spot>, Box<dyn std::error::Error>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.csv_path)?;

        let mut spots = Vec::new();
        for record in reader.deserialize::<Spot>() {
            match record {
                Ok(spot) => spots.push(spot),
                Err(err) => eprintln!("Skipping malformed spot row: {}", err),
            }
        }
        Ok(spots)
    }

    pub fn is_empty(&self) -> bool {
        self.spots().is_empty()
    }

    /// Does the store carry any rows for this area? Selection skips the store
    /// entirely for unsupported areas.
    pub fn supports_area(&self, area: &str) -> bool {
        self.spots().iter().any(|s| s.area_id == area)
    }

    pub fn search(&self, query: &SpotQuery) -> Vec<&Spot> {
        self.spots()
            .iter()
            .filter(|spot| Self::matches(spot, query))
            .collect()
    }

    fn matches(spot: &Spot, query: &SpotQuery) -> bool {
        if let Some(area) = &query.area {
            if &spot.area_id != area {
                return false;
            }
        }
        if let Some(category) = &query.category {
            if &spot.category != category {
                return false;
            }
        }
        if !query.interests.is_empty() {
            let tags = spot.interest_tags_list();
            if !query.interests.iter().any(|i| tags.contains(&i.as_str())) {
                return false;
            }
        }
        if let Some(budget) = query.budget {
            if normalize_budget_level(&spot.budget_level) != budget.as_str() {
                return false;
            }
        }
        if let Some(phase) = query.date_phase {
            let recommended = spot.recommended_for_list();
            let phase_ja = match phase {
                DatePhase::First => "初デート",
                DatePhase::Second => "2回目以降",
                DatePhase::Anniversary => "記念日",
                DatePhase::Casual => "カジュアル",
            };
            let suits = recommended.contains(&phase.as_str())
                || recommended.contains(&phase_ja)
                || recommended.contains(&"all")
                || recommended.contains(&"全て");
            if !suits {
                return false;
            }
        }
        if let Some(slot) = &query.time_slot {
            let slots = spot.best_time_slot_list();
            if !slots.contains(&slot.as_str()) && !slots.contains(&"anytime") {
                return false;
            }
        }
        if let Some(mood) = query.mood {
            let (key, label) = match mood {
                Mood::Relax => ("relax", "落ち着"),
                Mood::Active => ("active", "アクティブ"),
                Mood::Romantic => ("romantic", "ロマン"),
                Mood::Casual => ("casual", "カジュアル"),
            };
            let tags = spot.mood_tags.to_lowercase();
            if !tags.contains(key) && !spot.mood_tags.contains(label) {
                return false;
            }
        }
        for ng in &query.ng_conditions {
            let blocked = match ng {
                NgCondition::Outdoor => spot.indoor_outdoor == "outdoor",
                NgCondition::Indoor => spot.indoor_outdoor == "indoor",
                NgCondition::Crowd => spot.mood_tags.contains("賑やか"),
                NgCondition::Quiet => spot.mood_tags.contains("静か"),
                NgCondition::Walk => spot.stay_minutes() > 120,
                NgCondition::Rain => !spot.weather_ok(),
            };
            if blocked {
                return false;
            }
        }
        if query.weather_proof && !spot.weather_ok() {
            return false;
        }
        if query.require_coordinates && !spot.has_coordinates() {
            return false;
        }
        if query.exclude_spots.contains(&spot.spot_name) {
            return false;
        }
        true
    }

    pub fn pick_random(&self, query: &SpotQuery) -> Option<Spot> {
        let matches = self.search(query);
        matches.choose(&mut rand::thread_rng()).map(|s| Spot::clone(s))
    }

    pub fn pick_randoms(&self, n: usize, query: &SpotQuery) -> Vec<Spot> {
        let matches = self.search(query);
        matches
            .choose_multiple(&mut rand::thread_rng(), n.min(matches.len()))
            .map(|s| Spot::clone(s))
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.spots().len(),
            ..StoreStats::default()
        };
        for spot in self.spots() {
            *stats.by_area.entry(spot.area_id.clone()).or_default() += 1;
            *stats.by_category.entry(spot.category.clone()).or_default() += 1;
            if spot.has_coordinates() {
                stats.with_coordinates += 1;
            } else {
                stats.without_coordinates += 1;
            }
        }
        stats
    }

    /// Shape a curated record the way the plan pipeline consumes venues.
    pub fn format_for_plan(&self, spot: &Spot) -> Venue {
        let reason = match (spot.short_description.is_empty(), spot.tips.is_empty()) {
            (false, false) => format!("{} {}", spot.short_description, spot.tips),
            (false, true) => spot.short_description.clone(),
            (true, false) => spot.tips.clone(),
            (true, true) => format!("{}は{}な雰囲気で楽しめます。", spot.spot_name, spot.mood_tags),
        };

        let official_url = if !spot.official_url.is_empty() {
            Some(spot.official_url.clone())
        } else if !spot.source_url.is_empty() {
            Some(spot.source_url.clone())
        } else {
            None
        };

        Venue {
            name: spot.spot_name.clone(),
            category: spot.category.clone(),
            area: Some(spot.area_name.clone()),
            lat: spot.lat,
            lng: spot.lng,
            address: (!spot.address.is_empty()).then(|| spot.address.clone()),
            rating: None,
            url: Some(map_search_url(&spot.spot_name, &spot.area_name)),
            official_url,
            place_id: None,
            opening_hours: Vec::new(),
            photos: Vec::new(),
            reviews: Vec::new(),
            price_range: (!spot.price_range.is_empty()).then(|| spot.price_range.clone()),
            stay_minutes: Some(spot.stay_minutes()),
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(name: &str, area: &str, category: &str, budget: &str) -> Spot {
        Spot {
            spot_name: name.to_string(),
            area_id: area.to_string(),
            area_name: "渋谷".to_string(),
            category: category.to_string(),
            budget_level: budget.to_string(),
            recommended_for: "first|casual".to_string(),
            best_time_slot: "lunch|afternoon".to_string(),
            lat: Some(35.66),
            lng: Some(139.70),
            weather_ok: "TRUE".to_string(),
            ..Spot::default()
        }
    }

    #[test]
    fn search_filters_by_area_category_and_budget() {
        let store = SpotStore::from_spots(vec![
            spot("A", "shibuya", "restaurant", "medium"),
            spot("B", "shibuya", "cafe", "medium"),
            spot("C", "ueno", "restaurant", "mid"),
        ]);

        let query = SpotQuery {
            area: Some("shibuya".to_string()),
            category: Some("restaurant".to_string()),
            budget: Some(BudgetLevel::Medium),
            ..SpotQuery::default()
        };
        let found = store.search(&query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].spot_name, "A");

        // "mid" normalizes to medium.
        let query = SpotQuery {
            area: Some("ueno".to_string()),
            budget: Some(BudgetLevel::Medium),
            ..SpotQuery::default()
        };
        assert_eq!(store.search(&query).len(), 1);
    }

    #[test]
    fn ng_conditions_and_exclusions_drop_spots() {
        let mut outdoor = spot("公園", "shibuya", "park", "low");
        outdoor.indoor_outdoor = "outdoor".to_string();
        outdoor.mood_tags = "賑やか".to_string();
        let store = SpotStore::from_spots(vec![outdoor, spot("美術館", "shibuya", "museum", "low")]);

        let query = SpotQuery {
            area: Some("shibuya".to_string()),
            ng_conditions: vec![NgCondition::Outdoor, NgCondition::Crowd],
            ..SpotQuery::default()
        };
        let found = store.search(&query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].spot_name, "美術館");

        let query = SpotQuery {
            area: Some("shibuya".to_string()),
            exclude_spots: vec!["美術館".to_string()],
            ng_conditions: vec![NgCondition::Outdoor],
            ..SpotQuery::default()
        };
        assert!(store.search(&query).is_empty());
    }

    #[test]
    fn unsupported_area_is_reported() {
        let store = SpotStore::from_spots(vec![spot("A", "shibuya", "cafe", "low")]);
        assert!(store.supports_area("shibuya"));
        assert!(!store.supports_area("ota"));
    }

    #[test]
    fn format_for_plan_builds_reason_and_urls() {
        let mut s = spot("喫茶ロマン", "shibuya", "cafe", "low");
        s.short_description = "レトロな喫茶店。".to_string();
        s.tips = "窓際席がおすすめ。".to_string();
        let store = SpotStore::from_spots(vec![s.clone()]);

        let venue = store.format_for_plan(&s);
        assert_eq!(venue.reason.as_deref(), Some("レトロな喫茶店。 窓際席がおすすめ。"));
        assert!(venue.url.unwrap().contains("maps"));
        assert_eq!(venue.stay_minutes, Some(60));
    }
}

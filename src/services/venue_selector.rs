//! Slot venue selection.
//!
//! One venue per itinerary slot, resolved through tiers: the curated spot
//! store first, then a keyword search against the places provider (bounded
//! keyword retries, each candidate screened against its opening hours), and
//! `None` when both come up empty — the plan generator substitutes a
//! synthetic placeholder in that case. Selection never raises: provider
//! failures were already collapsed to `None` at the provider boundary.

use chrono::NaiveTime;
use rand::seq::SliceRandom;

use crate::db::spot_store::{SpotQuery, SpotStore};
use crate::models::conditions::{BudgetLevel, DatePhase, Mood, NgCondition, TimeSlot};
use crate::models::plan::ItemKind;
use crate::models::venue::Venue;
use crate::services::geo;
use crate::services::opening_hours;
use crate::services::places_service::{PlacesProvider, SearchOptions};

const MAX_KEYWORD_RETRIES: usize = 3;

/// Everything needed to fill one slot with a venue.
#[derive(Debug, Clone)]
pub struct SlotSpec {
    pub kind: ItemKind,
    pub area: String,
    pub budget: BudgetLevel,
    pub phase: DatePhase,
    pub time_slot: TimeSlot,
    /// Nominal clock time of the slot, used for the opening-hours screen.
    pub desired_time: NaiveTime,
    pub mood: Option<Mood>,
    pub ng_conditions: Vec<NgCondition>,
    /// Venue names already used in this itinerary.
    pub exclude: Vec<String>,
    /// Bias external search around this point (e.g. the resolved lunch venue)
    /// instead of the area center.
    pub anchor: Option<geo::Coordinate>,
}

pub struct VenueSelector<'a, P> {
    store: &'a SpotStore,
    places: &'a P,
    allow_external: bool,
}

impl<'a, P: PlacesProvider> VenueSelector<'a, P> {
    pub fn new(store: &'a SpotStore, places: &'a P, allow_external: bool) -> Self {
        VenueSelector {
            store,
            places,
            allow_external,
        }
    }

    pub async fn select_venue(&self, slot: &SlotSpec) -> Option<Venue> {
        // Tier 1: curated store. Skipped entirely when the store has no rows
        // for the requested area.
        if self.store.supports_area(&slot.area) {
            if let Some(venue) = self.store_lookup(slot) {
                println!("Slot {:?} filled from spot database: {}", slot.kind, venue.name);
                return Some(venue);
            }
        }

        // Tier 2: keyword search against the places provider.
        if self.allow_external {
            if let Some(venue) = self.search_lookup(slot).await {
                println!("Slot {:?} filled from places search: {}", slot.kind, venue.name);
                return Some(venue);
            }
        }

        None
    }

    fn store_lookup(&self, slot: &SlotSpec) -> Option<Venue> {
        let base = SpotQuery {
            area: Some(slot.area.clone()),
            budget: Some(slot.budget),
            date_phase: Some(slot.phase),
            time_slot: store_time_slot(slot.kind).map(str::to_string),
            mood: slot.mood,
            ng_conditions: slot.ng_conditions.clone(),
            require_coordinates: true,
            exclude_spots: slot.exclude.clone(),
            ..SpotQuery::default()
        };

        for category in store_categories(slot.kind) {
            let query = SpotQuery {
                category: category.map(str::to_string),
                // Activity slots are not budget-bound in the store.
                budget: if slot.kind == ItemKind::Activity { None } else { base.budget },
                ..base.clone()
            };
            if let Some(spot) = self.store.pick_random(&query) {
                return Some(self.store.format_for_plan(&spot));
            }
        }
        None
    }

    async fn search_lookup(&self, slot: &SlotSpec) -> Option<Venue> {
        let area_ja = geo::area_japanese(&slot.area);
        let options = SearchOptions {
            category: provider_category(slot.kind).map(str::to_string),
            budget: Some(slot.budget),
            date_phase: Some(slot.phase),
            time_slot: search_time_slot(slot.kind, slot.time_slot),
            exclude_names: slot.exclude.clone(),
            random_pick: true,
            anchor: slot.anchor,
        };

        let mut keywords = keyword_candidates(slot.kind, slot.budget, slot.mood);
        keywords.shuffle(&mut rand::thread_rng());

        // A candidate that fails the opening-hours screen is kept as a
        // fallback; the re-validation stage flags it if it is still closed at
        // its final time.
        let mut fallback: Option<Venue> = None;
        for keyword in keywords.into_iter().take(MAX_KEYWORD_RETRIES) {
            let Some(mut venue) = self.places.search_venue(keyword, &area_ja, &options).await else {
                continue;
            };
            if venue.opening_hours.is_empty() {
                if let Some(place_id) = venue.place_id.clone() {
                    if let Some(detail) = self.places.venue_detail(&place_id).await {
                        venue.opening_hours = detail.opening_hours;
                    }
                }
            }
            if opening_hours::is_open_at(&venue.opening_hours, slot.desired_time) {
                return Some(venue);
            }
            fallback.get_or_insert(venue);
        }
        fallback
    }

    /// Name-based lookup used by the custom-request resolver: first scoped to
    /// the area, then citywide.
    pub async fn search_named(&self, name: &str, area: &str) -> Option<Venue> {
        if !self.allow_external {
            return None;
        }
        let options = SearchOptions::default();
        let area_ja = geo::area_japanese(area);
        if let Some(venue) = self.places.search_venue(name, &area_ja, &options).await {
            return Some(venue);
        }
        self.places.search_venue(name, "東京都", &options).await
    }
}

/// Store categories tried in order for a slot kind. Activity slots widen from
/// concrete categories to "anything suitable".
fn store_categories(kind: ItemKind) -> Vec<Option<&'static str>> {
    match kind {
        ItemKind::Lunch => vec![Some("restaurant")],
        ItemKind::Dinner => vec![Some("restaurant"), Some("bar")],
        ItemKind::Cafe => vec![Some("cafe")],
        ItemKind::Activity => vec![
            Some("museum"),
            Some("theater"),
            Some("shopping"),
            Some("park"),
            None,
        ],
        _ => vec![None],
    }
}

fn provider_category(kind: ItemKind) -> Option<&'static str> {
    match kind {
        ItemKind::Lunch | ItemKind::Dinner => Some("restaurant"),
        ItemKind::Cafe => Some("cafe"),
        // Keyword-only search finds museums, parks and malls alike.
        _ => None,
    }
}

fn store_time_slot(kind: ItemKind) -> Option<&'static str> {
    match kind {
        ItemKind::Lunch => Some("lunch"),
        ItemKind::Cafe => Some("afternoon"),
        ItemKind::Dinner => Some("evening"),
        _ => None,
    }
}

fn search_time_slot(kind: ItemKind, slot: TimeSlot) -> Option<TimeSlot> {
    match kind {
        ItemKind::Lunch => Some(TimeSlot::Lunch),
        ItemKind::Dinner => Some(TimeSlot::Dinner),
        _ => Some(slot),
    }
}

fn keyword_candidates(kind: ItemKind, budget: BudgetLevel, mood: Option<Mood>) -> Vec<&'static str> {
    match kind {
        ItemKind::Lunch => match budget {
            BudgetLevel::Low => vec![
                "カフェランチ人気",
                "カジュアル和食おすすめ",
                "ラーメン店おしゃれ",
                "パスタランチ",
                "定食屋評判",
            ],
            BudgetLevel::Medium => vec![
                "イタリアンランチ有名",
                "レストランランチおすすめ",
                "ビストロランチ",
                "カフェレストラン人気",
                "和食ランチ個室",
            ],
            BudgetLevel::High => vec![
                "高級レストランランチ",
                "フレンチランチ有名",
                "懐石料理ランチ",
                "高級イタリアン",
                "寿司ランチ高級",
            ],
        },
        ItemKind::Dinner => match budget {
            BudgetLevel::Low => vec![
                "居酒屋おしゃれ人気",
                "カジュアルダイニング",
                "焼肉カジュアルおすすめ",
                "イタリアン気軽",
                "バル人気",
            ],
            BudgetLevel::Medium => vec![
                "おしゃれディナーおすすめ",
                "イタリアン人気",
                "フレンチビストロ",
                "和食個室ディナー",
                "焼肉おしゃれ",
            ],
            BudgetLevel::High => vec![
                "高級ディナー有名",
                "フレンチレストラン高級",
                "高級寿司",
                "会席料理",
                "鉄板焼き高級おすすめ",
            ],
        },
        ItemKind::Cafe => {
            if budget == BudgetLevel::High {
                vec!["高級カフェ", "スペシャリティコーヒー", "パティスリー併設カフェ"]
            } else if mood == Some(Mood::Romantic) {
                vec!["雰囲気カフェ", "隠れ家カフェ", "テラスカフェ"]
            } else {
                vec!["おしゃれカフェ", "スイーツカフェ", "隠れ家カフェ"]
            }
        }
        _ => match mood {
            Some(Mood::Active) => vec!["スポーツ施設", "アミューズメント", "体験施設"],
            Some(Mood::Romantic) => vec!["絶景スポット", "展望台有名", "インスタ映え人気"],
            Some(Mood::Relax) => vec!["公園人気", "庭園有名", "美術館人気"],
            _ => vec!["観光スポット", "人気スポット", "デートスポット"],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::spot_store::Spot;
    use crate::services::places_service::testing::FakeProvider;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn slot(kind: ItemKind, area: &str, exclude: Vec<String>) -> SlotSpec {
        SlotSpec {
            kind,
            area: area.to_string(),
            budget: BudgetLevel::Medium,
            phase: DatePhase::First,
            time_slot: TimeSlot::Lunch,
            desired_time: noon(),
            mood: None,
            ng_conditions: Vec::new(),
            exclude,
            anchor: None,
        }
    }

    fn curated_spot(name: &str, category: &str) -> Spot {
        Spot {
            spot_name: name.to_string(),
            area_id: "shibuya".to_string(),
            area_name: "渋谷".to_string(),
            category: category.to_string(),
            budget_level: "medium".to_string(),
            recommended_for: "all".to_string(),
            best_time_slot: "anytime".to_string(),
            lat: Some(35.66),
            lng: Some(139.70),
            weather_ok: "TRUE".to_string(),
            ..Spot::default()
        }
    }

    #[tokio::test]
    async fn curated_store_wins_over_search() {
        let store = SpotStore::from_spots(vec![curated_spot("渋谷食堂", "restaurant")]);
        let places = FakeProvider::default().with_venue(
            "ランチ",
            Venue {
                name: "検索の店".to_string(),
                ..Venue::default()
            },
        );
        let selector = VenueSelector::new(&store, &places, true);

        let venue = selector.select_venue(&slot(ItemKind::Lunch, "shibuya", vec![])).await;
        assert_eq!(venue.unwrap().name, "渋谷食堂");
    }

    #[tokio::test]
    async fn unsupported_area_falls_through_to_search() {
        let store = SpotStore::from_spots(vec![curated_spot("渋谷食堂", "restaurant")]);
        let places = FakeProvider::default().with_venue(
            "ランチ",
            Venue {
                name: "上野の店".to_string(),
                lat: Some(35.71),
                lng: Some(139.77),
                ..Venue::default()
            },
        );
        let selector = VenueSelector::new(&store, &places, true);

        let venue = selector.select_venue(&slot(ItemKind::Lunch, "ueno", vec![])).await;
        assert_eq!(venue.unwrap().name, "上野の店");
    }

    #[tokio::test]
    async fn exclusions_prevent_duplicate_venues() {
        let store = SpotStore::from_spots(vec![curated_spot("渋谷食堂", "restaurant")]);
        let places = FakeProvider::default();
        let selector = VenueSelector::new(&store, &places, true);

        let venue = selector
            .select_venue(&slot(ItemKind::Dinner, "shibuya", vec!["渋谷食堂".to_string()]))
            .await;
        assert!(venue.is_none());
    }

    #[tokio::test]
    async fn offline_mode_never_touches_the_provider() {
        let store = SpotStore::from_spots(vec![]);
        let places = FakeProvider::default().with_venue(
            "ランチ",
            Venue {
                name: "ネットの店".to_string(),
                ..Venue::default()
            },
        );
        let selector = VenueSelector::new(&store, &places, false);

        assert!(selector.select_venue(&slot(ItemKind::Lunch, "shibuya", vec![])).await.is_none());
        assert!(selector.search_named("浅草寺", "asakusa").await.is_none());
    }
}

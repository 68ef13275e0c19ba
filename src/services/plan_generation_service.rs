//! Plan generation orchestrator.
//!
//! Wires the pipeline end to end: adjustment intents, area-center resolution,
//! concurrent venue fill, placeholder fallbacks, custom-request application,
//! hydration and transit enrichment, assembly and narration. Exposes the one
//! operation the routes call: `build_plan`.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::db::spot_store::SpotStore;
use crate::models::conditions::{BudgetLevel, Conditions, DatePhase, TransportMode};
use crate::models::plan::{minutes_of, ItemKind, Plan, ScheduleItem};
use crate::models::venue::{search_url, Venue};
use crate::services::custom_request::{self, TimeDefaults};
use crate::services::geo::{self, Coordinate};
use crate::services::intent::{classify_adjustment, AdjustmentIntent, CustomRequestKind};
use crate::services::narrator::{self, CustomOutcome, NarratorFacts};
use crate::services::places_service::{PlacesProvider, SearchOptions};
use crate::services::schedule_assembler::{
    nominal_times, skeleton_for, BookendOverride, ScheduleAssembler, SlotTemplate,
};
use crate::services::venue_selector::{SlotSpec, VenueSelector};

/// Hydration is skipped wholesale once this much of the request budget is
/// spent, keeping the response inside the caller's overall deadline.
const HYDRATION_DEADLINE_MS: u128 = 7500;
/// Threshold for the custom-request "arrived close enough" narration.
const CUSTOM_TIME_TOLERANCE_MINUTES: i64 = 20;

pub struct PlanGenerator<P> {
    store: Arc<SpotStore>,
    places: Arc<P>,
}

impl<P: PlacesProvider> PlanGenerator<P> {
    pub fn new(store: Arc<SpotStore>, places: Arc<P>) -> Self {
        PlanGenerator { store, places }
    }

    /// Build a complete plan. `allow_external_calls = false` forbids every
    /// provider call (the degraded offline build); `preconstructed` carries an
    /// LLM-generated skeleton through the same leg/bookend/validation stages.
    pub async fn build_plan(
        &self,
        conditions: &Conditions,
        adjustment: Option<&str>,
        allow_external_calls: bool,
        preconstructed: Option<Vec<ScheduleItem>>,
        started_at: Instant,
    ) -> Plan {
        // Adjustment intents mutate a working copy of phase and budget.
        let mut phase = conditions.date_phase;
        let mut budget = conditions.date_budget_level;
        if let Some(text) = adjustment {
            for intent in classify_adjustment(text) {
                match intent {
                    AdjustmentIntent::BudgetDown => budget = budget.lower(),
                    AdjustmentIntent::BudgetUp => budget = budget.raise(),
                    AdjustmentIntent::PhaseFirst => phase = DatePhase::First,
                    AdjustmentIntent::PhaseAnniversary => phase = DatePhase::Anniversary,
                    AdjustmentIntent::PhaseCasual => phase = DatePhase::Casual,
                }
            }
        }

        let area = conditions.area.clone();
        let area_ja = geo::area_japanese(&area);
        let movement = conditions.movement();
        let window = conditions.start_time.zip(conditions.duration_minutes);
        let times = nominal_times(conditions.time_slot, window);
        let skeleton = skeleton_for(phase, conditions.time_slot, &times);

        // Preliminary area center: static tables, then the geocoder. `None`
        // here means unresolved; it is re-derived from venue coordinates
        // below rather than compared against a sentinel.
        let mut center = geo::cached_area_center(&area);
        if center.is_none() && allow_external_calls {
            center = self.places.geocode_area(&area_ja).await;
        }

        let selector = VenueSelector::new(&self.store, self.places.as_ref(), allow_external_calls);

        let was_preconstructed = preconstructed.is_some();
        let mut slot_items = match preconstructed {
            Some(items) => normalize_preconstructed(items, &area, phase, conditions.mood, budget),
            None => {
                let filled = self
                    .fill_slots(&skeleton, conditions, phase, budget, &selector)
                    .await;

                // Unresolved center: mean of the resolved venue coordinates,
                // then the Tokyo fallback.
                if center.is_none() {
                    center = mean_coordinate(filled.iter().flatten());
                }
                let final_center = center.unwrap_or_else(geo::tokyo_fallback);
                center = Some(final_center);

                skeleton
                    .iter()
                    .zip(filled)
                    .map(|(template, venue)| {
                        self.build_slot_item(
                            template,
                            venue,
                            &area,
                            &area_ja,
                            final_center,
                            phase,
                            conditions.mood,
                            budget,
                        )
                    })
                    .collect()
            }
        };
        let final_center = center.unwrap_or_else(geo::tokyo_fallback);

        // Custom request: bookend override or chronological insertion. An LLM
        // skeleton already reflects the request text, so only the rule-based
        // path resolves it here.
        let mut meeting_override = None;
        let mut farewell_override = None;
        let mut custom_override_applied = false;
        let custom_request_text = conditions
            .custom_request
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let (Some(request), false) = (custom_request_text, was_preconstructed) {
            let defaults = TimeDefaults {
                contextual: times.activity,
                lunch: times.lunch,
                dinner: times.dinner,
            };
            let resolved =
                custom_request::resolve(request, defaults, &area, final_center, &selector).await;
            match resolved.kind {
                CustomRequestKind::MeetingOverride => {
                    meeting_override = Some(BookendOverride {
                        name: resolved.name,
                        lat: resolved.lat,
                        lng: resolved.lng,
                        map_url: Some(resolved.map_url),
                        time: resolved.time,
                    });
                    custom_override_applied = true;
                }
                CustomRequestKind::FarewellOverride => {
                    farewell_override = Some(BookendOverride {
                        name: resolved.name,
                        lat: resolved.lat,
                        lng: resolved.lng,
                        map_url: Some(resolved.map_url),
                        time: resolved.time,
                    });
                    custom_override_applied = true;
                }
                CustomRequestKind::Insertion => {
                    let item = ScheduleItem {
                        time: resolved.time,
                        kind: ItemKind::Custom,
                        place_name: resolved.name,
                        lat: Some(resolved.lat),
                        lng: Some(resolved.lng),
                        area: Some(area.clone()),
                        price_range: Some(
                            narrator::price_range(budget, ItemKind::Activity).to_string(),
                        ),
                        duration_minutes: 60,
                        reason: format!("ユーザーリクエスト: {}", request),
                        reason_tags: vec!["リクエスト反映".to_string()],
                        info_url: Some(resolved.map_url),
                        place_id: resolved.place_id,
                        is_custom: true,
                        preferred_start_minutes: Some(minutes_of(resolved.time)),
                        ..ScheduleItem::default()
                    };
                    custom_request::insert_chronologically(&mut slot_items, item);
                }
            }
        }

        // Hydration: richer venue detail, fetched concurrently. Skipped
        // wholesale when the remaining budget is too thin or external calls
        // are forbidden.
        if allow_external_calls {
            if started_at.elapsed().as_millis() <= HYDRATION_DEADLINE_MS {
                slot_items = self.hydrate_items(slot_items, &area_ja).await;
            } else {
                println!(
                    "Hydration skipped, request budget nearly spent ({}ms elapsed)",
                    started_at.elapsed().as_millis()
                );
            }
        }
        enrich_media(&mut slot_items);

        let assembler = ScheduleAssembler::new(
            &area,
            final_center,
            movement.clone(),
            conditions.restricted_mode(),
        );
        let mut schedule = assembler.assemble(slot_items, meeting_override, farewell_override);

        if allow_external_calls && started_at.elapsed().as_millis() <= HYDRATION_DEADLINE_MS {
            schedule = self.enrich_transit(schedule).await;
        }

        // An LLM skeleton was prompted to include the request itself; only
        // the rule-based path can judge the outcome from item flags.
        let custom_outcome = if was_preconstructed && custom_request_text.is_some() {
            CustomOutcome::Satisfied
        } else {
            custom_outcome(
                &schedule,
                custom_request_text.is_some(),
                custom_override_applied,
            )
        };

        let facts = NarratorFacts {
            phase,
            budget,
            time_slot: conditions.time_slot,
            mood: conditions.mood,
            ng_conditions: &conditions.ng_conditions,
            movement: &movement,
            custom_request: custom_request_text,
            custom_outcome,
            adjustment,
        };

        Plan {
            plan_summary: narrator::plan_summary(phase),
            plan_reason: narrator::narrate(&facts),
            total_estimated_cost: narrator::cost_range(budget).to_string(),
            schedule,
            adjustable_points: narrator::adjustable_points(),
            risk_flags: Vec::new(),
            conversation_topics: narrator::conversation_topics(),
            next_step_phrase: narrator::next_step_phrase(phase),
        }
    }

    /// Fill the skeleton's venue slots in two fan-out batches: lunch and
    /// activity against the area, then cafe and dinner anchored near the
    /// resolved lunch venue and excluding everything batch one picked.
    async fn fill_slots(
        &self,
        skeleton: &[SlotTemplate],
        conditions: &Conditions,
        phase: DatePhase,
        budget: BudgetLevel,
        selector: &VenueSelector<'_, P>,
    ) -> Vec<Option<Venue>> {
        let make_spec = |template: &SlotTemplate, exclude: Vec<String>, anchor| SlotSpec {
            kind: template.kind,
            area: conditions.area.clone(),
            budget,
            phase,
            time_slot: conditions.time_slot,
            desired_time: template.time,
            mood: conditions.mood,
            ng_conditions: conditions.ng_conditions.clone(),
            exclude,
            anchor,
        };

        let mut filled: Vec<Option<Venue>> = vec![None; skeleton.len()];

        let first_batch: Vec<(usize, SlotSpec)> = skeleton
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t.kind, ItemKind::Lunch | ItemKind::Activity))
            .map(|(i, t)| (i, make_spec(t, Vec::new(), None)))
            .collect();
        let results = join_all(first_batch.iter().map(|(_, spec)| selector.select_venue(spec))).await;
        for ((index, _), venue) in first_batch.iter().zip(results) {
            filled[*index] = venue;
        }

        let exclude: Vec<String> = filled.iter().flatten().map(|v| v.name.clone()).collect();
        // Cafe and dinner near where lunch actually landed, not the centroid.
        let anchor = skeleton
            .iter()
            .zip(filled.iter())
            .find(|(t, v)| t.kind == ItemKind::Lunch && v.is_some())
            .and_then(|(_, v)| v.as_ref().unwrap().coordinates())
            .map(|(lat, lng)| Coordinate::new(lat, lng));

        let second_batch: Vec<(usize, SlotSpec)> = skeleton
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t.kind, ItemKind::Cafe | ItemKind::Dinner))
            .map(|(i, t)| (i, make_spec(t, exclude.clone(), anchor)))
            .collect();
        let results = join_all(second_batch.iter().map(|(_, spec)| selector.select_venue(spec))).await;
        for ((index, _), venue) in second_batch.iter().zip(results) {
            filled[*index] = venue;
        }

        // Concurrent lookups cannot thread exclusions between each other, so
        // enforce venue uniqueness once the batches resolve.
        let mut seen: Vec<String> = Vec::new();
        for slot in filled.iter_mut() {
            let name = match slot {
                Some(venue) => venue.name.clone(),
                None => continue,
            };
            if seen.contains(&name) {
                *slot = None;
            } else {
                seen.push(name);
            }
        }

        filled
    }

    #[allow(clippy::too_many_arguments)]
    fn build_slot_item(
        &self,
        template: &SlotTemplate,
        venue: Option<Venue>,
        area: &str,
        area_ja: &str,
        center: Coordinate,
        phase: DatePhase,
        mood: Option<crate::models::conditions::Mood>,
        budget: BudgetLevel,
    ) -> ScheduleItem {
        if template.kind == ItemKind::Walk {
            let (reason, reason_tags) = narrator::slot_reason(template.kind, phase, mood, budget);
            return ScheduleItem {
                time: template.time,
                kind: ItemKind::Walk,
                place_name: format!("{} 街歩き", area_ja),
                lat: Some(center.lat),
                lng: Some(center.lng),
                area: Some(area.to_string()),
                price_range: Some("0".to_string()),
                duration_minutes: template.duration_minutes,
                reason,
                reason_tags,
                ..ScheduleItem::default()
            };
        }

        let venue = venue.unwrap_or_else(|| placeholder_venue(template.kind, area, area_ja, center));
        let (reason, reason_tags) = narrator::slot_reason(template.kind, phase, mood, budget);
        let name = venue.name.clone();

        ScheduleItem {
            time: template.time,
            kind: template.kind,
            place_name: name.clone(),
            lat: venue.lat,
            lng: venue.lng,
            area: Some(area.to_string()),
            address: venue.address,
            price_range: Some(
                venue
                    .price_range
                    .unwrap_or_else(|| narrator::price_range(budget, template.kind).to_string()),
            ),
            duration_minutes: venue.stay_minutes.unwrap_or(template.duration_minutes),
            reason,
            reason_tags,
            info_url: Some(venue.url.unwrap_or_else(|| search_url(&name))),
            official_url: venue.official_url,
            rating: venue.rating,
            photos: venue.photos,
            reviews: venue.reviews,
            opening_hours: venue.opening_hours,
            place_id: venue.place_id,
            ..ScheduleItem::default()
        }
    }

    async fn hydrate_items(&self, items: Vec<ScheduleItem>, area_ja: &str) -> Vec<ScheduleItem> {
        println!("Hydrating {} schedule items", items.len());
        join_all(items.into_iter().map(|item| self.hydrate_item(item, area_ja))).await
    }

    async fn hydrate_item(&self, mut item: ScheduleItem, area_ja: &str) -> ScheduleItem {
        if !item.kind.is_visit() || item.kind == ItemKind::Walk {
            return item;
        }

        let mut place_id = item.place_id.clone();
        let mut search_photos: Vec<String> = Vec::new();

        if place_id.is_none() && !item.place_name.is_empty() {
            if let Some(found) = self
                .places
                .search_venue(&item.place_name, area_ja, &SearchOptions::default())
                .await
            {
                place_id = found.place_id.clone();
                search_photos = found.photos;
                if item.lat.is_none() {
                    item.lat = found.lat;
                    item.lng = found.lng;
                }
            }
        }

        let detail = match &place_id {
            Some(id) => self.places.venue_detail(id).await,
            None => None,
        };

        match detail {
            Some(detail) => {
                let mut photos = detail.photos;
                if photos.is_empty() {
                    photos = search_photos;
                }
                photos.truncate(3);
                if !photos.is_empty() {
                    item.photos = photos;
                }
                let mut reviews = detail.reviews;
                reviews.truncate(3);
                if !reviews.is_empty() {
                    item.reviews = reviews;
                }
                item.rating = detail.rating.or(item.rating);
                item.official_url = detail.website.or(item.official_url);
                item.address = detail.address.or(item.address);
                if !detail.opening_hours.is_empty() {
                    item.opening_hours = detail.opening_hours;
                }
                item.place_id = place_id;
            }
            None => {
                search_photos.truncate(3);
                if !search_photos.is_empty() {
                    item.photos = search_photos;
                }
            }
        }

        item
    }

    /// Attach best-effort transit details to train legs.
    async fn enrich_transit(&self, schedule: Vec<ScheduleItem>) -> Vec<ScheduleItem> {
        let mut enriched = Vec::with_capacity(schedule.len());
        for index in 0..schedule.len() {
            let mut item = schedule[index].clone();
            if item.kind == ItemKind::Travel
                && item.transport_mode == Some(TransportMode::Train)
                && index > 0
                && index + 1 < schedule.len()
            {
                let origin = coordinate_of(&schedule[index - 1]);
                let destination = coordinate_of(&schedule[index + 1]);
                if let (Some(origin), Some(destination)) = (origin, destination) {
                    item.transit_route = self.places.transit_summary(origin, destination).await;
                }
            }
            enriched.push(item);
        }
        enriched
    }
}

fn coordinate_of(item: &ScheduleItem) -> Option<Coordinate> {
    item.lat.zip(item.lng).map(|(lat, lng)| Coordinate::new(lat, lng))
}

fn mean_coordinate<'a>(venues: impl Iterator<Item = &'a Venue>) -> Option<Coordinate> {
    let coords: Vec<(f64, f64)> = venues.filter_map(|v| v.coordinates()).collect();
    if coords.is_empty() {
        return None;
    }
    let n = coords.len() as f64;
    Some(Coordinate::new(
        coords.iter().map(|c| c.0).sum::<f64>() / n,
        coords.iter().map(|c| c.1).sum::<f64>() / n,
    ))
}

/// Skeleton items from the LLM path: fill the defaults the model tends to
/// leave out so they survive the same pipeline stages.
fn normalize_preconstructed(
    items: Vec<ScheduleItem>,
    area: &str,
    phase: DatePhase,
    mood: Option<crate::models::conditions::Mood>,
    budget: BudgetLevel,
) -> Vec<ScheduleItem> {
    items
        .into_iter()
        .map(|mut item| {
            if item.area.is_none() {
                item.area = Some(area.to_string());
            }
            if item.price_range.is_none() {
                item.price_range = Some(narrator::price_range(budget, item.kind).to_string());
            }
            if item.reason.is_empty() {
                let (reason, tags) = narrator::slot_reason(item.kind, phase, mood, budget);
                item.reason = reason;
                if item.reason_tags.is_empty() {
                    item.reason_tags = tags;
                }
            }
            if item.info_url.is_none() {
                item.info_url = Some(search_url(&item.place_name));
            }
            item
        })
        .collect()
}

/// Last-tier synthetic venue: a known landmark for the area when the table
/// has one, otherwise a generic spot offset from the center so placeholders
/// do not collide exactly.
fn placeholder_venue(kind: ItemKind, area: &str, area_ja: &str, center: Coordinate) -> Venue {
    if let Some(venue) = known_fallback_spot(area, kind) {
        return venue;
    }

    let (name, lat, lng, address) = match kind {
        ItemKind::Lunch => (
            format!("{} レストラン", area_ja),
            center.lat,
            center.lng,
            Some(area_ja.to_string()),
        ),
        ItemKind::Cafe => (
            format!("{} カフェ", area_ja),
            center.lat + 0.0015,
            center.lng + 0.0015,
            None,
        ),
        ItemKind::Dinner => (
            format!("{} ディナー", area_ja),
            center.lat + 0.002,
            center.lng - 0.001,
            Some(area_ja.to_string()),
        ),
        _ => (format!("{}散策", area_ja), center.lat + 0.001, center.lng + 0.001, None),
    };

    Venue {
        name: name.clone(),
        lat: Some(lat),
        lng: Some(lng),
        address,
        url: Some(search_url(&name)),
        ..Venue::default()
    }
}

fn known_fallback_spot(area: &str, kind: ItemKind) -> Option<Venue> {
    let (name, lat, lng, address) = match (area, kind) {
        ("shibuya", ItemKind::Lunch) => ("渋谷モディ", 35.6604, 139.7017, Some("東京都渋谷区神南1-21-3")),
        ("shibuya", ItemKind::Activity) => ("渋谷センター街", 35.6597, 139.7006, None),
        ("shibuya", ItemKind::Dinner) => ("渋谷スクランブルスクエア", 35.6591, 139.7006, Some("東京都渋谷区渋谷2-24-12")),
        ("shinjuku", ItemKind::Lunch) => ("新宿ミロード", 35.6894, 139.7023, Some("東京都新宿区西新宿1-1-3")),
        ("shinjuku", ItemKind::Activity) => ("新宿御苑周辺", 35.6852, 139.7101, None),
        ("shinjuku", ItemKind::Dinner) => ("新宿ルミネ口エリア", 35.6895, 139.7004, Some("東京都新宿区新宿3-38-2")),
        ("ginza", ItemKind::Lunch) => ("GINZA SIX", 35.6702, 139.7636, Some("東京都中央区銀座6-10-1")),
        ("ginza", ItemKind::Activity) => ("銀座通り散策", 35.6717, 139.7650, None),
        ("ginza", ItemKind::Dinner) => ("銀座コースレストラン", 35.6705, 139.7640, Some("東京都中央区銀座4-1")),
        ("harajuku", ItemKind::Lunch) => ("表参道カフェ", 35.6654, 139.7120, Some("東京都渋谷区神宮前4-12-10")),
        ("harajuku", ItemKind::Activity) => ("竹下通り散策", 35.6702, 139.7020, None),
        ("harajuku", ItemKind::Dinner) => ("原宿イタリアン", 35.6700, 139.7034, Some("東京都渋谷区神宮前1-8-8")),
        ("odaiba", ItemKind::Lunch) => ("お台場ヴィーナスフォート", 35.6251, 139.7754, Some("東京都江東区青海1-3-15")),
        ("odaiba", ItemKind::Activity) => ("お台場海浜公園", 35.6298, 139.7766, None),
        ("odaiba", ItemKind::Dinner) => ("お台場デックス", 35.6272, 139.7757, Some("東京都港区台場1-6-1")),
        ("ueno", ItemKind::Lunch) => ("上野の森さくらテラス", 35.7156, 139.7745, Some("東京都台東区上野公園1-54")),
        ("ueno", ItemKind::Activity) => ("国立西洋美術館", 35.7188, 139.7769, None),
        ("ueno", ItemKind::Dinner) => ("アメ横の居酒屋", 35.7138, 139.7755, Some("東京都台東区上野4-7-8")),
        ("asakusa", ItemKind::Lunch) => ("浅草雷門周辺", 35.7148, 139.7967, Some("東京都台東区浅草2-3-1")),
        ("asakusa", ItemKind::Activity) => ("浅草寺散策", 35.7140, 139.7967, None),
        ("asakusa", ItemKind::Dinner) => ("仲見世通りグルメ", 35.7146, 139.7967, Some("東京都台東区浅草1-18-1")),
        ("ikebukuro", ItemKind::Lunch) => ("池袋サンシャイン", 35.7296, 139.7193, Some("東京都豊島区東池袋3-1-1")),
        ("ikebukuro", ItemKind::Activity) => ("サンシャイン水族館", 35.7289, 139.7188, None),
        ("ikebukuro", ItemKind::Dinner) => ("池袋グルメ街", 35.7310, 139.7101, Some("東京都豊島区西池袋1-1-25")),
        _ => return None,
    };

    Some(Venue {
        name: name.to_string(),
        lat: Some(lat),
        lng: Some(lng),
        address: address.map(str::to_string),
        url: Some(search_url(name)),
        ..Venue::default()
    })
}

/// Fill photo grids for visit items that ended up without any media.
fn enrich_media(items: &mut [ScheduleItem]) {
    for item in items.iter_mut() {
        if !item.kind.is_visit() || item.kind == ItemKind::Walk {
            continue;
        }
        if item.photos.is_empty() {
            item.photos = placeholder_photos(&item.place_name);
        }
    }
}

/// Gradient SVG placeholders so the photo grid never renders empty.
fn placeholder_photos(title: &str) -> Vec<String> {
    const PALETTE: [&str; 3] = ["#667eea", "#764ba2", "#ff6b6b"];
    let safe_title = title.replace('"', "");
    (0..3)
        .map(|variant| {
            let bg = PALETTE[variant % PALETTE.len()];
            let svg = format!(
                "<svg xmlns='http://www.w3.org/2000/svg' width='800' height='500'>\
                 <defs><linearGradient id='g{variant}' x1='0' y1='0' x2='1' y2='1'>\
                 <stop offset='0%' stop-color='{bg}' stop-opacity='0.9'/>\
                 <stop offset='100%' stop-color='#1c1c28' stop-opacity='0.8'/>\
                 </linearGradient></defs>\
                 <rect width='800' height='500' fill='url(#g{variant})'/>\
                 <text x='50%' y='50%' dominant-baseline='middle' text-anchor='middle' \
                 font-family='Arial' font-size='42' fill='white' opacity='0.9'>{safe_title}</text></svg>"
            );
            format!(
                "data:image/svg+xml;utf8,{}",
                utf8_percent_encode(&svg, NON_ALPHANUMERIC)
            )
        })
        .collect()
}

/// How the custom request fared, judged on the final schedule.
fn custom_outcome(schedule: &[ScheduleItem], requested: bool, override_applied: bool) -> CustomOutcome {
    if !requested {
        return CustomOutcome::NotRequested;
    }
    if override_applied {
        return CustomOutcome::Satisfied;
    }

    let custom_items: Vec<&ScheduleItem> = schedule
        .iter()
        .filter(|item| {
            item.is_custom || item.reason_tags.iter().any(|t| t == "リクエスト反映")
        })
        .collect();
    if custom_items.is_empty() {
        return CustomOutcome::OutOfArea;
    }

    let on_time = custom_items.iter().any(|item| match item.preferred_start_minutes {
        Some(preferred) => (minutes_of(item.time) - preferred).abs() <= CUSTOM_TIME_TOLERANCE_MINUTES,
        None => true,
    });
    if on_time {
        CustomOutcome::Satisfied
    } else {
        CustomOutcome::TimeShifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::places_service::testing::FakeProvider;
    use chrono::NaiveTime;

    fn conditions(area: &str) -> Conditions {
        serde_json::from_value(serde_json::json!({
            "area": area,
            "date_phase": "first",
            "date_budget_level": "medium",
            "time_slot": "lunch",
        }))
        .unwrap()
    }

    fn offline_generator() -> PlanGenerator<FakeProvider> {
        PlanGenerator::new(
            Arc::new(SpotStore::from_spots(vec![])),
            Arc::new(FakeProvider::default()),
        )
    }

    #[tokio::test]
    async fn offline_build_still_yields_a_complete_framed_plan() {
        let generator = offline_generator();
        let plan = generator
            .build_plan(&conditions("shibuya"), None, false, None, Instant::now())
            .await;

        let kinds: Vec<ItemKind> = plan.schedule.iter().map(|i| i.kind).collect();
        assert_eq!(kinds.first(), Some(&ItemKind::Meeting));
        assert_eq!(kinds.last(), Some(&ItemKind::Farewell));
        assert!(plan.schedule.iter().filter(|i| i.kind.is_visit()).count() >= 1);
        assert!(plan.schedule.iter().all(|i| i.lat.is_some() && i.lng.is_some()));

        for pair in plan.schedule.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }

    #[tokio::test]
    async fn unknown_area_without_geocoder_falls_back_to_tokyo() {
        let generator = offline_generator();
        let plan = generator
            .build_plan(&conditions("gotanda-west"), None, false, None, Instant::now())
            .await;

        let meeting = &plan.schedule[0];
        assert!((meeting.lat.unwrap() - 35.6812).abs() < 1e-6);
    }

    #[tokio::test]
    async fn no_two_visits_share_a_venue() {
        // The fake returns the same venue for every food query; the dedup
        // pass must keep only the first and placeholder the rest.
        let shared = Venue {
            name: "人気店".to_string(),
            lat: Some(35.66),
            lng: Some(139.70),
            ..Venue::default()
        };
        let places = FakeProvider::default()
            .with_venue("ランチ", shared.clone())
            .with_venue("ディナー", shared.clone())
            .with_venue("カフェ", shared);
        let generator = PlanGenerator::new(
            Arc::new(SpotStore::from_spots(vec![])),
            Arc::new(places),
        );

        let plan = generator
            .build_plan(&conditions("shibuya"), None, true, None, Instant::now())
            .await;

        let mut names: Vec<&str> = plan
            .schedule
            .iter()
            .filter(|i| i.kind.is_visit())
            .map(|i| i.place_name.as_str())
            .collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before, "duplicate venue in schedule");
    }

    #[tokio::test]
    async fn adjustment_lowers_the_working_budget() {
        let generator = offline_generator();
        let plan = generator
            .build_plan(
                &conditions("shibuya"),
                Some("もっと安くしたい"),
                false,
                None,
                Instant::now(),
            )
            .await;
        assert_eq!(plan.total_estimated_cost, "3000-5000");
        assert!(plan.plan_reason.contains("もっと安くしたい"));
    }

    #[tokio::test]
    async fn custom_insertion_lands_in_the_schedule_with_its_time() {
        let places = FakeProvider::default().with_venue(
            "浅草寺",
            Venue {
                name: "浅草寺".to_string(),
                lat: Some(35.7148),
                lng: Some(139.7967),
                ..Venue::default()
            },
        );
        let generator = PlanGenerator::new(
            Arc::new(SpotStore::from_spots(vec![])),
            Arc::new(places),
        );

        let mut cond = conditions("asakusa");
        cond.custom_request = Some("19時に浅草寺に行きたい".to_string());
        let plan = generator
            .build_plan(&cond, None, true, None, Instant::now())
            .await;

        let custom = plan.schedule.iter().find(|i| i.is_custom).unwrap();
        assert_eq!(custom.place_name, "浅草寺");
        assert_eq!(custom.time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        assert!(plan.plan_reason.contains("反映しています"));
    }

    #[tokio::test]
    async fn preconstructed_skeleton_flows_through_assembly() {
        let generator = offline_generator();
        let skeleton = vec![
            ScheduleItem {
                time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                kind: ItemKind::Lunch,
                place_name: "モデル提案の店".to_string(),
                duration_minutes: 60,
                ..ScheduleItem::default()
            },
            ScheduleItem {
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                kind: ItemKind::Activity,
                place_name: "モデル提案の美術館".to_string(),
                duration_minutes: 90,
                ..ScheduleItem::default()
            },
        ];

        let plan = generator
            .build_plan(&conditions("shibuya"), None, false, Some(skeleton), Instant::now())
            .await;

        assert_eq!(plan.schedule.first().unwrap().kind, ItemKind::Meeting);
        assert_eq!(plan.schedule.last().unwrap().kind, ItemKind::Farewell);
        let lunch = plan.schedule.iter().find(|i| i.kind == ItemKind::Lunch).unwrap();
        assert_eq!(lunch.place_name, "モデル提案の店");
        // Defaults were filled in for the model's sparse output.
        assert!(lunch.price_range.is_some());
        assert!(!lunch.reason.is_empty());
    }

    #[test]
    fn placeholder_photos_are_distinct_data_urls() {
        let photos = placeholder_photos("テスト \"スポット\"");
        assert_eq!(photos.len(), 3);
        assert!(photos.iter().all(|p| p.starts_with("data:image/svg+xml")));
        assert_ne!(photos[0], photos[1]);
    }

    #[test]
    fn custom_outcome_tolerates_twenty_minutes() {
        let item = |minutes: i64, preferred: i64| ScheduleItem {
            time: crate::models::plan::time_from_minutes(minutes),
            is_custom: true,
            preferred_start_minutes: Some(preferred),
            ..ScheduleItem::default()
        };

        let schedule = vec![item(19 * 60 + 10, 19 * 60)];
        assert_eq!(custom_outcome(&schedule, true, false), CustomOutcome::Satisfied);

        let schedule = vec![item(20 * 60, 19 * 60)];
        assert_eq!(custom_outcome(&schedule, true, false), CustomOutcome::TimeShifted);

        assert_eq!(custom_outcome(&[], true, false), CustomOutcome::OutOfArea);
        assert_eq!(custom_outcome(&[], false, false), CustomOutcome::NotRequested);
    }
}

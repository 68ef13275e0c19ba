//! Free-text custom request resolution.
//!
//! "19時に浅草寺に行きたい" becomes a classified role (meeting override /
//! farewell override / itinerary insertion), a preferred clock time, a
//! best-guess venue name and resolved coordinates. Resolution never fails:
//! worst case the raw text becomes the display name with a generic search
//! link at the area's reference coordinate.

use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::models::plan::{minutes_of, ScheduleItem};
use crate::models::venue::search_url;
use crate::services::geo::Coordinate;
use crate::services::intent::{
    classify_custom_request, farewell_vocabulary, meeting_vocabulary, CustomRequestKind,
};
use crate::services::places_service::PlacesProvider;
use crate::services::venue_selector::VenueSelector;

/// Slot-table defaults handed in by the assembler so period words resolve to
/// the active time context.
#[derive(Debug, Clone, Copy)]
pub struct TimeDefaults {
    pub contextual: NaiveTime,
    pub lunch: NaiveTime,
    pub dinner: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub kind: CustomRequestKind,
    pub time: NaiveTime,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub map_url: String,
    pub place_id: Option<String>,
}

fn explicit_time() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})[:：](\d{2})").unwrap())
}

fn hour_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})時").unwrap())
}

/// Time extraction priority: explicit HH:MM, then "N時", then coarse period
/// words, then the contextual default.
pub fn parse_preferred_time(text: &str, defaults: TimeDefaults) -> NaiveTime {
    if let Some(caps) = explicit_time().captures(text) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps[2].parse().unwrap_or(0);
        return NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap();
    }

    if let Some(caps) = hour_only().captures(text) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        return NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap();
    }

    static MORNING: OnceLock<Regex> = OnceLock::new();
    static MIDDAY: OnceLock<Regex> = OnceLock::new();
    static EVENING: OnceLock<Regex> = OnceLock::new();
    if MORNING
        .get_or_init(|| Regex::new(r"(?i)朝|午前|morning").unwrap())
        .is_match(text)
    {
        return NaiveTime::from_hms_opt(10, 0, 0).unwrap();
    }
    if MIDDAY
        .get_or_init(|| Regex::new(r"(?i)昼|ランチ|午後|afternoon").unwrap())
        .is_match(text)
    {
        return defaults.lunch;
    }
    if EVENING
        .get_or_init(|| Regex::new(r"(?i)夕方|夜|ディナー|dinner|night").unwrap())
        .is_match(text)
    {
        return defaults.dinner;
    }

    defaults.contextual
}

/// Strip time patterns and role/movement vocabulary; whatever remains is the
/// venue-name guess. An empty remainder falls back to the raw text.
pub fn extract_place_text(text: &str) -> String {
    static MOVEMENT: OnceLock<Regex> = OnceLock::new();
    static DISMISSAL: OnceLock<Regex> = OnceLock::new();

    let stripped = explicit_time().replace_all(text, "");
    let stripped = hour_only().replace_all(&stripped, "");
    let stripped = meeting_vocabulary().replace_all(&stripped, "");
    let stripped = farewell_vocabulary().replace_all(&stripped, "");
    let stripped = MOVEMENT
        .get_or_init(|| Regex::new(r"(?i)に行きたい|へ行きたい|に行く|行きたい|で集合|集合|待ち合わせ|待合せ").unwrap())
        .replace_all(&stripped, "");
    let stripped = DISMISSAL
        .get_or_init(|| Regex::new(r"(?i)で解散|解散|終わり|別れ|帰る|に|で|へ").unwrap())
        .replace_all(&stripped, "");

    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        text.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolve a free-text request against the venue selector. Lookup is
/// area-scoped first, citywide second; both failing keeps the extracted text
/// with fallback coordinates.
pub async fn resolve<P: PlacesProvider>(
    text: &str,
    defaults: TimeDefaults,
    area: &str,
    area_center: Coordinate,
    selector: &VenueSelector<'_, P>,
) -> ResolvedRequest {
    let kind = classify_custom_request(text);
    let time = parse_preferred_time(text, defaults);
    let place_text = extract_place_text(text);

    let mut resolved = ResolvedRequest {
        kind,
        time,
        name: place_text.clone(),
        lat: area_center.lat,
        lng: area_center.lng,
        map_url: search_url(&place_text),
        place_id: None,
    };

    if let Some(venue) = selector.search_named(&place_text, area).await {
        resolved.name = venue.name.clone();
        if let Some((lat, lng)) = venue.coordinates() {
            resolved.lat = lat;
            resolved.lng = lng;
        }
        if let Some(url) = venue.url {
            resolved.map_url = url;
        }
        resolved.place_id = venue.place_id;
    }

    resolved
}

/// Splice an insertion item into the slot sequence at its chronological
/// position; a tie places the new item before the existing one.
pub fn insert_chronologically(schedule: &mut Vec<ScheduleItem>, item: ScheduleItem) {
    let minutes = item.effective_minutes();
    let position = schedule
        .iter()
        .position(|existing| minutes <= minutes_of(existing.time))
        .unwrap_or(schedule.len());
    schedule.insert(position, item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::ItemKind;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn defaults() -> TimeDefaults {
        TimeDefaults {
            contextual: t(14, 0),
            lunch: t(12, 0),
            dinner: t(18, 0),
        }
    }

    #[test]
    fn explicit_time_beats_everything() {
        assert_eq!(parse_preferred_time("18:45に集合", defaults()), t(18, 45));
        assert_eq!(parse_preferred_time("１9時でもいいけど17：30で", defaults()), t(17, 30));
    }

    #[test]
    fn kanji_hour_and_period_words() {
        assert_eq!(parse_preferred_time("19時に浅草寺に行きたい", defaults()), t(19, 0));
        assert_eq!(parse_preferred_time("朝から動きたい", defaults()), t(10, 0));
        assert_eq!(parse_preferred_time("夜は夜景が見たい", defaults()), t(18, 0));
        assert_eq!(parse_preferred_time("浅草寺に行きたい", defaults()), t(14, 0));
    }

    #[test]
    fn place_text_strips_time_and_role_words() {
        assert_eq!(extract_place_text("19時に浅草寺に行きたい"), "浅草寺");
        assert_eq!(extract_place_text("渋谷駅で集合"), "渋谷駅");
        // Nothing left after stripping: raw text survives.
        assert_eq!(extract_place_text("19時に集合"), "19時に集合");
    }

    #[test]
    fn insertion_is_chronological_with_tie_before() {
        let mut schedule = vec![
            ScheduleItem {
                time: t(12, 0),
                kind: ItemKind::Lunch,
                place_name: "ランチ".to_string(),
                ..ScheduleItem::default()
            },
            ScheduleItem {
                time: t(16, 30),
                kind: ItemKind::Cafe,
                place_name: "カフェ".to_string(),
                ..ScheduleItem::default()
            },
        ];

        let custom = ScheduleItem {
            time: t(16, 30),
            kind: ItemKind::Custom,
            place_name: "浅草寺".to_string(),
            preferred_start_minutes: Some(16 * 60 + 30),
            is_custom: true,
            ..ScheduleItem::default()
        };
        insert_chronologically(&mut schedule, custom);

        assert_eq!(schedule[1].place_name, "浅草寺");
        assert_eq!(schedule[2].place_name, "カフェ");
    }

    #[tokio::test]
    async fn round_trip_of_the_sensoji_request() {
        use crate::db::spot_store::SpotStore;
        use crate::models::venue::Venue;
        use crate::services::places_service::testing::FakeProvider;
        use crate::services::venue_selector::VenueSelector;

        let store = SpotStore::from_spots(vec![]);
        let places = FakeProvider::default().with_venue(
            "浅草寺",
            Venue {
                name: "浅草寺".to_string(),
                lat: Some(35.7148),
                lng: Some(139.7967),
                url: Some("https://maps.example/sensoji".to_string()),
                ..Venue::default()
            },
        );
        let selector = VenueSelector::new(&store, &places, true);

        let resolved = resolve(
            "19時に浅草寺に行きたい",
            defaults(),
            "asakusa",
            Coordinate::new(35.7148, 139.7967),
            &selector,
        )
        .await;

        assert_eq!(resolved.kind, CustomRequestKind::Insertion);
        assert_eq!(resolved.time, t(19, 0));
        assert_eq!(resolved.name, "浅草寺");
        assert_eq!(resolved.map_url, "https://maps.example/sensoji");
    }
}

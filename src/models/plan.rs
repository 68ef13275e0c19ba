use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::conditions::TransportMode;
use crate::models::venue::Review;

/// Role of an item in the finished schedule. Serialized as the wire-format
/// `type` tag.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Meeting,
    Travel,
    Lunch,
    #[default]
    Activity,
    Cafe,
    Dinner,
    Walk,
    Shop,
    Custom,
    Farewell,
}

impl ItemKind {
    /// Visits are the items that occupy a venue; meeting/travel/farewell frame
    /// them and never carry venue detail.
    pub fn is_visit(&self) -> bool {
        !matches!(self, ItemKind::Meeting | ItemKind::Travel | ItemKind::Farewell)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransitStep {
    pub mode: String,
    pub line_name: Option<String>,
    pub agency: Option<String>,
    pub headsign: Option<String>,
    pub num_stops: Option<u32>,
    pub departure_stop: Option<String>,
    pub arrival_stop: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransitRoute {
    pub summary: Option<String>,
    pub duration_minutes: Option<i64>,
    pub steps: Vec<TransitStep>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScheduleItem {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub place_name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    pub duration_minutes: i64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opening_hours: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,

    // Travel items only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_mode: Option<TransportMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_route: Option<TransitRoute>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_start_minutes: Option<i64>,
}

impl Default for ScheduleItem {
    fn default() -> Self {
        ScheduleItem {
            time: NaiveTime::MIN,
            end_time: None,
            kind: ItemKind::default(),
            place_name: String::new(),
            lat: None,
            lng: None,
            area: None,
            address: None,
            price_range: None,
            duration_minutes: 0,
            reason: String::new(),
            reason_tags: Vec::new(),
            info_url: None,
            official_url: None,
            rating: None,
            photos: Vec::new(),
            reviews: Vec::new(),
            opening_hours: Vec::new(),
            closure_warning: None,
            place_id: None,
            distance_m: None,
            transport_mode: None,
            transport_label: None,
            travel_minutes: None,
            directions_url: None,
            directions_note: None,
            transit_route: None,
            is_custom: false,
            preferred_start_minutes: None,
        }
    }
}

impl ScheduleItem {
    /// Ordering key: a custom item's explicit preferred minute takes
    /// precedence over its nominal slot time.
    pub fn effective_minutes(&self) -> i64 {
        self.preferred_start_minutes
            .unwrap_or_else(|| minutes_of(self.time))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Plan {
    pub plan_summary: String,
    pub plan_reason: String,
    pub total_estimated_cost: String,
    pub schedule: Vec<ScheduleItem>,
    pub adjustable_points: Vec<String>,
    pub risk_flags: Vec<String>,
    pub conversation_topics: Vec<String>,
    pub next_step_phrase: String,
}

pub fn minutes_of(time: NaiveTime) -> i64 {
    use chrono::Timelike;
    time.hour() as i64 * 60 + time.minute() as i64
}

pub fn time_from_minutes(minutes: i64) -> NaiveTime {
    let clamped = minutes.rem_euclid(24 * 60);
    NaiveTime::from_hms_opt((clamped / 60) as u32, (clamped % 60) as u32, 0).unwrap()
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// "HH:MM" (de)serialization for schedule clock times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_item_times_serialize_as_hhmm() {
        let item = ScheduleItem {
            time: NaiveTime::from_hms_opt(12, 5, 0).unwrap(),
            end_time: Some(NaiveTime::from_hms_opt(13, 0, 0).unwrap()),
            kind: ItemKind::Lunch,
            place_name: "テスト".to_string(),
            ..ScheduleItem::default()
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["time"], "12:05");
        assert_eq!(json["end_time"], "13:00");
        assert_eq!(json["type"], "lunch");
    }

    #[test]
    fn effective_minutes_prefers_the_custom_minute() {
        let mut item = ScheduleItem {
            time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            ..ScheduleItem::default()
        };
        assert_eq!(item.effective_minutes(), 14 * 60);
        item.preferred_start_minutes = Some(19 * 60);
        assert_eq!(item.effective_minutes(), 19 * 60);
    }

    #[test]
    fn minute_conversions_round_trip() {
        assert_eq!(minutes_of(time_from_minutes(19 * 60 + 30)), 19 * 60 + 30);
        // Past-midnight arithmetic wraps into the next day.
        assert_eq!(time_from_minutes(25 * 60), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
    }
}

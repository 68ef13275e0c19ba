use serde::{Deserialize, Serialize};

/// Stage of the relationship the date is planned for. Drives the slot
/// pattern and the tone of venue selection.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatePhase {
    First,
    Second,
    Anniversary,
    #[default]
    #[serde(other)]
    Casual,
}

impl DatePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePhase::First => "first",
            DatePhase::Second => "second",
            DatePhase::Anniversary => "anniversary",
            DatePhase::Casual => "casual",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Low,
    High,
    #[default]
    #[serde(other)]
    Medium,
}

impl BudgetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetLevel::Low => "low",
            BudgetLevel::Medium => "medium",
            BudgetLevel::High => "high",
        }
    }

    pub fn raise(&self) -> BudgetLevel {
        match self {
            BudgetLevel::Low => BudgetLevel::Medium,
            _ => BudgetLevel::High,
        }
    }

    pub fn lower(&self) -> BudgetLevel {
        match self {
            BudgetLevel::High => BudgetLevel::Medium,
            _ => BudgetLevel::Low,
        }
    }
}

/// Named time window for the date. An explicit `start_time` + `duration_minutes`
/// pair on `Conditions` takes precedence over this.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Dinner,
    Halfday,
    Fullday,
    #[default]
    #[serde(other)]
    Lunch,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Relax,
    Active,
    Romantic,
    Casual,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NgCondition {
    Outdoor,
    Indoor,
    Crowd,
    Quiet,
    Walk,
    Rain,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walk,
    Train,
    Car,
    Taxi,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Train => "train",
            TransportMode::Car => "car",
            TransportMode::Taxi => "taxi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransportMode::Walk => "徒歩",
            TransportMode::Train => "電車/地下鉄",
            TransportMode::Car => "車",
            TransportMode::Taxi => "タクシー",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementStyle {
    SingleArea,
    NearbyAreas,
    MultipleAreas,
    DayTrip,
}

/// Movement policy bundle derived from `MovementStyle`: caps one travel leg's
/// duration and bounds how many distinct areas the plan may touch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovementPreferences {
    pub key: String,
    pub label: String,
    pub description: String,
    pub max_leg_minutes: i64,
    pub max_areas: u32,
    pub focus: String,
}

impl MovementPreferences {
    pub fn for_style(style: Option<MovementStyle>) -> Self {
        match style {
            Some(MovementStyle::SingleArea) => MovementPreferences {
                key: "single_area".to_string(),
                label: "ひとつの街でゆっくり".to_string(),
                description: "徒歩中心・同一エリア内で移動少なめ".to_string(),
                max_leg_minutes: 15,
                max_areas: 1,
                focus: "半径1km/徒歩10〜15分以内を目安に、滞在時間を長めに確保".to_string(),
            },
            Some(MovementStyle::NearbyAreas) => MovementPreferences {
                key: "nearby_areas".to_string(),
                label: "近くのエリアを少し回る".to_string(),
                description: "徒歩＋短距離移動で2エリア程度".to_string(),
                max_leg_minutes: 30,
                max_areas: 2,
                focus: "隣接エリアまで、移動20〜30分以内を優先".to_string(),
            },
            Some(MovementStyle::MultipleAreas) => MovementPreferences {
                key: "multiple_areas".to_string(),
                label: "いくつかの街を巡りたい".to_string(),
                description: "電車移動を含めて複数エリアを巡る".to_string(),
                max_leg_minutes: 45,
                max_areas: 3,
                focus: "最大3エリア・1区間30〜45分を上限にルートを最適化".to_string(),
            },
            Some(MovementStyle::DayTrip) => MovementPreferences {
                key: "day_trip".to_string(),
                label: "遠出したい（日帰り）".to_string(),
                description: "片道1〜1.5時間の遠出も許容し、現地滞在を重視".to_string(),
                max_leg_minutes: 90,
                max_areas: 3,
                focus: "長距離移動を含めるが、現地では移動30分以内で目玉スポットを優先".to_string(),
            },
            None => MovementPreferences {
                key: "balanced".to_string(),
                label: "バランス".to_string(),
                description: "移動と滞在のバランスを取る標準プラン".to_string(),
                max_leg_minutes: 25,
                max_areas: 2,
                focus: "移動時間は25分程度まで、主要エリア2つ以内で構成".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conditions {
    #[serde(default = "default_area")]
    pub area: String,
    #[serde(default)]
    pub date_phase: DatePhase,
    #[serde(default)]
    pub date_budget_level: BudgetLevel,
    #[serde(default)]
    pub time_slot: TimeSlot,
    /// Explicit window start ("HH:MM"); overrides `time_slot` when present.
    #[serde(default, with = "crate::models::plan::hhmm_opt")]
    pub start_time: Option<chrono::NaiveTime>,
    pub duration_minutes: Option<i64>,
    pub mood: Option<Mood>,
    #[serde(default)]
    pub ng_conditions: Vec<NgCondition>,
    pub custom_request: Option<String>,
    pub movement_style: Option<MovementStyle>,
    pub movement_preferences: Option<MovementPreferences>,
    #[serde(default)]
    pub preferred_areas: Vec<String>,
    pub transport_modes: Option<Vec<TransportMode>>,
}

impl Conditions {
    /// Movement policy, filled from `movement_style` when the request did not
    /// carry a resolved bundle.
    pub fn movement(&self) -> MovementPreferences {
        self.movement_preferences
            .clone()
            .unwrap_or_else(|| MovementPreferences::for_style(self.movement_style))
    }

    /// A restriction applies only when the caller narrowed transport down to
    /// car/taxi/walk; an empty or train-containing list keeps the default bands.
    pub fn restricted_mode(&self) -> Option<TransportMode> {
        let modes = self.transport_modes.as_ref()?;
        if modes.is_empty() || modes.contains(&TransportMode::Train) {
            return None;
        }
        modes.first().copied()
    }
}

fn default_area() -> String {
    "shibuya".to_string()
}

/// Payload sent by the step-by-step wizard UI.
#[derive(Debug, Deserialize, Clone)]
pub struct WizardData {
    pub start_location: Option<String>,
    #[serde(default)]
    pub date_phase: DatePhase,
    pub time_slot: Option<String>,
    pub budget_level: Option<String>,
    pub movement_style: Option<MovementStyle>,
    #[serde(default)]
    pub preferred_areas: Vec<String>,
}

impl WizardData {
    pub fn into_conditions(self) -> Conditions {
        let area = self
            .start_location
            .as_deref()
            .map(|loc| area_slug(loc).map(str::to_string).unwrap_or_else(|| loc.to_lowercase()))
            .unwrap_or_else(default_area);

        let time_slot = match self.time_slot.as_deref() {
            Some("evening") => TimeSlot::Dinner,
            Some("half_day") => TimeSlot::Halfday,
            _ => TimeSlot::Lunch,
        };

        let budget = match self.budget_level.as_deref() {
            Some("low") => BudgetLevel::Low,
            Some("high") | Some("no_limit") => BudgetLevel::High,
            _ => BudgetLevel::Medium,
        };

        let movement_preferences = Some(MovementPreferences::for_style(self.movement_style));
        let preferred_areas = self
            .preferred_areas
            .iter()
            .map(|a| area_slug(a).map(str::to_string).unwrap_or_else(|| a.to_lowercase()))
            .collect();

        Conditions {
            area,
            date_phase: self.date_phase,
            date_budget_level: budget,
            time_slot,
            start_time: None,
            duration_minutes: None,
            mood: None,
            ng_conditions: Vec::new(),
            custom_request: None,
            movement_style: self.movement_style,
            movement_preferences,
            preferred_areas,
            transport_modes: None,
        }
    }
}

/// Japanese area name → area slug used by the store and the geo tables.
fn area_slug(name: &str) -> Option<&'static str> {
    match name {
        "渋谷" => Some("shibuya"),
        "新宿" => Some("shinjuku"),
        "表参道" => Some("omotesando"),
        "原宿" => Some("harajuku"),
        "恵比寿" => Some("ebisu"),
        "代官山" => Some("daikanyama"),
        "中目黒" => Some("nakameguro"),
        "六本木" => Some("roppongi"),
        "銀座" => Some("ginza"),
        "丸の内" => Some("marunouchi"),
        "東京" => Some("tokyo"),
        "品川" => Some("shinagawa"),
        "池袋" => Some("ikebukuro"),
        "上野" => Some("ueno"),
        "浅草" => Some("asakusa"),
        "秋葉原" => Some("akihabara"),
        "お台場" => Some("odaiba"),
        "吉祥寺" => Some("kichijoji"),
        "下北沢" => Some("shimokitazawa"),
        "自由が丘" => Some("jiyugaoka"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_phase_and_budget_fall_back_to_defaults() {
        let conditions: Conditions = serde_json::from_str(
            r#"{"area":"ueno","date_phase":"whatever","date_budget_level":"???"}"#,
        )
        .unwrap();
        assert_eq!(conditions.date_phase, DatePhase::Casual);
        assert_eq!(conditions.date_budget_level, BudgetLevel::Medium);
    }

    #[test]
    fn wizard_data_maps_japanese_area_and_budget() {
        let wizard = WizardData {
            start_location: Some("浅草".to_string()),
            date_phase: DatePhase::First,
            time_slot: Some("evening".to_string()),
            budget_level: Some("no_limit".to_string()),
            movement_style: Some(MovementStyle::SingleArea),
            preferred_areas: vec!["上野".to_string()],
        };
        let conditions = wizard.into_conditions();
        assert_eq!(conditions.area, "asakusa");
        assert_eq!(conditions.time_slot, TimeSlot::Dinner);
        assert_eq!(conditions.date_budget_level, BudgetLevel::High);
        assert_eq!(conditions.preferred_areas, vec!["ueno".to_string()]);
        assert_eq!(conditions.movement().max_leg_minutes, 15);
    }

    #[test]
    fn restricted_mode_ignores_lists_containing_train() {
        let mut conditions: Conditions = serde_json::from_str(r#"{"area":"ginza"}"#).unwrap();
        assert!(conditions.restricted_mode().is_none());

        conditions.transport_modes = Some(vec![TransportMode::Car]);
        assert_eq!(conditions.restricted_mode(), Some(TransportMode::Car));

        conditions.transport_modes = Some(vec![TransportMode::Train, TransportMode::Car]);
        assert!(conditions.restricted_mode().is_none());
    }
}

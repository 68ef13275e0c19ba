//! Optional LLM-backed itinerary skeleton generation (OpenAI-compatible chat
//! API, JSON response mode).
//!
//! The model's output is never returned as-is: it is parsed into slot items
//! and handed to the plan generator as a preconstructed skeleton, so travel
//! legs, bookends and opening-hours validation stay consistent regardless of
//! the itinerary source. Unlike the other collaborators this one is allowed
//! to fail — the caller falls back to rule-based slot filling.

use std::{env, time::Duration};

use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::json;

use crate::models::conditions::Conditions;
use crate::models::plan::{ItemKind, ScheduleItem};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const PLACEHOLDER_KEY: &str = "sk-your-api-key-here";

pub struct LlmService {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl LlmService {
    /// `None` when no usable API key is configured; the service is simply
    /// absent then.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok()?;
        if api_key.is_empty() || api_key == PLACEHOLDER_KEY {
            return None;
        }
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(8))
            .build()
            .ok()?;
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(LlmService {
            http_client,
            api_key,
            model,
        })
    }

    /// Ask the model for a whole-day schedule and parse it into slot items.
    pub async fn generate_skeleton(
        &self,
        conditions: &Conditions,
        adjustment: Option<&str>,
    ) -> Result<Vec<ScheduleItem>, Box<dyn std::error::Error>> {
        let prompt = build_prompt(conditions, adjustment);

        let response = self
            .http_client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "response_format": { "type": "json_object" },
            }))
            .send()
            .await?;

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or("empty model response")?;

        parse_schedule(&content)
    }
}

fn build_prompt(conditions: &Conditions, adjustment: Option<&str>) -> String {
    let mut prompt = format!(
        "あなたはデートプラン生成の専門家です。以下の条件に基づいて、完璧なデートプランをJSON形式で生成してください。\n\n\
         【ユーザーの条件】\n\
         - エリア: {}\n\
         - デートの段階: {}\n\
         - 予算レベル: {}\n",
        conditions.area,
        conditions.date_phase.as_str(),
        conditions.date_budget_level.as_str(),
    );
    if let Some(mood) = conditions.mood {
        prompt.push_str(&format!("- 今日の気分: {:?}\n", mood));
    }
    if !conditions.ng_conditions.is_empty() {
        prompt.push_str(&format!("- NG条件: {:?}\n", conditions.ng_conditions));
    }
    if let Some(request) = &conditions.custom_request {
        prompt.push_str(&format!("- ユーザーの自由入力リクエスト: {}\n", request));
    }
    if !conditions.preferred_areas.is_empty() {
        prompt.push_str(&format!(
            "- 途中で立ち寄りたいエリア: {}（可能な範囲で経路に組み込む）\n",
            conditions.preferred_areas.join(", ")
        ));
    }
    let movement = conditions.movement();
    prompt.push_str(&format!(
        "- 移動方針: {}（{}）。{}\n",
        movement.label, movement.description, movement.focus
    ));
    if let Some(adjustment) = adjustment {
        prompt.push_str(&format!(
            "\n【ユーザーからの調整リクエスト】\n{}\n前回のプランを基に、このリクエストを反映して修正したプランを生成してください。\n",
            adjustment
        ));
    }
    prompt.push_str(
        "\n【出力形式】\n\
         {\"schedule\": [{\"time\": \"HH:MM\", \"type\": \"lunch|dinner|activity|walk|shop|cafe\", \
         \"place_name\": \"場所の名前\", \"area\": \"エリア\", \"price_range\": \"1500-2000\", \
         \"duration\": \"60min\", \"reason\": \"このスポットを選んだ理由\", \"reason_tags\": [\"タグ\"]}]}\n\n\
         【ルール】\n\
         1. 初デートの場合は、密室や長時間拘束を避けてください\n\
         2. 予算レベルを超えないようにしてください\n\
         3. 指定されたエリア周辺で現実的な移動範囲内にしてください\n\
         4. NG条件を避けたスポットを選んでください\n\
         5. ユーザーの自由入力があれば、必ずスケジュールに組み込んでください",
    );
    prompt
}

/// Parse the model's JSON into slot items, tolerating missing fields.
fn parse_schedule(content: &str) -> Result<Vec<ScheduleItem>, Box<dyn std::error::Error>> {
    let plan: LlmPlan = serde_json::from_str(content)?;
    let items = plan
        .schedule
        .into_iter()
        .filter_map(|raw| {
            let time = NaiveTime::parse_from_str(raw.time.as_deref()?, "%H:%M").ok()?;
            Some(ScheduleItem {
                time,
                kind: parse_kind(raw.kind.as_deref().unwrap_or("activity")),
                place_name: raw.place_name?,
                area: raw.area,
                price_range: raw.price_range,
                duration_minutes: parse_duration_minutes(raw.duration.as_deref()),
                reason: raw.reason.unwrap_or_default(),
                reason_tags: raw.reason_tags,
                ..ScheduleItem::default()
            })
        })
        .collect::<Vec<_>>();

    if items.is_empty() {
        return Err("model returned no usable schedule items".into());
    }
    Ok(items)
}

fn parse_kind(raw: &str) -> ItemKind {
    match raw {
        "lunch" => ItemKind::Lunch,
        "dinner" => ItemKind::Dinner,
        "cafe" => ItemKind::Cafe,
        "walk" => ItemKind::Walk,
        "shop" => ItemKind::Shop,
        _ => ItemKind::Activity,
    }
}

/// "90min" / "90" → 90; anything unparsable defaults to 60.
fn parse_duration_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|s| {
        let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
    .unwrap_or(60)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmPlan {
    #[serde(default)]
    schedule: Vec<LlmScheduleItem>,
}

#[derive(Debug, Deserialize)]
struct LlmScheduleItem {
    time: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    place_name: Option<String>,
    area: Option<String>,
    price_range: Option<String>,
    duration: Option<String>,
    reason: Option<String>,
    #[serde(default)]
    reason_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_output_parses_into_slot_items() {
        let content = r#"{
            "schedule": [
                {"time": "12:00", "type": "lunch", "place_name": "ビストロ", "duration": "60min", "reason": "落ち着いた店"},
                {"time": "14:00", "type": "activity", "place_name": "美術館", "duration": "90min"},
                {"time": "xx", "type": "cafe", "place_name": "壊れた行"}
            ]
        }"#;
        let items = parse_schedule(content).unwrap();
        // The malformed row is dropped, not fatal.
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ItemKind::Lunch);
        assert_eq!(items[0].duration_minutes, 60);
        assert_eq!(items[1].duration_minutes, 90);
    }

    #[test]
    fn unusable_payload_is_an_error() {
        assert!(parse_schedule(r#"{"schedule": []}"#).is_err());
        assert!(parse_schedule("not json").is_err());
    }

    #[test]
    fn duration_parsing_tolerates_units_and_garbage() {
        assert_eq!(parse_duration_minutes(Some("45min")), 45);
        assert_eq!(parse_duration_minutes(Some("120")), 120);
        assert_eq!(parse_duration_minutes(Some("min")), 60);
        assert_eq!(parse_duration_minutes(None), 60);
    }
}

//! Plan narration: the human-readable justification assembled from the same
//! facts the assembler used. Pure formatting, no side effects; missing fields
//! are simply omitted.

use crate::models::conditions::{
    BudgetLevel, DatePhase, Mood, MovementPreferences, NgCondition, TimeSlot,
};
use crate::models::plan::ItemKind;

/// How the free-text request ended up in the final schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomOutcome {
    NotRequested,
    /// Landed within ±20 minutes of the requested time.
    Satisfied,
    /// In the plan, but shifted away from the requested time.
    TimeShifted,
    /// Judged out-of-area and left out.
    OutOfArea,
}

pub struct NarratorFacts<'a> {
    pub phase: DatePhase,
    pub budget: BudgetLevel,
    pub time_slot: TimeSlot,
    pub mood: Option<Mood>,
    pub ng_conditions: &'a [NgCondition],
    pub movement: &'a MovementPreferences,
    pub custom_request: Option<&'a str>,
    pub custom_outcome: CustomOutcome,
    pub adjustment: Option<&'a str>,
}

/// Whole-day estimated cost range per budget level (yen).
pub fn cost_range(budget: BudgetLevel) -> &'static str {
    match budget {
        BudgetLevel::Low => "3000-5000",
        BudgetLevel::Medium => "7000-10000",
        BudgetLevel::High => "15000-25000",
    }
}

/// Per-slot price range (yen) by budget level.
pub fn price_range(budget: BudgetLevel, kind: ItemKind) -> &'static str {
    match (budget, kind) {
        (BudgetLevel::Low, ItemKind::Lunch) => "1000-1500",
        (BudgetLevel::Low, ItemKind::Dinner) => "1500-2000",
        (BudgetLevel::Low, ItemKind::Cafe) => "600-1000",
        (BudgetLevel::Low, _) => "1000-1500",
        (BudgetLevel::Medium, ItemKind::Lunch) => "1500-2500",
        (BudgetLevel::Medium, ItemKind::Dinner) => "3000-5000",
        (BudgetLevel::Medium, ItemKind::Cafe) => "1000-1500",
        (BudgetLevel::Medium, _) => "2000-3000",
        (BudgetLevel::High, ItemKind::Lunch) => "2500-4000",
        (BudgetLevel::High, ItemKind::Dinner) => "5000-10000",
        (BudgetLevel::High, ItemKind::Cafe) => "1500-2500",
        (BudgetLevel::High, _) => "3000-5000",
    }
}

/// Reason and tags for one slot, keyed by phase/mood/budget the same way the
/// selection leaned.
pub fn slot_reason(
    kind: ItemKind,
    phase: DatePhase,
    mood: Option<Mood>,
    budget: BudgetLevel,
) -> (String, Vec<String>) {
    let (reason, tags): (&str, &[&str]) = match kind {
        ItemKind::Lunch => match phase {
            DatePhase::First => (
                "初対面でも会話しやすい落ち着いた環境を選びました",
                &["初デート向け", "会話しやすい"],
            ),
            DatePhase::Anniversary => (
                "記念日にふさわしい特別な雰囲気のお店を選びました",
                &["記念日", "特別感"],
            ),
            DatePhase::Casual => (
                "カジュアルに楽しめる雰囲気のお店を選びました",
                &["カジュアル", "気軽"],
            ),
            DatePhase::Second => (
                "リラックスして会話を楽しめる場所を選びました",
                &["リラックス", "会話向き"],
            ),
        },
        ItemKind::Activity | ItemKind::Walk => match mood {
            Some(Mood::Active) => ("アクティブに楽しめる体験を重視しました", &["アクティブ", "体験重視"]),
            Some(Mood::Romantic) => (
                "ロマンチックな雰囲気を楽しめる場所を選びました",
                &["ロマンチック", "雰囲気◎"],
            ),
            Some(Mood::Relax) => (
                "ゆったりと落ち着いて楽しめる場所を選びました",
                &["リラックス", "落ち着き"],
            ),
            _ => ("一緒に楽しめる体験を重視しました", &["楽しめる", "体験"]),
        },
        ItemKind::Cafe => {
            if phase == DatePhase::Anniversary {
                ("記念日らしい上質な空間で特別な時間を", &["記念日", "上質"])
            } else if mood == Some(Mood::Romantic) {
                ("雰囲気のある空間でゆっくり過ごせます", &["雰囲気◎", "ゆったり"])
            } else {
                (
                    "おしゃれな空間でリフレッシュできる場所を選びました",
                    &["おしゃれ", "リフレッシュ"],
                )
            }
        }
        ItemKind::Dinner => {
            if budget == BudgetLevel::High {
                (
                    "特別な時間を過ごせる高級感のある場所を選びました",
                    &["高級感", "特別"],
                )
            } else if phase == DatePhase::Anniversary {
                ("記念日を彩る素敵なディナーを楽しめます", &["記念日", "ディナー"])
            } else if mood == Some(Mood::Romantic) {
                (
                    "ロマンチックな雰囲気でゆっくり関係を深められます",
                    &["ロマンチック", "落ち着き"],
                )
            } else {
                (
                    "ゆったりとした時間で会話を楽しめる場所を選びました",
                    &["ゆったり", "会話向き"],
                )
            }
        }
        _ => ("楽しい時間を過ごせる場所を選びました", &[]),
    };

    (reason.to_string(), tags.iter().map(|t| t.to_string()).collect())
}

pub fn plan_summary(phase: DatePhase) -> String {
    match phase {
        DatePhase::First => "落ち着いて会話しやすい初デート向けプラン",
        DatePhase::Second => "より親密になる2〜3回目デート向けプラン",
        DatePhase::Anniversary => "記念日を彩る特別なデートプラン",
        DatePhase::Casual => "カジュアルに楽しむデートプラン",
    }
    .to_string()
}

pub fn next_step_phrase(phase: DatePhase) -> String {
    match phase {
        DatePhase::First => "今日は本当に楽しかった。また会いたい。",
        DatePhase::Second => "この前よりも君のこともっと知りたいな。",
        DatePhase::Anniversary => "これからもずっと一緒にいたいね。",
        DatePhase::Casual => "また気軽に会おうね。",
    }
    .to_string()
}

pub fn adjustable_points() -> Vec<String> {
    ["予算", "所要時間", "屋内/屋外", "グルメのジャンル"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn conversation_topics() -> Vec<String> {
    ["最近やってみたいこと", "子どもの頃の思い出", "お互いの家族について"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Compose the plan-wide reason text from the resolved facts.
pub fn narrate(facts: &NarratorFacts) -> String {
    let phase_name = match facts.phase {
        DatePhase::First => "初めてのデート",
        DatePhase::Second => "2〜3回目のデート",
        DatePhase::Anniversary => "記念日のデート",
        DatePhase::Casual => "カジュアルなデート",
    };
    let phase_description = match facts.phase {
        DatePhase::First => "落ち着いて会話できる場所を中心に",
        DatePhase::Second => "一緒に楽しめるアクティビティを多めに",
        DatePhase::Anniversary => "特別な時間を過ごせる場所を",
        DatePhase::Casual => "気軽に楽しめる場所を",
    };
    let time_slot_name = match facts.time_slot {
        TimeSlot::Lunch => "ランチタイム",
        TimeSlot::Dinner => "ディナータイム",
        TimeSlot::Halfday => "半日",
        TimeSlot::Fullday => "1日",
    };
    let budget_name = match facts.budget {
        BudgetLevel::Low => "カジュアル",
        BudgetLevel::Medium => "程よい",
        BudgetLevel::High => "特別な",
    };

    let mut reasons = vec![
        format!("{}ということで、{}選びました", phase_name, phase_description),
        format!("{}を中心としたプランです", time_slot_name),
    ];

    if let Some(mood) = facts.mood {
        let mood_name = match mood {
            Mood::Relax => "リラックスした雰囲気",
            Mood::Active => "アクティブな体験",
            Mood::Romantic => "ロマンチックな雰囲気",
            Mood::Casual => "気軽な雰囲気",
        };
        reasons.push(format!(
            "今日の気分は{}とのことで、それに合わせたスポットを選びました",
            mood_name
        ));
    }

    reasons.push(format!(
        "移動方針は「{}」。{}",
        facts.movement.label, facts.movement.focus
    ));
    reasons.push(format!(
        "予算は{}な{}円程度で設定しています",
        budget_name,
        cost_range(facts.budget)
    ));

    if !facts.ng_conditions.is_empty() {
        let names: Vec<&str> = facts
            .ng_conditions
            .iter()
            .map(|ng| match ng {
                NgCondition::Outdoor => "屋外",
                NgCondition::Indoor => "屋内のみ",
                NgCondition::Crowd => "混雑",
                NgCondition::Quiet => "静かすぎる場所",
                NgCondition::Walk => "長時間歩く",
                NgCondition::Rain => "雨天不可",
            })
            .collect();
        reasons.push(format!("{}は避けるよう配慮しています", names.join("、")));
    }

    if let Some(request) = facts.custom_request {
        match facts.custom_outcome {
            CustomOutcome::Satisfied => reasons.push(format!(
                "自由入力のリクエスト「{}」をスケジュール内に反映しています",
                request
            )),
            CustomOutcome::TimeShifted => reasons.push(format!(
                "自由入力のリクエスト「{}」は希望時刻ちょうどには難しいため、近い時間帯で提案しています",
                request
            )),
            CustomOutcome::OutOfArea => reasons.push(format!(
                "自由入力のリクエスト「{}」はデートエリアと離れているため、今回はプランに含められませんでした",
                request
            )),
            CustomOutcome::NotRequested => {}
        }
    }

    let mut text = reasons.join("。") + "。";
    if let Some(adjustment) = facts.adjustment {
        text.push_str(&format!("\n\n✨ 調整内容「{}」を反映しました！", adjustment));
    }
    text
}

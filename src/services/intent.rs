//! Free-text intent classification. The matching mechanism (regex rules) is
//! deliberately confined to this module: everything downstream depends only
//! on the closed enums, so the matcher could be swapped for a model without
//! touching the assembler.

use std::sync::OnceLock;

use regex::Regex;

/// Intents recognized in an adjustment request ("もっと安く", "記念日っぽく").
/// Several may apply to one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentIntent {
    BudgetUp,
    BudgetDown,
    PhaseFirst,
    PhaseAnniversary,
    PhaseCasual,
}

pub fn classify_adjustment(text: &str) -> Vec<AdjustmentIntent> {
    static BUDGET_DOWN: OnceLock<Regex> = OnceLock::new();
    static BUDGET_UP: OnceLock<Regex> = OnceLock::new();
    static PHASE_FIRST: OnceLock<Regex> = OnceLock::new();
    static PHASE_ANNIVERSARY: OnceLock<Regex> = OnceLock::new();
    static PHASE_CASUAL: OnceLock<Regex> = OnceLock::new();

    let mut intents = Vec::new();
    if BUDGET_DOWN
        .get_or_init(|| Regex::new(r"安く|安い|節約|リーズナブル|お金|予算").unwrap())
        .is_match(text)
    {
        intents.push(AdjustmentIntent::BudgetDown);
    }
    if BUDGET_UP
        .get_or_init(|| Regex::new(r"高級|贅沢|豪華|特別|リッチ").unwrap())
        .is_match(text)
    {
        intents.push(AdjustmentIntent::BudgetUp);
    }
    if PHASE_FIRST
        .get_or_init(|| Regex::new(r"初|初めて|初デート|1回目").unwrap())
        .is_match(text)
    {
        intents.push(AdjustmentIntent::PhaseFirst);
    }
    if PHASE_ANNIVERSARY
        .get_or_init(|| Regex::new(r"記念日|特別|アニバーサリー").unwrap())
        .is_match(text)
    {
        intents.push(AdjustmentIntent::PhaseAnniversary);
    }
    if PHASE_CASUAL
        .get_or_init(|| Regex::new(r"カジュアル|気軽").unwrap())
        .is_match(text)
    {
        intents.push(AdjustmentIntent::PhaseCasual);
    }
    intents
}

/// Role a custom request plays in the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomRequestKind {
    MeetingOverride,
    FarewellOverride,
    Insertion,
}

pub fn meeting_vocabulary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)集合|待ち合わせ|待合せ|meet").unwrap())
}

pub fn farewell_vocabulary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)解散|終わり|別れ|バイバイ|帰る|farewell|goodbye").unwrap())
}

/// Meeting vocabulary wins over farewell vocabulary; anything else becomes an
/// itinerary insertion.
pub fn classify_custom_request(text: &str) -> CustomRequestKind {
    if meeting_vocabulary().is_match(text) {
        CustomRequestKind::MeetingOverride
    } else if farewell_vocabulary().is_match(text) {
        CustomRequestKind::FarewellOverride
    } else {
        CustomRequestKind::Insertion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_and_phase_intents_can_stack() {
        let intents = classify_adjustment("もっと安くてカジュアルな感じにして");
        assert!(intents.contains(&AdjustmentIntent::BudgetDown));
        assert!(intents.contains(&AdjustmentIntent::PhaseCasual));
        assert!(!intents.contains(&AdjustmentIntent::BudgetUp));
    }

    #[test]
    fn anniversary_wording_also_raises_budget() {
        // 特別 appears in both vocabularies; both intents apply.
        let intents = classify_adjustment("特別な記念日にしたい");
        assert!(intents.contains(&AdjustmentIntent::BudgetUp));
        assert!(intents.contains(&AdjustmentIntent::PhaseAnniversary));
    }

    #[test]
    fn meeting_wins_over_farewell() {
        assert_eq!(
            classify_custom_request("渋谷駅で集合して最後は解散したい"),
            CustomRequestKind::MeetingOverride
        );
        assert_eq!(
            classify_custom_request("20時に新宿で解散したい"),
            CustomRequestKind::FarewellOverride
        );
        assert_eq!(
            classify_custom_request("19時に浅草寺に行きたい"),
            CustomRequestKind::Insertion
        );
    }
}

//! Opening-hours evaluation over the textual weekly descriptions returned by
//! the places provider (e.g. "月曜日: 11:00～23:00", "水曜日: 定休日").
//!
//! Absence of data never blocks a plan: an empty list, a missing weekday
//! entry, or an unparsable span all lean toward "open".

use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveTime, Weekday};
use regex::Regex;

use crate::models::plan::minutes_of;

/// Is the venue open at `time` on today's weekday?
pub fn is_open_at(hours: &[String], time: NaiveTime) -> bool {
    is_open_on(hours, Local::now().weekday(), time)
}

/// Weekday-explicit variant, used directly by tests and the re-validation
/// pass.
pub fn is_open_on(hours: &[String], weekday: Weekday, time: NaiveTime) -> bool {
    if hours.is_empty() {
        return true;
    }

    let Some(entry) = entry_for_weekday(hours, weekday) else {
        return true;
    };

    let body = entry_body(entry);
    if closed_marker().is_match(body) {
        return false;
    }
    if open_all_day_marker().is_match(body) {
        return true;
    }

    let minutes = minutes_of(time);
    for span in body.split(['、', ',']) {
        if let Some((open, close)) = parse_span(span) {
            if span_contains(open, close, minutes) {
                return true;
            }
        }
    }
    false
}

fn entry_for_weekday(hours: &[String], weekday: Weekday) -> Option<&String> {
    let (kanji, english) = match weekday {
        Weekday::Mon => ("月曜", "Monday"),
        Weekday::Tue => ("火曜", "Tuesday"),
        Weekday::Wed => ("水曜", "Wednesday"),
        Weekday::Thu => ("木曜", "Thursday"),
        Weekday::Fri => ("金曜", "Friday"),
        Weekday::Sat => ("土曜", "Saturday"),
        Weekday::Sun => ("日曜", "Sunday"),
    };
    hours
        .iter()
        .find(|entry| entry.trim_start().starts_with(kanji) || entry.trim_start().starts_with(english))
}

/// Text after the weekday label, or the whole entry when no label colon is
/// present.
fn entry_body(entry: &str) -> &str {
    entry
        .split_once([':', '：'])
        .map(|(_, rest)| rest)
        .unwrap_or(entry)
        .trim()
}

fn closed_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"定休日|休業|休み|Closed").unwrap())
}

fn open_all_day_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"24\s*時間|Open 24 hours").unwrap())
}

fn time_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "11:00", "１1時", "23時30分" — colon and kanji-hour notations.
    RE.get_or_init(|| Regex::new(r"(\d{1,2})(?::(\d{2})|時(?:(\d{1,2})分)?)").unwrap())
}

/// Parse one "open–close" span into minutes-of-day. Returns `None` for spans
/// that do not contain two time tokens.
fn parse_span(span: &str) -> Option<(i64, i64)> {
    let mut tokens = time_token().captures_iter(span);
    let open = token_minutes(&tokens.next()?)?;
    let close = token_minutes(&tokens.next()?)?;
    Some((open, close))
}

fn token_minutes(caps: &regex::Captures) -> Option<i64> {
    let hour: i64 = caps.get(1)?.as_str().parse().ok()?;
    let minute: i64 = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().parse().ok())
        .unwrap_or(Some(0))?;
    if hour > 29 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

/// A span whose close precedes its open crosses midnight: open if the queried
/// time is at/after open or at/before close.
fn span_contains(open: i64, close: i64, minutes: i64) -> bool {
    let close = if close > 24 * 60 { close - 24 * 60 } else { close };
    if close < open {
        minutes >= open || minutes <= close
    } else {
        (open..=close).contains(&minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn hours(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_data_assumes_open() {
        assert!(is_open_on(&[], Weekday::Mon, t(12, 0)));
        // No entry for the queried weekday.
        let h = hours(&["火曜日: 11:00～20:00"]);
        assert!(is_open_on(&h, Weekday::Mon, t(12, 0)));
    }

    #[test]
    fn closed_day_and_round_the_clock_markers() {
        let h = hours(&["月曜日: 定休日", "火曜日: 24 時間営業"]);
        assert!(!is_open_on(&h, Weekday::Mon, t(12, 0)));
        assert!(is_open_on(&h, Weekday::Tue, t(3, 0)));
    }

    #[test]
    fn colon_notation_spans() {
        let h = hours(&["金曜日: 11:30～14:30、17:00～22:00"]);
        assert!(is_open_on(&h, Weekday::Fri, t(12, 0)));
        assert!(!is_open_on(&h, Weekday::Fri, t(15, 0)));
        assert!(is_open_on(&h, Weekday::Fri, t(21, 30)));
    }

    #[test]
    fn kanji_notation_spans() {
        let h = hours(&["土曜日: 11時30分～23時"]);
        assert!(is_open_on(&h, Weekday::Sat, t(12, 0)));
        assert!(!is_open_on(&h, Weekday::Sat, t(23, 30)));
    }

    #[test]
    fn overnight_span_crosses_midnight() {
        let h = hours(&["金曜日: 18:00～2:00"]);
        assert!(is_open_on(&h, Weekday::Fri, t(23, 0)));
        assert!(is_open_on(&h, Weekday::Fri, t(1, 30)));
        assert!(!is_open_on(&h, Weekday::Fri, t(12, 0)));
    }

    #[test]
    fn unparsable_spans_are_skipped() {
        let h = hours(&["水曜日: ランチのみ"]);
        // Entry exists but no parsable span matches.
        assert!(!is_open_on(&h, Weekday::Wed, t(12, 0)));

        let h = hours(&["水曜日: ランチのみ、17:00～21:00"]);
        assert!(is_open_on(&h, Weekday::Wed, t(18, 0)));
    }
}

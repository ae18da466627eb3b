//! Mined publication dates, certain and otherwise.

use chrono::{DateTime, Utc};

/// How an ambiguous date string was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateInterpretation {
    DayFirstYearFirst,
    DayFirstYearSecond,
    DaySecondYearFirst,
    DaySecondYearSecond,
}

impl DateInterpretation {
    pub fn from_flags(day_first: bool, year_first: bool) -> Self {
        match (day_first, year_first) {
            (true, true) => Self::DayFirstYearFirst,
            (true, false) => Self::DayFirstYearSecond,
            (false, true) => Self::DaySecondYearFirst,
            (false, false) => Self::DaySecondYearSecond,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DayFirstYearFirst => "DayFirstYearFirst",
            Self::DayFirstYearSecond => "DayFirstYearSecond",
            Self::DaySecondYearFirst => "DaySecondYearFirst",
            Self::DaySecondYearSecond => "DaySecondYearSecond",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DayFirstYearFirst" => Some(Self::DayFirstYearFirst),
            "DayFirstYearSecond" => Some(Self::DayFirstYearSecond),
            "DaySecondYearFirst" => Some(Self::DaySecondYearFirst),
            "DaySecondYearSecond" => Some(Self::DaySecondYearSecond),
            _ => None,
        }
    }
}

/// A date with exactly one parse.
#[derive(Debug, Clone)]
pub struct CertainDate {
    pub id: i64,
    pub doc_id: i64,
    pub date: DateTime<Utc>,
    pub position: i64,
}

/// One interpretation of a date string with several plausible parses.
/// A single context yields one row per interpretation, sharing
/// (document, matched_text, position).
#[derive(Debug, Clone)]
pub struct AmbiguousDate {
    pub id: i64,
    pub doc_id: i64,
    pub date: DateTime<Utc>,
    pub interpreted_with: DateInterpretation,
    pub matched_text: String,
    pub position: i64,
}

/// Maximum stored matched-text fragment length.
pub const MAX_FRAG_LEN: usize = 32;

/// Validate an ambiguous date's matched text.
pub fn validate_matched_text(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || text.len() > MAX_FRAG_LEN {
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpretation_covers_all_flag_pairs() {
        assert_eq!(
            DateInterpretation::from_flags(true, true),
            DateInterpretation::DayFirstYearFirst
        );
        assert_eq!(
            DateInterpretation::from_flags(true, false),
            DateInterpretation::DayFirstYearSecond
        );
        assert_eq!(
            DateInterpretation::from_flags(false, true),
            DateInterpretation::DaySecondYearFirst
        );
        assert_eq!(
            DateInterpretation::from_flags(false, false),
            DateInterpretation::DaySecondYearSecond
        );
    }

    #[test]
    fn interpretation_round_trips() {
        for day_first in [true, false] {
            for year_first in [true, false] {
                let i = DateInterpretation::from_flags(day_first, year_first);
                assert_eq!(DateInterpretation::parse(i.as_str()), Some(i));
            }
        }
    }

    #[test]
    fn matched_text_bounds() {
        assert_eq!(validate_matched_text(" 3/4/2005 "), Some("3/4/2005".to_string()));
        assert_eq!(validate_matched_text(""), None);
        assert_eq!(validate_matched_text(&"x".repeat(33)), None);
    }
}

//! Date mining over article markup.
//!
//! Each date-like fragment in the page yields one context: the matched text,
//! its byte position, an optional leading preposition, and every defensible
//! calendar reading of the fragment. Numeric forms where day and month are
//! interchangeable produce several readings; month-name forms produce one.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// One calendar reading of a matched fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedDate {
    pub date: DateTime<Utc>,
    pub day_first: bool,
    pub year_first: bool,
}

/// One date-like fragment and its readings.
#[derive(Debug, Clone)]
pub struct DateContext {
    pub dates: Vec<MinedDate>,
    pub text: String,
    pub prep: Option<String>,
    pub position: i64,
}

impl DateContext {
    /// A context with a single reading is a certain date.
    pub fn is_certain(&self) -> bool {
        self.dates.len() == 1
    }
}

pub trait DateMiner: Send + Sync {
    /// Mine date contexts out of raw markup. Positions are byte offsets
    /// into the input.
    fn mine(&self, markup: &str) -> Vec<DateContext>;

    /// Version string recorded in provenance.
    fn version(&self) -> &str;
}

static MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(\d{1,2})\s+)?(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.?\s+(?:(\d{1,2})(?:st|nd|rd|th)?,?\s+)?(\d{4})\b",
    )
    .unwrap()
});

// Numeric forms with various separators: 2008-03-01, 01/03/2008, 01.03.08
static YEAR_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})[-/._](\d{1,2})[-/._](\d{1,2})\b").unwrap()
});
static YEAR_LAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[-/._](\d{1,2})[-/._](\d{4})\b").unwrap()
});

/// Words that often introduce a publication date.
const DATE_PREPS: &[&str] = &["on", "at", "published", "posted", "updated", "dated"];

/// Regex-backed miner.
#[derive(Debug)]
pub struct RegexDateMiner {
    version: String,
}

impl RegexDateMiner {
    pub fn new() -> Self {
        Self {
            version: format!("sentropy-datefinder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for RegexDateMiner {
    fn default() -> Self {
        Self::new()
    }
}

impl DateMiner for RegexDateMiner {
    fn mine(&self, markup: &str) -> Vec<DateContext> {
        let mut contexts = Vec::new();

        for caps in MONTH_NAME.captures_iter(markup) {
            let whole = caps.get(0).unwrap();
            let month = month_number(&caps[2]);
            let day = caps
                .get(1)
                .or_else(|| caps.get(3))
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(1);
            let year: i32 = match caps[4].parse() {
                Ok(year) => year,
                Err(_) => continue,
            };
            let Some(month) = month else { continue };
            let Some(date) = to_utc(year, month, day) else {
                continue;
            };

            contexts.push(DateContext {
                dates: vec![MinedDate {
                    date,
                    day_first: caps.get(1).is_some(),
                    year_first: false,
                }],
                text: whole.as_str().to_string(),
                prep: preceding_prep(markup, whole.start()),
                position: whole.start() as i64,
            });
        }

        for caps in YEAR_FIRST.captures_iter(markup) {
            let whole = caps.get(0).unwrap();
            let year: i32 = match caps[1].parse() {
                Ok(year) => year,
                Err(_) => continue,
            };
            let a: u32 = match caps[2].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let b: u32 = match caps[3].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };

            let mut dates = Vec::new();
            // year-month-day reading
            if let Some(date) = to_utc(year, a, b) {
                dates.push(MinedDate {
                    date,
                    day_first: false,
                    year_first: true,
                });
            }
            // year-day-month reading, only distinct when both fit
            if a != b {
                if let Some(date) = to_utc(year, b, a) {
                    dates.push(MinedDate {
                        date,
                        day_first: true,
                        year_first: true,
                    });
                }
            }
            if dates.is_empty() {
                continue;
            }

            contexts.push(DateContext {
                dates,
                text: whole.as_str().to_string(),
                prep: preceding_prep(markup, whole.start()),
                position: whole.start() as i64,
            });
        }

        for caps in YEAR_LAST.captures_iter(markup) {
            let whole = caps.get(0).unwrap();
            let a: u32 = match caps[1].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let b: u32 = match caps[2].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let year: i32 = match caps[3].parse() {
                Ok(year) => year,
                Err(_) => continue,
            };

            let mut dates = Vec::new();
            // month-day-year reading
            if let Some(date) = to_utc(year, a, b) {
                dates.push(MinedDate {
                    date,
                    day_first: false,
                    year_first: false,
                });
            }
            // day-month-year reading
            if a != b {
                if let Some(date) = to_utc(year, b, a) {
                    dates.push(MinedDate {
                        date,
                        day_first: true,
                        year_first: false,
                    });
                }
            }
            if dates.is_empty() {
                continue;
            }

            contexts.push(DateContext {
                dates,
                text: whole.as_str().to_string(),
                prep: preceding_prep(markup, whole.start()),
                position: whole.start() as i64,
            });
        }

        contexts.sort_by_key(|c| c.position);
        contexts
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let month = match &lower[..3.min(lower.len())] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn to_utc(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Last word before `position`, if it is a date-introducing preposition.
fn preceding_prep(markup: &str, position: usize) -> Option<String> {
    let before = &markup[..position];
    let word = before
        .rsplit(|c: char| !c.is_ascii_alphabetic())
        .find(|w| !w.is_empty())?;
    let lower = word.to_lowercase();
    DATE_PREPS.contains(&lower.as_str()).then_some(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mine(markup: &str) -> Vec<DateContext> {
        RegexDateMiner::new().mine(markup)
    }

    #[test]
    fn month_name_dates_are_certain() {
        let contexts = mine("<p>Published on March 1, 2008 by staff</p>");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].is_certain());
        assert_eq!(contexts[0].prep.as_deref(), Some("on"));
        assert_eq!(
            contexts[0].dates[0].date.date_naive(),
            NaiveDate::from_ymd_opt(2008, 3, 1).unwrap()
        );
    }

    #[test]
    fn ambiguous_numeric_dates_have_multiple_readings() {
        let contexts = mine("updated 03/04/2005 late");
        assert_eq!(contexts.len(), 1);
        let context = &contexts[0];
        assert_eq!(context.dates.len(), 2);
        assert!(!context.is_certain());
        assert_eq!(context.text, "03/04/2005");
        assert_eq!(context.prep.as_deref(), Some("updated"));

        let months: Vec<u32> = context
            .dates
            .iter()
            .map(|d| d.date.date_naive().format("%m").to_string().parse().unwrap())
            .collect();
        assert!(months.contains(&3) && months.contains(&4));
    }

    #[test]
    fn unambiguous_numeric_dates_are_certain() {
        // 25 can only be a day.
        let contexts = mine("on 25/12/2007 we celebrated");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].is_certain());
        assert!(contexts[0].dates[0].day_first);
    }

    #[test]
    fn year_first_forms_are_flagged() {
        let contexts = mine("archive/2008-03-01/index.html");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].dates.iter().all(|d| d.year_first));
    }

    #[test]
    fn positions_are_byte_offsets() {
        let markup = "xxxx 2008-05-06 yyyy";
        let contexts = mine(markup);
        assert_eq!(contexts[0].position, 5);
    }

    #[test]
    fn nonsense_numbers_yield_nothing() {
        assert!(mine("the score was 99/88/2008 wait no").is_empty());
        assert!(mine("no dates here at all").is_empty());
    }
}

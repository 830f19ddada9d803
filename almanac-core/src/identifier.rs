//! Diary identifier parsing.
//!
//! Identifiers come from file names and may name a single day
//! (`2024-04-15.md`), a range (`2024-04-01_to_2024-04-07`, `2024-04-01 到 2024-04-07`)
//! or carry dates somewhere inside free text. Parsing is total: anything without a
//! valid calendar date lands on [`SENTINEL_DATE`].

use almanac_types::{DiaryIdentifierMeta, SENTINEL_DATE};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Inclusive span of calendar days named by an identifier.
///
/// `is_range` records that two separate date tokens were found, even when they
/// name the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_range: bool,
}

impl DateSpan {
    /// Build a range from two dates in either order.
    pub fn ordered(a: NaiveDate, b: NaiveDate) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start,
            end,
            is_range: true,
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            is_range: false,
        }
    }
}

/// Ordered fallback chain; the first strategy returning a span wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `DATE <sep> DATE` covering the whole identifier
    Range,
    /// Exactly one date and nothing else
    SingleDate,
    /// Any dates found anywhere in the text
    Scan,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Range, Strategy::SingleDate, Strategy::Scan];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Range => "range",
            Strategy::SingleDate => "single-date",
            Strategy::Scan => "scan",
        }
    }

    pub fn apply(&self, raw: &str) -> Option<DateSpan> {
        match self {
            Strategy::Range => {
                let caps = range_regex().captures(raw)?;
                let start = valid_date(caps.get(1)?.as_str())?;
                let end = valid_date(caps.get(2)?.as_str())?;
                Some(DateSpan::ordered(start, end))
            }
            Strategy::SingleDate => valid_date(raw).map(DateSpan::single),
            Strategy::Scan => {
                let mut dates = date_token_regex()
                    .find_iter(raw)
                    .filter_map(|m| valid_date(m.as_str()));
                let first = dates.next()?;
                Some(match dates.next() {
                    Some(second) => DateSpan::ordered(first, second),
                    None => DateSpan::single(first),
                })
            }
        }
    }
}

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4}-\d{2}-\d{2})\s*(?:到|至|~|～|to|TO|_to_|-to-|--|—|–|_|\.{2,}|\s+to\s+)\s*(\d{4}-\d{2}-\d{2})$",
        )
        .expect("valid regex")
    })
}

fn single_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"))
}

fn date_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"))
}

fn extension_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.mdx?$").expect("valid regex"))
}

/// Parse a `YYYY-MM-DD` string that names a real calendar day.
///
/// `2023-02-30` has the right shape but is rejected rather than rolled over.
pub fn valid_date(value: &str) -> Option<NaiveDate> {
    let caps = single_date_regex().captures(value)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Strip a trailing markdown extension and surrounding whitespace
pub fn normalize_identifier(id: &str) -> String {
    extension_regex().replace(id.trim(), "").trim().to_string()
}

/// Run the strategy chain, reporting which strategy matched.
pub fn detect(raw: &str) -> Option<(Strategy, DateSpan)> {
    Strategy::ALL
        .iter()
        .find_map(|strategy| strategy.apply(raw).map(|span| (*strategy, span)))
}

/// `YYYY-Qn` bucket for a date
pub fn quarter_key(date: NaiveDate) -> String {
    format!("{}-Q{}", date.year(), date.month().div_ceil(3))
}

/// Parse an entry identifier. Never fails.
///
/// # Example
///
/// ```
/// use almanac_core::parse_identifier;
///
/// let meta = parse_identifier("2024-04-20_to_2024-04-15.md");
/// assert_eq!(meta.start_date, "2024-04-15");
/// assert_eq!(meta.end_date, "2024-04-20");
/// assert!(meta.is_range);
/// assert_eq!(meta.quarter_key, "2024-Q2");
/// ```
pub fn parse_identifier(id: &str) -> DiaryIdentifierMeta {
    let raw_id = normalize_identifier(id);

    let span = match detect(&raw_id) {
        Some((strategy, span)) => {
            tracing::trace!("identifier {:?} matched {}", raw_id, strategy.name());
            span
        }
        None => {
            tracing::debug!("identifier {:?} has no valid date, using sentinel", raw_id);
            DateSpan::single(sentinel_date())
        }
    };

    let start_date = span.start.format("%Y-%m-%d").to_string();
    let end_date = span.end.format("%Y-%m-%d").to_string();

    DiaryIdentifierMeta {
        raw_id,
        quarter_key: quarter_key(span.start),
        sort_key: end_date.clone(),
        is_range: span.is_range,
        start_date,
        end_date,
    }
}

fn sentinel_date() -> NaiveDate {
    valid_date(SENTINEL_DATE).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        valid_date(s).unwrap()
    }

    #[test]
    fn test_single_date() {
        let meta = parse_identifier("2024-04-15.md");
        assert_eq!(meta.raw_id, "2024-04-15");
        assert_eq!(meta.start_date, "2024-04-15");
        assert_eq!(meta.end_date, "2024-04-15");
        assert!(!meta.is_range);
        assert_eq!(meta.sort_key, "2024-04-15");
    }

    #[test]
    fn test_range_separators() {
        for id in [
            "2024-01-01_to_2024-01-05",
            "2024-01-01 to 2024-01-05",
            "2024-01-01到2024-01-05",
            "2024-01-01 至 2024-01-05",
            "2024-01-01~2024-01-05",
            "2024-01-01～2024-01-05",
            "2024-01-01--2024-01-05",
            "2024-01-01—2024-01-05",
            "2024-01-01–2024-01-05",
            "2024-01-01_2024-01-05",
            "2024-01-01...2024-01-05",
            "2024-01-01-to-2024-01-05",
        ] {
            let (strategy, span) = detect(id).unwrap_or_else(|| panic!("no match for {id}"));
            assert_eq!(strategy, Strategy::Range, "{id}");
            assert_eq!(span.start, date("2024-01-01"), "{id}");
            assert_eq!(span.end, date("2024-01-05"), "{id}");
        }
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let meta = parse_identifier("2024-03-10_to_2023-12-31");
        assert_eq!(meta.start_date, "2023-12-31");
        assert_eq!(meta.end_date, "2024-03-10");
        assert!(meta.is_range);
        assert_eq!(meta.quarter_key, "2023-Q4");
        assert_eq!(meta.sort_key, "2024-03-10");
    }

    #[test]
    fn test_invalid_calendar_date_falls_back_to_sentinel() {
        let meta = parse_identifier("2023-02-30");
        assert_eq!(meta.start_date, SENTINEL_DATE);
        assert_eq!(meta.end_date, SENTINEL_DATE);
        assert!(!meta.is_range);
        assert_eq!(meta.quarter_key, "1970-Q1");
    }

    #[test]
    fn test_invalid_range_end_falls_through_to_scan() {
        // Range shape matches but the second date is bogus; scan keeps the valid one.
        let (strategy, span) = detect("2024-02-01_to_2024-02-31").unwrap();
        assert_eq!(strategy, Strategy::Scan);
        assert_eq!(span, DateSpan::single(date("2024-02-01")));
    }

    #[test]
    fn test_scan_finds_embedded_dates() {
        let meta = parse_identifier("trip 2024-05-03 and back 2024-05-01 notes");
        assert_eq!(meta.start_date, "2024-05-01");
        assert_eq!(meta.end_date, "2024-05-03");
        assert!(meta.is_range);

        let meta = parse_identifier("weekly-review-2024-06-09");
        assert_eq!(meta.start_date, "2024-06-09");
        assert!(!meta.is_range);
    }

    #[test]
    fn test_unparseable_identifier() {
        let meta = parse_identifier("  random notes.MDX ");
        assert_eq!(meta.raw_id, "random notes");
        assert_eq!(meta.start_date, SENTINEL_DATE);
        assert!(detect("random notes").is_none());
    }

    #[test]
    fn test_quarter_key() {
        assert_eq!(quarter_key(date("2024-04-15")), "2024-Q2");
        assert_eq!(quarter_key(date("2024-01-01")), "2024-Q1");
        assert_eq!(quarter_key(date("2024-09-30")), "2024-Q3");
        assert_eq!(quarter_key(date("2024-12-31")), "2024-Q4");
    }

    #[test]
    fn test_range_ordering_property() {
        let dates = ["2020-02-29", "2021-07-04", "2024-12-31", "1999-01-01"];
        for a in dates {
            for b in dates {
                let meta = parse_identifier(&format!("{a}_to_{b}"));
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                assert_eq!(meta.start_date, lo);
                assert_eq!(meta.end_date, hi);
                assert!(meta.is_range);
            }
        }
    }
}

//! Date normalization for the free-form dates found on tender pages.
//!
//! Sources publish deadlines as `31/12/2026`, `31.12.26`, `2026-12-31`,
//! `2026-12-31T00:00:00` and a few other shapes. Everything is normalized to
//! `YYYY-MM-DD`; absence is reported as `None` and never as an error, so
//! callers always pick their own fallback (usually the run date).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered list of accepted shapes. Each regex pins the digit widths so that
/// e.g. `1/2/26` is never read as the year 26 by the four-digit pattern.
static DATE_FORMATS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"^\d{1,2}/\d{1,2}/\d{4}$", "%d/%m/%Y"),
        (r"^\d{1,2}\.\d{1,2}\.\d{4}$", "%d.%m.%Y"),
        (r"^\d{4}-\d{1,2}-\d{1,2}$", "%Y-%m-%d"),
        (r"^\d{1,2}-\d{1,2}-\d{4}$", "%d-%m-%Y"),
        (r"^\d{1,2}/\d{1,2}/\d{2}$", "%d/%m/%y"),
        (r"^\d{1,2}\.\d{1,2}\.\d{2}$", "%d.%m.%y"),
        (r"^\d{1,2}-\d{1,2}-\d{2}$", "%d-%m-%y"),
    ]
    .into_iter()
    .map(|(pattern, fmt)| (Regex::new(pattern).unwrap(), fmt))
    .collect()
});

/// API timestamps such as `2026-12-31T00:00:00`; only the date part is kept.
static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ]").unwrap());

/// Candidate dates embedded in running text.
static DATE_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[./-]\d{1,2}[./-]\d{2,4}").unwrap());

/// Format a date the way the snapshot stores it.
pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a raw date string into a calendar date.
///
/// Formats are tried in a fixed order and the first successful parse wins.
pub fn parse_naive_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let candidate = ISO_DATETIME
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    DATE_FORMATS
        .iter()
        .filter(|(shape, _)| shape.is_match(candidate))
        .find_map(|(_, fmt)| NaiveDate::parse_from_str(candidate, fmt).ok())
}

/// Parse a raw date string and return it as `YYYY-MM-DD`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_date("05/11/2026"), Some("2026-11-05".to_string()));
/// assert_eq!(parse_date("soon"), None);
/// ```
pub fn parse_date(raw: &str) -> Option<String> {
    parse_naive_date(raw).map(to_iso)
}

/// Find the first valid date anywhere in `text` and normalize it.
///
/// Candidates that look like dates but are not valid calendar dates
/// (`31/02/2026`) are skipped in favour of later ones.
pub fn find_date(text: &str) -> Option<String> {
    DATE_IN_TEXT
        .find_iter(text)
        .find_map(|m| parse_date(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_normalizes_to_iso() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let formats = [
            "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%y", "%d.%m.%y", "%d-%m-%y",
        ];
        for fmt in formats {
            let raw = date.format(fmt).to_string();
            assert_eq!(parse_date(&raw), Some("2026-03-07".to_string()), "format {fmt}");
        }
    }

    #[test]
    fn test_single_digit_day_and_month() {
        assert_eq!(parse_date("7/3/2026"), Some("2026-03-07".to_string()));
        assert_eq!(parse_date(" 1.12.2026 "), Some("2026-12-01".to_string()));
    }

    #[test]
    fn test_two_digit_year_is_not_read_as_four_digit() {
        assert_eq!(parse_date("01/02/26"), Some("2026-02-01".to_string()));
    }

    #[test]
    fn test_iso_datetime_keeps_date_part() {
        assert_eq!(parse_date("2026-12-31T00:00:00"), Some("2026-12-31".to_string()));
        assert_eq!(parse_date("2026-12-31 13:45"), Some("2026-12-31".to_string()));
    }

    #[test]
    fn test_unparsable_inputs_yield_none() {
        for raw in ["", "   ", "tomorrow", "31/02/2026", "2026/12/31", "12/2026", "ב-5 לחודש"] {
            assert_eq!(parse_date(raw), None, "input {raw:?}");
        }
    }

    #[test]
    fn test_find_date_in_hebrew_text() {
        let text = "מועד אחרון להגשה: 15.11.2026 בשעה 12:00";
        assert_eq!(find_date(text), Some("2026-11-15".to_string()));
    }

    #[test]
    fn test_find_date_skips_invalid_candidates() {
        let text = "פורסם 31/02/2026, הגשה עד 02/03/2026";
        assert_eq!(find_date(text), Some("2026-03-02".to_string()));
        assert_eq!(find_date("אין תאריך"), None);
    }
}

//! Field extraction from listing text: label patterns, identity numbers,
//! document types and URL resolution.

use crate::config::{ConfigError, DocTypeConfig, FieldPatterns, compile_pattern};
use crate::dates::parse_date;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

static URL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4,}$").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[/-]?\d*").unwrap());

/// Compiled label patterns for the labelled fields on Hebrew listing pages
/// ("מועד אחרון להגשה", "שם המפרסם", "מספר פרסום", ...).
#[derive(Debug, Clone)]
pub struct FieldRules {
    tender_number: Vec<Regex>,
    deadline: Vec<Regex>,
    publisher: Vec<Regex>,
}

impl FieldRules {
    pub fn compile(patterns: &FieldPatterns) -> Result<Self, ConfigError> {
        let compile_all = |list: &[String]| {
            list.iter()
                .map(|p| compile_pattern(p))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            tender_number: compile_all(&patterns.tender_number)?,
            deadline: compile_all(&patterns.deadline)?,
            publisher: compile_all(&patterns.publisher)?,
        })
    }

    pub fn tender_number(&self, text: &str) -> Option<String> {
        first_capture(&self.tender_number, text)
    }

    /// Labelled deadline, normalized. A label whose value does not parse
    /// as a date does not count as a match.
    pub fn deadline(&self, text: &str) -> Option<String> {
        self.deadline
            .iter()
            .filter_map(|re| re.captures(text))
            .filter_map(|caps| caps.get(1))
            .find_map(|m| parse_date(m.as_str()))
    }

    pub fn publisher(&self, text: &str) -> Option<String> {
        first_capture(&self.publisher, text)
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .find(|value| !value.is_empty())
}

/// Assigns a document type from marker phrases in the listing text.
#[derive(Debug, Clone)]
pub struct DocTyper {
    default: String,
    rules: Vec<(String, Vec<String>)>,
}

impl DocTyper {
    pub fn new(config: &DocTypeConfig) -> Self {
        Self {
            default: config.default_doc_type.clone(),
            rules: config
                .rules
                .iter()
                .map(|r| {
                    let markers = r.markers.iter().map(|m| m.to_lowercase()).collect();
                    (r.label.clone(), markers)
                })
                .collect(),
        }
    }

    /// Label of the first rule with a marker in `text`, else the default.
    pub fn doc_type(&self, text: &str) -> String {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| text.contains(m.as_str())))
            .map_or_else(|| self.default.clone(), |(label, _)| label.clone())
    }
}

/// True if `text` contains any of `markers`, case-insensitively.
pub fn contains_marker(text: &str, markers: &[String]) -> bool {
    let text = text.to_lowercase();
    markers.iter().any(|m| !m.is_empty() && text.contains(&m.to_lowercase()))
}

/// The numeric listing ID in a URL: the final path segment, when it is
/// four or more digits. A trailing slash is ignored.
///
/// # Examples
///
/// ```ignore
/// let url = "https://mr.gov.il/ilgstorefront/he/p/4000512345";
/// assert_eq!(extract_url_id(url), Some("4000512345".into()));
/// assert_eq!(extract_url_id("https://mr.gov.il/tenders/2026/details"), None);
/// ```
pub fn extract_url_id(url: &str) -> Option<String> {
    let path = Url::parse(url).map_or_else(
        |_| url.split(['?', '#']).next().unwrap_or_default().to_string(),
        |u| u.path().to_string(),
    );
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| URL_ID.is_match(segment))
        .map(str::to_string)
}

/// First number-like token (`12`, `12/2026`, `2026-004`) in `text`.
pub fn first_number(text: &str) -> Option<String> {
    NUMBER.find(text).map(|m| m.as_str().trim_end_matches(['/', '-']).to_string())
}

/// Resolve a link found on `page` to an absolute URL.
///
/// Absolute links pass through unchanged; a missing or unresolvable link
/// falls back to the page itself.
pub fn resolve_url(page: &Url, href: Option<&str>) -> String {
    href.and_then(|h| page.join(h).ok())
        .map_or_else(|| page.to_string(), |u| u.to_string())
}

/// Mints fallback tender numbers when a listing has no resolvable one.
///
/// Tokens look like `MR-20261018093000-1`: the source prefix, the run start
/// time and a run-wide sequence number, so fallback tokens never collide
/// within one snapshot.
#[derive(Debug)]
pub struct SyntheticIds {
    stamp: String,
    seq: AtomicUsize,
}

impl SyntheticIds {
    pub fn new(started: NaiveDateTime) -> Self {
        Self {
            stamp: started.format("%Y%m%d%H%M%S").to_string(),
            seq: AtomicUsize::new(0),
        }
    }

    pub fn next(&self, prefix: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{}-{n}", self.stamp)
    }
}

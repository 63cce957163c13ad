//! Data models for scraped tenders and the published snapshot.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Tender`]: One normalized procurement announcement
//! - [`Source`]: Which adapter produced a record
//! - [`Snapshot`]: The envelope written to `tenders.json`
//!
//! Field names serialize in camelCase to match the JSON shape the display
//! layer reads.

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The adapter that produced a [`Tender`].
///
/// Serialized values are the labels the display layer filters on; the
/// command-line names are the ones accepted by `--only`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum Source {
    /// The national procurement portal (mr.gov.il).
    #[serde(rename = "mr.gov.il")]
    #[value(name = "portal")]
    Portal,
    /// The government tenders API on gov.il.
    #[serde(rename = "tender.gov.il")]
    #[value(name = "gov-api")]
    GovApi,
    /// City and local-authority websites.
    #[serde(rename = "municipal")]
    #[value(name = "municipal")]
    Municipal,
    /// Government-owned companies.
    #[serde(rename = "gov-company")]
    #[value(name = "gov-company")]
    GovCompany,
}

impl Source {
    /// All sources, in the order the pipeline runs them.
    pub const ALL: [Source; 4] = [
        Source::Portal,
        Source::GovApi,
        Source::Municipal,
        Source::GovCompany,
    ];

    /// The label written into the snapshot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Portal => "mr.gov.il",
            Source::GovApi => "tender.gov.il",
            Source::Municipal => "municipal",
            Source::GovCompany => "gov-company",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document type assigned when no doc-type rule matches.
pub const DEFAULT_DOC_TYPE: &str = "tender";

/// A single tender announcement, normalized from any source.
///
/// Constructed once by an adapter and never modified afterwards; the
/// aggregator only drops or reorders whole records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    /// Identity key, unique within a snapshot.
    pub tender_number: String,
    /// Announcement title; never empty.
    pub title: String,
    /// Publishing organization, or a placeholder when unresolved.
    pub publisher: String,
    /// Submission deadline as `YYYY-MM-DD`. The run date when unresolved.
    pub deadline: String,
    /// Category labels in taxonomy order; never empty.
    pub categories: Vec<String>,
    pub source: Source,
    /// Absolute link to the original listing.
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
}

fn default_doc_type() -> String {
    DEFAULT_DOC_TYPE.to_string()
}

/// Drop repeated tender numbers, keeping the first occurrence and the
/// original order of the survivors.
pub fn dedup_by_number(tenders: impl IntoIterator<Item = Tender>) -> Vec<Tender> {
    tenders
        .into_iter()
        .unique_by(|t| t.tender_number.clone())
        .collect()
}

/// The JSON envelope produced by one pipeline run.
///
/// Each run writes a fresh snapshot that fully replaces the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Local time of the run, formatted `YYYY-MM-DD HH:MM`.
    pub last_update: String,
    pub tenders: Vec<Tender>,
    pub total_count: usize,
    /// Number of tenders per source label.
    pub sources: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

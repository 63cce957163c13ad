//! Source adapters that turn tender listing pages into [`Tender`] records.
//!
//! Each adapter implements [`TenderSource`] and follows the same shape:
//!
//! 1. **Targets**: decide what to fetch (search pages, an API call, or one
//!    page per registry entry)
//! 2. **Fragments**: locate candidate listings with a [`LocatorChain`]
//! 3. **Fields**: extract title, number, deadline, publisher and URL, each
//!    with a fallback
//! 4. **Classify**: keep relevant listings and label them
//! 5. **Dedup**: drop repeated tender numbers (first occurrence wins)
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | mr.gov.il | [`portal`] | Paginated keyword search | Filters exemption notices |
//! | gov.il | [`gov_api`] | JSON API | HTML listing as fallback |
//! | Municipalities | [`municipal`] | HTML scraping | One page per registry entry |
//! | Government companies | [`company`] | HTML scraping | One page per registry entry |
//!
//! # Failure handling
//!
//! Adapters never fail a run for a bad page. A listing that cannot be used
//! is skipped with a debug log; a page that cannot be fetched is skipped
//! with a warning; only adapter-wide failures surface as `Err`.

pub mod company;
pub mod gov_api;
pub mod municipal;
pub mod portal;
pub mod registry;

use crate::classify::Classifier;
use crate::config::{ConfigError, PipelineConfig};
use crate::dates::to_iso;
use crate::error::ScrapeError;
use crate::extract::{DocTyper, FieldRules, SyntheticIds};
use crate::markup::{LocatorChain, collapse_whitespace, element_text};
use crate::models::{Source, Tender};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html};
use tracing::debug;

/// Per-run settings shared by all adapters.
#[derive(Debug)]
pub struct RunContext {
    /// Historical mode: deeper portal search, reversed output order.
    pub historical: bool,
    /// Local start time of the run.
    pub started: NaiveDateTime,
    /// Fallback tender numbers for this run.
    pub ids: SyntheticIds,
}

impl RunContext {
    pub fn new(historical: bool) -> Self {
        Self::at(Local::now().naive_local(), historical)
    }

    pub fn at(started: NaiveDateTime, historical: bool) -> Self {
        Self {
            historical,
            started,
            ids: SyntheticIds::new(started),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.started.date()
    }

    /// Deadline fallback when a listing has none.
    pub fn today_iso(&self) -> String {
        to_iso(self.today())
    }
}

/// One source of tenders.
#[async_trait]
pub trait TenderSource: Send + Sync {
    fn source(&self) -> Source;

    /// Collect all relevant tenders from this source.
    ///
    /// Page- and listing-level failures are logged and skipped inside;
    /// the result is already deduplicated by tender number.
    async fn scrape(&self, ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError>;
}

/// Classification and field rules shared by all adapters of a run.
#[derive(Debug, Clone)]
pub struct Rules {
    pub classifier: Classifier,
    pub fields: FieldRules,
    pub doc_types: DocTyper,
}

impl Rules {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier: Classifier::new(&config.classifier),
            fields: FieldRules::compile(&config.fields)?,
            doc_types: DocTyper::new(&config.doc_types),
        })
    }
}

/// Where listings and their titles live on one kind of page.
#[derive(Debug, Clone)]
pub struct ListingLayout {
    pub fragments: LocatorChain,
    pub title: LocatorChain,
}

/// A candidate listing that has a title and passed the relevance gate.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a, 's> {
    pub element: ElementRef<'a>,
    pub title: &'s str,
    /// Whitespace-collapsed text of the whole listing.
    pub text: &'s str,
}

impl Fragment<'_, '_> {
    /// Listing text with the title taken out.
    pub fn body_text(&self) -> String {
        collapse_whitespace(&self.text.replacen(self.title, " ", 1))
    }
}

/// Why a candidate listing did not become a tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoTitle,
    Irrelevant,
    Exemption,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NoTitle => "no title",
            Rejection::Irrelevant => "not relevant",
            Rejection::Exemption => "exemption notice",
        }
    }
}

/// Result of parsing one page.
#[derive(Debug, Default)]
pub struct PageHarvest {
    /// Candidate listings located, before any filtering.
    pub fragments: usize,
    pub tenders: Vec<Tender>,
}

/// Parse a listing page and build tenders from its fragments.
///
/// Fragments without a title or failing the relevance gate never reach
/// `build`. `build` may still reject a fragment; every rejection is logged
/// at debug level and the remaining fragments are processed.
pub fn harvest_page(
    body: &str,
    layout: &ListingLayout,
    rules: &Rules,
    mut build: impl FnMut(Fragment<'_, '_>) -> Result<Tender, Rejection>,
) -> PageHarvest {
    let document = Html::parse_document(body);
    let fragments = layout.fragments.find_in_document(&document);
    let mut harvest = PageHarvest {
        fragments: fragments.len(),
        tenders: Vec::new(),
    };

    for element in fragments {
        let text = element_text(element);
        let result = match layout.title.first_text(element) {
            None => Err(Rejection::NoTitle),
            Some(title) if !rules.classifier.is_relevant(&title, &text) => {
                debug!(%title, "Listing not relevant");
                Err(Rejection::Irrelevant)
            }
            Some(title) => build(Fragment {
                element,
                title: &title,
                text: &text,
            }),
        };

        match result {
            Ok(tender) => harvest.tenders.push(tender),
            Err(reason) => debug!(reason = reason.as_str(), "Skipped listing"),
        }
    }

    harvest
}

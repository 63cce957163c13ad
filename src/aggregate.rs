//! Runs every source adapter and merges their results into one [`Snapshot`].
//!
//! Adapters run one after another in registration order. An adapter that
//! fails contributes nothing; the others still run and the snapshot is
//! always produced.

use crate::models::{Snapshot, Source, Tender, dedup_by_number};
use crate::scrapers::{RunContext, TenderSource};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

const EMPTY_NOTE: &str = "לא נמצאו מכרזים פעילים בתחומי דוברות, יחסי ציבור ותקשורת כרגע";
const EMPTY_HISTORICAL_NOTE: &str = "לא נמצאו מכרזים בסריקה ההיסטורית";

/// The ordered set of adapters for one run.
pub struct Aggregator {
    sources: Vec<Box<dyn TenderSource>>,
}

impl Aggregator {
    pub fn new(sources: Vec<Box<dyn TenderSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> Vec<Source> {
        self.sources.iter().map(|s| s.source()).collect()
    }

    /// Scrape every source and build the snapshot.
    #[instrument(
        level = "info",
        skip_all,
        fields(sources = self.sources.len(), historical = ctx.historical)
    )]
    pub async fn run(&self, ctx: &RunContext) -> Snapshot {
        let batches: Vec<Vec<Tender>> = stream::iter(self.sources.iter())
            .then(|source| async move {
                match source.scrape(ctx).await {
                    Ok(tenders) => {
                        info!(source = %source.source(), count = tenders.len(), "Source finished");
                        tenders
                    }
                    Err(e) => {
                        error!(
                            source = %source.source(),
                            error = %e,
                            "Source failed; contributing no tenders"
                        );
                        Vec::new()
                    }
                }
            })
            .collect()
            .await;

        let mut tenders = merge(batches);
        sort_by_deadline(&mut tenders, ctx.historical);
        info!(count = tenders.len(), "Merged tenders from all sources");

        Snapshot {
            last_update: ctx.started.format("%Y-%m-%d %H:%M").to_string(),
            total_count: tenders.len(),
            sources: source_counts(&tenders),
            note: summary_note(tenders.len(), ctx.historical),
            tenders,
        }
    }
}

/// Concatenate per-source batches in order and drop repeated tender numbers.
pub fn merge(batches: impl IntoIterator<Item = Vec<Tender>>) -> Vec<Tender> {
    dedup_by_number(batches.into_iter().flatten())
}

/// Stable sort on the ISO deadline: soonest first, or latest first for
/// historical runs.
pub fn sort_by_deadline(tenders: &mut [Tender], historical: bool) {
    if historical {
        tenders.sort_by(|a, b| b.deadline.cmp(&a.deadline));
    } else {
        tenders.sort_by(|a, b| a.deadline.cmp(&b.deadline));
    }
}

/// Number of tenders per source label.
pub fn source_counts(tenders: &[Tender]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for tender in tenders {
        *counts.entry(tender.source.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn summary_note(count: usize, historical: bool) -> Option<String> {
    match (count, historical) {
        (0, false) => Some(EMPTY_NOTE.to_string()),
        (0, true) => Some(EMPTY_HISTORICAL_NOTE.to_string()),
        (n, true) => Some(format!("סריקה היסטורית: נמצאו {n} מכרזים")),
        (_, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::models::fixtures::tender;
    use crate::scrapers::fixtures::ctx;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    struct Canned {
        source: Source,
        result: fn() -> Result<Vec<Tender>, ScrapeError>,
    }

    #[async_trait]
    impl TenderSource for Canned {
        fn source(&self) -> Source {
            self.source
        }

        async fn scrape(&self, _ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError> {
            (self.result)()
        }
    }

    fn canned(
        source: Source,
        result: fn() -> Result<Vec<Tender>, ScrapeError>,
    ) -> Box<dyn TenderSource> {
        Box::new(Canned { source, result })
    }

    fn portal() -> Result<Vec<Tender>, ScrapeError> {
        Ok(vec![
            tender("100", Source::Portal, "2026-12-01"),
            tender("101", Source::Portal, "2026-11-01"),
        ])
    }

    fn municipal() -> Result<Vec<Tender>, ScrapeError> {
        Ok(vec![
            tender("100", Source::Municipal, "2026-10-20"),
            tender("TLV-7", Source::Municipal, "2026-11-15"),
        ])
    }

    fn broken() -> Result<Vec<Tender>, ScrapeError> {
        Err(ScrapeError::Http("connection refused".to_string()))
    }

    fn numbers(tenders: &[Tender]) -> Vec<&str> {
        tenders.iter().map(|t| t.tender_number.as_str()).collect()
    }

    #[tokio::test]
    async fn test_first_source_wins_on_shared_number() {
        let aggregator = Aggregator::new(vec![
            canned(Source::Portal, portal),
            canned(Source::Municipal, municipal),
        ]);
        let snapshot = aggregator.run(&ctx(false)).await;

        let shared: Vec<_> = snapshot.tenders.iter().filter(|t| t.tender_number == "100").collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].source, Source::Portal);
        assert_eq!(snapshot.total_count, 3);
        assert_eq!(snapshot.sources["mr.gov.il"], 2);
        assert_eq!(snapshot.sources["municipal"], 1);
        assert!(snapshot.note.is_none());
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_run() {
        let aggregator = Aggregator::new(vec![
            canned(Source::Portal, portal),
            canned(Source::GovApi, broken),
            canned(Source::Municipal, || {
                Ok(vec![tender("TLV-9", Source::Municipal, "2026-11-10")])
            }),
        ]);
        let snapshot = aggregator.run(&ctx(false)).await;

        assert_eq!(snapshot.total_count, 3);
        assert!(!snapshot.sources.contains_key("tender.gov.il"));
        assert!(NaiveDateTime::parse_from_str(&snapshot.last_update, "%Y-%m-%d %H:%M").is_ok());
    }

    #[tokio::test]
    async fn test_all_sources_failing_still_yields_snapshot() {
        let aggregator = Aggregator::new(vec![
            canned(Source::Portal, broken),
            canned(Source::GovApi, broken),
        ]);
        let snapshot = aggregator.run(&ctx(false)).await;

        assert!(snapshot.tenders.is_empty());
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.last_update, "2026-10-18 09:30");
        assert_eq!(snapshot.note.as_deref(), Some(EMPTY_NOTE));
    }

    #[tokio::test]
    async fn test_sort_order_by_mode() {
        let aggregator = Aggregator::new(vec![
            canned(Source::Portal, portal),
            canned(Source::Municipal, municipal),
        ]);

        let default_run = aggregator.run(&ctx(false)).await;
        assert_eq!(numbers(&default_run.tenders), ["101", "TLV-7", "100"]);

        let historical_run = aggregator.run(&ctx(true)).await;
        assert_eq!(numbers(&historical_run.tenders), ["100", "TLV-7", "101"]);
        assert_eq!(historical_run.note.as_deref(), Some("סריקה היסטורית: נמצאו 3 מכרזים"));
    }

    #[test]
    fn test_sort_is_stable_for_equal_deadlines() {
        let mut tenders = vec![
            tender("b", Source::Portal, "2026-11-01"),
            tender("a", Source::Portal, "2026-11-01"),
            tender("c", Source::Portal, "2026-10-01"),
        ];
        sort_by_deadline(&mut tenders, false);
        assert_eq!(numbers(&tenders), ["c", "b", "a"]);
        sort_by_deadline(&mut tenders, true);
        assert_eq!(numbers(&tenders), ["b", "a", "c"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge([portal().unwrap(), municipal().unwrap()]);
        let twice = merge([once.clone()]);
        assert_eq!(once, twice);
        assert_eq!(numbers(&once), ["100", "101", "TLV-7"]);
    }

    #[test]
    fn test_summary_note() {
        assert_eq!(summary_note(0, false).as_deref(), Some(EMPTY_NOTE));
        assert_eq!(summary_note(0, true).as_deref(), Some(EMPTY_HISTORICAL_NOTE));
        assert_eq!(summary_note(5, false), None);
        assert!(summary_note(5, true).unwrap().contains('5'));
    }
}

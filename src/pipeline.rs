//! Wiring: configuration in, snapshot out.

use crate::aggregate::Aggregator;
use crate::config::PipelineConfig;
use crate::models::{Snapshot, Source};
use crate::scrapers::company::{Company, CompanyScraper};
use crate::scrapers::gov_api::GovApiScraper;
use crate::scrapers::municipal::{Municipal, MunicipalScraper};
use crate::scrapers::portal::PortalScraper;
use crate::scrapers::{RunContext, Rules, TenderSource};
use std::error::Error;
use std::sync::Arc;
use tracing::{info, instrument};

/// Build the adapters to run, in [`Source::ALL`] order.
///
/// An empty `only` selects every source.
pub fn build_sources(
    config: &PipelineConfig,
    rules: Arc<Rules>,
    only: &[Source],
) -> Result<Vec<Box<dyn TenderSource>>, Box<dyn Error>> {
    let selected = Source::ALL
        .into_iter()
        .filter(|s| only.is_empty() || only.contains(s));

    let mut sources: Vec<Box<dyn TenderSource>> = Vec::new();
    for source in selected {
        let rules = Arc::clone(&rules);
        let adapter: Box<dyn TenderSource> = match source {
            Source::Portal => {
                Box::new(PortalScraper::new(config.portal.clone(), &config.http, rules)?)
            }
            Source::GovApi => {
                Box::new(GovApiScraper::new(config.gov_api.clone(), &config.http, rules)?)
            }
            Source::Municipal => Box::new(MunicipalScraper::new(
                Municipal::default(),
                &config.municipalities,
                &config.http,
                rules,
            )?),
            Source::GovCompany => Box::new(CompanyScraper::new(
                Company::default(),
                &config.companies,
                &config.http,
                rules,
            )?),
        };
        sources.push(adapter);
    }
    Ok(sources)
}

/// Run every selected source once and return the merged snapshot.
///
/// Source failures are contained inside the run; only configuration and
/// client construction errors are returned.
#[instrument(level = "info", skip(config))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    historical: bool,
    only: &[Source],
) -> Result<Snapshot, Box<dyn Error>> {
    let rules = Arc::new(Rules::from_config(config)?);
    let aggregator = Aggregator::new(build_sources(config, rules, only)?);
    info!(sources = ?aggregator.sources(), "Starting tender scan");

    let ctx = RunContext::new(historical);
    Ok(aggregator.run(&ctx).await)
}

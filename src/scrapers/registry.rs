//! Adapters driven by a static registry of sites.
//!
//! Municipalities and government companies publish their tenders on their
//! own websites, one listing page per organization. A [`RegistryScraper`]
//! visits every [`SourceDescriptor`] in turn; what differs between the two
//! source kinds (page layout, how numbers are found) is captured by a
//! [`RegistryProfile`].

use super::{
    Fragment, ListingLayout, PageHarvest, Rejection, RunContext, Rules, TenderSource, harvest_page,
};
use crate::config::{HttpConfig, SourceDescriptor};
use crate::error::ScrapeError;
use crate::http::{Fetch, HttpFetcher};
use crate::models::{Source, Tender, dedup_by_number};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

/// Source-specific part of a registry adapter.
pub trait RegistryProfile: Send + Sync {
    fn source(&self) -> Source;

    fn layout(&self) -> &ListingLayout;

    /// Build a tender from a relevant listing on `descriptor`'s page.
    fn listing(
        &self,
        fragment: Fragment<'_, '_>,
        descriptor: &SourceDescriptor,
        page: &Url,
        rules: &Rules,
        ctx: &RunContext,
    ) -> Result<Tender, Rejection>;
}

/// Scrapes one listing page per registry entry, each with its own session.
pub struct RegistryScraper<P, F = HttpFetcher> {
    profile: P,
    targets: Vec<(SourceDescriptor, F)>,
    rules: Arc<Rules>,
}

impl<P: RegistryProfile> RegistryScraper<P, HttpFetcher> {
    pub fn new(
        profile: P,
        descriptors: &[SourceDescriptor],
        http: &HttpConfig,
        rules: Arc<Rules>,
    ) -> Result<Self, ScrapeError> {
        let targets = descriptors
            .iter()
            .map(|d| Ok((d.clone(), HttpFetcher::new(http, d.insecure_tls)?)))
            .collect::<Result<Vec<_>, ScrapeError>>()?;
        Ok(Self::with_fetchers(profile, targets, rules))
    }
}

impl<P: RegistryProfile, F: Fetch> RegistryScraper<P, F> {
    pub fn with_fetchers(
        profile: P,
        targets: Vec<(SourceDescriptor, F)>,
        rules: Arc<Rules>,
    ) -> Self {
        Self {
            profile,
            targets,
            rules,
        }
    }

    #[instrument(level = "info", skip_all, fields(site = %descriptor.id))]
    async fn scrape_site(
        &self,
        descriptor: &SourceDescriptor,
        fetcher: &F,
        ctx: &RunContext,
    ) -> Result<Vec<Tender>, ScrapeError> {
        let page = Url::parse(&descriptor.url)?;
        let response = fetcher.fetch(&descriptor.url, &[]).await?.error_for_status()?;
        let layout = self.profile.layout();
        let PageHarvest { fragments, tenders } =
            harvest_page(&response.body, layout, &self.rules, |f| {
                self.profile.listing(f, descriptor, &page, &self.rules, ctx)
            });
        info!(
            name = %descriptor.name,
            fragments,
            count = tenders.len(),
            "Parsed listing page"
        );
        Ok(tenders)
    }
}

#[async_trait]
impl<P: RegistryProfile, F: Fetch> TenderSource for RegistryScraper<P, F> {
    fn source(&self) -> Source {
        self.profile.source()
    }

    #[instrument(level = "info", skip_all, fields(source = %self.profile.source()))]
    async fn scrape(&self, ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError> {
        let mut found = Vec::new();
        for (descriptor, fetcher) in &self.targets {
            info!(name = %descriptor.name, url = %descriptor.url, "Scraping site");
            match self.scrape_site(descriptor, fetcher, ctx).await {
                Ok(tenders) => found.extend(tenders),
                Err(e) => warn!(name = %descriptor.name, error = %e, "Failed to scrape site"),
            }
        }

        let tenders = dedup_by_number(found);
        info!(count = tenders.len(), sites = self.targets.len(), "Found tenders");
        Ok(tenders)
    }
}

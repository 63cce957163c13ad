//! National procurement portal scraper (mr.gov.il).
//!
//! The portal exposes a keyword search. Each configured query is paged
//! through until a page comes back without any listings, the page budget
//! for the run mode is exhausted, or a request fails.
//!
//! Search results mix genuine tenders with exemption notices (contracts
//! awarded without a tender). A listing whose text carries an exemption
//! marker is dropped unless it also carries an explicit tender marker.

use super::{
    Fragment, ListingLayout, PageHarvest, Rejection, RunContext, Rules, TenderSource, harvest_page,
};
use crate::config::{HttpConfig, PortalConfig};
use crate::dates::find_date;
use crate::error::ScrapeError;
use crate::extract::{contains_marker, extract_url_id, resolve_url};
use crate::http::{Fetch, HttpFetcher};
use crate::markup::{LocatorChain, first_link};
use crate::models::{Source, Tender, dedup_by_number};
use crate::utils::truncate_chars;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const DESCRIPTION_CHARS: usize = 300;

static DEADLINE: Lazy<LocatorChain> = Lazy::new(|| LocatorChain::css(&[".deadline", ".end-date"]));
static PUBLISHER: Lazy<LocatorChain> =
    Lazy::new(|| LocatorChain::css(&[".publisher", ".ministry"]));
static DESCRIPTION: Lazy<LocatorChain> = Lazy::new(|| LocatorChain::css(&[".description", "p"]));

/// Scraper for the mr.gov.il search pages.
pub struct PortalScraper<F = HttpFetcher> {
    fetcher: F,
    config: PortalConfig,
    rules: Arc<Rules>,
    layout: ListingLayout,
}

impl PortalScraper<HttpFetcher> {
    pub fn new(
        config: PortalConfig,
        http: &HttpConfig,
        rules: Arc<Rules>,
    ) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::new(http, config.insecure_tls)?;
        Ok(Self::with_fetcher(fetcher, config, rules))
    }
}

impl<F: Fetch> PortalScraper<F> {
    pub fn with_fetcher(fetcher: F, config: PortalConfig, rules: Arc<Rules>) -> Self {
        Self {
            fetcher,
            config,
            rules,
            layout: ListingLayout {
                fragments: LocatorChain::css(&[
                    "div.product-item",
                    "div.tender-item",
                    "li.search-result",
                    "article",
                ]),
                title: LocatorChain::css(&["h2", "h3", ".title", "a"]),
            },
        }
    }

    fn page_budget(&self, ctx: &RunContext) -> u32 {
        if ctx.historical {
            self.config.historical_pages
        } else {
            self.config.pages
        }
    }

    fn query_params(&self, query: &str, page: u32, ctx: &RunContext) -> Vec<(String, String)> {
        let mut params = vec![
            (self.config.query_param.clone(), query.to_string()),
            (self.config.page_param.clone(), page.to_string()),
        ];
        params.extend(self.config.extra_params.clone());
        if ctx.historical {
            params.extend(self.config.historical_params.clone());
        }
        params
    }

    #[instrument(level = "info", skip(self, ctx))]
    async fn scrape_page(
        &self,
        query: &str,
        page: u32,
        ctx: &RunContext,
    ) -> Result<PageHarvest, ScrapeError> {
        let params = self.query_params(query, page, ctx);
        let response = self
            .fetcher
            .fetch(&self.config.search_url, &params)
            .await?
            .error_for_status()?;
        let page_url =
            Url::parse(&response.url).or_else(|_| Url::parse(&self.config.search_url))?;

        let harvest = harvest_page(&response.body, &self.layout, &self.rules, |f| {
            self.listing(f, &page_url, ctx)
        });
        debug!(
            fragments = harvest.fragments,
            count = harvest.tenders.len(),
            "Parsed search page"
        );
        Ok(harvest)
    }

    fn listing(
        &self,
        fragment: Fragment<'_, '_>,
        page: &Url,
        ctx: &RunContext,
    ) -> Result<Tender, Rejection> {
        if contains_marker(fragment.text, &self.config.exemption_markers)
            && !contains_marker(fragment.text, &self.config.tender_markers)
        {
            debug!(title = fragment.title, "Exemption notice");
            return Err(Rejection::Exemption);
        }

        let link = first_link(fragment.element);
        let url = resolve_url(page, link);
        let fields = &self.rules.fields;

        let tender_number = fragment
            .element
            .value()
            .attr("data-code")
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .or_else(|| link.and(extract_url_id(&url)))
            .or_else(|| fields.tender_number(&fragment.body_text()))
            .unwrap_or_else(|| ctx.ids.next(&self.config.id_prefix));

        let deadline = fields
            .deadline(fragment.text)
            .or_else(|| DEADLINE.first_text(fragment.element).and_then(|d| find_date(&d)))
            .or_else(|| find_date(fragment.text))
            .unwrap_or_else(|| ctx.today_iso());

        let publisher = PUBLISHER
            .first_text(fragment.element)
            .or_else(|| fields.publisher(fragment.text))
            .unwrap_or_else(|| self.config.default_publisher.clone());

        let description = DESCRIPTION
            .first_text(fragment.element)
            .map(|d| truncate_chars(&d, DESCRIPTION_CHARS).to_string())
            .unwrap_or_default();

        Ok(Tender {
            tender_number,
            title: fragment.title.to_string(),
            publisher,
            deadline,
            categories: self.rules.classifier.categories_for(fragment.title, fragment.text),
            source: Source::Portal,
            url,
            description,
            doc_type: self.rules.doc_types.doc_type(fragment.text),
        })
    }
}

#[async_trait]
impl<F: Fetch> TenderSource for PortalScraper<F> {
    fn source(&self) -> Source {
        Source::Portal
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(source = "mr.gov.il", historical = ctx.historical)
    )]
    async fn scrape(&self, ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError> {
        let budget = self.page_budget(ctx);
        let mut found = Vec::new();

        for query in &self.config.queries {
            for page in 0..budget {
                match self.scrape_page(query, page, ctx).await {
                    Ok(harvest) if harvest.fragments == 0 => {
                        debug!(%query, page, "No listings on page; next query");
                        break;
                    }
                    Ok(harvest) => found.extend(harvest.tenders),
                    Err(e) => {
                        warn!(%query, page, error = %e, "Failed to fetch search page");
                        break;
                    }
                }
            }
        }

        let tenders = dedup_by_number(found);
        info!(count = tenders.len(), "Found tenders from mr.gov.il");
        Ok(tenders)
    }
}

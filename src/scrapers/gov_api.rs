//! gov.il tenders: JSON API with an HTML listing fallback.
//!
//! The API is queried once with a page-size limit. When it is unreachable,
//! answers with a non-2xx status or returns a body that is not the
//! expected JSON envelope, the public HTML listing is scraped instead.

use super::{
    Fragment, ListingLayout, Rejection, RunContext, Rules, TenderSource, harvest_page,
};
use crate::config::{GovApiConfig, HttpConfig};
use crate::dates::{find_date, parse_date};
use crate::error::ScrapeError;
use crate::extract::resolve_url;
use crate::http::{Fetch, HttpFetcher};
use crate::markup::{LocatorChain, collapse_whitespace, first_link};
use crate::models::{Source, Tender, dedup_by_number};
use crate::utils::{truncate_chars, truncate_for_log};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const DESCRIPTION_CHARS: usize = 300;

/// Top-level API envelope. Listings come under `results` or `items`.
#[derive(Debug, Default, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl ApiEnvelope {
    fn listings(self) -> Vec<serde_json::Value> {
        if self.results.is_empty() {
            self.items
        } else {
            self.results
        }
    }
}

/// Tender ids arrive as strings or bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiId {
    Text(String),
    Number(serde_json::Number),
}

impl ApiId {
    fn into_string(self) -> String {
        match self {
            ApiId::Text(s) => s.trim().to_string(),
            ApiId::Number(n) => n.to_string(),
        }
    }
}

/// One API listing. The API has used both PascalCase and lowercase keys.
#[derive(Debug, Deserialize)]
struct ApiListing {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "title")]
    title_lower: Option<String>,
    #[serde(rename = "TenderId")]
    tender_id: Option<ApiId>,
    #[serde(rename = "id")]
    id: Option<ApiId>,
    #[serde(rename = "OfficeName")]
    office_name: Option<String>,
    #[serde(rename = "office")]
    office: Option<String>,
    #[serde(rename = "EndDate")]
    end_date: Option<String>,
    #[serde(rename = "Url")]
    url: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

/// Scraper for the gov.il tenders API.
pub struct GovApiScraper<F = HttpFetcher> {
    fetcher: F,
    config: GovApiConfig,
    rules: Arc<Rules>,
    layout: ListingLayout,
}

impl GovApiScraper<HttpFetcher> {
    pub fn new(
        config: GovApiConfig,
        http: &HttpConfig,
        rules: Arc<Rules>,
    ) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::new(http, config.insecure_tls)?;
        Ok(Self::with_fetcher(fetcher, config, rules))
    }
}

impl<F: Fetch> GovApiScraper<F> {
    pub fn with_fetcher(fetcher: F, config: GovApiConfig, rules: Arc<Rules>) -> Self {
        Self {
            fetcher,
            config,
            rules,
            layout: ListingLayout {
                fragments: LocatorChain::css(&["div.tender-item", "article"]),
                title: LocatorChain::css(&["h2", "h3"]),
            },
        }
    }

    fn api_params(&self) -> Vec<(String, String)> {
        vec![
            ("skip".to_string(), "0".to_string()),
            ("limit".to_string(), self.config.page_size.to_string()),
            ("OfficeId".to_string(), String::new()),
            ("Type".to_string(), "all".to_string()),
        ]
    }

    #[instrument(level = "info", skip_all)]
    async fn scrape_api(&self, ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError> {
        let response = self
            .fetcher
            .fetch(&self.config.api_url, &self.api_params())
            .await?
            .error_for_status()?;
        let envelope: ApiEnvelope = response.json().inspect_err(|e| {
            debug!(
                error = %e,
                body = %truncate_for_log(&response.body, 200),
                "API body is not a listing envelope"
            );
        })?;
        let base = Url::parse(&self.config.base_url)?;
        let listings = envelope.listings();
        debug!(count = listings.len(), "API listings received");

        let mut tenders = Vec::new();
        for value in listings {
            let item = match serde_json::from_value::<ApiListing>(value) {
                Ok(item) => item,
                Err(e) => {
                    debug!(error = %e, "Skipped undecodable API listing");
                    continue;
                }
            };
            if let Some(tender) = self.api_listing(item, &base, ctx) {
                tenders.push(tender);
            }
        }
        Ok(tenders)
    }

    fn api_listing(&self, item: ApiListing, base: &Url, ctx: &RunContext) -> Option<Tender> {
        let title = non_empty(item.title).or_else(|| non_empty(item.title_lower))?;
        let description = non_empty(item.description)
            .map(|d| truncate_chars(&d, DESCRIPTION_CHARS).to_string())
            .unwrap_or_default();
        if !self.rules.classifier.is_relevant(&title, &description) {
            debug!(%title, "Listing not relevant");
            return None;
        }

        let raw_id = item
            .tender_id
            .map(ApiId::into_string)
            .filter(|id| !id.is_empty())
            .or_else(|| item.id.map(ApiId::into_string).filter(|id| !id.is_empty()));

        let url = match (non_empty(item.url), &raw_id) {
            (Some(link), _) => resolve_url(base, Some(&link)),
            (None, Some(id)) => resolve_url(base, Some(&format!("/he/departments/tenders/{id}"))),
            (None, None) => self.config.html_url.clone(),
        };

        Some(Tender {
            tender_number: raw_id.unwrap_or_else(|| ctx.ids.next(&self.config.id_prefix)),
            publisher: non_empty(item.office_name)
                .or_else(|| non_empty(item.office))
                .unwrap_or_else(|| self.config.default_publisher.clone()),
            deadline: item
                .end_date
                .as_deref()
                .and_then(parse_date)
                .unwrap_or_else(|| ctx.today_iso()),
            categories: self.rules.classifier.categories_for(&title, &description),
            source: Source::GovApi,
            url,
            doc_type: self.rules.doc_types.doc_type(&format!("{title} {description}")),
            description,
            title,
        })
    }

    #[instrument(level = "info", skip_all)]
    async fn scrape_html(&self, ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError> {
        let response = self.fetcher.fetch(&self.config.html_url, &[]).await?;
        if !response.is_success() {
            warn!(status = response.status, url = %response.url, "HTML listing unavailable");
            return Ok(Vec::new());
        }
        let page_url =
            Url::parse(&response.url).or_else(|_| Url::parse(&self.config.html_url))?;

        let harvest = harvest_page(&response.body, &self.layout, &self.rules, |f| {
            self.html_listing(f, &page_url, ctx)
        });
        debug!(
            fragments = harvest.fragments,
            count = harvest.tenders.len(),
            "Parsed HTML listing"
        );
        Ok(harvest.tenders)
    }

    fn html_listing(
        &self,
        fragment: Fragment<'_, '_>,
        page: &Url,
        ctx: &RunContext,
    ) -> Result<Tender, Rejection> {
        let fields = &self.rules.fields;
        Ok(Tender {
            tender_number: fields
                .tender_number(&fragment.body_text())
                .unwrap_or_else(|| ctx.ids.next(&self.config.id_prefix)),
            title: fragment.title.to_string(),
            publisher: fields
                .publisher(fragment.text)
                .unwrap_or_else(|| self.config.default_publisher.clone()),
            deadline: fields
                .deadline(fragment.text)
                .or_else(|| find_date(fragment.text))
                .unwrap_or_else(|| ctx.today_iso()),
            categories: self.rules.classifier.categories_for(fragment.title, fragment.text),
            source: Source::GovApi,
            url: resolve_url(page, first_link(fragment.element)),
            description: String::new(),
            doc_type: self.rules.doc_types.doc_type(fragment.text),
        })
    }
}

#[async_trait]
impl<F: Fetch> TenderSource for GovApiScraper<F> {
    fn source(&self) -> Source {
        Source::GovApi
    }

    #[instrument(level = "info", skip_all, fields(source = "tender.gov.il"))]
    async fn scrape(&self, ctx: &RunContext) -> Result<Vec<Tender>, ScrapeError> {
        let found = match self.scrape_api(ctx).await {
            Ok(tenders) => tenders,
            Err(e) => {
                info!(error = %e, "API unavailable, trying HTML listing");
                self.scrape_html(ctx).await?
            }
        };

        let tenders = dedup_by_number(found);
        info!(count = tenders.len(), "Found tenders from tender.gov.il");
        Ok(tenders)
    }
}

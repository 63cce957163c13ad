//! Government-owned companies (electricity, water, rail, airports, post).
//!
//! Company sites publish richer listings than municipalities: tender
//! numbers usually follow a "מספר מכרז" label and listings mix tenders with
//! RFIs and calls for proposals, so the document type is recorded too.

use super::registry::{RegistryProfile, RegistryScraper};
use super::{Fragment, ListingLayout, Rejection, RunContext, Rules};
use crate::config::SourceDescriptor;
use crate::dates::find_date;
use crate::extract::{first_number, resolve_url};
use crate::http::HttpFetcher;
use crate::markup::{Locator, LocatorChain, element_text, first_link};
use crate::models::{Source, Tender};
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use url::Url;

pub type CompanyScraper<F = HttpFetcher> = RegistryScraper<Company, F>;

const DESCRIPTION_CHARS: usize = 300;

static NUMBER: Lazy<LocatorChain> = Lazy::new(|| {
    LocatorChain::new(vec![Locator::class_pattern(
        &[],
        r"(?i)number|num\b|(?:^|[\s_-])id(?:$|[\s_-])",
    )])
});

static DESCRIPTION: Lazy<LocatorChain> =
    Lazy::new(|| LocatorChain::css(&[".description", ".summary", "p"]));

/// Markup profile for government-company tender pages.
pub struct Company {
    layout: ListingLayout,
}

impl Default for Company {
    fn default() -> Self {
        Self {
            layout: ListingLayout {
                fragments: LocatorChain::css(&[
                    "div.tender-item",
                    "div.tender",
                    "tr.tender-row",
                    "li.tender",
                    "article",
                    "table tbody tr",
                ]),
                title: LocatorChain::new(vec![
                    Locator::class_pattern(
                        &["h2", "h3", "h4", "a", "span", "td", "div"],
                        r"title|name|subject",
                    ),
                    Locator::css("h2"),
                    Locator::css("h3"),
                    Locator::css("h4"),
                    Locator::css("a"),
                ]),
            },
        }
    }
}

impl RegistryProfile for Company {
    fn source(&self) -> Source {
        Source::GovCompany
    }

    fn layout(&self) -> &ListingLayout {
        &self.layout
    }

    fn listing(
        &self,
        fragment: Fragment<'_, '_>,
        descriptor: &SourceDescriptor,
        page: &Url,
        rules: &Rules,
        ctx: &RunContext,
    ) -> Result<Tender, Rejection> {
        let tender_number = rules
            .fields
            .tender_number(&fragment.body_text())
            .or_else(|| {
                NUMBER.find_map(fragment.element, |el| {
                    let text = element_text(el);
                    if text.contains(fragment.title) {
                        None
                    } else {
                        first_number(&text)
                    }
                })
            })
            .map(|n| format!("{}-{n}", descriptor.prefix))
            .unwrap_or_else(|| ctx.ids.next(&descriptor.prefix));

        let deadline = rules
            .fields
            .deadline(fragment.text)
            .or_else(|| find_date(fragment.text))
            .unwrap_or_else(|| ctx.today_iso());

        let description = DESCRIPTION
            .first_text(fragment.element)
            .filter(|d| d != fragment.title)
            .map(|d| truncate_chars(&d, DESCRIPTION_CHARS).to_string())
            .unwrap_or_default();

        Ok(Tender {
            tender_number,
            title: fragment.title.to_string(),
            publisher: descriptor.name.clone(),
            deadline,
            categories: rules.classifier.categories_for(fragment.title, fragment.text),
            source: Source::GovCompany,
            url: resolve_url(page, first_link(fragment.element)),
            description,
            doc_type: rules.doc_types.doc_type(fragment.text),
        })
    }
}

//! Municipal tender pages.
//!
//! City websites are mostly SharePoint or CMS listings with no common
//! markup, so both the listing rows and the titles are located through
//! fallback chains. Tender numbers are printed next to a "מספר"/"מכרז"
//! label and are prefixed with the city code (`TLV-12/2026`). Titles often
//! carry a year ("לשנת 2027"), so the title never supplies the number.

use super::registry::{RegistryProfile, RegistryScraper};
use super::{Fragment, ListingLayout, Rejection, RunContext, Rules};
use crate::config::SourceDescriptor;
use crate::dates::find_date;
use crate::extract::{first_number, resolve_url};
use crate::http::HttpFetcher;
use crate::markup::{Locator, LocatorChain, element_text, first_link};
use crate::models::{DEFAULT_DOC_TYPE, Source, Tender};
use once_cell::sync::Lazy;
use url::Url;

pub type MunicipalScraper<F = HttpFetcher> = RegistryScraper<Municipal, F>;

static NUMBER: Lazy<LocatorChain> = Lazy::new(|| {
    LocatorChain::new(vec![
        Locator::text(r"מספר|מכרז|#"),
        Locator::class_pattern(&[], r"(?i)number|num\b|(?:^|[\s_-])id(?:$|[\s_-])"),
    ])
});

/// Markup profile for municipal listing pages.
pub struct Municipal {
    layout: ListingLayout,
}

impl Default for Municipal {
    fn default() -> Self {
        Self {
            layout: ListingLayout {
                fragments: LocatorChain::css(&[
                    "div.tender-row",
                    "tr.tender",
                    "article.tender",
                    "li.tender-item",
                    "div.ms-listviewtable",
                ]),
                title: LocatorChain::new(vec![
                    Locator::class_pattern(
                        &["h2", "h3", "h4", "a", "span"],
                        r"title|name|subject",
                    ),
                    Locator::css("td.title"),
                    Locator::css("a"),
                    Locator::css("span"),
                ]),
            },
        }
    }
}

impl RegistryProfile for Municipal {
    fn source(&self) -> Source {
        Source::Municipal
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

        Ok(Tender {
            tender_number,
            title: fragment.title.to_string(),
            publisher: descriptor.name.clone(),
            deadline,
            categories: rules.classifier.categories_for(fragment.title, fragment.text),
            source: Source::Municipal,
            url: resolve_url(page, first_link(fragment.element)),
            description: String::new(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::StubFetcher;
    use crate::scrapers::TenderSource;
    use crate::scrapers::fixtures::{ctx, rules};
    use std::sync::Arc;

    const TLV_URL: &str = "https://www.tel-aviv.gov.il/Tenders/Pages/TendersList.aspx";
    const HAIFA_URL: &str = "https://www.haifa.muni.il/tenders";

    const TLV_PAGE: &str = r#"
        <table>
          <tr class="tender">
            <td class="title">מכרז לשירותי דוברות ויחסי ציבור לעירייה</td>
            <td>מכרז מס' 45/2026</td>
            <td>מועד אחרון להגשה: 02/12/2026</td>
            <td><a href="TenderDetails.aspx?id=45">לפרטים</a></td>
          </tr>
          <tr class="tender">
            <td class="title">אספקת ריהוט לבתי ספר</td>
            <td>מכרז מס' 46/2026</td>
          </tr>
          <tr class="tender">
            <td class="title">קמפיין פרסום לחגים</td>
            <td>ללא פרטים נוספים</td>
          </tr>
        </table>"#;

    const HAIFA_PAGE: &str = r#"
        <div class="tender-row">
          <h3 class="tender-title">ליווי תקשורתי ורשתות חברתיות</h3>
          <span class="tender-number">2026-118</span>
          <span>תאריך אחרון 9.1.27</span>
          <a href="/tenders/118">פרטים</a>
        </div>"#;

    fn descriptor(id: &str, name: &str, url: &str, prefix: &str) -> SourceDescriptor {
        SourceDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            prefix: prefix.to_string(),
            insecure_tls: false,
        }
    }

    fn scraper(stub: StubFetcher) -> MunicipalScraper<Arc<StubFetcher>> {
        let stub = Arc::new(stub);
        MunicipalScraper::with_fetchers(
            Municipal::default(),
            vec![
                (descriptor("tel-aviv", "עיריית תל אביב-יפו", TLV_URL, "TLV"), stub.clone()),
                (descriptor("haifa", "עיריית חיפה", HAIFA_URL, "HFA"), stub),
            ],
            rules(),
        )
    }

    #[tokio::test]
    async fn test_scrapes_every_registry_site() {
        let stub = StubFetcher::new().page(TLV_URL, TLV_PAGE).page(HAIFA_URL, HAIFA_PAGE);
        let tenders = scraper(stub).scrape(&ctx(false)).await.unwrap();

        assert_eq!(tenders.len(), 3);

        let first = &tenders[0];
        assert_eq!(first.tender_number, "TLV-45/2026");
        assert_eq!(first.publisher, "עיריית תל אביב-יפו");
        assert_eq!(first.deadline, "2026-12-02");
        assert_eq!(
            first.url,
            "https://www.tel-aviv.gov.il/Tenders/Pages/TenderDetails.aspx?id=45"
        );
        assert_eq!(first.source, Source::Municipal);
        assert_eq!(
            first.categories,
            vec!["דוברות".to_string(), "יחסי ציבור".to_string()]
        );

        let campaign = &tenders[1];
        assert!(campaign.tender_number.starts_with("TLV-20261018093000-"));
        assert_eq!(campaign.deadline, "2026-10-18");
        assert_eq!(campaign.url, TLV_URL);

        let haifa = &tenders[2];
        assert_eq!(haifa.tender_number, "HFA-2026-118");
        assert_eq!(haifa.deadline, "2027-01-09");
        assert_eq!(haifa.url, "https://www.haifa.muni.il/tenders/118");
        assert_eq!(haifa.publisher, "עיריית חיפה");
    }

    #[tokio::test]
    async fn test_failed_site_does_not_stop_the_others() {
        let stub = StubFetcher::new().status(TLV_URL, 503).page(HAIFA_URL, HAIFA_PAGE);
        let tenders = scraper(stub).scrape(&ctx(false)).await.unwrap();
        assert_eq!(tenders.len(), 1);
        assert_eq!(tenders[0].publisher, "עיריית חיפה");

        let stub = StubFetcher::new().fail(TLV_URL).page(HAIFA_URL, HAIFA_PAGE);
        let tenders = scraper(stub).scrape(&ctx(false)).await.unwrap();
        assert_eq!(tenders.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_numbers_within_adapter_are_dropped() {
        let page = format!("{TLV_PAGE}{TLV_PAGE}");
        let stub = StubFetcher::new().page(TLV_URL, &page);
        let tenders = scraper(stub).scrape(&ctx(false)).await.unwrap();

        let numbered: Vec<_> = tenders
            .iter()
            .filter(|t| t.tender_number == "TLV-45/2026")
            .collect();
        assert_eq!(numbered.len(), 1);
    }

    #[tokio::test]
    async fn test_year_in_title_is_not_the_tender_number() {
        let page = r#"
            <table>
              <tr class="tender">
                <td class="title">מכרז לשירותי דוברות לשנת 2027</td>
                <td>מכרז מס' 45/2026</td>
              </tr>
              <tr class="tender">
                <td class="title">ליווי תקשורתי לשנת 2027</td>
                <td>מכרז מס' 46/2026</td>
              </tr>
              <tr class="tender">
                <td class="title">מכרז 2027 לייעוץ תקשורתי</td>
                <td>מספר 47/2026</td>
              </tr>
              <tr class="tender">
                <td class="title">קמפיין הסברה 2027</td>
                <td>ללא פרטים</td>
              </tr>
            </table>"#;
        let stub = StubFetcher::new().page(TLV_URL, page).status(HAIFA_URL, 404);
        let tenders = scraper(stub).scrape(&ctx(false)).await.unwrap();

        let numbers: Vec<_> = tenders.iter().map(|t| t.tender_number.as_str()).collect();
        assert_eq!(numbers.len(), 4);
        assert_eq!(&numbers[..3], ["TLV-45/2026", "TLV-46/2026", "TLV-47/2026"]);
        assert!(numbers[3].starts_with("TLV-20261018093000-"));
    }
}

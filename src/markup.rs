//! Element lookup on parsed pages, built on `scraper`.
//!
//! Tender sites change their markup often and differ from one another, so
//! adapters never rely on a single selector. A [`LocatorChain`] holds an
//! ordered list of [`Locator`]s; the first locator that matches anything
//! wins and the rest are not consulted.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// One way of finding elements below a root element.
#[derive(Debug, Clone)]
pub enum Locator {
    /// A CSS selector; covers tag names (`h2`) and class names (`.title`).
    Css(Selector),
    /// Elements whose own text nodes match the pattern.
    TextPattern(Regex),
    /// Elements whose `class` attribute matches the pattern, optionally
    /// restricted to a set of tag names.
    ClassPattern { tags: Vec<&'static str>, pattern: Regex },
}

impl Locator {
    /// A CSS locator from a literal selector.
    ///
    /// # Panics
    ///
    /// Panics on an invalid selector; only call with literals.
    pub fn css(selector: &str) -> Self {
        let selector = Selector::parse(selector)
            .unwrap_or_else(|e| panic!("invalid selector {selector:?}: {e}"));
        Locator::Css(selector)
    }

    /// A locator for elements whose own text matches `pattern`.
    pub fn text(pattern: &str) -> Self {
        Locator::TextPattern(literal_regex(pattern))
    }

    /// A locator for elements whose class matches `pattern`; empty `tags` means any tag.
    pub fn class_pattern(tags: &[&'static str], pattern: &str) -> Self {
        Locator::ClassPattern {
            tags: tags.to_vec(),
            pattern: literal_regex(pattern),
        }
    }

    /// All matches below `root` (the root itself is never included), in document order.
    pub fn find_all<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self {
            Locator::Css(selector) => root
                .select(selector)
                .filter(|el| el.id() != root.id())
                .collect(),
            Locator::TextPattern(pattern) => descendants(root)
                .filter(|el| {
                    el.children()
                        .filter_map(|child| child.value().as_text())
                        .any(|text| pattern.is_match(text))
                })
                .collect(),
            Locator::ClassPattern { tags, pattern } => descendants(root)
                .filter(|el| tags.is_empty() || tags.iter().any(|tag| *tag == el.value().name()))
                .filter(|el| el.value().attr("class").is_some_and(|class| pattern.is_match(class)))
                .collect(),
        }
    }
}

fn descendants<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// An ordered fallback list of locators.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    locators: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(locators: Vec<Locator>) -> Self {
        Self { locators }
    }

    /// Chain of CSS locators from literal selectors.
    pub fn css(selectors: &[&str]) -> Self {
        Self::new(selectors.iter().map(|s| Locator::css(s)).collect())
    }

    /// Matches of the first locator that yields anything.
    pub fn find_all<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.locators
            .iter()
            .map(|locator| locator.find_all(root))
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    /// [`find_all`](Self::find_all) over a whole document.
    pub fn find_in_document<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.find_all(document.root_element())
    }

    /// Text of the first element with non-empty text, trying locators in
    /// order. Elements that exist but are blank do not stop the search.
    pub fn first_text(&self, root: ElementRef<'_>) -> Option<String> {
        self.find_map(root, |el| Some(element_text(el)).filter(|text| !text.is_empty()))
    }

    /// First `Some` produced by `f`, visiting every match of every locator
    /// in chain order.
    pub fn find_map<'a, T>(
        &self,
        root: ElementRef<'a>,
        mut f: impl FnMut(ElementRef<'a>) -> Option<T>,
    ) -> Option<T> {
        self.locators
            .iter()
            .find_map(|locator| locator.find_all(root).into_iter().find_map(&mut f))
    }
}

fn literal_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern:?}: {e}"))
}

/// All text below `element`, whitespace-collapsed and trimmed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The `href` of the first link below `root`.
pub fn first_link<'a>(root: ElementRef<'a>) -> Option<&'a str> {
    root.select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
}

//! Listing extraction from search result pages.
//!
//! Each field is read with a [`TieredLookup`]: an ordered list of extractors
//! tried one after another until one yields a non-empty value. Used-item and
//! new-item prices render with different markup, so the price lookup always
//! has more than one tier.

use scraper::{ElementRef, Html, Selector};

use crate::config::{DetailLookupConfig, ListingSelectors};
use crate::error::{Result, WatchError};
use crate::models::{CandidateRecord, DropReason};

type Extractor = Box<dyn Fn(&ElementRef<'_>) -> Option<String> + Send + Sync>;

/// Ordered extractors for one field. First success wins.
#[derive(Default)]
pub struct TieredLookup {
    tiers: Vec<Extractor>,
}

impl TieredLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&ElementRef<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.tiers.push(Box::new(extractor));
        self
    }

    /// One tier per selector, each reading the text of its first match.
    pub fn text(selectors: &[String]) -> Result<Self> {
        let mut lookup = Self::new();
        for selector in compile_all(selectors)? {
            lookup = lookup.then(move |fragment: &ElementRef<'_>| first_text(fragment, &selector));
        }
        Ok(lookup)
    }

    /// One tier per selector, each reading `attr` from its first match.
    pub fn attr(selectors: &[String], attr: &'static str) -> Result<Self> {
        let mut lookup = Self::new();
        for selector in compile_all(selectors)? {
            lookup = lookup
                .then(move |fragment: &ElementRef<'_>| first_attr(fragment, &selector, attr));
        }
        Ok(lookup)
    }

    pub fn lookup(&self, fragment: &ElementRef<'_>) -> Option<String> {
        self.tiers.iter().find_map(|tier| tier(fragment))
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl std::fmt::Debug for TieredLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredLookup")
            .field("tiers", &self.tiers.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Title,
    Link,
}

impl From<MissingField> for DropReason {
    fn from(field: MissingField) -> Self {
        match field {
            MissingField::Title => DropReason::MissingTitle,
            MissingField::Link => DropReason::MissingLink,
        }
    }
}

/// What could be read from one listing fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Complete(CandidateRecord),
    /// Title and link were found but no price tier produced a value.
    PriceMissing {
        title: String,
        relative_link: String,
    },
    Incomplete(MissingField),
}

#[derive(Debug)]
pub struct ListingParser {
    container: Selector,
    id_attribute: String,
    title: TieredLookup,
    link: TieredLookup,
    price: TieredLookup,
}

impl ListingParser {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            container: compile(&selectors.container)?,
            id_attribute: selectors.id_attribute.clone(),
            title: TieredLookup::text(&selectors.title)?,
            link: TieredLookup::attr(&selectors.link, "href")?,
            price: TieredLookup::text(&selectors.price)?,
        })
    }

    /// Listing containers in document order. Containers whose identifier
    /// attribute is missing or blank are skipped.
    pub fn fragments<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        document.select(&self.container).filter(move |element| {
            element
                .value()
                .attr(&self.id_attribute)
                .is_some_and(|id| !id.trim().is_empty())
        })
    }

    pub fn extract(&self, fragment: &ElementRef<'_>) -> Extraction {
        let Some(title) = self.title.lookup(fragment) else {
            return Extraction::Incomplete(MissingField::Title);
        };
        let Some(relative_link) = self.link.lookup(fragment) else {
            return Extraction::Incomplete(MissingField::Link);
        };
        match self.price.lookup(fragment) {
            Some(raw_price_text) => Extraction::Complete(CandidateRecord {
                title,
                raw_price_text,
                relative_link,
            }),
            None => Extraction::PriceMissing {
                title,
                relative_link,
            },
        }
    }

    /// Parse `html` and extract every listing, in document order.
    pub fn parse(&self, html: &str) -> Vec<Extraction> {
        let document = Html::parse_document(html);
        self.fragments(&document)
            .map(|fragment| self.extract(&fragment))
            .collect()
    }
}

/// Reads the used-offer price from a product detail page.
#[derive(Debug)]
pub struct DetailPriceParser {
    price: TieredLookup,
}

impl DetailPriceParser {
    pub fn new(config: &DetailLookupConfig) -> Result<Self> {
        Ok(Self {
            price: TieredLookup::text(&config.price)?,
        })
    }

    pub fn price(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        self.price.lookup(&document.root_element())
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| WatchError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| compile(s)).collect()
}

fn first_text(fragment: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = fragment.select(selector).next()?;
    let text = element.text().collect::<Vec<_>>().join(" ");
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

fn first_attr(fragment: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    let value = fragment.select(selector).next()?.value().attr(attr)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

//! Brand, feature and price conditions a listing must meet.
//!
//! Title checks are literal, case-sensitive substring containment. A brand
//! token also matches inside a longer word ("LG" in "ELGATO").

use crate::config::WatchConfig;
use crate::models::NormalizedRecord;

#[derive(Debug, Clone)]
pub struct MatchPredicate {
    brands: Vec<String>,
    required_keywords: Vec<String>,
    shape_synonyms: Vec<String>,
    max_price: u64,
}

impl MatchPredicate {
    pub fn new(
        brands: Vec<String>,
        required_keywords: Vec<String>,
        shape_synonyms: Vec<String>,
        max_price: u64,
    ) -> Self {
        Self {
            brands,
            required_keywords,
            shape_synonyms,
            max_price,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            config.brands.clone(),
            config.required_keywords.clone(),
            config.shape_synonyms.clone(),
            config.max_price,
        )
    }

    pub fn max_price(&self) -> u64 {
        self.max_price
    }

    /// Brand, keyword and shape conditions only.
    pub fn title_qualifies(&self, title: &str) -> bool {
        contains_any(title, &self.brands)
            && self
                .required_keywords
                .iter()
                .all(|keyword| title.contains(keyword.as_str()))
            && contains_any(title, &self.shape_synonyms)
    }

    pub fn within_budget(&self, price: u64) -> bool {
        price <= self.max_price
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        self.title_qualifies(&record.title) && self.within_budget(record.price)
    }
}

fn contains_any(title: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|token| !token.is_empty() && title.contains(token.as_str()))
}

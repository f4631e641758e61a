//! Watch configuration.
//!
//! Everything the pipeline needs is carried in one immutable [`WatchConfig`]
//! passed to [`crate::pipeline::Pipeline::new`]. Values are layered with the
//! `config` crate: built-in defaults, an optional file, `OLED_WATCH_*`
//! environment variables, then the `EMAIL_USER` / `EMAIL_PASS` / `EMAIL_TO`
//! variables the deployment secrets already use.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

pub const ENV_PREFIX: &str = "OLED_WATCH";

/// Keys whose environment values are comma-separated lists.
const ENV_LIST_KEYS: [&str; 8] = [
    "brands",
    "required_keywords",
    "shape_synonyms",
    "price_decorations",
    "selectors.title",
    "selectors.link",
    "selectors.price",
    "detail.price",
];

const DEFAULT_SEARCH_URL: &str = "https://www.amazon.co.jp/s?k=LG+Samsung+MSI+curved+OLED+monitor&i=electronics&rh=p_n_condition-type%3A2224375051";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Search results page checked on every run
    pub search_url: String,

    /// Marketplace origin that relative listing links are resolved against
    pub origin: String,

    /// Inclusive price ceiling, in the marketplace's currency units
    pub max_price: u64,

    /// At least one must appear in the title
    pub brands: Vec<String>,

    /// All must appear in the title
    pub required_keywords: Vec<String>,

    /// At least one must appear in the title
    pub shape_synonyms: Vec<String>,

    /// Literal substrings stripped from price text before parsing
    pub price_decorations: Vec<String>,

    pub fetch: FetchConfig,
    pub selectors: ListingSelectors,
    pub detail: DetailLookupConfig,
    pub email: EmailConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            origin: "https://www.amazon.co.jp".to_string(),
            max_price: 80_000,
            brands: strings(&["LG", "Samsung", "MSI"]),
            required_keywords: strings(&["OLED"]),
            shape_synonyms: strings(&["曲面", "Curved"]),
            price_decorations: strings(&["中古品", "新品", "より", "￥", "¥", "円", ",", "，"]),
            fetch: FetchConfig::default(),
            selectors: ListingSelectors::default(),
            detail: DetailLookupConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET with static headers
    Http,
    /// Headless Chrome driven over WebDriver
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub mode: FetchMode,
    pub timeout_ms: u64,

    /// Extra attempts for the search page after the first one fails
    pub retry_count: u32,
    pub retry_delay_ms: u64,

    pub user_agent: String,
    pub accept_language: String,

    pub webdriver_url: String,
    pub headless: bool,

    /// Time given to client-side rendering before the page source is read
    pub render_wait_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Browser,
            timeout_ms: 60_000,
            retry_count: 0,
            retry_delay_ms: 2_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "ja-JP,ja;q=0.9,en;q=0.8".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            render_wait_ms: 5_000,
        }
    }
}

/// CSS selectors for the search results page. Every field list is a tier
/// order: the first selector yielding a value wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListingSelectors {
    pub container: String,

    /// Attribute holding the per-listing identifier; containers without a
    /// non-empty value are layout blocks, not listings
    pub id_attribute: String,

    pub title: Vec<String>,
    pub link: Vec<String>,

    /// New-item price first, then the used-item renderings
    pub price: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: "div.s-main-slot div[data-asin]".to_string(),
            id_attribute: "data-asin".to_string(),
            title: strings(&["h2 a span", "h2 span"]),
            link: strings(&["h2 a", "a.a-link-normal[href]"]),
            price: strings(&[
                ".a-price .a-offscreen",
                ".a-row .a-color-secondary .a-color-base",
                ".a-color-price",
            ]),
        }
    }
}

/// Follow a listing's detail page when the search page shows no price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetailLookupConfig {
    pub enabled: bool,
    pub price: Vec<String>,
    pub request_delay_ms: u64,
}

impl Default for DetailLookupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            price: strings(&[
                "#usedBuySection .a-color-price",
                "#olpOfferListColumn .a-color-price",
            ]),
            request_delay_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
    pub subject_prefix: String,
    pub subject_label: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            username: None,
            password: None,
            recipient: None,
            subject_prefix: "[Amazon JP Alert]".to_string(),
            subject_label: "Curved OLED Monitors".to_string(),
        }
    }
}

impl WatchConfig {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(environment)
            .set_override_option("email.username", std::env::var("EMAIL_USER").ok())?
            .set_override_option("email.password", std::env::var("EMAIL_PASS").ok())?
            .set_override_option("email.recipient", std::env::var("EMAIL_TO").ok())?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("origin", &self.origin), ("search_url", &self.search_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WatchError::Config(format!(
                    "{name} must be an http(s) URL, got `{url}`"
                )));
            }
        }
        if self.brands.iter().all(|b| b.is_empty()) {
            return Err(WatchError::Config("brands must not be empty".into()));
        }
        if self.shape_synonyms.iter().all(|s| s.is_empty()) {
            return Err(WatchError::Config("shape_synonyms must not be empty".into()));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(WatchError::Config("fetch.timeout_ms must be positive".into()));
        }

        let tiers = [
            ("selectors.title", &self.selectors.title),
            ("selectors.link", &self.selectors.link),
            ("selectors.price", &self.selectors.price),
        ];
        for (name, tier) in tiers {
            if tier.is_empty() {
                return Err(WatchError::Config(format!("{name} needs at least one selector")));
            }
        }
        if self.detail.enabled && self.detail.price.is_empty() {
            return Err(WatchError::Config(
                "detail.price needs at least one selector when detail lookup is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// `OLED_WATCH_MAX_PRICE`, `OLED_WATCH_FETCH__MODE`, `OLED_WATCH_BRANDS=LG,MSI`.
/// A list value cannot contain a literal comma.
fn environment() -> config::Environment {
    let environment = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    ENV_LIST_KEYS
        .iter()
        .fold(environment, |environment, key| environment.with_list_parse_key(key))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

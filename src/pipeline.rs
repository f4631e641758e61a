//! Fetch, extract, normalize, filter and accumulate, in that order.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::filter::MatchPredicate;
use crate::models::{CandidateRecord, DropReason, MatchResult, ResultSet, RunStats};
use crate::normalizer::Normalizer;
use crate::parser::{DetailPriceParser, Extraction, ListingParser};

pub struct Pipeline {
    config: WatchConfig,
    fetcher: Box<dyn PageFetcher>,
    parser: ListingParser,
    detail: Option<DetailPriceParser>,
    normalizer: Normalizer,
    predicate: MatchPredicate,
}

impl Pipeline {
    pub fn new(config: WatchConfig, fetcher: Box<dyn PageFetcher>) -> Result<Self> {
        config.validate()?;
        let parser = ListingParser::new(&config.selectors)?;
        let detail = if config.detail.enabled {
            Some(DetailPriceParser::new(&config.detail)?)
        } else {
            None
        };

        Ok(Self {
            normalizer: Normalizer::from_config(&config),
            predicate: MatchPredicate::from_config(&config),
            config,
            fetcher,
            parser,
            detail,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Check the search page once. Only a failure to fetch it is an error.
    pub async fn run(&self) -> Result<ResultSet> {
        info!(
            "Checking {} via {} fetcher (max ¥{})",
            self.config.search_url,
            self.fetcher.name(),
            self.config.max_price
        );
        let html = self.fetch_search_page().await?;
        let (results, stats) = self.evaluate(&html).await;

        info!(
            "{} listing(s) seen, {} matched, {} dropped",
            stats.listings,
            stats.matched,
            stats.dropped()
        );
        debug!("Run stats: {:?}", stats);
        Ok(results)
    }

    /// Evaluate an already fetched search page.
    pub async fn evaluate(&self, html: &str) -> (ResultSet, RunStats) {
        let mut results = ResultSet::new();
        let mut stats = RunStats::default();

        // the parsed document is dropped before any detail page is awaited
        let extractions = self.parser.parse(html);
        stats.listings = extractions.len();

        for extraction in extractions {
            let candidate = match extraction {
                Extraction::Complete(candidate) => candidate,
                Extraction::PriceMissing {
                    title,
                    relative_link,
                } => {
                    // only listings whose title already qualifies are worth a detail fetch
                    if self.detail.is_some() && !self.predicate.title_qualifies(&title) {
                        stats.record_drop(DropReason::Filtered);
                        continue;
                    }
                    match self.price_from_detail(title, relative_link, &mut stats).await {
                        Some(candidate) => candidate,
                        None => {
                            stats.record_drop(DropReason::MissingPrice);
                            continue;
                        }
                    }
                }
                Extraction::Incomplete(field) => {
                    debug!("Skipping listing without {:?}", field);
                    stats.record_drop(field.into());
                    continue;
                }
            };

            let raw_price = candidate.raw_price_text.clone();
            let Some(record) = self.normalizer.normalize(candidate) else {
                debug!("Skipping listing with unparseable price {:?}", raw_price);
                stats.record_drop(DropReason::UnparseablePrice);
                continue;
            };

            debug!(
                "{} | ¥{} | {}",
                record.title, record.price, record.absolute_url
            );
            if self.predicate.matches(&record) {
                results.push(MatchResult::from(record));
                stats.matched += 1;
            } else {
                stats.record_drop(DropReason::Filtered);
            }
        }

        (results, stats)
    }

    async fn fetch_search_page(&self) -> Result<String> {
        let url = &self.config.search_url;
        let attempts = self.config.fetch.retry_count + 1;
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(url, self.timeout()).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                    sleep(Duration::from_millis(self.config.fetch.retry_delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Follow the listing to its detail page for a used-offer price.
    async fn price_from_detail(
        &self,
        title: String,
        relative_link: String,
        stats: &mut RunStats,
    ) -> Option<CandidateRecord> {
        let detail = self.detail.as_ref()?;

        let url = self.normalizer.resolve(&relative_link);
        if stats.detail_lookups > 0 {
            sleep(Duration::from_millis(self.config.detail.request_delay_ms)).await;
        }
        stats.detail_lookups += 1;

        let html = match self.fetcher.fetch(&url, self.timeout()).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Error fetching product page {}: {}", url, e);
                return None;
            }
        };
        let raw_price_text = detail.price(&html)?;

        Some(CandidateRecord {
            title,
            raw_price_text,
            relative_link,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.fetch.timeout_ms)
    }
}

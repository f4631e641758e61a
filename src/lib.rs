//! Watches a marketplace search page for used curved OLED monitors under a
//! price ceiling and reports the matches.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod notifier;
pub mod parser;
pub mod pipeline;

pub use config::{FetchMode, WatchConfig};
pub use error::{Result, WatchError};
pub use fetcher::{BrowserFetcher, HttpFetcher, PageFetcher, SnapshotFetcher};
pub use models::{CandidateRecord, MatchResult, NormalizedRecord, ResultSet, RunStats};
pub use notifier::{ConsoleNotifier, EmailNotifier, Notifier};
pub use pipeline::Pipeline;

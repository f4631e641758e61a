use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use oled_watch::logging::init_logging;
use oled_watch::{
    ConsoleNotifier, EmailNotifier, FetchMode, Notifier, PageFetcher, Pipeline, SnapshotFetcher,
    WatchConfig, fetcher,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "oled-watch",
    about = "Check a marketplace search page for used curved OLED monitors and e-mail the matches"
)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override how the search page is fetched
    #[arg(long, value_enum)]
    fetcher: Option<FetchMode>,

    /// Override the inclusive price ceiling
    #[arg(long)]
    max_price: Option<u64>,

    /// Evaluate a saved search page instead of fetching it
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print matches without sending e-mail
    #[arg(long)]
    dry_run: bool,

    /// Print matches as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = WatchConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(mode) = cli.fetcher {
        config.fetch.mode = mode;
    }
    if let Some(max_price) = cli.max_price {
        config.max_price = max_price;
    }

    let page_fetcher: Box<dyn PageFetcher> = match &cli.snapshot {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            Box::new(SnapshotFetcher::new().with_page(config.search_url.clone(), html))
        }
        None => fetcher::from_config(&config.fetch)?,
    };

    info!("🖥️  OLED Watch - used curved OLED monitors");
    let max_price = config.max_price;
    let email = config.email.clone();
    let pipeline = Pipeline::new(config, page_fetcher)?;
    let monitors = pipeline.run().await.context("search page check failed")?;

    // JSON consumers get an array even when nothing matched
    if cli.json {
        ConsoleNotifier::new(true).notify(&monitors).await?;
    }
    if monitors.is_empty() {
        info!("No matching monitors under ¥{}", max_price);
        return Ok(());
    }

    info!("Found {} monitor(s) under ¥{}", monitors.len(), max_price);
    if !cli.json {
        ConsoleNotifier::new(false).notify(&monitors).await?;
    }

    if cli.dry_run {
        info!("Dry run, not sending e-mail");
        return Ok(());
    }

    let notified = match EmailNotifier::new(&email) {
        Ok(notifier) => notifier.notify(&monitors).await,
        Err(e) => Err(e),
    };
    if let Err(e) = notified {
        error!("❌ {}", e);
        return Err(e.into());
    }
    Ok(())
}

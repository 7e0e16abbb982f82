use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use webz_fetcher::config::Config;
use webz_fetcher::db::Database;
use webz_fetcher::logging::{self, LogSettings};
use webz_fetcher::webz::WebzService;

/// Fetch news posts matching a search query into the local database.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Search query, in Webz.io query syntax
    query: String,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present
    let _ = dotenvy::dotenv();

    let log_settings = LogSettings::from_env().context("Invalid logging configuration")?;
    // Held until run() returns so the log file is flushed.
    let _log_guard = logging::init(&log_settings)?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        api_base_url = %config.api_base_url,
        log_file = ?log_settings.file,
        "Configuration loaded"
    );

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!(path = %config.database_path.display(), "Database opened");

    let service = WebzService::new(&config, db.repository())?;

    service
        .fetch_posts(&cli.query, |retrieved, total| {
            info!(retrieved, total, "Fetch complete");
        })
        .await
        .with_context(|| format!("Failed to fetch posts for query '{}'", cli.query))?;

    db.close().await;

    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use bank_reviews::config::Config;
use bank_reviews::db::{self, Database};
use bank_reviews::output::terminal;
use bank_reviews::pipeline;
use bank_reviews::sentiment::{download, VaderScorer};
use bank_reviews::source::client::PlayStoreClient;

/// bank-reviews: review analytics for Ethiopian banking apps.
///
/// Collects Google Play reviews, cleans them, scores sentiment, extracts
/// keyword and topic themes per bank, and loads the result into a store.
#[derive(Parser)]
#[command(name = "bank-reviews", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect raw reviews and app summaries from the store
    Scrape,

    /// Clean the raw reviews
    Preprocess,

    /// Score sentiment for the cleaned reviews
    Sentiment,

    /// Extract keywords, topics and themes per bank
    Themes,

    /// Load scored reviews into the database
    Load,

    /// Run every stage in order, stopping at the first failure
    Run {
        /// Treat partial results (failed apps, unparsed dates, failed banks) as errors
        #[arg(long)]
        strict: bool,
    },

    /// Show artifact and database status
    Status,

    /// Download the sentiment lexicon
    DownloadLexicon,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bank_reviews=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Scrape => scrape(&config).await?,
        Commands::Preprocess => preprocess(&config)?,
        Commands::Sentiment => sentiment(&config)?,
        Commands::Themes => themes(&config)?,
        Commands::Load => load(&config).await?,

        Commands::Run { strict } => {
            config.strict |= strict;
            if config.strict {
                info!("Strict mode: partial results fail the stage");
            }
            // Lexicon first, so a missing one stops the run before any network work.
            let scorer = VaderScorer::load(&config.lexicon_path)?;

            scrape(&config).await?;
            preprocess(&config)?;
            let summary = pipeline::sentiment_stage(&config, &scorer)?;
            terminal::display_sentiment_summary(&summary);
            themes(&config)?;
            load(&config).await?;

            println!("\n{}", "Pipeline complete.".green().bold());
        }

        Commands::Status => {
            let db = existing_database(&config).await?;
            bank_reviews::status::show(&config, db.as_deref()).await?;
        }

        Commands::DownloadLexicon => {
            println!("Downloading sentiment lexicon...");
            if download::download_lexicon(&config.lexicon_path).await? {
                println!("Lexicon saved to: {}", config.lexicon_path.display());
            } else {
                println!(
                    "Lexicon already present at: {}",
                    config.lexicon_path.display()
                );
            }
        }
    }

    Ok(())
}

async fn scrape(config: &Config) -> Result<()> {
    let client = PlayStoreClient::new(&config.play_store_url)?;
    println!(
        "Collecting up to {} reviews for {} apps...",
        config.reviews_per_bank,
        config.banks.len()
    );
    let report = pipeline::scrape_stage(config, &client).await?;
    terminal::display_scrape_summary(&report);
    println!("Raw reviews saved to: {}", config.paths.raw_reviews.display());
    Ok(())
}

fn preprocess(config: &Config) -> Result<()> {
    let stats = pipeline::preprocess_stage(config)?;
    terminal::display_normalize_summary(&stats);
    println!(
        "Cleaned reviews saved to: {}",
        config.paths.processed_reviews.display()
    );
    Ok(())
}

fn sentiment(config: &Config) -> Result<()> {
    let scorer = VaderScorer::load(&config.lexicon_path)?;
    let summary = pipeline::sentiment_stage(config, &scorer)?;
    terminal::display_sentiment_summary(&summary);
    println!(
        "Sentiment results saved to: {}",
        config.paths.sentiment_results.display()
    );
    Ok(())
}

fn themes(config: &Config) -> Result<()> {
    let report = pipeline::themes_stage(config)?;
    terminal::display_theme_report(&report);
    println!(
        "\nThemes saved to: {} and {}",
        config.paths.keyword_profiles.display(),
        config.paths.topic_profiles.display()
    );
    Ok(())
}

async fn load(config: &Config) -> Result<()> {
    let db = init_database(config).await?;
    let report = pipeline::load_stage(config, db.as_ref()).await?;
    terminal::display_load_summary(&report);
    Ok(())
}

/// Initialize the database (create if needed).
///
/// When DATABASE_URL points to PostgreSQL, uses the Postgres backend
/// (requires the `postgres` feature). Otherwise falls back to SQLite.
async fn init_database(config: &Config) -> Result<Arc<dyn Database>> {
    if let Some(ref url) = config.database_url {
        if db::is_postgres_url(url) {
            #[cfg(feature = "postgres")]
            {
                info!("Using PostgreSQL backend");
                return db::connect_postgres(url).await;
            }
            #[cfg(not(feature = "postgres"))]
            anyhow::bail!(
                "DATABASE_URL points to PostgreSQL but the 'postgres' feature is not compiled in.\n\
                 Rebuild with: cargo build --features postgres"
            );
        }
    }
    sqlite_backend(&config.db_path, true)
}

/// Open the store only if it already exists.
async fn existing_database(config: &Config) -> Result<Option<Arc<dyn Database>>> {
    if let Some(ref url) = config.database_url {
        if db::is_postgres_url(url) {
            return init_database(config).await.map(Some);
        }
    }
    if !Path::new(&config.db_path).exists() {
        return Ok(None);
    }
    sqlite_backend(&config.db_path, false).map(Some)
}

#[cfg(feature = "sqlite")]
fn sqlite_backend(db_path: &str, create: bool) -> Result<Arc<dyn Database>> {
    if create {
        db::initialize_sqlite(db_path)
    } else {
        db::open_sqlite(db_path)
    }
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_backend(_db_path: &str, _create: bool) -> Result<Arc<dyn Database>> {
    anyhow::bail!(
        "SQLite support is not compiled in. Set DATABASE_URL to a PostgreSQL URL \
         or rebuild with: cargo build --features sqlite"
    )
}

//! Book Catalog Pipeline CLI
//!
//! Imports the catalog CSV into SQLite, or runs the full scrape/import
//! pipeline out of band.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use books_persistence::{Database, DatabaseConfig, RetryPolicy, StatsCache};
use books_pipeline::{
    CommandScrapeJob, CsvImportJob, ImportMode, PipelineConfig, PipelineOrchestrator, RunOutcome,
    import_books, read_books,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "books-pipeline")]
#[command(about = "Load and refresh the book catalog")]
struct Args {
    /// SQLite database path or URL
    #[arg(long, env = "DATABASE_URL", default_value = "data/books.db")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a CSV file into the catalog
    Import {
        /// CSV file to load
        #[arg(env = "BOOKS_CSV_PATH", default_value = "data/books.csv")]
        csv: PathBuf,

        /// Replace a populated catalog instead of leaving it alone
        #[arg(long)]
        force: bool,
    },

    /// Run the scraper, then import its CSV output
    Run {
        /// Scraper command line
        #[arg(long, env = "SCRAPER_COMMAND")]
        scraper: Option<String>,

        /// CSV file the scraper writes
        #[arg(long, env = "BOOKS_CSV_PATH", default_value = "data/books.csv")]
        csv: PathBuf,

        /// Scrape step timeout in seconds
        #[arg(long, env = "SCRAPE_TIMEOUT_SECS", default_value = "300")]
        scrape_timeout: u64,

        /// Import step timeout in seconds
        #[arg(long, env = "IMPORT_TIMEOUT_SECS", default_value = "120")]
        import_timeout: u64,

        /// Replace a populated catalog instead of leaving it alone
        #[arg(long)]
        force: bool,
    },
}

const fn mode(force: bool) -> ImportMode {
    if force {
        ImportMode::Replace
    } else {
        ImportMode::SkipIfPopulated
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("books_pipeline=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let db = Database::connect(DatabaseConfig::new(&args.database_url)).await?;
    info!(database = %db.path().display(), "Connected");

    match args.command {
        Command::Import { csv, force } => {
            let path = csv.clone();
            let books = tokio::task::spawn_blocking(move || read_books(path)).await??;
            info!(path = %csv.display(), rows = books.len(), "CSV loaded");

            let report = import_books(&db, RetryPolicy::default(), &books, mode(force)).await?;
            if report.skipped {
                info!(
                    existing = report.existing,
                    "Catalog already populated; pass --force to replace it"
                );
            }
        }
        Command::Run {
            scraper,
            csv,
            scrape_timeout,
            import_timeout,
            force,
        } => {
            let pipeline = PipelineOrchestrator::new(
                Arc::new(CommandScrapeJob::new(scraper.as_deref())),
                Arc::new(CsvImportJob::new(db.clone(), RetryPolicy::default(), csv)),
                Arc::new(StatsCache::default()),
                PipelineConfig {
                    scrape_timeout: Duration::from_secs(scrape_timeout),
                    import_timeout: Duration::from_secs(import_timeout),
                },
            );

            let record = pipeline.run("cli", mode(force)).await?;
            if let Some(RunOutcome::Failed { stage, error }) = record.outcome {
                db.close().await;
                bail!("pipeline failed at {stage}: {error}");
            }
            info!(run_id = %record.run_id, "Pipeline complete");
        }
    }

    db.close().await;
    Ok(())
}

mod config;
mod enricher;
mod fetcher;
mod geocode;
mod models;
mod normalize;
mod parser;
mod walker;
mod warehouse;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::HumanDuration;
use tracing::{info, warn};

use crate::config::{Settings, COURTESY_PAUSE, FETCH_RETRIES, RETRY_DELAY, TIMEOUT};
use fetcher::HttpFetcher;
use geocode::Nominatim;
use models::PropertyRecord;
use normalize::Table;
use warehouse::bigquery::BigQuery;
use warehouse::sqlite::SqliteWarehouse;
use warehouse::{LoadReport, Warehouse};

#[derive(Parser)]
#[command(name = "santafe_scraper", about = "Arrendamientos Santa Fe listings to the data warehouse")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk, enrich, normalize and load both tables (default)
    Run,
    /// Print the detail-page references found on the listing pages
    Walk,
    /// Walk and enrich, writing the raw property records as JSON
    Scrape {
        #[arg(short, long, default_value = "data/properties.json")]
        output: PathBuf,
    },
    /// Normalize a raw JSON dump and load it
    Load {
        #[arg(short, long, default_value = "data/properties.json")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            println!(
                "Scraping {} (max {} pages)",
                settings.base_url, settings.max_page
            );
            let records = scrape(&settings).await?;
            load_records(&settings, &records).await
        }
        Commands::Walk => {
            let fetcher = HttpFetcher::new(TIMEOUT, FETCH_RETRIES, RETRY_DELAY)?;
            let refs = walk(&settings, &fetcher).await;
            for r in &refs {
                println!("{:<10} {:<16} {}", r.business_type, r.property_type, r.link);
            }
            println!("\n{} references", refs.len());
            Ok(())
        }
        Commands::Scrape { output } => {
            let records = scrape(&settings).await?;
            write_dump(&output, &records)?;
            println!("Wrote {} records to {}", records.len(), output.display());
            Ok(())
        }
        Commands::Load { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let records: Vec<PropertyRecord> =
                serde_json::from_str(&raw).context("Invalid property dump")?;
            load_records(&settings, &records).await
        }
    };

    println!("\nFinished in {}", HumanDuration(t0.elapsed()));
    result
}

async fn walk(settings: &Settings, fetcher: &HttpFetcher) -> Vec<models::ReferenceRecord> {
    walker::walk(
        fetcher,
        &settings.base_url,
        settings.start_page,
        settings.max_page,
        &settings.pages_path,
    )
    .await
}

async fn scrape(settings: &Settings) -> Result<Vec<PropertyRecord>> {
    let fetcher = HttpFetcher::new(TIMEOUT, FETCH_RETRIES, RETRY_DELAY)?;
    let geocoder = Nominatim::new()?;

    let refs = walk(settings, &fetcher).await;
    let records = enricher::enrich(
        &fetcher,
        &geocoder,
        &settings.base_url,
        refs,
        COURTESY_PAUSE,
    )
    .await;
    Ok(records)
}

fn write_dump(path: &Path, records: &[PropertyRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

async fn load_records(settings: &Settings, records: &[PropertyRecord]) -> Result<()> {
    let (rentals, sales) = normalize::normalize(records).context("Normalization failed")?;
    println!("Normalized {} rentals, {} sales", rentals.len(), sales.len());
    if rentals.is_empty() && sales.is_empty() {
        warn!("Nothing to load; tables will only be created");
    }

    let reports = if let Some(path) = &settings.sqlite_path {
        let wh = SqliteWarehouse::open(path)?;
        load_both(&wh, settings, &rentals, &sales).await?
    } else if let Some(token) = &settings.bigquery_token {
        let wh = BigQuery::new(token.clone())?;
        load_both(&wh, settings, &rentals, &sales).await?
    } else {
        bail!("No warehouse configured: set SANTAFE_BIGQUERY_TOKEN or SANTAFE_SQLITE_PATH");
    };

    for r in &reports {
        if r.is_complete() {
            println!("{}: {} rows in {} batches", r.table_id, r.rows_loaded, r.loaded_chunks);
        } else {
            println!(
                "{}: INCOMPLETE, {} of {} batches loaded ({})",
                r.table_id,
                r.loaded_chunks,
                r.chunks,
                r.failed.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}

async fn load_both(
    wh: &impl Warehouse,
    settings: &Settings,
    rentals: &Table,
    sales: &Table,
) -> Result<Vec<LoadReport>> {
    let mut reports = Vec::with_capacity(2);
    for (table, table_id) in [(rentals, &settings.table_rentals), (sales, &settings.table_sales)] {
        let report = warehouse::load(wh, table, table_id, settings.chunk_size)
            .await
            .with_context(|| format!("Loading {} failed", table_id))?;
        info!(table = %table_id, rows = report.rows_loaded, "Load finished");
        reports.push(report);
    }
    Ok(reports)
}

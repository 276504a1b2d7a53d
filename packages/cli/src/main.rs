#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the dining atlas.
//!
//! `populate` runs the batch pass over a business dataset and replaces the
//! stored summaries. `lookup` prints the baseline for a location, and
//! `compare` sets a live search beside that baseline.
//!
//! Uses `indicatif-log-bridge` (via [`dining_atlas_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use dining_atlas_aggregate::aggregate_file;
use dining_atlas_aggregate::progress::null_progress;
use dining_atlas_cli_utils::IndicatifProgress;
use dining_atlas_database::{DuckDbSummaryStore, ResponseCache};
use dining_atlas_query::{LocationQuery, QueryTimeMerger};
use dining_atlas_search::{SearchClient, SearchSummary};

use crate::report::{ComparisonReport, Distributions, LookupReport};

/// Shown when `compare` fails for any reason.
const GENERIC_FAILURE: &str = "Something went wrong while comparing. Please try again later.";

#[derive(Parser)]
#[command(name = "dining_atlas", about = "Restaurant attribute summaries by city and zip code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a business dataset and replace the stored summaries
    Populate {
        /// Newline-delimited JSON business dataset
        #[arg(long)]
        dataset: PathBuf,
        /// Summary database (defaults to `data/summaries.duckdb`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Maximum number of records to read (for testing)
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Print the merged baseline for a city or zip code
    Lookup {
        /// City name or prefix (e.g., "Seattle")
        #[arg(long, conflicts_with = "zip", required_unless_present = "zip")]
        city: Option<String>,
        /// Zip code
        #[arg(long)]
        zip: Option<String>,
        /// Summary database (defaults to `data/summaries.duckdb`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Search a business live and compare it with the stored baseline
    Compare {
        /// Business name or search term
        business_name: String,
        /// City name or zip code
        location: String,
        /// Treat the location as a zip code
        #[arg(long)]
        zip: bool,
        /// Summary database (defaults to `data/summaries.duckdb`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print dataset statistics without writing anything
    Stats {
        /// Newline-delimited JSON business dataset
        #[arg(long)]
        dataset: PathBuf,
        /// Maximum number of records to read
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = dining_atlas_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Populate { dataset, db, limit } => {
            let start = Instant::now();
            let progress = IndicatifProgress::records_bar(&multi, "Aggregating");
            let (aggregator, load) = aggregate_file(&dataset, limit, progress.as_ref())?;

            let stats = aggregator.stats();
            log::info!(
                "{} records ({} malformed lines skipped), {} cities, {} zip codes, {} categories",
                load.records,
                load.malformed,
                stats.cities.len(),
                stats.zip_codes.len(),
                stats.categories.len()
            );

            let summaries = aggregator.finalize();
            let store = open_store(db.as_deref())?;
            let (cities, zips) = store.replace_all(&summaries.cities, &summaries.zips)?;

            println!(
                "Stored {cities} city and {zips} zip summaries ({} cities skipped) in {:.1}s",
                summaries.skipped_cities.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Lookup { city, zip, db } => {
            let query = match (city, zip) {
                (_, Some(zip)) => LocationQuery::parse(&zip, true)?,
                (Some(city), None) => LocationQuery::parse(&city, false)?,
                (None, None) => return Err("either --city or --zip is required".into()),
            };

            let store = open_store(db.as_deref())?;
            let baseline = QueryTimeMerger::new(&store).baseline(&query)?;
            if baseline.is_empty() {
                log::warn!("No stored summaries match {}", query.as_str());
            }
            println!("{}", serde_json::to_string_pretty(&LookupReport::new(&baseline))?);
        }
        Commands::Compare {
            business_name,
            location,
            zip,
            db,
        } => match compare(&business_name, &location, zip, db.as_deref()).await {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => {
                log::debug!("Comparison failed: {e}");
                println!("{GENERIC_FAILURE}");
                std::process::exit(1);
            }
        },
        Commands::Stats { dataset, limit } => {
            let (aggregator, load) = aggregate_file(&dataset, limit, null_progress().as_ref())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "load": {
                        "lines": load.lines,
                        "records": load.records,
                        "malformed": load.malformed,
                    },
                    "dataset": aggregator.stats(),
                }))?
            );
        }
    }

    Ok(())
}

fn open_store(path: Option<&Path>) -> Result<DuckDbSummaryStore, dining_atlas_database::DbError> {
    path.map_or_else(DuckDbSummaryStore::open_default, DuckDbSummaryStore::open)
}

/// Live search plus stored baseline for one business and location.
async fn compare(
    business_name: &str,
    location: &str,
    by_zip: bool,
    db: Option<&Path>,
) -> Result<ComparisonReport, Box<dyn std::error::Error>> {
    let query = LocationQuery::parse(location, by_zip)?;
    let baseline = {
        let store = open_store(db)?;
        QueryTimeMerger::new(&store).baseline(&query)?
    };

    let client = SearchClient::from_env(ResponseCache::open_default()?)?;
    let response = client.search_businesses(business_name, query.as_str()).await?;
    let live = SearchSummary::from_response(&response);

    let (top_business, reviews) = match &live.top_business {
        Some(top) => (
            Some(client.business_details(&top.id).await?),
            client.business_reviews(&top.id).await?,
        ),
        None => (None, Vec::new()),
    };

    Ok(ComparisonReport {
        business_name: business_name.to_string(),
        location: query.as_str().to_string(),
        live_price: live.price_symbol(),
        live,
        distributions: Distributions::of(&baseline),
        baseline,
        top_business,
        reviews,
    })
}

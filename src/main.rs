use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use almanac::aggregate::run_aggregate;
use almanac::collectors::{
    countries::CountriesCollector, food::FoodCollector, movies::MoviesCollector,
    weather::WeatherCollector, Collector,
};
use almanac::config::{self, ApiConfig, IngestConfig};
use almanac::database_ops::{checkpoint, db::Db, ledger};
use almanac::fetch::FetchClient;
use almanac::ingest::run_batch;
use almanac::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "almanac", version, about = "Checkpointed batch collector for public-API datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Collection {
    Weather,
    Movies,
    Countries,
    Food,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run one quota-bounded, resumable ingestion batch for a collection
    Ingest {
        #[arg(value_enum)]
        collection: Collection,
        /// Optional override for the SQLite database path
        #[arg(long)]
        db: Option<String>,
        /// Per-run cap on fetch attempts (default: env MAX_ITEMS_PER_RUN or 25)
        #[arg(long)]
        quota: Option<u32>,
    },
    /// Join and aggregate ledger contents into CSV/text summaries
    Aggregate {
        /// Optional override for the SQLite database path
        #[arg(long)]
        db: Option<String>,
        /// Directory the summary files are written to
        #[arg(long, default_value = "exports")]
        out_dir: PathBuf,
    },
    /// Print row counts for ledger tables and cursor positions
    DbCounts {
        /// Optional override for the SQLite database path
        #[arg(long)]
        db: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    almanac::tracing::init_tracing("info,sqlx=warn")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            collection,
            db,
            quota,
        } => {
            let api = ApiConfig::from_env()?;
            match collection {
                Collection::Movies => env_util::preflight_check(
                    "movies ingest",
                    &["OMDB_API_KEY"],
                    &["OMDB_API_URL", "MAX_ITEMS_PER_RUN", "OMDB_DELAY_MS"],
                )?,
                Collection::Countries => env_util::preflight_check(
                    "countries ingest",
                    &["COUNTRYLAYER_API_KEY"],
                    &["COUNTRYLAYER_API_URL", "MAX_ITEMS_PER_RUN"],
                )?,
                _ => {}
            }

            let db = connect(db).await?;
            let http = FetchClient::new(api.timeout, &api.user_agent)?;
            let cfg = IngestConfig::from_env(quota);

            let collector: Box<dyn Collector> = match collection {
                Collection::Weather => Box::new(WeatherCollector::new(&api)),
                Collection::Movies => Box::new(MoviesCollector::new(&api)?),
                Collection::Countries => Box::new(CountriesCollector::new(&api)?),
                Collection::Food => Box::new(FoodCollector::new(&api)),
            };

            let report = run_batch(collector.as_ref(), &db, &http, &cfg).await?;
            report.print_summary();
        }
        Commands::Aggregate { db, out_dir } => {
            let db = connect(db).await?;
            let report = run_aggregate(&db, &out_dir).await?;
            report.print_summary(&out_dir);
        }
        Commands::DbCounts { db } => {
            let db = connect(db).await?;
            println!("table counts:");
            for (table, count) in ledger::table_counts(&db).await? {
                println!("    {table:>20} | {count}");
            }
            let cursors = checkpoint::list(&db).await?;
            if cursors.is_empty() {
                println!("no ingest cursors yet");
            } else {
                println!("ingest cursors:");
                for (collection, offset, setup) in cursors {
                    println!("    {collection:>20} | offset={offset} setup_complete={setup}");
                }
            }
        }
    }
    Ok(())
}

async fn connect(cli_db: Option<String>) -> Result<Db> {
    let path = config::db_path(cli_db);
    let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 5u32);
    info!(db = %path, "opening ledger database");
    Db::connect(&path, max_conns)
        .await
        .context("Db::connect failed")
}

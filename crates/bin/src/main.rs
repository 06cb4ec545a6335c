//! Hanover CLI binary.
//!
//! Command-line interface for constructing characteristic-sorted
//! portfolios and Fama-French style factors from the research-data
//! warehouse.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hanover::engine::FactorLibrary;
use hanover::{Characteristic, DateRange, FactorName, Frequency, LibraryConfig, Weighting};
use hanover_data::cache::QueryCache;
use hanover_data::reference::ReferenceLibrary;
use hanover_data::warehouse::WarehouseClient;
use hanover_output::export::write_frame_csv;
use hanover_output::stats::TableKind;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hanover")]
#[command(about = "Hanover: characteristic-sorted portfolios and Fama-French style factors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Construct factor return series and print summary statistics
    Factors {
        /// Observation frequency (D, W, M, Q, A)
        #[arg(long, default_value = "M")]
        freq: String,

        /// Comma-separated factor labels (e.g. MKT-RF,SMB,HML)
        #[arg(long, default_value = "MKT-RF,SMB,HML")]
        factors: String,

        /// Sample start date (YYYY-MM-DD)
        #[arg(long, default_value = "1963-07-01")]
        start: String,

        /// Sample end date (YYYY-MM-DD)
        #[arg(long, default_value = "2019-12-31")]
        end: String,

        /// Serve strictly from the local cache
        #[arg(long)]
        cached_only: bool,

        /// Export the factor table to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Build sorted portfolios: returns, firm counts, or characteristics
    Sorts {
        /// Observation frequency (D, W, M, Q, A)
        #[arg(long, default_value = "M")]
        freq: String,

        /// Comma-separated sorting characteristics (e.g. ME,BM)
        #[arg(long, default_value = "ME,BM")]
        on: String,

        /// Comma-separated bucket counts per dimension (e.g. 2,3 or 5,5)
        #[arg(long, default_value = "2,3")]
        dims: String,

        /// Portfolio weighting: vw or ew
        #[arg(long, default_value = "vw")]
        weighting: String,

        /// What to report: returns, numfirms, or characs
        #[arg(long, default_value = "returns")]
        kind: String,

        /// Sample start date (YYYY-MM-DD)
        #[arg(long, default_value = "1963-07-01")]
        start: String,

        /// Sample end date (YYYY-MM-DD)
        #[arg(long, default_value = "2019-12-31")]
        end: String,

        /// Serve strictly from the local cache
        #[arg(long)]
        cached_only: bool,

        /// Export the table to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Compare constructed factors against a published reference file
    Compare {
        /// Observation frequency (D, W, M, Q, A)
        #[arg(long, default_value = "M")]
        freq: String,

        /// Comma-separated factor labels to compare
        #[arg(long, default_value = "MKT-RF,SMB,HML")]
        factors: String,

        /// Directory or HTTP base URL holding reference CSV files
        #[arg(long)]
        reference: String,

        /// Reference file name (e.g. F-F_Research_Data_Factors.CSV)
        #[arg(long)]
        file: String,

        /// Sample start date (YYYY-MM-DD)
        #[arg(long, default_value = "1963-07-01")]
        start: String,

        /// Sample end date (YYYY-MM-DD)
        #[arg(long, default_value = "2019-12-31")]
        end: String,

        /// Serve strictly from the local cache
        #[arg(long)]
        cached_only: bool,
    },

    /// Inspect or clear the local query cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,

        /// Remove all cached query results
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Factors {
            freq,
            factors,
            start,
            end,
            cached_only,
            csv,
        } => {
            let config = LibraryConfig::new(
                Frequency::parse(&freq)?,
                vec![Characteristic::Me, Characteristic::Bm],
                parse_factors(&factors)?,
                vec![],
            );
            let config = apply_cache_flags(config, cached_only);
            let range = parse_range(&start, &end)?;

            let mut lib = FactorLibrary::new(WarehouseClient::from_env()?, config)?;
            let table = with_spinner("constructing factors", lib.factor_returns(range)).await?;

            let summary = lib.summary(&table, TableKind::Factors)?;
            println!("{summary}");
            export_if_requested(&table, csv)?;
        }
        Commands::Sorts {
            freq,
            on,
            dims,
            weighting,
            kind,
            start,
            end,
            cached_only,
            csv,
        } => {
            let characteristics = parse_characteristics(&on)?;
            let config = LibraryConfig::new(
                Frequency::parse(&freq)?,
                characteristics.clone(),
                vec![],
                characteristics,
            );
            let config = apply_cache_flags(config, cached_only);
            let range = parse_range(&start, &end)?;
            let dims = parse_dims(&dims)?;
            let weighting = Weighting::parse(&weighting)?;

            let mut lib = FactorLibrary::new(WarehouseClient::from_env()?, config)?;
            match kind.as_str() {
                "returns" => {
                    let table = with_spinner(
                        "building sorted portfolios",
                        lib.portfolio_returns(range, &dims, weighting),
                    )
                    .await?;
                    let summary = lib.summary(&table, TableKind::Returns)?;
                    println!("{summary}");
                    export_if_requested(&table, csv)?;
                }
                "numfirms" => {
                    let table =
                        with_spinner("counting firms", lib.num_firms(range, &dims)).await?;
                    let summary = lib.summary(&table, TableKind::NumFirms)?;
                    println!("{summary}");
                    export_if_requested(&table, csv)?;
                }
                "characs" => {
                    let tables = with_spinner(
                        "averaging characteristics",
                        lib.portfolio_characteristics(range, &dims),
                    )
                    .await?;
                    for (characteristic, table) in &tables {
                        println!("\n== {characteristic} ==");
                        let summary = lib.summary(table, TableKind::Characs)?;
                        println!("{summary}");
                    }
                    if let Some(path) = csv {
                        if let Some((_, first)) = tables.first() {
                            write_frame_csv(first, &path)?;
                            println!("wrote {}", path.display());
                        }
                    }
                }
                other => return Err(format!("unknown report kind: {other}").into()),
            }
        }
        Commands::Compare {
            freq,
            factors,
            reference,
            file,
            start,
            end,
            cached_only,
        } => {
            let config = LibraryConfig::new(
                Frequency::parse(&freq)?,
                vec![Characteristic::Me, Characteristic::Bm],
                parse_factors(&factors)?,
                vec![],
            );
            let config = apply_cache_flags(config, cached_only);
            let range = parse_range(&start, &end)?;

            let library = if reference.starts_with("http://") || reference.starts_with("https://")
            {
                ReferenceLibrary::from_url(&reference)
            } else {
                ReferenceLibrary::from_dir(&reference)
            };
            let published = library.load(&file).await?;

            let mut lib = FactorLibrary::new(WarehouseClient::from_env()?, config)?;
            let constructed =
                with_spinner("constructing factors", lib.factor_returns(range)).await?;
            let report = lib.compare(&constructed, &published)?;
            println!("{report}");
        }
        Commands::Cache { stats, clear } => {
            let cache = QueryCache::open(default_cache_path()?)?;
            if clear {
                cache.clear()?;
                println!("cache cleared");
            }
            if stats || !clear {
                let stats = cache.stats()?;
                println!(
                    "cache: {} results, {} panel rows",
                    stats.entries, stats.total_rows
                );
            }
        }
    }

    Ok(())
}

fn default_cache_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base = dirs::data_dir().ok_or("no data directory available on this platform")?;
    let dir = base.join("hanover");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("query_cache.sqlite"))
}

fn apply_cache_flags(config: LibraryConfig, cached_only: bool) -> LibraryConfig {
    let config = match default_cache_path() {
        Ok(path) => config.with_cache_path(path),
        Err(_) => config,
    };
    if cached_only {
        config.cache_only()
    } else {
        config
    }
}

fn parse_range(start: &str, end: &str) -> Result<DateRange, Box<dyn std::error::Error>> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")?;
    Ok(DateRange::new(start, end)?)
}

fn parse_factors(spec: &str) -> Result<Vec<FactorName>, Box<dyn std::error::Error>> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| FactorName::parse(s).map_err(Into::into))
        .collect()
}

fn parse_characteristics(spec: &str) -> Result<Vec<Characteristic>, Box<dyn std::error::Error>> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| Characteristic::parse(s).map_err(Into::into))
        .collect()
}

fn parse_dims(spec: &str) -> Result<Vec<usize>, Box<dyn std::error::Error>> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<usize>().map_err(Into::into))
        .collect()
}

async fn with_spinner<T, E, F>(message: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = future.await;
    spinner.finish_and_clear();
    result
}

fn export_if_requested(
    table: &DataFrame,
    csv: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = csv {
        write_frame_csv(table, &path)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod api;
mod cli;
mod config;
mod etf;
mod output;
mod scrape;
mod store;
mod telemetry;
mod util;

mod enrich;
mod etfs;
mod fmp;
mod history;
mod schedule;
mod summary;

#[derive(Parser)]
#[command(name = "divminder", about = "Distribution schedule and dividend history crawler for YieldMax ETFs")]
struct Cli {
    /// Output directory for the JSON files (overrides DIVMINDER_OUT_DIR)
    #[arg(global = true, short, long)]
    out: Option<PathBuf>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the distribution schedule page
    Schedule(schedule::ScheduleCmd),
    /// Scrape per-fund dividend history pages
    History(history::HistoryCmd),
    /// Build the ETF list
    Etfs(etfs::EtfsCmd),
    /// Add Alpha Vantage metadata to the ETF list
    Enrich(enrich::EnrichCmd),
    /// Financial Modeling Prep dividend data
    Fmp(fmp::FmpCmd),
    /// Write the API index
    Summary(summary::SummaryCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr; RUST_LOG and DIVMINDER_LOG_FORMAT apply
    telemetry::config::init_tracing();

    let mut cfg = config::AppConfig::from_env();
    if let Some(out) = cli.out { cfg.out_dir = out; }

    match cli.command {
        Commands::Schedule(args) => schedule::run(&cfg, args).await?,
        Commands::History(args) => history::run(&cfg, args).await?,
        Commands::Etfs(args) => etfs::run(&cfg, args).await?,
        Commands::Enrich(args) => enrich::run(&cfg, args).await?,
        Commands::Fmp(args) => fmp::run(&cfg, args).await?,
        Commands::Summary(args) => summary::run(&cfg, args).await?,
    }

    Ok(())
}

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pricewatch_lib::ScrapeConfig;

use crate::commands::Context;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "Track prices on arbitrary product pages")]
struct Cli {
    /// Output format: table, markdown or json
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Tracker store file
    #[arg(long, env = "PRICEWATCH_DATA", default_value = "data/trackers.json", global = true)]
    data: PathBuf,

    /// Domain selector cache file
    #[arg(
        long,
        env = "PRICEWATCH_SELECTORS",
        default_value = "data/selector_data.json",
        global = true
    )]
    selectors: PathBuf,

    /// Optional YAML file with scrape settings
    #[arg(long, env = "PRICEWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every tracker and report changes
    Scan(commands::scan::ScanArgs),
    /// Rank price candidates on a page
    Detect(commands::detect::DetectArgs),
    /// Check whether a selector needs a rendered page
    Probe(commands::probe::ProbeArgs),
    /// Add a tracker
    Add(commands::add::AddArgs),
    /// Remove a tracker
    Remove(commands::remove::RemoveArgs),
    /// List trackers
    List(commands::list::ListArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewatch=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "markdown" | "md" => OutputFormat::Markdown,
        _ => OutputFormat::Table,
    };

    let config = match &cli.config {
        Some(path) => ScrapeConfig::load_yaml(path)?,
        None => ScrapeConfig::default(),
    }
    .with_env_overrides();

    let ctx = Context {
        config,
        data: cli.data,
        selectors: cli.selectors,
        format,
    };

    match &cli.command {
        Commands::Scan(args) => commands::scan::run(args, &ctx).await?,
        Commands::Detect(args) => commands::detect::run(args, &ctx).await?,
        Commands::Probe(args) => commands::probe::run(args, &ctx).await?,
        Commands::Add(args) => commands::add::run(args, &ctx).await?,
        Commands::Remove(args) => commands::remove::run(args, &ctx)?,
        Commands::List(args) => commands::list::run(args, &ctx)?,
    }

    Ok(())
}

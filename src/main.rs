//! Datasource command line tool
//!
//! Resolves one datasource and prints it: decoded values as JSON, or the raw
//! contents with `--include`.

use anyhow::Context;
use clap::{ArgAction, Parser};
use datasource_core::{DataConfig, DataRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Resolve and print a datasource
///
/// # Usage
/// ```bash
/// datasource -d config.yaml config
/// datasource -d api=https://example.com/items.json -H "api=Accept: application/json" api
/// datasource --config datasources.yaml secrets db
/// ```
#[derive(Parser, Debug)]
#[command(name = "datasource", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Datasource as `alias=uri` or a bare filename (repeatable)
    #[arg(short = 'd', long = "datasource")]
    datasources: Vec<String>,

    /// Request header as `alias=Name: value` (repeatable)
    #[arg(short = 'H', long = "datasource-header")]
    headers: Vec<String>,

    /// Print the raw contents instead of decoding them
    #[arg(long)]
    include: bool,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Alias of the datasource to read
    alias: String,

    /// Arguments passed to the datasource reader
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            DataConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => DataConfig::default(),
    };
    config.extend(&cli.datasources, &cli.headers);
    if let Some(timeout) = cli.timeout {
        config.http_timeout_secs = timeout;
    }

    let registry = config
        .build_registry()
        .context("invalid datasource configuration")?;
    info!("Configured datasources: {:?}", registry.aliases());

    let result = print_datasource(&registry, cli).await;

    for e in registry.shutdown().await {
        warn!("Cleanup failed: {}", e);
    }
    let stats = registry.stats();
    info!(
        "Reads: {} cache hits, {} misses, {} bytes fetched",
        stats.cache_hits, stats.cache_misses, stats.bytes_read
    );
    result
}

async fn print_datasource(registry: &DataRegistry, cli: &Cli) -> anyhow::Result<()> {
    if cli.include {
        let text = registry.include(&cli.alias, &cli.args).await?;
        print!("{}", text);
    } else {
        let value = registry.datasource(&cli.alias, &cli.args).await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

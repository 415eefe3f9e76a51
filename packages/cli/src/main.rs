#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the peace map.
//!
//! Fetches ACLED events, normalizes them for map rendering, and prints the
//! result as JSON. When live data is unavailable (no credentials, or a
//! request fails) the sample dataset is printed instead, with a warning,
//! unless `--strict` is given.

mod commands;
mod config;
mod fallback;

use std::path::PathBuf;

use chrono::Duration;
use clap::Parser;
use peace_map_acled::AcledClient;
use peace_map_cache::{CacheConfig, ResultCache};

use crate::commands::{Commands, Output};
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "peace_map", about = "ACLED conflict events for the peace map")]
struct Cli {
    /// Config file (defaults to `peace_map.toml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Exit with an error instead of printing sample data
    #[arg(long, global = true)]
    strict: bool,
    /// Keep responses in memory for this run only
    #[arg(long, global = true)]
    no_cache: bool,
    #[command(subcommand)]
    command: Commands,
}

/// The response cache for this run, if any. A cache directory that cannot
/// be opened is not fatal.
fn open_cache(config: &CacheConfig, no_cache: bool) -> Option<ResultCache> {
    if no_cache {
        return Some(
            ResultCache::in_memory().with_ttl(Duration::hours(i64::from(config.ttl_hours))),
        );
    }
    match config.open() {
        Ok(cache) => cache,
        Err(e) => {
            log::warn!(
                "Cache directory {} unavailable ({e}), continuing without a cache",
                config.dir.display()
            );
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    if matches!(cli.command, Commands::ClearCache) {
        let cache = if cli.no_cache {
            None
        } else {
            config.cache.open()?
        };
        if let Some(cache) = &cache {
            cache.clear_all();
            log::info!("Cleared cache in {}", config.cache.dir.display());
        }
        print_output(&Output::Cleared {
            cleared: cache.is_some(),
        })?;
        return Ok(());
    }

    let output = match AcledClient::new(config.acled.clone()) {
        Ok(client) => {
            let client = match open_cache(&config.cache, cli.no_cache) {
                Some(cache) => client.with_cache(cache),
                None => client,
            };
            match commands::run(&client, &cli.command).await {
                Ok(output) => output,
                Err(e) if !cli.strict => {
                    log::warn!("{e}. Showing sample data instead.");
                    commands::fallback(&cli.command)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(e) if !cli.strict => {
            log::warn!("{e}. Showing sample data instead.");
            commands::fallback(&cli.command)
        }
        Err(e) => return Err(e.into()),
    };

    print_output(&output)
}

fn print_output(output: &Output) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Output::Text(text) => print!("{text}"),
        _ => println!("{}", serde_json::to_string_pretty(output)?),
    }
    Ok(())
}

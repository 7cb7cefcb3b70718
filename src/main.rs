//! `skywatch` - CLI for regional flight watching and delay scoring.
//!
//! This binary provides the command-line interface for running the poll
//! loop and inspecting stored flights, predictions, and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::error;

use skywatch::cli::{Cli, Command, ConfigCommand, FetchCommand, RecentCommand, StatusCommand};
use skywatch::{init_logging, Config, FlightStore, Pipeline, RiskScorer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Watch => handle_watch(&config).await,
        Command::Fetch(fetch_cmd) => handle_fetch(&config, &fetch_cmd).await,
        Command::Recent(recent_cmd) => handle_recent(&config, &recent_cmd),
        Command::Train => handle_train(&config),
        Command::Status(status_cmd) => handle_status(&config, &status_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

/// Poll continuously until interrupted.
///
/// A failed cycle is logged and the loop continues; only setup failures
/// terminate the watch.
async fn handle_watch(config: &Config) -> Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    let interval = config.refresh_interval();

    println!(
        "Watching region ({:.1}, {:.1}) .. ({:.1}, {:.1}) every {}s",
        config.region.min_latitude,
        config.region.min_longitude,
        config.region.max_latitude,
        config.region.max_longitude,
        interval.as_secs()
    );

    loop {
        match pipeline.run_cycle().await {
            Ok(summary) => {
                println!(
                    "{} flights stored, mean delay probability {:.3}",
                    summary.stored, summary.mean_probability
                );
            }
            Err(e) => error!("cycle failed: {e}"),
        }
        tokio::time::sleep(interval).await;
    }
}

async fn handle_fetch(config: &Config, cmd: &FetchCommand) -> Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    let summary = pipeline.run_cycle().await?;

    if cmd.json {
        let value = serde_json::json!({
            "fetched": summary.fetched,
            "stored": summary.stored,
            "scored": summary.scored,
            "mean_probability": summary.mean_probability,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Fetched: {}", summary.fetched);
        println!("Stored:  {}", summary.stored);
        println!("Scored:  {}", summary.scored);
        println!("Mean delay probability: {:.3}", summary.mean_probability);
    }
    Ok(())
}

fn handle_recent(config: &Config, cmd: &RecentCommand) -> Result<()> {
    let store = FlightStore::open(config.database_path())?;
    let flights = store.recent(cmd.limit)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&flights)?);
        return Ok(());
    }

    if flights.is_empty() {
        println!("No flights stored yet.");
        return Ok(());
    }

    for flight in &flights {
        let observed = flight
            .observed_at()
            .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
        println!(
            "{:<8} {:<10} {:>8.0} m {:>6.0} m/s  {}  {}",
            flight.icao24,
            flight.display_name(),
            flight.altitude,
            flight.velocity,
            observed,
            flight.origin_country,
        );
    }
    Ok(())
}

fn handle_train(config: &Config) -> Result<()> {
    let scorer = RiskScorer::train_new(config)?;
    println!("Model trained and saved to {}", scorer.model_path().display());
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> Result<()> {
    let store = FlightStore::open(config.database_path())?;
    let stats = store.stats()?;
    let model_present = config.model_path().exists() && config.scaler_path().exists();

    if cmd.json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "total_flights": stats.total_flights,
            "total_predictions": stats.total_predictions,
            "distinct_aircraft": stats.distinct_aircraft,
            "oldest_observation": stats.oldest_observation,
            "newest_observation": stats.newest_observation,
            "db_size_bytes": stats.db_size_bytes,
            "model_present": model_present,
            "model_path": config.model_path(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("skywatch status");
        println!("---------------");
        println!("Database:          {}", config.database_path().display());
        println!("Flights stored:    {}", stats.total_flights);
        println!("Predictions:       {}", stats.total_predictions);
        println!("Distinct aircraft: {}", stats.distinct_aircraft);
        if let Some(newest) = stats.newest_observation {
            println!("Newest observed:   {}", newest.to_rfc3339());
        }
        println!("Database size:     {} bytes", stats.db_size_bytes);
        println!(
            "Model:             {}",
            if model_present {
                "trained"
            } else {
                "not yet trained"
            }
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Api]");
                println!("  Base URL:        {}", config.api.base_url);
                println!(
                    "  Authenticated:   {}",
                    if config.credentials().is_some() {
                        "yes"
                    } else {
                        "no (anonymous)"
                    }
                );
                println!();
                println!("[Region]");
                println!(
                    "  Latitude:        {} .. {}",
                    config.region.min_latitude, config.region.max_latitude
                );
                println!(
                    "  Longitude:       {} .. {}",
                    config.region.min_longitude, config.region.max_longitude
                );
                println!();
                println!("[Watch]");
                println!(
                    "  Refresh every:   {}s",
                    config.watch.refresh_interval_secs
                );
                println!();
                println!("[Storage]");
                println!("  Database path:   {}", config.database_path().display());
                println!("  Model path:      {}", config.model_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

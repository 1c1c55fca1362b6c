//! WSI Tile Cache - diagnostics for the shared decoded-tile cache.
//!
//! This binary runs the cache stress scenario and the sequential replay.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_tilecache::{
    config::{format_size, Cli, Command, OutputFormat, SimulateConfig, StressConfig},
    diag::{run_stress, simulate, SimulationReport, StressReport},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Stress(config) => run_stress_command(config).await,
        Command::Simulate(config) => run_simulate_command(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_tilecache=debug"
    } else {
        "wsi_tilecache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Print a report as pretty JSON.
fn print_json<T: serde::Serialize>(report: &T) -> ExitCode {
    match serde_json::to_string_pretty(report) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Stress Command
// =============================================================================

async fn run_stress_command(config: StressConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!(
        "  Cache: {} shared, {} alternate",
        format_size(config.capacity),
        format_size(config.swap_capacity)
    );
    if config.swap_interval_ms == 0 {
        info!("  Swapping: disabled");
    } else {
        info!("  Swapping: every {}ms", config.swap_interval_ms);
    }

    let report = match run_stress(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("Stress run failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let status = match config.format {
        OutputFormat::Text => {
            print_stress_report(&report);
            ExitCode::SUCCESS
        }
        OutputFormat::Json => print_json(&report),
    };

    if report.mismatches > 0 {
        error!(
            "{} tile(s) did not match the requested coordinates",
            report.mismatches
        );
        return ExitCode::FAILURE;
    }

    status
}

fn print_stress_report(report: &StressReport) {
    println!("Reads:       {}", report.reads);
    println!(
        "Hits:        {} ({:.1}%)",
        report.hits,
        report.hit_ratio() * 100.0
    );
    println!("Misses:      {}", report.misses);
    println!("Swaps:       {}", report.swaps);
    println!("Mismatches:  {}", report.mismatches);
    println!("Elapsed:     {}ms", report.elapsed_ms);
    println!();
    println!("Final cache:");
    println!("  Capacity:  {}", format_size(report.final_cache.capacity));
    println!(
        "  Resident:  {} in {} tile(s)",
        format_size(report.final_cache.resident_bytes),
        report.final_cache.entries
    );
    println!("  Evictions: {}", report.final_cache.evictions);
    println!("  Rejected:  {}", report.final_cache.rejections);
}

// =============================================================================
// Simulate Command
// =============================================================================

fn run_simulate_command(config: SimulateConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if config.tile_size > config.capacity {
        warn!(
            "Tiles of {} exceed the capacity of {}; nothing will be cached",
            format_size(config.tile_size),
            format_size(config.capacity)
        );
    }

    let report = simulate(&config);

    match config.format {
        OutputFormat::Text => {
            print_simulation_report(&report);
            ExitCode::SUCCESS
        }
        OutputFormat::Json => print_json(&report),
    }
}

fn print_simulation_report(report: &SimulationReport) {
    println!(
        "Inserted {} tile(s) of {} into {}",
        report.inserted,
        format_size(report.tile_size),
        format_size(report.capacity)
    );
    println!("Resident: {:?}", report.resident);
    println!("Evicted:  {:?}", report.evicted);
    println!(
        "Resident bytes: {} / {}",
        report.stats.resident_bytes, report.stats.capacity
    );
}

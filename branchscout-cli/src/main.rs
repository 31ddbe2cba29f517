use anyhow::{Context, Result};
use branchscout::{run, ScanConfig, ScanReport};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod progress;

use progress::ProgressObserver;

/// Search every remote branch of a list of git repositories
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    config: PathBuf,
}

/// `RUST_LOG` wins over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(report: &ScanReport, config: &ScanConfig) {
    let stats = &report.stats;
    println!(
        "Searched {} repositories ({} skipped, {} timed out)",
        stats.repositories_searched.to_string().cyan(),
        stats.repositories_skipped.to_string().yellow(),
        stats.repositories_timed_out.to_string().yellow()
    );
    println!(
        "Searched {} branches ({} skipped)",
        stats.branches_searched.to_string().cyan(),
        stats.branches_skipped.to_string().yellow()
    );

    if report.is_empty() {
        println!("{}", "No results found.".yellow());
    } else {
        println!("Found {} matches", report.len().to_string().green().bold());
        println!(
            "Results written to: {}",
            config.output_file.display().to_string().bold()
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ScanConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_logging(&config.log_level);

    let observer = Arc::new(ProgressObserver::new(config.repositories.len()));
    let outcome = run(&config, observer.clone());
    observer.finish();

    let report = outcome.context("Scan failed")?;
    print_summary(&report, &config);
    Ok(())
}

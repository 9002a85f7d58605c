use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use image_collector::collector::{collect_images, CollectSummary};
use image_collector::config::{Cli, Config};
use image_collector::progress::Progress;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, progress: Progress) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(progress)
        .with_target(false)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let progress = Progress::new(!cli.quiet);
    init_logging(cli.verbose, progress.clone());
    let config = Config::from_cli(cli).context("Invalid arguments")?;

    // Setup Ctrl+C handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let summary = collect_images(&config, &shutdown, &progress).with_context(|| {
        format!("Failed to collect images from {}", config.directory.display())
    })?;

    print_summary(&summary);

    if shutdown.load(Ordering::Relaxed) || summary.was_cancelled() {
        eprintln!("\nCollection cancelled");
        return Ok(ExitCode::from(130));
    }

    // Individual failures are listed above but do not fail the run
    Ok(ExitCode::SUCCESS)
}

/// Error message followed by its sources, `a: b: c`
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn print_summary(summary: &CollectSummary) {
    let secs = summary.duration.as_secs_f64();
    let throughput = if secs > 0.0 {
        summary.copied() as f64 / secs
    } else {
        0.0
    };

    println!("Found {} images.", summary.found);
    println!(
        "Removed {} files with the same name.",
        summary.duplicates_removed
    );
    println!(
        "Removed {} files that already exist.",
        summary.existing_removed
    );
    println!(
        "Copied {} images ({} bytes) in {:.2}s ({:.0} files/sec) with {} worker(s)",
        summary.copied(),
        summary.bytes_copied,
        secs,
        throughput,
        summary.workers
    );
    if let Some(metadata) = &summary.metadata {
        println!("Copied metadata for {} images", metadata.succeeded());
    }

    if !summary.scan_warnings.is_empty() {
        println!("Skipped {} unreadable entries:", summary.scan_warnings.len());
        for warning in &summary.scan_warnings {
            println!("  {warning}");
        }
    }

    let failures: Vec<_> = summary
        .copy
        .failures()
        .chain(summary.metadata.iter().flat_map(|m| m.failures()))
        .collect();
    if !failures.is_empty() {
        println!("Failed {} task(s):", failures.len());
        for (task, error) in failures {
            println!("  {}: {}", task.source.display(), error_chain(error));
        }
    }
}

//! CLI configuration and runtime settings for image collection.

use clap::Parser;
use std::path::PathBuf;

use crate::collector::effective_workers;
use crate::error::CollectError;

/// Collect images from a directory and its subdirectories and copy them to a new directory
#[derive(Parser, Debug)]
#[command(name = "image-collector")]
#[command(version)]
#[command(
    about = "Collect images from a directory and its subdirectories and copy them to a new directory"
)]
pub struct Cli {
    /// The directory to search for images
    pub directory: PathBuf,

    /// The directory to copy the images to
    pub output: PathBuf,

    /// Number of parallel workers (0 or less = one per CPU)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub workers: i64,

    /// Copy permissions and timestamps for copied images
    #[arg(short, long)]
    pub metadata: bool,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runtime configuration parsed from CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Scan root, canonical
    pub directory: PathBuf,
    /// Flat destination directory
    pub output: PathBuf,
    /// Resolved number of parallel workers, at least 1
    pub workers: usize,
    /// Run the metadata pass after copying
    pub metadata: bool,
    /// Hide progress bars
    pub quiet: bool,
    /// Enable verbose output
    pub verbose: bool,
}

impl Config {
    /// Create Config from CLI arguments.
    ///
    /// Both directories must exist; the output directory is never created.
    pub fn from_cli(cli: Cli) -> Result<Self, CollectError> {
        if !cli.directory.exists() {
            return Err(CollectError::RootNotFound {
                path: cli.directory,
            });
        }
        if !cli.directory.is_dir() {
            return Err(CollectError::NotADirectory {
                path: cli.directory,
            });
        }
        if !cli.output.exists() {
            return Err(CollectError::OutputNotFound { path: cli.output });
        }
        if !cli.output.is_dir() {
            return Err(CollectError::NotADirectory { path: cli.output });
        }

        let directory = cli.directory.canonicalize()?;

        Ok(Config {
            directory,
            output: cli.output,
            workers: effective_workers(cli.workers),
            metadata: cli.metadata,
            quiet: cli.quiet,
            verbose: cli.verbose,
        })
    }
}

//! # Image Collector
//!
//! Collects image files scattered through a directory tree into one flat
//! directory, copying them in parallel.
//!
//! ## Features
//!
//! - Recursive scan filtered by image extension
//! - Flattened destination names, first occurrence wins on collisions
//! - Skips images whose destination already exists
//! - Parallel copying on a fixed-size Rayon pool
//! - Optional permission and timestamp preservation
//!
//! ## Usage
//!
//! ```ignore
//! use image_collector::scanner::scan_images;
//! use image_collector::plan::CopyPlan;
//!
//! let scan = scan_images(&root, &ProgressBar::hidden())?;
//! let plan = CopyPlan::prepare(scan.images, &output, |_, _| ProgressBar::hidden())?;
//! ```

/// Orchestration of scan, planning and copy passes
pub mod collector;

/// CLI configuration and argument parsing
pub mod config;

/// Single-file content and metadata copies
pub mod copier;

/// Error types for collection operations
pub mod error;

/// Image extensions and image paths
pub mod image;

/// Copy plan building and filtering
pub mod plan;

/// Progress bars
pub mod progress;

/// Recursive image scanning
pub mod scanner;

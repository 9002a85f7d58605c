//! Image collection orchestration.
//!
//! Runs scan, planning and the parallel copy passes in order:
//! - content copies on a dedicated worker pool
//! - optional metadata pass, only after every content copy finished
//! - per-task failures collected, never aborting the batch
//! - progress tracking with cache-aligned atomic counters

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::copier::{copy_file, copy_metadata};
use crate::error::{CollectError, ScanWarning};
use crate::plan::{CopyPlan, CopyTask};
use crate::progress::Progress;
use crate::scanner::scan_images;

/// Outcome of one task in a pass
#[derive(Debug)]
pub enum TaskStatus {
    /// Finished without error
    Done,
    /// Failed, siblings kept running
    Failed(CollectError),
    /// Never started because of Ctrl+C
    Cancelled,
}

/// Result of a single copy or metadata task
#[derive(Debug)]
pub struct TaskResult {
    pub task: CopyTask,
    pub status: TaskStatus,
    /// Bytes written (always 0 for metadata)
    pub bytes: u64,
}

/// Cache-line aligned atomic counter to prevent false sharing
/// Each counter is on its own 64-byte cache line
#[repr(align(64))]
pub struct CacheAlignedAtomic(pub AtomicU64);

impl CacheAlignedAtomic {
    pub const fn new(val: u64) -> Self {
        Self(AtomicU64::new(val))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }
}

/// Counters updated by workers while passes run
pub struct CollectStats {
    pub files_copied: CacheAlignedAtomic,
    pub bytes_copied: CacheAlignedAtomic,
    pub metadata_copied: CacheAlignedAtomic,
    pub errors: CacheAlignedAtomic,
}

impl CollectStats {
    pub fn new() -> Self {
        Self {
            files_copied: CacheAlignedAtomic::new(0),
            bytes_copied: CacheAlignedAtomic::new(0),
            metadata_copied: CacheAlignedAtomic::new(0),
            errors: CacheAlignedAtomic::new(0),
        }
    }
}

impl Default for CollectStats {
    fn default() -> Self {
        Self::new()
    }
}

/// All task results of one pass, in plan order
#[derive(Debug, Default)]
pub struct PassReport {
    pub results: Vec<TaskResult>,
}

impl PassReport {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, TaskStatus::Done))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, TaskStatus::Cancelled))
            .count()
    }

    /// Failed tasks with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&CopyTask, &CollectError)> {
        self.results.iter().filter_map(|r| match &r.status {
            TaskStatus::Failed(e) => Some((&r.task, e)),
            _ => None,
        })
    }

    /// Tasks that finished successfully, in plan order
    pub fn completed_tasks(&self) -> Vec<CopyTask> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, TaskStatus::Done))
            .map(|r| r.task.clone())
            .collect()
    }
}

/// Everything a run reports back to the caller
#[derive(Debug)]
pub struct CollectSummary {
    pub found: usize,
    pub duplicates_removed: usize,
    pub existing_removed: usize,
    pub workers: usize,
    pub scan_warnings: Vec<ScanWarning>,
    pub copy: PassReport,
    /// Present only when metadata copying was requested
    pub metadata: Option<PassReport>,
    pub bytes_copied: u64,
    pub duration: Duration,
}

impl CollectSummary {
    pub fn copied(&self) -> usize {
        self.copy.succeeded()
    }

    pub fn metadata_copied(&self) -> usize {
        self.metadata.as_ref().map_or(0, PassReport::succeeded)
    }

    pub fn failure_count(&self) -> usize {
        self.copy.failures().count()
            + self
                .metadata
                .as_ref()
                .map_or(0, |report| report.failures().count())
    }

    pub fn was_cancelled(&self) -> bool {
        self.copy.cancelled() > 0 || self.metadata.as_ref().is_some_and(|r| r.cancelled() > 0)
    }
}

/// Worker count to use: the requested value when positive, else one per CPU
pub fn effective_workers(requested: i64) -> usize {
    match usize::try_from(requested) {
        Ok(n) if n > 0 => n,
        _ => num_cpus::get().max(1),
    }
}

/// Build a pool with exactly `workers` threads
pub fn build_pool(workers: usize) -> Result<ThreadPool, CollectError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("collect-worker-{i}"))
        .build()?;
    Ok(pool)
}

/// Run `op` for every task on `pool`, isolating failures.
///
/// Returns only after every task has finished or been marked cancelled.
fn run_pass<F>(
    pool: &ThreadPool,
    tasks: Vec<CopyTask>,
    shutdown: &AtomicBool,
    progress: &ProgressBar,
    op: F,
) -> PassReport
where
    F: Fn(&CopyTask) -> Result<u64, CollectError> + Sync,
{
    let results = pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| {
                if shutdown.load(Ordering::Relaxed) {
                    return TaskResult {
                        task,
                        status: TaskStatus::Cancelled,
                        bytes: 0,
                    };
                }

                let result = match op(&task) {
                    Ok(bytes) => TaskResult {
                        task,
                        status: TaskStatus::Done,
                        bytes,
                    },
                    Err(e) => {
                        warn!(task = %task, error = %e, "task failed");
                        TaskResult {
                            task,
                            status: TaskStatus::Failed(e),
                            bytes: 0,
                        }
                    }
                };
                progress.inc(1);
                result
            })
            .collect()
    });

    PassReport { results }
}

/// Copy the content of every planned task
pub fn run_copy_pass(
    pool: &ThreadPool,
    tasks: Vec<CopyTask>,
    shutdown: &AtomicBool,
    stats: &CollectStats,
    progress: &ProgressBar,
) -> PassReport {
    run_pass(pool, tasks, shutdown, progress, |task| {
        match copy_file(&task.source, &task.destination) {
            Ok(bytes) => {
                debug!(%task, bytes, "copied");
                stats.files_copied.add(1);
                stats.bytes_copied.add(bytes);
                Ok(bytes)
            }
            Err(e) => {
                stats.errors.add(1);
                Err(e)
            }
        }
    })
}

/// Copy permissions and timestamps for tasks whose content is in place
pub fn run_metadata_pass(
    pool: &ThreadPool,
    tasks: Vec<CopyTask>,
    shutdown: &AtomicBool,
    stats: &CollectStats,
    progress: &ProgressBar,
) -> PassReport {
    run_pass(pool, tasks, shutdown, progress, |task| {
        match copy_metadata(&task.source, &task.destination) {
            Ok(()) => {
                stats.metadata_copied.add(1);
                Ok(0)
            }
            Err(e) => {
                stats.errors.add(1);
                Err(e)
            }
        }
    })
}

/// Scan, plan and copy according to `config`.
///
/// Fails only on fatal conditions (bad root, pool creation, planning
/// contract violation). Per-file failures end up in the summary.
pub fn collect_images(
    config: &Config,
    shutdown: &AtomicBool,
    progress: &Progress,
) -> Result<CollectSummary, CollectError> {
    let start = Instant::now();
    let stats = CollectStats::new();

    info!(directory = %config.directory.display(), "collecting images");
    let pb = progress.spinner("Scanning");
    let scan = scan_images(&config.directory, &pb)?;
    pb.finish();
    info!("found {} images", scan.images.len());
    if !scan.warnings.is_empty() {
        warn!("{} unreadable entries skipped", scan.warnings.len());
    }

    let plan = CopyPlan::prepare(scan.images, &config.output, |len, msg| {
        progress.bar(len, msg)
    })?;
    info!("removed {} files with the same name", plan.duplicates_removed);
    info!("removed {} files that already exist", plan.existing_removed);

    let pool = build_pool(config.workers)?;
    info!("using {} workers", pool.current_num_threads());

    info!(
        "copying {} images to {}",
        plan.len(),
        config.output.display()
    );
    let pb = progress.bar(plan.len(), "Copying images");
    let copy = run_copy_pass(&pool, plan.tasks, shutdown, &stats, &pb);
    pb.finish();
    info!("copied {} images", stats.files_copied.get());

    let metadata = if config.metadata {
        let tasks = copy.completed_tasks();
        info!("copying metadata for {} images", tasks.len());
        let pb = progress.bar(tasks.len(), "Copying metadata");
        let report = run_metadata_pass(&pool, tasks, shutdown, &stats, &pb);
        pb.finish();
        info!("copied metadata for {} images", stats.metadata_copied.get());
        Some(report)
    } else {
        None
    };

    Ok(CollectSummary {
        found: plan.found,
        duplicates_removed: plan.duplicates_removed,
        existing_removed: plan.existing_removed,
        workers: pool.current_num_threads(),
        scan_warnings: scan.warnings,
        copy,
        metadata,
        bytes_copied: stats.bytes_copied.get(),
        duration: start.elapsed(),
    })
}

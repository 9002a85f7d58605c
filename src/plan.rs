//! Copy planning: flatten scanned images into destination paths, then drop
//! name collisions and destinations that already exist.
//!
//! The two filters run as separate passes so that the number of tasks each
//! one removed can be reported on its own.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

use crate::error::CollectError;
use crate::image::ImageRef;

/// One file to copy: a source image and its flattened destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl fmt::Display for CopyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

/// Map every image to `output_dir/<file name>`, keeping scan order
pub fn build_plan(
    images: Vec<ImageRef>,
    output_dir: &Path,
    progress: &ProgressBar,
) -> Result<Vec<CopyTask>, CollectError> {
    let mut tasks = Vec::with_capacity(images.len());

    for image in images {
        let destination = image.file_name().map(|name| output_dir.join(name));
        let Some(destination) = destination else {
            return Err(CollectError::NoFileName {
                path: image.into_path(),
            });
        };
        tasks.push(CopyTask {
            source: image.into_path(),
            destination,
        });
        progress.inc(1);
    }

    Ok(tasks)
}

/// Keep the first task for each destination, returns (kept, removed)
pub fn remove_duplicates(tasks: Vec<CopyTask>, progress: &ProgressBar) -> (Vec<CopyTask>, usize) {
    let total = tasks.len();
    let mut seen = HashSet::with_capacity(total);
    let kept: Vec<CopyTask> = tasks
        .into_iter()
        .filter(|task| {
            progress.inc(1);
            seen.insert(task.destination.clone())
        })
        .collect();

    let removed = total - kept.len();
    (kept, removed)
}

/// Drop tasks whose destination exists right now, returns (kept, removed)
pub fn remove_existing(tasks: Vec<CopyTask>, progress: &ProgressBar) -> (Vec<CopyTask>, usize) {
    let total = tasks.len();
    let kept: Vec<CopyTask> = tasks
        .into_iter()
        .filter(|task| {
            progress.inc(1);
            !task.destination.exists()
        })
        .collect();

    let removed = total - kept.len();
    (kept, removed)
}

/// Filtered, ordered list of copies with the counts of each filter step.
///
/// Destinations are unique and did not exist when the plan was prepared.
/// Nothing stops another process from creating one before the copy runs.
#[derive(Debug, Clone, Default)]
pub struct CopyPlan {
    pub tasks: Vec<CopyTask>,
    /// Images handed to the planner
    pub found: usize,
    /// Removed because an earlier image had the same file name
    pub duplicates_removed: usize,
    /// Removed because the destination already existed
    pub existing_removed: usize,
}

impl CopyPlan {
    /// Build, deduplicate and existence-check a plan.
    ///
    /// `bars` is called once per phase with the phase length and label.
    pub fn prepare<F>(
        images: Vec<ImageRef>,
        output_dir: &Path,
        mut bars: F,
    ) -> Result<Self, CollectError>
    where
        F: FnMut(usize, &'static str) -> ProgressBar,
    {
        let found = images.len();

        let pb = bars(found, "Making destination list");
        let tasks = build_plan(images, output_dir, &pb)?;
        pb.finish();

        let pb = bars(tasks.len(), "Removing duplicate names");
        let (tasks, duplicates_removed) = remove_duplicates(tasks, &pb);
        pb.finish();

        let pb = bars(tasks.len(), "Checking existing files");
        let (tasks, existing_removed) = remove_existing(tasks, &pb);
        pb.finish();

        Ok(Self {
            tasks,
            found,
            duplicates_removed,
            existing_removed,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn hidden(_: usize, _: &'static str) -> ProgressBar {
        ProgressBar::hidden()
    }

    fn task(source: &str, destination: &str) -> CopyTask {
        CopyTask {
            source: PathBuf::from(source),
            destination: PathBuf::from(destination),
        }
    }

    fn images(paths: &[&str]) -> Vec<ImageRef> {
        paths.iter().map(|p| ImageRef::new(*p)).collect()
    }

    // ==================== build_plan tests ====================

    #[test]
    fn test_build_plan_flattens_to_basename() {
        let sources = ["/photos/a.jpg", "/photos/2023/june/b.png", "/c.gif"];
        let tasks = build_plan(images(&sources), Path::new("/out"), &ProgressBar::hidden())
            .unwrap();

        assert_eq!(tasks.len(), sources.len());
        for (task, source) in tasks.iter().zip(sources) {
            let source = Path::new(source);
            assert_eq!(task.source, source);
            assert_eq!(
                task.destination,
                Path::new("/out").join(source.file_name().unwrap())
            );
        }
    }

    #[test]
    fn test_build_plan_keeps_collisions_and_order() {
        let tasks = build_plan(
            images(&["/x/img.png", "/y/img.png"]),
            Path::new("/out"),
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(tasks[0].source, Path::new("/x/img.png"));
        assert_eq!(tasks[1].source, Path::new("/y/img.png"));
        assert_eq!(tasks[0].destination, tasks[1].destination);
    }

    #[test]
    fn test_build_plan_relative_output() {
        let tasks = build_plan(
            images(&["/x/img.png"]),
            Path::new("collected"),
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert_eq!(tasks[0].destination, Path::new("collected/img.png"));
    }

    #[test]
    fn test_build_plan_empty() {
        let tasks = build_plan(Vec::new(), Path::new("/out"), &ProgressBar::hidden()).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_build_plan_no_file_name_is_error() {
        let result = build_plan(images(&["/"]), Path::new("/out"), &ProgressBar::hidden());
        assert!(matches!(result, Err(CollectError::NoFileName { .. })));
    }

    // ==================== remove_duplicates tests ====================

    #[test]
    fn test_remove_duplicates_first_wins() {
        let tasks = vec![
            task("/x/img.png", "/out/img.png"),
            task("/a/other.jpg", "/out/other.jpg"),
            task("/y/img.png", "/out/img.png"),
            task("/z/img.png", "/out/img.png"),
        ];

        let (kept, removed) = remove_duplicates(tasks, &ProgressBar::hidden());

        assert_eq!(removed, 2);
        assert_eq!(
            kept,
            vec![
                task("/x/img.png", "/out/img.png"),
                task("/a/other.jpg", "/out/other.jpg"),
            ]
        );
    }

    #[test]
    fn test_remove_duplicates_idempotent() {
        let tasks = vec![
            task("/x/a.png", "/out/a.png"),
            task("/y/a.png", "/out/a.png"),
            task("/y/b.png", "/out/b.png"),
        ];

        let (once, _) = remove_duplicates(tasks, &ProgressBar::hidden());
        let (twice, removed) = remove_duplicates(once.clone(), &ProgressBar::hidden());

        assert_eq!(once, twice);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_remove_duplicates_case_sensitive_names() {
        let tasks = vec![
            task("/x/IMG.png", "/out/IMG.png"),
            task("/y/img.png", "/out/img.png"),
        ];
        let (kept, removed) = remove_duplicates(tasks, &ProgressBar::hidden());
        assert_eq!(kept.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_remove_duplicates_counts_progress() {
        let tasks = vec![task("/x/a.png", "/out/a.png"), task("/y/a.png", "/out/a.png")];
        let pb = ProgressBar::hidden();
        remove_duplicates(tasks, &pb);
        assert_eq!(pb.position(), 2);
    }

    // ==================== remove_existing tests ====================

    #[test]
    fn test_remove_existing_drops_present_destinations() {
        let temp = TempDir::new().unwrap();
        let out = temp.path();
        fs::write(out.join("img.png"), b"old").unwrap();

        let tasks = vec![
            task("/x/img.png", out.join("img.png").to_str().unwrap()),
            task("/x/new.png", out.join("new.png").to_str().unwrap()),
        ];

        let (kept, removed) = remove_existing(tasks, &ProgressBar::hidden());

        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].destination, out.join("new.png"));
        assert!(kept.iter().all(|t| !t.destination.exists()));
    }

    #[test]
    fn test_remove_existing_counts_directories_as_existing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("taken.png")).unwrap();

        let tasks = vec![task("/x/taken.png", temp.path().join("taken.png").to_str().unwrap())];
        let (kept, removed) = remove_existing(tasks, &ProgressBar::hidden());

        assert!(kept.is_empty());
        assert_eq!(removed, 1);
    }

    // ==================== CopyPlan tests ====================

    #[test]
    fn test_copy_plan_counts_are_separate() {
        let temp = TempDir::new().unwrap();
        let out = temp.path();
        fs::write(out.join("exists.png"), b"old").unwrap();

        let plan = CopyPlan::prepare(
            images(&["/x/a.png", "/y/a.png", "/x/exists.png", "/x/b.png"]),
            out,
            hidden,
        )
        .unwrap();

        assert_eq!(plan.found, 4);
        assert_eq!(plan.duplicates_removed, 1);
        assert_eq!(plan.existing_removed, 1);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.tasks[0].source, Path::new("/x/a.png"));
        assert_eq!(plan.tasks[1].source, Path::new("/x/b.png"));
    }

    #[test]
    fn test_copy_plan_duplicate_of_existing_counts_as_duplicate() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.png"), b"old").unwrap();

        let plan = CopyPlan::prepare(images(&["/x/a.png", "/y/a.png"]), temp.path(), hidden)
            .unwrap();

        assert_eq!(plan.duplicates_removed, 1);
        assert_eq!(plan.existing_removed, 1);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_copy_plan_phase_labels() {
        let mut labels = Vec::new();
        CopyPlan::prepare(images(&["/x/a.png"]), Path::new("/nonexistent-out"), |len, label| {
            labels.push((len, label));
            ProgressBar::hidden()
        })
        .unwrap();

        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|(len, _)| *len == 1));
    }
}

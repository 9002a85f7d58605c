use std::fs;
use std::path::Path;

use indicatif::ProgressBar;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{CollectError, ScanWarning};
use crate::image::{is_image_path, ImageRef};

/// Images found by a scan, in walk order, plus the subtrees that were skipped
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub images: Vec<ImageRef>,
    pub warnings: Vec<ScanWarning>,
}

/// True for regular files and for symlinks that resolve to one
fn is_file_entry(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink()
        && fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false)
}

/// Recursively collect every image file beneath `root`.
///
/// Unreadable subdirectories are reported as warnings and skipped; only a
/// missing or non-directory root is fatal.
#[must_use = "this returns the discovered images which should be planned"]
pub fn scan_images(root: &Path, progress: &ProgressBar) -> Result<ScanOutcome, CollectError> {
    if !root.exists() {
        return Err(CollectError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(CollectError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let root = std::path::absolute(root)?;
    let mut outcome = ScanOutcome::default();

    for entry in WalkDir::new(&root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let warning = ScanWarning::from(e);
                warn!(%warning, "skipping unreadable entry");
                outcome.warnings.push(warning);
                continue;
            }
        };

        if !is_file_entry(&entry) || !is_image_path(entry.path()) {
            continue;
        }

        debug!(path = %entry.path().display(), "found image");
        outcome.images.push(ImageRef::new(entry.into_path()));
        progress.inc(1);
    }

    Ok(outcome)
}

use std::fs::{self, File};
use std::io;
use std::path::Path;

use filetime::FileTime;

use crate::error::CollectError;

/// ENOSPC on Unix
const ENOSPC: i32 = 28;

fn is_disk_full(e: &io::Error) -> bool {
    e.raw_os_error() == Some(ENOSPC)
}

/// Copy the contents of `src` to `dst`, returning the number of bytes copied.
///
/// Only bytes are copied: a new destination gets default permissions, and
/// mode and timestamps are left to [`copy_metadata`]. The destination is
/// created or truncated, so a file that appeared at `dst` after planning is
/// overwritten without notice.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, CollectError> {
    let copy = || -> io::Result<u64> {
        let mut reader = File::open(src)?;
        let mut writer = File::create(dst)?;
        io::copy(&mut reader, &mut writer)
    };

    copy().map_err(|e| {
        if is_disk_full(&e) {
            return CollectError::DiskFull {
                path: dst.to_path_buf(),
            };
        }
        CollectError::CopyFailed {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source: e,
        }
    })
}

/// Copy permission bits and access/modification times from `src` to `dst`.
///
/// `dst` must already hold its final content: writing to it afterwards
/// would bump the modification time again.
pub fn copy_metadata(src: &Path, dst: &Path) -> Result<(), CollectError> {
    let wrap = |source: io::Error| CollectError::MetadataFailed {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(src).map_err(wrap)?;
    fs::set_permissions(dst, metadata.permissions()).map_err(wrap)?;

    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dst, atime, mtime).map_err(wrap)?;

    Ok(())
}

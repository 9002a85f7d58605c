use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Collection error types
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Scan root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Output directory not found: {path}")]
    OutputNotFound { path: PathBuf },

    #[error("Source path has no file name: {path}")]
    NoFileName { path: PathBuf },

    #[error("No space left on device for {path}")]
    DiskFull { path: PathBuf },

    #[error("Failed to copy {src} to {dst}")]
    CopyFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy metadata from {src} to {dst}")]
    MetadataFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A subtree the scanner could not read. The walk continues past it.
#[derive(Debug, Clone)]
pub struct ScanWarning {
    /// Entry that failed, when walkdir knows it
    pub path: Option<PathBuf>,
    pub message: String,
}

impl From<walkdir::Error> for ScanWarning {
    fn from(err: walkdir::Error) -> Self {
        Self {
            path: err.path().map(|p| p.to_path_buf()),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

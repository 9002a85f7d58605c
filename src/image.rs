use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Extensions recognized as images, compared lower-cased
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "svg", "webp"];

/// Check whether a path names an image by its extension
#[inline]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Absolute path of a discovered image file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Final path component, used as the flattened destination name
    pub fn file_name(&self) -> Option<&OsStr> {
        self.0.file_name()
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ImageRef {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

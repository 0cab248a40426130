//! Mapping of (variable, day) to per-day file paths.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Default extension of per-day stores.
pub const DEFAULT_EXTENSION: &str = "zarr";

/// Resolves the file holding one calendar day of one variable.
///
/// Implementations are pure: they never touch the filesystem.
pub trait FileLocator: Send + Sync {
    fn locate(&self, variable: &str, day: NaiveDate) -> PathBuf;
}

/// `<root>/<variable>-<YYYY-MM-DD>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFileLocator {
    root: PathBuf,
    extension: String,
}

impl DailyFileLocator {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Locator for Zarr day stores under `root`.
    pub fn zarr(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_EXTENSION)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl FileLocator for DailyFileLocator {
    fn locate(&self, variable: &str, day: NaiveDate) -> PathBuf {
        self.root.join(format!(
            "{}-{}.{}",
            variable,
            day.format("%Y-%m-%d"),
            self.extension
        ))
    }
}

//! Path utilities for locating ERA5 test data files.
//!
//! Real ERA5 day files are large and not committed, so tests look for them
//! in a few well-known places and skip when none has them.

use std::path::PathBuf;

/// Returns the workspace root directory.
///
/// Derived from this crate's manifest directory (`crates/test-utils`).
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns `crates/{crate_name}/testdata/`.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join(crate_name)
        .join("testdata")
}

/// Searches for a test file in multiple locations.
///
/// This function checks the following locations in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `crates/climate-query/testdata/`
/// 3. `crates/raster-io/testdata/`
/// 4. `testdata/` at the workspace root
/// 5. `data/ERA5/` at the workspace root (the default data root)
///
/// # Returns
///
/// `Some(PathBuf)` if the file is found, `None` otherwise.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        crate_testdata_dir("climate-query").join(name),
        crate_testdata_dir("raster-io").join(name),
        root.join("testdata").join(name),
        root.join("data/ERA5").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

/// A temporary directory named `<prefix>...`, removed on drop.
pub fn scratch_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

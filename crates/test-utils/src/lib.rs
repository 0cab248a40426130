//! Test support for the ERA5 query workspace.
//!
//! - [`DayStoreFixture`] builds a throwaway data root of Zarr day stores
//! - [`GridSpec`] and the `create_*_cube` generators give rasters whose
//!   values can be checked by hand
//! - [`require_test_file!`] skips a test when a real ERA5 day is not on disk
//! - [`assert_approx_eq!`] compares floats within a tolerance
//!
//! Pull it in as a dev-dependency (`test-utils = { path = "../test-utils" }`).

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Install a `tracing` subscriber for test output, filtered by `RUST_LOG`.
///
/// Only the first call in a test binary installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Path of a real ERA5 day found by [`find_test_file`], or an early return
/// from the calling test with a `SKIPPED` note on stderr.
///
/// ```ignore
/// let store = require_test_file!(files::ERA5_T2M_ZARR);
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: ERA5 day '{}' not found; set TEST_DATA_DIR to run this test.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Panic unless `|left - right| <= epsilon`, comparing as `f64`.
///
/// `NaN` on either side fails.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: {} ≈ {}\n  left: {:?}\n right: {:?}\n  diff: {:?} > {:?}",
                stringify!($left),
                stringify!($right),
                left,
                right,
                diff,
                epsilon
            );
        }
    }};
}

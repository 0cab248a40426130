//! Raster reader trait and format implementations.

#[cfg(feature = "netcdf")]
mod netcdf;
mod zarr;

#[cfg(feature = "netcdf")]
pub use self::netcdf::NetCdfDayReader;
pub use self::zarr::ZarrDayReader;

use std::path::Path;

use reanalysis_common::{Raster, RasterError, RasterResult};

/// Trait for decoding one per-day file into a [`Raster`].
///
/// Implementations only read the requested variable; coordinate axes and
/// time are always read. Fill values become `NaN`.
pub trait RasterReader: Send + Sync {
    /// Read variable `short_name` from the file at `path`.
    ///
    /// # Returns
    /// * A raster holding exactly one variable, keyed by `short_name`
    /// * `FileNotFound` if `path` does not exist, `FormatError` if it cannot be decoded
    fn read(&self, path: &Path, short_name: &str) -> RasterResult<Raster>;

    /// Short format name for logs.
    fn format_name(&self) -> &'static str;
}

/// Pick a reader from a file extension (`zarr`, `nc`).
pub fn reader_for_extension(
    extension: &str,
    resolution: f64,
) -> RasterResult<Box<dyn RasterReader>> {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "zarr" => Ok(Box::new(ZarrDayReader::new(resolution))),
        #[cfg(feature = "netcdf")]
        "nc" | "nc4" | "netcdf" => Ok(Box::new(NetCdfDayReader::new(resolution))),
        _ => Err(RasterError::invalid_parameter("file_extension", extension)),
    }
}

pub(crate) fn ensure_exists(path: &Path) -> RasterResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RasterError::file_not_found(path))
    }
}

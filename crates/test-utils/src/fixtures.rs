//! Common ERA5 test fixtures.
//!
//! The canonical Greenland query, plus [`DayStoreFixture`] for building a
//! throwaway data root of Zarr day stores.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use raster_io::{DailyFileLocator, DayStoreWriter, FileLocator};
use reanalysis_common::Raster;
use tempfile::TempDir;

use crate::generators::{create_temperature_cube, hourly_times, synthetic_raster, GridSpec};

/// Regions as `(min_lat, max_lat, min_lon, max_lon)`, 0..360 longitudes.
pub mod bbox {
    /// Greenland, as used by the canonical single-value check.
    pub const GREENLAND: (f64, f64, f64, f64) = (60.0, 80.0, 285.0, 350.0);
}

pub mod time {
    /// Interval of the canonical single-value check.
    pub const CANONICAL_START: &str = "2023-01-01T00:00:00";
    pub const CANONICAL_END: &str = "2023-01-01T09:00:00";
}

/// Variable names as used in requests and file names.
pub mod variables {
    pub const TEMPERATURE_2M: &str = "2m_temperature";
    pub const TEMPERATURE_2M_SHORT: &str = "t2m";
}

/// File names of real ERA5 days, looked up with `require_test_file!`.
pub mod files {
    pub const ERA5_T2M_NETCDF: &str = "2m_temperature-2023-01-01.nc";
    pub const ERA5_T2M_ZARR: &str = "2m_temperature-2023-01-01.zarr";
}

/// Expected mean 2m temperature over Greenland for the first ten hours of
/// 2023-01-01 in the real ERA5 file.
pub const CANONICAL_GREENLAND_MEAN: f64 = 251.92674;

/// A temporary data root holding Zarr day stores in the canonical layout.
///
/// The directory is removed when the fixture is dropped.
pub struct DayStoreFixture {
    dir: TempDir,
    locator: DailyFileLocator,
}

impl DayStoreFixture {
    pub fn new() -> Self {
        let dir = crate::paths::scratch_dir("era5_days_");
        let locator = DailyFileLocator::zarr(dir.path());
        Self { dir, locator }
    }

    /// The data root to point a loader at.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `raster` as the day store of `variable` on `day`.
    pub fn write_day(&self, variable: &str, day: NaiveDate, raster: &Raster) -> PathBuf {
        write_day_store(&self.locator, variable, day, raster)
    }

    /// Write `days` consecutive hourly temperature days starting at `first`.
    ///
    /// Day `i` holds `hours_per_day` steps from midnight with values from
    /// [`create_temperature_cube`] shifted by `i` Kelvin.
    pub fn write_temperature_days(
        &self,
        spec: &GridSpec,
        first: NaiveDate,
        days: usize,
        hours_per_day: u32,
    ) -> Vec<PathBuf> {
        first
            .iter_days()
            .take(days)
            .enumerate()
            .map(|(i, day)| {
                let cube = create_temperature_cube(hours_per_day as usize, spec.n_lat, spec.n_lon)
                    + i as f32;
                let raster = synthetic_raster(
                    spec,
                    hourly_times(day, 0..hours_per_day),
                    variables::TEMPERATURE_2M_SHORT,
                    cube,
                );
                self.write_day(variables::TEMPERATURE_2M, day, &raster)
            })
            .collect()
    }
}

impl Default for DayStoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one day store where `locator` expects it.
pub fn write_day_store(
    locator: &dyn FileLocator,
    variable: &str,
    day: NaiveDate,
    raster: &Raster,
) -> PathBuf {
    let path = locator.locate(variable, day);
    DayStoreWriter::new()
        .write(&path, raster)
        .expect("Failed to write day store fixture");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_temperature_days_uses_canonical_names() {
        let fixture = DayStoreFixture::new();
        let spec = GridSpec::era5(61.0, 300.0, 4, 4);
        let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let paths = fixture.write_temperature_days(&spec, first, 2, 3);
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("2m_temperature-2023-01-02.zarr"));
        assert!(paths.iter().all(|p| p.join("zarr.json").exists()));
    }
}

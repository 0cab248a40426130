//! Synthetic ERA5-like rasters.
//!
//! These generators create predictable, verifiable data patterns on a
//! descending-latitude / ascending-longitude grid.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use ndarray::Array3;

use reanalysis_common::{BoundingBox, Raster, NATIVE_RESOLUTION};

/// A regular grid anchored at its north-west cell centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub max_lat: f64,
    pub min_lon: f64,
    pub n_lat: usize,
    pub n_lon: usize,
    pub resolution: f64,
}

impl GridSpec {
    /// A grid at ERA5 native resolution.
    pub const fn era5(max_lat: f64, min_lon: f64, n_lat: usize, n_lon: usize) -> Self {
        Self {
            max_lat,
            min_lon,
            n_lat,
            n_lon,
            resolution: NATIVE_RESOLUTION,
        }
    }

    /// Latitudes, north to south.
    pub fn latitudes(&self) -> Vec<f64> {
        (0..self.n_lat)
            .map(|i| self.max_lat - i as f64 * self.resolution)
            .collect()
    }

    /// Longitudes, west to east.
    pub fn longitudes(&self) -> Vec<f64> {
        (0..self.n_lon)
            .map(|i| self.min_lon + i as f64 * self.resolution)
            .collect()
    }

    /// Extent of the cell centres.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.max_lat - (self.n_lat.max(1) - 1) as f64 * self.resolution,
            self.max_lat,
            self.min_lon,
            self.min_lon + (self.n_lon.max(1) - 1) as f64 * self.resolution,
        )
    }
}

/// Timestamps at the given hours of `day`.
pub fn hourly_times(day: NaiveDate, hours: impl IntoIterator<Item = u32>) -> Vec<DateTime<Utc>> {
    let midnight = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("valid midnight"));
    hours
        .into_iter()
        .map(|h| midnight + Duration::hours(i64::from(h)))
        .collect()
}

/// Creates a cube with predictable values.
///
/// Each cell value is `t * 10000 + row * 100 + col`, so any cell can be
/// checked against its indices.
///
/// # Example
///
/// ```
/// use test_utils::create_test_cube;
///
/// let cube = create_test_cube(2, 3, 4);
/// assert_eq!(cube[[1, 2, 3]], 10203.0);
/// ```
pub fn create_test_cube(n_time: usize, n_lat: usize, n_lon: usize) -> Array3<f32> {
    Array3::from_shape_fn((n_time, n_lat, n_lon), |(t, row, col)| {
        (t * 10000 + row * 100 + col) as f32
    })
}

/// Creates a cube of temperature-like values in Kelvin.
///
/// Colder to the north (row 0), warmer to the east, with a small diurnal
/// cycle over time steps. Values stay within 240K..300K.
pub fn create_temperature_cube(n_time: usize, n_lat: usize, n_lon: usize) -> Array3<f32> {
    Array3::from_shape_fn((n_time, n_lat, n_lon), |(t, row, col)| {
        let y_factor = row as f32 / n_lat.max(1) as f32;
        let x_factor = col as f32 / n_lon.max(1) as f32;
        let diurnal = ((t % 24) as f32 / 24.0 * std::f32::consts::TAU).sin();
        245.0 + y_factor * 30.0 + x_factor * 20.0 + diurnal * 3.0
    })
}

/// Creates a cube of deterministic precipitation-like values in metres.
///
/// Most cells are dry; roughly a quarter hold up to 0.05 m.
pub fn create_precipitation_cube(
    n_time: usize,
    n_lat: usize,
    n_lon: usize,
    seed: u32,
) -> Array3<f32> {
    Array3::from_shape_fn((n_time, n_lat, n_lon), |(t, row, col)| {
        let hash = simple_hash(col as u32, (row + t * n_lat) as u32, seed);
        if hash % 4 == 0 {
            (hash % 5000) as f32 / 100_000.0
        } else {
            0.0
        }
    })
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Creates a cube of zeros with `NaN` at the given `(t, row, col)` positions.
pub fn create_cube_with_nans(
    n_time: usize,
    n_lat: usize,
    n_lon: usize,
    nan_positions: &[(usize, usize, usize)],
) -> Array3<f32> {
    let mut cube = Array3::zeros((n_time, n_lat, n_lon));
    for &(t, row, col) in nan_positions {
        if let Some(v) = cube.get_mut([t, row, col]) {
            *v = f32::NAN;
        }
    }
    cube
}

/// Builds a single-variable raster on `spec`.
///
/// Panics if `data` does not match the grid and time axis.
pub fn synthetic_raster(
    spec: &GridSpec,
    times: Vec<DateTime<Utc>>,
    short_name: &str,
    data: Array3<f32>,
) -> Raster {
    let mut variables = BTreeMap::new();
    variables.insert(short_name.to_string(), data);
    Raster::new(
        spec.latitudes(),
        spec.longitudes(),
        times,
        spec.resolution,
        variables,
    )
    .expect("synthetic raster must match its grid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_axes() {
        let spec = GridSpec::era5(80.0, 285.0, 3, 4);
        assert_eq!(spec.latitudes(), vec![80.0, 79.75, 79.5]);
        assert_eq!(spec.longitudes(), vec![285.0, 285.25, 285.5, 285.75]);
        assert_eq!(spec.bbox(), BoundingBox::new(79.5, 80.0, 285.0, 285.75));
    }

    #[test]
    fn test_create_test_cube() {
        let cube = create_test_cube(2, 5, 10);
        assert_eq!(cube.dim(), (2, 5, 10));
        assert_eq!(cube[[0, 0, 0]], 0.0);
        assert_eq!(cube[[0, 0, 1]], 1.0);
        assert_eq!(cube[[0, 1, 0]], 100.0);
        assert_eq!(cube[[1, 4, 9]], 10409.0);
    }

    #[test]
    fn test_create_temperature_cube_range() {
        let cube = create_temperature_cube(24, 50, 50);
        let min = cube.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = cube.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(min >= 240.0);
        assert!(max <= 300.0);
    }

    #[test]
    fn test_precipitation_deterministic() {
        let a = create_precipitation_cube(2, 20, 20, 42);
        let b = create_precipitation_cube(2, 20, 20, 42);
        assert_eq!(a, b, "Same seed should produce same data");
        assert_ne!(a, create_precipitation_cube(2, 20, 20, 43));
    }

    #[test]
    fn test_create_cube_with_nans() {
        let cube = create_cube_with_nans(2, 3, 3, &[(1, 2, 2), (5, 0, 0)]);
        assert!(cube[[1, 2, 2]].is_nan());
        assert_eq!(cube.iter().filter(|v| v.is_nan()).count(), 1);
    }

    #[test]
    fn test_synthetic_raster() {
        let spec = GridSpec::era5(60.0, 0.0, 4, 4);
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let raster = synthetic_raster(&spec, hourly_times(day, 0..3), "t2m", create_test_cube(3, 4, 4));
        assert_eq!(raster.shape(), (3, 4, 4));
        assert_eq!(raster.times()[2].to_rfc3339(), "2023-01-01T02:00:00+00:00");
    }
}

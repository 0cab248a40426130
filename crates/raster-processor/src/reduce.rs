//! Whole-raster and per-axis reductions.

use std::collections::BTreeMap;

use ndarray::{Array2, Axis};

use reanalysis_common::{AggregationMethod, Raster, RasterResult, TimeResolution};

use crate::temporal::{collapse_time, regroup_series};
use crate::types::TimeSeries;

/// Reduce every cell of every variable to one `f64` per variable.
pub fn reduce_all(raster: &Raster, method: AggregationMethod) -> BTreeMap<String, f64> {
    raster
        .variables()
        .iter()
        .map(|(name, data)| (name.clone(), method.reduce_f64(data.iter().copied())))
        .collect()
}

/// Reduce latitude and longitude per time step, then regroup by `resolution`.
///
/// Both stages use `method`.
pub fn spatial_series(
    raster: &Raster,
    method: AggregationMethod,
    resolution: TimeResolution,
) -> RasterResult<BTreeMap<String, TimeSeries>> {
    let mut out = BTreeMap::new();
    for (name, data) in raster.variables() {
        let per_step: Vec<f64> = data
            .axis_iter(Axis(0))
            .map(|layer| method.reduce_f64(layer.iter().copied()))
            .collect();
        let (times, values) = regroup_series(raster.times(), &per_step, resolution, method)?;
        out.insert(name.clone(), TimeSeries::new(times, values)?);
    }
    Ok(out)
}

/// Collapse the time axis of every variable with `method`.
pub fn collapse_all(raster: &Raster, method: AggregationMethod) -> BTreeMap<String, Array2<f32>> {
    raster
        .variables()
        .iter()
        .map(|(name, data)| (name.clone(), collapse_time(data, method)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_utils::{create_cube_with_nans, create_test_cube, hourly_times, synthetic_raster, GridSpec};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    #[test]
    fn test_reduce_all() {
        let spec = GridSpec::era5(10.0, 0.0, 2, 2);
        let raster = synthetic_raster(&spec, hourly_times(day(), 0..2), "t2m", create_test_cube(2, 2, 2));
        // cells: 0, 1, 100, 101, then +10000
        assert_eq!(reduce_all(&raster, AggregationMethod::Mean)["t2m"], 5050.5);
        assert_eq!(reduce_all(&raster, AggregationMethod::Max)["t2m"], 10101.0);
        assert_eq!(reduce_all(&raster, AggregationMethod::Min)["t2m"], 0.0);
    }

    #[test]
    fn test_reduce_all_skips_nan_and_handles_empty() {
        let spec = GridSpec::era5(10.0, 0.0, 2, 2);
        let cube = create_cube_with_nans(1, 2, 2, &[(0, 0, 0)]) + 1.0;
        let raster = synthetic_raster(&spec, hourly_times(day(), 0..1), "t2m", cube);
        assert_eq!(reduce_all(&raster, AggregationMethod::Mean)["t2m"], 1.0);

        let empty = synthetic_raster(&spec, vec![], "t2m", create_test_cube(0, 2, 2));
        assert!(reduce_all(&empty, AggregationMethod::Mean)["t2m"].is_nan());
    }

    #[test]
    fn test_spatial_series_hourly_and_daily() {
        let spec = GridSpec::era5(10.0, 0.0, 2, 2);
        let raster = synthetic_raster(&spec, hourly_times(day(), 0..30), "t2m", create_test_cube(30, 2, 2));

        let hourly = spatial_series(&raster, AggregationMethod::Mean, TimeResolution::Hour).unwrap();
        let series = &hourly["t2m"];
        assert_eq!(series.len(), 30);
        assert_eq!(series.values[3], 30_050.5);

        let daily = spatial_series(&raster, AggregationMethod::Max, TimeResolution::Day).unwrap();
        assert_eq!(daily["t2m"].values, vec![230_101.0, 290_101.0]);
    }

    #[test]
    fn test_collapse_all() {
        let spec = GridSpec::era5(10.0, 0.0, 2, 3);
        let raster = synthetic_raster(&spec, hourly_times(day(), 0..4), "t2m", create_test_cube(4, 2, 3));
        let layers = collapse_all(&raster, AggregationMethod::Min);
        assert_eq!(layers["t2m"].dim(), (2, 3));
        assert_eq!(layers["t2m"][[1, 2]], 102.0);
    }
}

//! Spatial-temporal resampling: coarsen, then regroup time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use reanalysis_common::{
    AggregationMethod, Raster, RasterResult, TimeResolution, NATIVE_RESOLUTION,
};

use crate::coarsen::{coarsen, coarsen_factor};
use crate::temporal::resample_time;

/// Target resolutions and reducers for [`resample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleParams {
    /// Target grid spacing in degrees.
    pub spatial_resolution: f64,
    pub spatial_aggregation: AggregationMethod,
    pub time_resolution: TimeResolution,
    pub time_aggregation: AggregationMethod,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            spatial_resolution: NATIVE_RESOLUTION,
            spatial_aggregation: AggregationMethod::Mean,
            time_resolution: TimeResolution::Hour,
            time_aggregation: AggregationMethod::Mean,
        }
    }
}

impl ResampleParams {
    pub fn new(spatial_resolution: f64) -> Self {
        Self {
            spatial_resolution,
            ..Self::default()
        }
    }

    pub fn with_spatial_aggregation(mut self, method: AggregationMethod) -> Self {
        self.spatial_aggregation = method;
        self
    }

    pub fn with_time_resolution(mut self, resolution: TimeResolution) -> Self {
        self.time_resolution = resolution;
        self
    }

    pub fn with_time_aggregation(mut self, method: AggregationMethod) -> Self {
        self.time_aggregation = method;
        self
    }

    /// Same parameters with hourly time, i.e. spatial coarsening only.
    pub fn spatial_only(self) -> Self {
        self.with_time_resolution(TimeResolution::Hour)
    }
}

/// Resample `raster` to `params`.
///
/// The coarsen factor is `spatial_resolution / raster.resolution()` and must
/// be a whole number of at least 1. Spatial reduction always runs before
/// temporal reduction. With factor 1 and hourly time the raster is returned
/// unchanged.
pub fn resample(raster: &Raster, params: &ResampleParams) -> RasterResult<Raster> {
    let factor = coarsen_factor(params.spatial_resolution, raster.resolution())?;

    let coarse = coarsen(raster, factor, params.spatial_aggregation)?;
    let out = resample_time(&coarse, params.time_resolution, params.time_aggregation)?;

    debug!(
        factor = factor,
        spatial = %params.spatial_aggregation,
        time = %params.time_resolution,
        input = ?raster.shape(),
        output = ?out.shape(),
        "Resampled raster"
    );
    Ok(out)
}

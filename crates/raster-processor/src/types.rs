//! Query result types.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use reanalysis_common::{RasterError, RasterResult};

/// One value per time label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<DateTime<Utc>>, values: Vec<f64>) -> RasterResult<Self> {
        if times.len() != values.len() {
            return Err(RasterError::format(format!(
                "time series has {} labels but {} values",
                times.len(),
                values.len()
            )));
        }
        Ok(Self { times, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single 2-D layer on a latitude/longitude grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatMap {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// `(latitude, longitude)` values, latitude descending.
    pub values: Array2<f32>,
}

impl HeatMap {
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>, values: Array2<f32>) -> RasterResult<Self> {
        if values.dim() != (latitudes.len(), longitudes.len()) {
            return Err(RasterError::format(format!(
                "heat map values {:?} do not match a {}x{} grid",
                values.dim(),
                latitudes.len(),
                longitudes.len()
            )));
        }
        Ok(Self {
            latitudes,
            longitudes,
            values,
        })
    }
}

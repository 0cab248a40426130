//! Calendar bucketing of the time axis.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::{s, Array2, Array3};
use tracing::debug;

use reanalysis_common::{AggregationMethod, Raster, RasterError, RasterResult, TimeResolution};

use crate::coarsen::stack_layers;

/// Time steps grouped into contiguous calendar buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBuckets {
    /// Bucket labels, the start of each bucket, ascending and gap-free.
    pub starts: Vec<DateTime<Utc>>,
    /// Indices into the source time axis for each bucket, in source order.
    pub members: Vec<Vec<usize>>,
}

impl TimeBuckets {
    /// Group `times` by `resolution`.
    ///
    /// Buckets run from the earliest to the latest bucket touched by any
    /// timestamp. Buckets in between with no samples have no members. The
    /// input does not need to be sorted.
    pub fn group(times: &[DateTime<Utc>], resolution: TimeResolution) -> RasterResult<Self> {
        let labels: Vec<DateTime<Utc>> = times.iter().map(|t| resolution.bucket_start(*t)).collect();
        let (Some(first), Some(last)) = (labels.iter().min(), labels.iter().max()) else {
            return Ok(Self {
                starts: Vec::new(),
                members: Vec::new(),
            });
        };

        let mut starts = Vec::new();
        let mut cursor = *first;
        while cursor <= *last {
            starts.push(cursor);
            cursor = resolution.next_bucket(cursor).ok_or_else(|| {
                RasterError::format(format!("calendar overflow after {}", cursor))
            })?;
        }

        let index: BTreeMap<DateTime<Utc>, usize> =
            starts.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        let mut members = vec![Vec::new(); starts.len()];
        for (t, label) in labels.iter().enumerate() {
            if let Some(b) = index.get(label) {
                members[*b].push(t);
            }
        }

        Ok(Self { starts, members })
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Regroup the time axis of `raster` into calendar buckets.
///
/// `Hour` leaves the raster as it is. Otherwise each bucket is reduced with
/// `method` cell by cell and labeled by its start; empty buckets hold `NaN`.
///
/// Month and year buckets are therefore labelled with the first instant of
/// the period (`2023-01-01T00:00Z` for January 2023), not with its last day
/// as pandas-style `"M"`/`"Y"` resampling does.
pub fn resample_time(
    raster: &Raster,
    resolution: TimeResolution,
    method: AggregationMethod,
) -> RasterResult<Raster> {
    if resolution == TimeResolution::Hour {
        return Ok(raster.clone());
    }

    let buckets = TimeBuckets::group(raster.times(), resolution)?;
    let (_, n_lat, n_lon) = raster.shape();

    let mut variables = BTreeMap::new();
    for (name, data) in raster.variables() {
        let layers: Vec<Array2<f32>> = buckets
            .members
            .iter()
            .map(|members| {
                Array2::from_shape_fn((n_lat, n_lon), |(y, x)| {
                    method.reduce(members.iter().map(|t| data[[*t, y, x]]))
                })
            })
            .collect();
        variables.insert(name.clone(), stack_layers(layers, n_lat, n_lon)?);
    }

    debug!(
        resolution = %resolution,
        method = %method,
        steps = raster.times().len(),
        buckets = buckets.len(),
        "Resampled time axis"
    );

    Raster::new(
        raster.latitudes().to_vec(),
        raster.longitudes().to_vec(),
        buckets.starts,
        raster.resolution(),
        variables,
    )
}

/// Regroup a per-step series into calendar buckets with `method`.
///
/// Returns bucket labels and one value per bucket, `NaN` for empty buckets.
pub fn regroup_series(
    times: &[DateTime<Utc>],
    values: &[f64],
    resolution: TimeResolution,
    method: AggregationMethod,
) -> RasterResult<(Vec<DateTime<Utc>>, Vec<f64>)> {
    if times.len() != values.len() {
        return Err(RasterError::format(format!(
            "series has {} timestamps but {} values",
            times.len(),
            values.len()
        )));
    }
    if resolution == TimeResolution::Hour {
        return Ok((times.to_vec(), values.to_vec()));
    }

    let buckets = TimeBuckets::group(times, resolution)?;
    let reduced = buckets
        .members
        .iter()
        .map(|members| method.reduce_f64(members.iter().map(|t| values[*t])))
        .collect();
    Ok((buckets.starts, reduced))
}

/// Collapse the time axis of one variable with `method`, per cell.
pub fn collapse_time(data: &Array3<f32>, method: AggregationMethod) -> Array2<f32> {
    let (_, n_lat, n_lon) = data.dim();
    Array2::from_shape_fn((n_lat, n_lon), |(y, x)| {
        method.reduce(data.slice(s![.., y, x]).iter().copied())
    })
}

//! In-memory raster: named `f32` variables over (time, latitude, longitude).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Array3, ArrayView3, Axis};

use crate::error::{RasterError, RasterResult};
use crate::COORD_EPSILON;

/// Key under which a polygon mask is attached to a raster.
pub const SHAPE_MASK: &str = "shape";

/// Relative tolerance when checking axis spacing against the resolution.
const STEP_TOLERANCE: f64 = 1e-6;

/// Boolean overlay carried alongside raster values.
#[derive(Debug, Clone, PartialEq)]
pub enum Mask {
    /// Per (lat, lon) cell, after collapsing time.
    Spatial(Array2<bool>),
    /// Per time step, after collapsing latitude and longitude.
    Temporal(Array1<bool>),
    /// Per (lat, lon) cell, true where the cell centre lies in a polygon.
    Shape(Array2<bool>),
}

impl Mask {
    /// Number of `true` entries.
    pub fn count(&self) -> usize {
        match self {
            Self::Spatial(m) | Self::Shape(m) => m.iter().filter(|v| **v).count(),
            Self::Temporal(m) => m.iter().filter(|v| **v).count(),
        }
    }

    /// The 2-D grid for spatial and shape masks.
    pub fn as_grid(&self) -> Option<&Array2<bool>> {
        match self {
            Self::Spatial(m) | Self::Shape(m) => Some(m),
            Self::Temporal(_) => None,
        }
    }

    /// The 1-D series for temporal masks.
    pub fn as_series(&self) -> Option<&Array1<bool>> {
        match self {
            Self::Temporal(m) => Some(m),
            _ => None,
        }
    }
}

/// Gridded data on a regular latitude/longitude grid.
///
/// Invariants, checked by [`Raster::new`]:
/// - latitude is strictly descending, longitude strictly ascending, both with
///   a uniform step equal to `resolution`;
/// - every variable has shape `(times, latitudes, longitudes)`.
///
/// Time is kept in whatever order the source provided; concatenating
/// overlapping days can produce repeated timestamps.
#[derive(Debug, Clone)]
pub struct Raster {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    resolution: f64,
    variables: BTreeMap<String, Array3<f32>>,
    masks: BTreeMap<String, Mask>,
}

impl Raster {
    pub fn new(
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        times: Vec<DateTime<Utc>>,
        resolution: f64,
        variables: BTreeMap<String, Array3<f32>>,
    ) -> RasterResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(RasterError::format(format!(
                "grid resolution must be positive, got {}",
                resolution
            )));
        }

        check_axis("latitude", &latitudes, -resolution)?;
        check_axis("longitude", &longitudes, resolution)?;

        let expected = (times.len(), latitudes.len(), longitudes.len());
        for (name, data) in &variables {
            if data.dim() != expected {
                return Err(RasterError::format(format!(
                    "variable '{}' has shape {:?}, expected {:?}",
                    name,
                    data.dim(),
                    expected
                )));
            }
        }

        Ok(Self {
            latitudes,
            longitudes,
            times,
            resolution,
            variables,
            masks: BTreeMap::new(),
        })
    }

    /// Attach a mask, checking it against the grid.
    pub fn with_mask(mut self, name: impl Into<String>, mask: Mask) -> RasterResult<Self> {
        let name = name.into();
        let ok = match &mask {
            Mask::Spatial(m) | Mask::Shape(m) => {
                m.dim() == (self.latitudes.len(), self.longitudes.len())
            }
            Mask::Temporal(m) => m.len() == self.times.len(),
        };
        if !ok {
            return Err(RasterError::format(format!(
                "mask '{}' does not match raster shape {:?}",
                name,
                self.shape()
            )));
        }
        self.masks.insert(name, mask);
        Ok(self)
    }

    /// Concatenate rasters along time, in the order given.
    ///
    /// All parts must share latitude, longitude, resolution and variable
    /// names. Masks are not carried over.
    pub fn concat_time(parts: Vec<Raster>) -> RasterResult<Raster> {
        let mut iter = parts.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| RasterError::format("no rasters to concatenate"))?;
        let rest: Vec<Raster> = iter.collect();
        if rest.is_empty() {
            return Ok(first.without_masks());
        }

        for (i, part) in rest.iter().enumerate() {
            if !axes_match(&first.latitudes, &part.latitudes)
                || !axes_match(&first.longitudes, &part.longitudes)
            {
                return Err(RasterError::format(format!(
                    "raster {} has a different latitude/longitude grid",
                    i + 1
                )));
            }
            if !first.variables.keys().eq(part.variables.keys()) {
                return Err(RasterError::format(format!(
                    "raster {} holds variables {:?}, expected {:?}",
                    i + 1,
                    part.variable_names(),
                    first.variable_names()
                )));
            }
        }

        let mut times = first.times.clone();
        for part in &rest {
            times.extend_from_slice(&part.times);
        }

        let mut variables = BTreeMap::new();
        for (name, data) in &first.variables {
            let mut views: Vec<ArrayView3<f32>> = vec![data.view()];
            for part in &rest {
                if let Some(other) = part.variables.get(name) {
                    views.push(other.view());
                }
            }
            let joined = ndarray::concatenate(Axis(0), &views)
                .map_err(|e| RasterError::format(format!("concatenating '{}': {}", name, e)))?;
            variables.insert(name.clone(), joined);
        }

        Raster::new(
            first.latitudes,
            first.longitudes,
            times,
            first.resolution,
            variables,
        )
    }

    fn without_masks(mut self) -> Self {
        self.masks.clear();
        self
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// Grid spacing in degrees.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn variable(&self, name: &str) -> Option<&Array3<f32>> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Array3<f32>> {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    pub fn masks(&self) -> &BTreeMap<String, Mask> {
        &self.masks
    }

    pub fn mask(&self, name: &str) -> Option<&Mask> {
        self.masks.get(name)
    }

    /// `(time, latitude, longitude)` lengths.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.latitudes.len(), self.longitudes.len())
    }

    /// True when any axis has no entries.
    pub fn is_empty(&self) -> bool {
        let (t, y, x) = self.shape();
        t == 0 || y == 0 || x == 0
    }
}

fn check_axis(name: &str, values: &[f64], step: f64) -> RasterResult<()> {
    let tolerance = step.abs() * STEP_TOLERANCE;
    for pair in values.windows(2) {
        let delta = pair[1] - pair[0];
        if delta.signum() != step.signum() || (delta - step).abs() > tolerance {
            let order = if step < 0.0 { "descending" } else { "ascending" };
            return Err(RasterError::format(format!(
                "{} axis must be strictly {} with step {}, found {} -> {}",
                name,
                order,
                step.abs(),
                pair[0],
                pair[1]
            )));
        }
    }
    Ok(())
}

fn axes_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= COORD_EPSILON)
}

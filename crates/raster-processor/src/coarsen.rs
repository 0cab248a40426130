//! Spatial coarsening by block aggregation.
//!
//! A raster at resolution `r` coarsened by an integer factor `f` becomes a
//! raster at `f * r`: every non-overlapping `f x f` block of cells is reduced
//! to one cell. Trailing rows and columns that do not fill a block are
//! trimmed.

use std::collections::BTreeMap;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use tracing::debug;

use reanalysis_common::{AggregationMethod, Raster, RasterError, RasterResult};

/// Relative tolerance when deciding whether a resolution ratio is whole.
const FACTOR_TOLERANCE: f64 = 1e-6;

/// Integer coarsening factor taking `current` resolution to `target`.
///
/// Fails with `InvalidParameter` unless `target / current` is a whole
/// number of at least 1.
pub fn coarsen_factor(target: f64, current: f64) -> RasterResult<usize> {
    let invalid = || RasterError::invalid_parameter("spatial_resolution", target);

    if !(target.is_finite() && target > 0.0 && current.is_finite() && current > 0.0) {
        return Err(invalid());
    }

    let ratio = target / current;
    let rounded = ratio.round();
    if rounded < 1.0 || (ratio - rounded).abs() > FACTOR_TOLERANCE * rounded {
        return Err(invalid());
    }
    Ok(rounded as usize)
}

/// Reduce one 2-D grid by `factor x factor` blocks.
///
/// Returns a grid of `(rows / factor, cols / factor)`.
pub fn coarsen_grid(grid: ArrayView2<f32>, factor: usize, method: AggregationMethod) -> Array2<f32> {
    let (rows, cols) = grid.dim();
    let out_rows = rows / factor;
    let out_cols = cols / factor;

    Array2::from_shape_fn((out_rows, out_cols), |(oy, ox)| {
        let y0 = oy * factor;
        let x0 = ox * factor;
        let block = (y0..y0 + factor).flat_map(|y| (x0..x0 + factor).map(move |x| grid[[y, x]]));
        method.reduce(block)
    })
}

/// Coarsen every variable of `raster` by `factor`.
///
/// New coordinates are the mean of each block's coordinates and the new
/// resolution is `factor * resolution`. A factor of 1 returns the input
/// unchanged. Time steps are processed in order on the calling thread.
pub fn coarsen(raster: &Raster, factor: usize, method: AggregationMethod) -> RasterResult<Raster> {
    if factor == 0 {
        return Err(RasterError::invalid_parameter("coarsen_factor", factor));
    }
    if factor == 1 {
        return Ok(raster.clone());
    }

    let latitudes = block_means(raster.latitudes(), factor);
    let longitudes = block_means(raster.longitudes(), factor);

    let mut variables = BTreeMap::new();
    for (name, data) in raster.variables() {
        let layers: Vec<Array2<f32>> = data
            .axis_iter(Axis(0))
            .map(|layer| coarsen_grid(layer, factor, method))
            .collect();
        variables.insert(
            name.clone(),
            stack_layers(layers, latitudes.len(), longitudes.len())?,
        );
    }

    debug!(
        factor = factor,
        method = %method,
        input = ?raster.shape(),
        lats = latitudes.len(),
        lons = longitudes.len(),
        "Coarsened raster"
    );

    Raster::new(
        latitudes,
        longitudes,
        raster.times().to_vec(),
        raster.resolution() * factor as f64,
        variables,
    )
}

fn block_means(axis: &[f64], factor: usize) -> Vec<f64> {
    axis.chunks_exact(factor)
        .map(|block| block.iter().sum::<f64>() / factor as f64)
        .collect()
}

/// Stack per-time 2-D layers into `(time, rows, cols)`.
pub(crate) fn stack_layers(
    layers: Vec<Array2<f32>>,
    rows: usize,
    cols: usize,
) -> RasterResult<Array3<f32>> {
    let n = layers.len();
    let mut values = Vec::with_capacity(n * rows * cols);
    for layer in layers {
        values.extend(layer.iter().copied());
    }
    Array3::from_shape_vec((n, rows, cols), values).map_err(|e| RasterError::format(e.to_string()))
}

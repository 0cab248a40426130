//! Threshold masking and existence masks.
//!
//! Criteria masking keeps values and replaces the ones that fail the
//! predicate with `NaN`. Existence masks then collapse an axis, marking
//! where non-missing values remain under `any` or `all` semantics.

use std::collections::BTreeMap;

use ndarray::{s, Array1, Array2};
use tracing::debug;

use reanalysis_common::{AnyOrAll, Criteria, Mask, Raster, RasterResult};

/// Replace every value that does not satisfy `criteria` with `NaN`.
///
/// Shape, coordinates and masks are preserved. `NaN` input stays `NaN`.
pub fn apply_criteria(raster: &Raster, criteria: &Criteria) -> RasterResult<Raster> {
    let mut variables = BTreeMap::new();
    for (name, data) in raster.variables() {
        let masked = data.mapv(|v| if criteria.matches(v) { v } else { f32::NAN });
        variables.insert(name.clone(), masked);
    }

    let mut out = Raster::new(
        raster.latitudes().to_vec(),
        raster.longitudes().to_vec(),
        raster.times().to_vec(),
        raster.resolution(),
        variables,
    )?;
    for (name, mask) in raster.masks() {
        out = out.with_mask(name.clone(), mask.clone())?;
    }

    debug!(
        predicate = %criteria.predicate,
        threshold = criteria.threshold,
        "Applied value criteria"
    );
    Ok(out)
}

/// Per-cell flags: does any (or every) time step hold a value?
///
/// One `Mask::Spatial` is attached per variable, keyed by its name.
pub fn spatial_existence(raster: &Raster, mode: AnyOrAll) -> RasterResult<Raster> {
    let (_, n_lat, n_lon) = raster.shape();
    let mut out = raster.clone();
    for (name, data) in raster.variables() {
        let grid = Array2::from_shape_fn((n_lat, n_lon), |(y, x)| {
            mode.collapse(data.slice(s![.., y, x]).iter().map(|v| !v.is_nan()))
        });
        out = out.with_mask(name.clone(), Mask::Spatial(grid))?;
    }
    Ok(out)
}

/// Per-step flags: does any (or every) cell hold a value?
///
/// One `Mask::Temporal` is attached per variable, keyed by its name.
pub fn temporal_existence(raster: &Raster, mode: AnyOrAll) -> RasterResult<Raster> {
    let (n_time, _, _) = raster.shape();
    let mut out = raster.clone();
    for (name, data) in raster.variables() {
        let series = Array1::from_shape_fn(n_time, |t| {
            mode.collapse(data.slice(s![t, .., ..]).iter().map(|v| !v.is_nan()))
        });
        out = out.with_mask(name.clone(), Mask::Temporal(series))?;
    }
    Ok(out)
}

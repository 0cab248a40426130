//! NetCDF reader for ERA5 per-day files as delivered by the CDS.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array3;
use tracing::debug;

use reanalysis_common::{Raster, RasterError, RasterResult};

use super::{ensure_exists, RasterReader};
use crate::cf_time::{decode_axis, CfTimeUnits};

/// Reads one variable plus coordinates from an ERA5 NetCDF file.
///
/// Packed variables are unpacked with `scale_factor`/`add_offset` and
/// `_FillValue`/`missing_value` become `NaN`.
#[derive(Debug, Clone)]
pub struct NetCdfDayReader {
    resolution: f64,
}

impl NetCdfDayReader {
    pub fn new(resolution: f64) -> Self {
        Self { resolution }
    }
}

impl RasterReader for NetCdfDayReader {
    fn read(&self, path: &Path, short_name: &str) -> RasterResult<Raster> {
        ensure_exists(path)?;

        let file = netcdf::open(path).map_err(|e| {
            RasterError::format(format!("{}: failed to open NetCDF: {}", path.display(), e))
        })?;

        let latitudes = read_coordinate(&file, path, &["latitude", "lat"])?;
        let longitudes = read_coordinate(&file, path, &["longitude", "lon"])?;

        let time_var = find_variable(&file, path, &["time", "valid_time"])?;
        let units = get_str_attr(&time_var, "units").ok_or_else(|| {
            RasterError::format(format!("{}: time axis has no units", path.display()))
        })?;
        let units = CfTimeUnits::parse(&units)?;
        let raw_times: Vec<f64> = time_var
            .get_values(..)
            .map_err(|e| RasterError::format(format!("failed to read time: {}", e)))?;
        let times = decode_axis(&units, &raw_times)?;

        let var = find_variable(&file, path, &[short_name])?;
        let expected = (times.len(), latitudes.len(), longitudes.len());
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if dims != [expected.0, expected.1, expected.2] {
            return Err(RasterError::format(format!(
                "{}: variable '{}' has shape {:?}, expected {:?}",
                path.display(),
                short_name,
                dims,
                expected
            )));
        }

        let raw: Vec<f64> = var
            .get_values(..)
            .map_err(|e| RasterError::format(format!("failed to read {}: {}", short_name, e)))?;

        let scale = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
        let fill = get_f64_attr(&var, "_FillValue").or_else(|| get_f64_attr(&var, "missing_value"));

        let values: Vec<f32> = raw
            .into_iter()
            .map(|v| {
                if Some(v) == fill || v.is_nan() {
                    f32::NAN
                } else {
                    (v * scale + offset) as f32
                }
            })
            .collect();

        let data = Array3::from_shape_vec(expected, values)
            .map_err(|e| RasterError::format(e.to_string()))?;

        debug!(
            path = %path.display(),
            variable = short_name,
            times = expected.0,
            "Read NetCDF day file"
        );

        let mut variables = BTreeMap::new();
        variables.insert(short_name.to_string(), data);
        Raster::new(latitudes, longitudes, times, self.resolution, variables)
    }

    fn format_name(&self) -> &'static str {
        "netcdf"
    }
}

fn find_variable<'f>(
    file: &'f netcdf::File,
    path: &Path,
    names: &[&str],
) -> RasterResult<netcdf::Variable<'f>> {
    names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| {
            RasterError::format(format!(
                "{}: none of the variables {:?} present",
                path.display(),
                names
            ))
        })
}

fn read_coordinate(file: &netcdf::File, path: &Path, names: &[&str]) -> RasterResult<Vec<f64>> {
    find_variable(file, path, names)?
        .get_values(..)
        .map_err(|e| RasterError::format(format!("failed to read {:?}: {}", names, e)))
}

/// Probe for an attribute without asking HDF5, which logs absent names to stderr.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

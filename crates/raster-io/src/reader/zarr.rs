//! Zarr V3 day-store reader.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ndarray::Array3;
use tracing::debug;
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use reanalysis_common::{Raster, RasterError, RasterResult};

use super::{ensure_exists, RasterReader};
use crate::cf_time::{decode_axis, CfTimeUnits};

const LATITUDE_NAMES: [&str; 2] = ["latitude", "lat"];
const LONGITUDE_NAMES: [&str; 2] = ["longitude", "lon"];
const TIME_NAMES: [&str; 2] = ["time", "valid_time"];

/// Reads one variable plus its coordinates from a Zarr V3 hierarchy on disk.
///
/// Layout: `/latitude`, `/longitude`, `/time` (with a CF `units` attribute)
/// and `/<short_name>` shaped `[time, latitude, longitude]`.
#[derive(Debug, Clone)]
pub struct ZarrDayReader {
    resolution: f64,
}

impl ZarrDayReader {
    /// Create a reader for stores on a grid of `resolution` degrees.
    pub fn new(resolution: f64) -> Self {
        Self { resolution }
    }
}

impl RasterReader for ZarrDayReader {
    fn read(&self, path: &Path, short_name: &str) -> RasterResult<Raster> {
        ensure_exists(path)?;

        let store = Arc::new(
            FilesystemStore::new(path)
                .map_err(|e| RasterError::format(format!("{}: {}", path.display(), e)))?,
        );

        let latitudes = read_f64(&open_any(&store, path, &LATITUDE_NAMES)?)?;
        let longitudes = read_f64(&open_any(&store, path, &LONGITUDE_NAMES)?)?;

        let time_array = open_any(&store, path, &TIME_NAMES)?;
        let units = time_array
            .attributes()
            .get("units")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RasterError::format(format!("{}: time axis has no units", path.display()))
            })?;
        let units = CfTimeUnits::parse(units)?;
        let times = decode_axis(&units, &read_f64(&time_array)?)?;

        let array = open_array(&store, path, short_name)?;
        let shape = array.shape().to_vec();
        let expected = [times.len(), latitudes.len(), longitudes.len()];
        if shape.len() != 3 || shape.iter().zip(&expected).any(|(a, b)| *a != *b as u64) {
            return Err(RasterError::format(format!(
                "{}: variable '{}' has shape {:?}, expected {:?}",
                path.display(),
                short_name,
                shape,
                expected
            )));
        }

        let values = read_f32_masked(&array)?;
        let data = Array3::from_shape_vec((expected[0], expected[1], expected[2]), values)
            .map_err(|e| RasterError::format(e.to_string()))?;

        debug!(
            path = %path.display(),
            variable = short_name,
            times = expected[0],
            lats = expected[1],
            lons = expected[2],
            "Read Zarr day store"
        );

        let mut variables = BTreeMap::new();
        variables.insert(short_name.to_string(), data);
        Raster::new(latitudes, longitudes, times, self.resolution, variables)
    }

    fn format_name(&self) -> &'static str {
        "zarr"
    }
}

fn open_array(
    store: &Arc<FilesystemStore>,
    path: &Path,
    name: &str,
) -> RasterResult<Array<FilesystemStore>> {
    Array::open(store.clone(), &format!("/{}", name)).map_err(|e| {
        RasterError::format(format!("{}: cannot open array '{}': {}", path.display(), name, e))
    })
}

/// Open the first array found among alternative names.
fn open_any(
    store: &Arc<FilesystemStore>,
    path: &Path,
    names: &[&str],
) -> RasterResult<Array<FilesystemStore>> {
    for name in names {
        if path.join(name).is_dir() {
            return open_array(store, path, name);
        }
    }
    Err(RasterError::format(format!(
        "{}: none of the arrays {:?} present",
        path.display(),
        names
    )))
}

fn whole(array: &Array<FilesystemStore>) -> ArraySubset {
    ArraySubset::new_with_shape(array.shape().to_vec())
}

fn read_err(e: impl std::fmt::Display) -> RasterError {
    RasterError::format(format!("failed to read array: {}", e))
}

/// Read a numeric coordinate array as `f64`.
fn read_f64(array: &Array<FilesystemStore>) -> RasterResult<Vec<f64>> {
    let subset = whole(array);
    let values = match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&subset)
            .map_err(read_err)?,
        DataType::Float32 => array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(read_err)?
            .into_iter()
            .map(f64::from)
            .collect(),
        DataType::Int64 => array
            .retrieve_array_subset_elements::<i64>(&subset)
            .map_err(read_err)?
            .into_iter()
            .map(|v| v as f64)
            .collect(),
        DataType::Int32 => array
            .retrieve_array_subset_elements::<i32>(&subset)
            .map_err(read_err)?
            .into_iter()
            .map(f64::from)
            .collect(),
        other => {
            return Err(RasterError::format(format!(
                "unsupported coordinate data type {:?}",
                other
            )))
        }
    };
    Ok(values)
}

fn attr_f64(array: &Array<FilesystemStore>, name: &str) -> Option<f64> {
    array.attributes().get(name).and_then(|v| v.as_f64())
}

/// Read a data variable as `f32`, mapping fill values to `NaN` and
/// unpacking `scale_factor`/`add_offset` for integer storage.
fn read_f32_masked(array: &Array<FilesystemStore>) -> RasterResult<Vec<f32>> {
    let subset = whole(array);
    let attr_fill = attr_f64(array, "_FillValue").or_else(|| attr_f64(array, "missing_value"));

    match array.data_type() {
        DataType::Float32 => {
            let mut data = array
                .retrieve_array_subset_elements::<f32>(&subset)
                .map_err(read_err)?;
            let stored_fill = array
                .fill_value()
                .as_ne_bytes()
                .try_into()
                .map(f32::from_ne_bytes)
                .ok();
            for fill in [stored_fill, attr_fill.map(|f| f as f32)].into_iter().flatten() {
                if !fill.is_nan() {
                    data.iter_mut()
                        .filter(|v| **v == fill)
                        .for_each(|v| *v = f32::NAN);
                }
            }
            Ok(data)
        }
        DataType::Float64 => {
            let data = array
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(read_err)?;
            Ok(data
                .into_iter()
                .map(|v| {
                    if Some(v) == attr_fill {
                        f32::NAN
                    } else {
                        v as f32
                    }
                })
                .collect())
        }
        DataType::Int16 => {
            let raw = array
                .retrieve_array_subset_elements::<i16>(&subset)
                .map_err(read_err)?;
            Ok(unpack(raw.into_iter().map(f64::from), array, attr_fill))
        }
        DataType::Int32 => {
            let raw = array
                .retrieve_array_subset_elements::<i32>(&subset)
                .map_err(read_err)?;
            Ok(unpack(raw.into_iter().map(f64::from), array, attr_fill))
        }
        other => Err(RasterError::format(format!(
            "unsupported variable data type {:?}",
            other
        ))),
    }
}

fn unpack<I>(raw: I, array: &Array<FilesystemStore>, fill: Option<f64>) -> Vec<f32>
where
    I: Iterator<Item = f64>,
{
    let scale = attr_f64(array, "scale_factor").unwrap_or(1.0);
    let offset = attr_f64(array, "add_offset").unwrap_or(0.0);
    raw.map(|v| {
        if Some(v) == fill {
            f32::NAN
        } else {
            (v * scale + offset) as f32
        }
    })
    .collect()
}

//! Zarr V3 day-store writer.
//!
//! Produces the layout [`crate::ZarrDayReader`] reads. Used to ingest
//! converted ERA5 days and to build test fixtures.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use reanalysis_common::{Raster, RasterError, RasterResult};

use crate::cf_time::{CfTimeUnits, WRITER_TIME_UNITS};

/// Writes a [`Raster`] as one Zarr V3 hierarchy.
#[derive(Debug, Clone, Default)]
pub struct DayStoreWriter {
    /// Time steps per chunk of each variable; `None` keeps one chunk per step.
    time_chunk: Option<usize>,
}

impl DayStoreWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group several time steps into one chunk.
    pub fn with_time_chunk(mut self, steps: usize) -> Self {
        self.time_chunk = Some(steps.max(1));
        self
    }

    /// Write every variable of `raster` to a new store at `path`.
    ///
    /// Missing parent directories are created; an existing store at `path`
    /// is overwritten array by array.
    pub fn write(&self, path: &Path, raster: &Raster) -> RasterResult<()> {
        std::fs::create_dir_all(path)?;
        let store = Arc::new(FilesystemStore::new(path).map_err(storage_err)?);

        let mut root_attrs = serde_json::Map::new();
        root_attrs.insert(
            "resolution".to_string(),
            serde_json::json!(raster.resolution()),
        );
        root_attrs.insert("Conventions".to_string(), serde_json::json!("CF-1.7"));
        let mut group = GroupBuilder::new();
        group.attributes(root_attrs);
        group
            .build(store.clone(), "/")
            .map_err(storage_err)?
            .store_metadata()
            .map_err(storage_err)?;

        write_axis(
            &store,
            "/latitude",
            DataType::Float64,
            raster.latitudes(),
            "degrees_north",
        )?;
        write_axis(
            &store,
            "/longitude",
            DataType::Float64,
            raster.longitudes(),
            "degrees_east",
        )?;

        let units = CfTimeUnits::parse(WRITER_TIME_UNITS)?;
        let seconds: Vec<i64> = raster
            .times()
            .iter()
            .map(|t| units.encode(*t).round() as i64)
            .collect();
        write_axis(&store, "/time", DataType::Int64, &seconds, WRITER_TIME_UNITS)?;

        let (n_time, n_lat, n_lon) = raster.shape();
        let time_chunk = self.time_chunk.unwrap_or(1).min(n_time).max(1);
        for (name, data) in raster.variables() {
            let mut attrs = serde_json::Map::new();
            attrs.insert(
                "dimensions".to_string(),
                serde_json::json!(["time", "latitude", "longitude"]),
            );

            let shape = vec![n_time as u64, n_lat as u64, n_lon as u64];
            let chunk_grid: zarrs::array::ChunkGrid = vec![
                time_chunk as u64,
                n_lat.max(1) as u64,
                n_lon.max(1) as u64,
            ]
            .try_into()
            .map_err(|e| RasterError::format(format!("{:?}", e)))?;

            let mut binding = ArrayBuilder::new(
                shape.clone(),
                DataType::Float32,
                chunk_grid,
                FillValue::from(f32::NAN),
            );
            let array = binding
                .attributes(attrs)
                .build(store.clone(), &format!("/{}", name))
                .map_err(storage_err)?;
            array.store_metadata().map_err(storage_err)?;

            if !raster.is_empty() {
                let values: Vec<f32> = data.iter().copied().collect();
                let subset = ArraySubset::new_with_shape(shape);
                array
                    .store_array_subset_elements(&subset, &values)
                    .map_err(storage_err)?;
            }
        }

        debug!(
            path = %path.display(),
            variables = ?raster.variable_names(),
            times = n_time,
            "Wrote Zarr day store"
        );
        Ok(())
    }
}

fn write_axis<T: zarrs::array::Element>(
    store: &Arc<FilesystemStore>,
    array_path: &str,
    data_type: DataType,
    values: &[T],
    units: &str,
) -> RasterResult<()> {
    let fill = match data_type {
        DataType::Int64 => FillValue::from(0i64),
        _ => FillValue::from(f64::NAN),
    };

    let mut attrs = serde_json::Map::new();
    attrs.insert("units".to_string(), serde_json::json!(units));

    let chunk_grid: zarrs::array::ChunkGrid = vec![values.len().max(1) as u64]
        .try_into()
        .map_err(|e| RasterError::format(format!("{:?}", e)))?;

    let mut binding = ArrayBuilder::new(vec![values.len() as u64], data_type, chunk_grid, fill);
    let array = binding
        .attributes(attrs)
        .build(store.clone(), array_path)
        .map_err(storage_err)?;
    array.store_metadata().map_err(storage_err)?;

    if !values.is_empty() {
        let subset = ArraySubset::new_with_shape(vec![values.len() as u64]);
        array
            .store_array_subset_elements(&subset, values)
            .map_err(storage_err)?;
    }
    Ok(())
}

fn storage_err(e: impl std::fmt::Display) -> RasterError {
    RasterError::Io(std::io::Error::other(e.to_string()))
}

//! Configuration for the query layer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use raster_io::{VariableCatalog, DEFAULT_EXTENSION};
use reanalysis_common::NATIVE_RESOLUTION;

use crate::error::{QueryError, QueryResult};

/// Where the data lives and how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Directory holding `<variable>-<YYYY-MM-DD>.<ext>` day files.
    pub data_root: PathBuf,

    /// Day file extension, `zarr` or (with the `netcdf` feature) `nc`.
    pub file_extension: String,

    /// Grid spacing of the source files in degrees.
    pub native_resolution: f64,

    /// Directory searched for named shapes.
    pub shapes_dir: PathBuf,

    /// Read the days of a range on the rayon pool.
    pub parallel_load: bool,

    /// Request name to in-file short name.
    pub variables: VariableCatalog,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data/ERA5"),
            file_extension: DEFAULT_EXTENSION.to_string(),
            native_resolution: NATIVE_RESOLUTION,
            shapes_dir: PathBuf::from("data/shapes"),
            parallel_load: false,
            variables: VariableCatalog::era5(),
        }
    }
}

impl QueryConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ERA5_DATA_ROOT") {
            config.data_root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("ERA5_FILE_EXTENSION") {
            config.file_extension = val.trim_start_matches('.').to_string();
        }

        if let Ok(val) = std::env::var("ERA5_NATIVE_RESOLUTION") {
            if let Ok(resolution) = val.parse() {
                config.native_resolution = resolution;
            }
        }

        if let Ok(val) = std::env::var("ERA5_SHAPES_DIR") {
            config.shapes_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("ERA5_PARALLEL_LOAD") {
            config.parallel_load = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Load configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| QueryError::config(format!("Cannot read {:?}: {}", path, e)))?;
        Self::from_yaml_str(&contents)
            .map_err(|e| QueryError::config(format!("Invalid YAML in {:?}: {}", path, e)))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> QueryResult<()> {
        if !(self.native_resolution.is_finite() && self.native_resolution > 0.0) {
            return Err(QueryError::config(format!(
                "native_resolution must be > 0, got {}",
                self.native_resolution
            )));
        }

        if self.file_extension.trim().is_empty() {
            return Err(QueryError::config("file_extension must not be empty"));
        }

        if self.variables.is_empty() {
            return Err(QueryError::config("variables table must not be empty"));
        }

        Ok(())
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn with_shapes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shapes_dir = dir.into();
        self
    }

    pub fn with_parallel_load(mut self, parallel: bool) -> Self {
        self.parallel_load = parallel;
        self
    }
}

//! Error types for raster loading, resampling and querying.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using RasterError.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors raised anywhere in the load/select/resample/query pipeline.
///
/// An empty selection is deliberately absent: a bounding box or interval
/// matching no data yields an empty raster, not an error.
#[derive(Debug, Error)]
pub enum RasterError {
    /// A per-day file is missing from storage.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A file exists but cannot be decoded as a raster.
    #[error("invalid raster data: {0}")]
    FormatError(String),

    /// A caller-supplied parameter is out of its domain.
    #[error("invalid parameter value for '{param}': {value}")]
    InvalidParameter { param: String, value: String },

    /// A polygon source cannot be parsed.
    #[error("invalid shape: {0}")]
    ShapeError(String),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RasterError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a FormatError.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::FormatError(msg.into())
    }

    /// Create an InvalidParameter error naming the parameter and the value received.
    pub fn invalid_parameter(param: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
        }
    }

    /// Create a ShapeError.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeError(msg.into())
    }

    /// Whether this error was raised by parameter validation (no I/O involved).
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message_names_param_and_value() {
        let err = RasterError::invalid_parameter("spatial_agg_method", "median");
        assert_eq!(
            err.to_string(),
            "invalid parameter value for 'spatial_agg_method': median"
        );
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_file_not_found_message() {
        let err = RasterError::file_not_found("/data/ERA5/2m_temperature-2023-01-01.zarr");
        assert_eq!(
            err.to_string(),
            "file not found: /data/ERA5/2m_temperature-2023-01-01.zarr"
        );
        assert!(!err.is_invalid_parameter());
    }
}

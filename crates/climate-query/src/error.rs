//! Error types for the query layer.

use thiserror::Error;

use reanalysis_common::RasterError;

/// Errors returned by query operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Loading, selecting or resampling failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl QueryError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

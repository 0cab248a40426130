//! Query layer over ERA5 reanalysis rasters.
//!
//! A [`QueryEngine`] answers questions such as "the mean 2m temperature over
//! Greenland last January" or "where did precipitation exceed 10 mm on any
//! day" by composing the loader from `raster-io` with the selection,
//! resampling and masking steps from `raster-processor`.
//!
//! # Example
//!
//! ```ignore
//! use climate_query::{QueryConfig, QueryEngine, RasterQuery};
//! use reanalysis_common::{BoundingBox, TimeRange};
//!
//! let engine = QueryEngine::from_config(&QueryConfig::from_env())?;
//! let range = TimeRange::parse("2023-01-01T00:00:00", "2023-01-01T09:00:00")?;
//! let query = RasterQuery::new("2m_temperature", BoundingBox::new(60.0, 80.0, 285.0, 350.0), range);
//! let mean = engine.single_value_aggregation(&query)?["t2m"];
//! ```

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod shapes;

pub use config::QueryConfig;
pub use descriptor::{QueryParams, RasterQuery};
pub use engine::QueryEngine;
pub use error::{QueryError, QueryResult};
pub use shapes::{load_shape, load_shape_file, resolve_shape_path};

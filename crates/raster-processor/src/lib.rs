//! Raster processing for ERA5 queries.
//!
//! Every query is built from the same steps over an in-memory
//! [`Raster`](reanalysis_common::Raster):
//!
//! ```text
//! loaded raster
//!      │
//!      ▼
//! select(bbox, time range)          bounding selection, inclusive
//!      │
//!      ▼
//! resample(params)
//!      ├─► coarsen(factor, spatial_agg)     f x f block reduction
//!      └─► resample_time(resolution, agg)   calendar buckets
//!      │
//!      ▼
//! reduce / apply_criteria / existence masks / shape rasterization
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_processor::{resample, select, ResampleParams};
//!
//! let window = select(&raster, &bbox, &range)?;
//! let coarse = resample(&window, &ResampleParams::new(1.0))?;
//! ```

pub mod coarsen;
pub mod mask;
pub mod reduce;
pub mod resample;
pub mod select;
pub mod shape;
pub mod temporal;
pub mod types;

pub use coarsen::{coarsen, coarsen_factor, coarsen_grid};
pub use mask::{apply_criteria, spatial_existence, temporal_existence};
pub use reduce::{collapse_all, reduce_all, spatial_series};
pub use resample::{resample, ResampleParams};
pub use select::select;
pub use shape::{Polygon, Shape};
pub use temporal::{collapse_time, regroup_series, resample_time, TimeBuckets};
pub use types::{HeatMap, TimeSeries};

//! Common types shared across the ERA5 query workspace.
//!
//! Everything here is format- and storage-agnostic: the in-memory
//! [`Raster`], the query enumerations parsed at the API boundary, and the
//! [`RasterError`] taxonomy every other crate propagates.

pub mod bbox;
pub mod error;
pub mod method;
pub mod raster;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{RasterError, RasterResult};
pub use method::{AggregationMethod, AnyOrAll, Criteria, Predicate};
pub use raster::{Mask, Raster, SHAPE_MASK};
pub use time::{parse_datetime, TimeRange, TimeResolution};

/// Grid spacing of the ERA5 single-level products, in degrees.
pub const NATIVE_RESOLUTION: f64 = 0.25;

/// Tolerance used when comparing coordinate labels, in degrees.
pub const COORD_EPSILON: f64 = 1e-9;

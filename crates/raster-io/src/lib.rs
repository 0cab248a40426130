//! Storage access for ERA5 per-day files.
//!
//! - [`DailyFileLocator`] maps `(variable, day)` to `<root>/<variable>-<YYYY-MM-DD>.<ext>`
//! - [`RasterReader`] decodes one file; [`ZarrDayReader`] reads Zarr V3 day
//!   stores, `NetCdfDayReader` (feature `netcdf`) reads CDS NetCDF files
//! - [`RasterLoader`] loads a day range and concatenates it along time
//! - [`DayStoreWriter`] writes rasters back as Zarr V3 day stores

pub mod catalog;
pub mod cf_time;
pub mod loader;
pub mod locator;
pub mod reader;
pub mod writer;

pub use catalog::VariableCatalog;
pub use cf_time::CfTimeUnits;
pub use loader::RasterLoader;
pub use locator::{DailyFileLocator, FileLocator, DEFAULT_EXTENSION};
#[cfg(feature = "netcdf")]
pub use reader::NetCdfDayReader;
pub use reader::{reader_for_extension, RasterReader, ZarrDayReader};
pub use writer::DayStoreWriter;

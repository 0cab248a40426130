//! The query layer.
//!
//! Every operation starts from the same window: load the day files covering
//! the query's interval, then select its bounding box and interval. From
//! there each query adds its own reductions or masks.
//!
//! | Operation | Steps after the window |
//! |-----------|------------------------|
//! | [`raster_data_access`](QueryEngine::raster_data_access) | resample |
//! | [`single_value_aggregation`](QueryEngine::single_value_aggregation) | reduce everything |
//! | [`time_series`](QueryEngine::time_series) | reduce lat/lon, regroup time |
//! | [`heat_map_single_layer`](QueryEngine::heat_map_single_layer) | coarsen, collapse time |
//! | [`heat_map_multi_layer`](QueryEngine::heat_map_multi_layer) | resample |
//! | [`value_criteria`](QueryEngine::value_criteria) | resample, mask by predicate |
//! | [`area_finding`](QueryEngine::area_finding) | criteria, spatial existence |
//! | [`time_period`](QueryEngine::time_period) | criteria, temporal existence |
//! | [`shape_query`](QueryEngine::shape_query) | envelope window, resample, polygon mask |
//!
//! Nothing is cached between calls; every query re-reads storage.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use raster_io::{reader_for_extension, DailyFileLocator, RasterLoader};
use raster_processor::{
    apply_criteria, collapse_all, reduce_all, resample, select, spatial_existence,
    spatial_series, temporal_existence, HeatMap, Shape, TimeSeries,
};
use reanalysis_common::{AnyOrAll, Criteria, Mask, Raster, SHAPE_MASK};

use crate::config::QueryConfig;
use crate::descriptor::RasterQuery;
use crate::error::QueryResult;
use crate::shapes::load_shape;

/// Runs queries against one data root.
pub struct QueryEngine {
    loader: RasterLoader,
    native_resolution: f64,
    shapes_dir: PathBuf,
}

impl QueryEngine {
    pub fn new(loader: RasterLoader, native_resolution: f64, shapes_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            native_resolution,
            shapes_dir: shapes_dir.into(),
        }
    }

    /// Build the locator, reader and catalog described by `config`.
    pub fn from_config(config: &QueryConfig) -> QueryResult<Self> {
        config.validate()?;

        let locator = DailyFileLocator::new(&config.data_root, config.file_extension.clone());
        let reader = reader_for_extension(locator.extension(), config.native_resolution)?;
        let loader = RasterLoader::new(Box::new(locator), reader, config.variables.clone())
            .with_parallel(config.parallel_load);

        Ok(Self::new(loader, config.native_resolution, &config.shapes_dir))
    }

    /// Validate, load the covering days and select the query window.
    fn window(&self, query: &RasterQuery) -> QueryResult<Raster> {
        query.validate(self.native_resolution)?;

        let loaded = self.loader.load_range(&query.variable, &query.time_range)?;
        Ok(select(&loaded, &query.bbox, &query.time_range)?)
    }

    /// Load, select and resample. The primitive under every other query.
    pub fn raster_data_access(&self, query: &RasterQuery) -> QueryResult<Raster> {
        let start = Instant::now();
        let window = self.window(query)?;
        let out = resample(&window, &query.resample_params())?;

        info!(
            variable = %query.variable,
            shape = ?out.shape(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Raster data access complete"
        );
        Ok(out)
    }

    /// One value per variable over the whole window.
    ///
    /// Uses `query.spatial_aggregation` as the reducer; resolutions are
    /// ignored.
    pub fn single_value_aggregation(&self, query: &RasterQuery) -> QueryResult<BTreeMap<String, f64>> {
        let start = Instant::now();
        let window = self.window(query)?;
        let values = reduce_all(&window, query.spatial_aggregation);

        info!(
            variable = %query.variable,
            method = %query.spatial_aggregation,
            cells = window.variables().values().map(|v| v.len()).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Single value aggregation complete"
        );
        Ok(values)
    }

    /// Reduce latitude and longitude per step, then regroup by
    /// `query.time_resolution`.
    ///
    /// Both stages use `query.spatial_aggregation`.
    pub fn time_series(&self, query: &RasterQuery) -> QueryResult<BTreeMap<String, TimeSeries>> {
        let start = Instant::now();
        let window = self.window(query)?;
        let series = spatial_series(&window, query.spatial_aggregation, query.time_resolution)?;

        info!(
            variable = %query.variable,
            method = %query.spatial_aggregation,
            time_resolution = %query.time_resolution,
            points = series.values().map(TimeSeries::len).max().unwrap_or(0),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Time series complete"
        );
        Ok(series)
    }

    /// Coarsen, then collapse the whole time axis with
    /// `query.time_aggregation` into one layer per variable.
    pub fn heat_map_single_layer(&self, query: &RasterQuery) -> QueryResult<BTreeMap<String, HeatMap>> {
        let start = Instant::now();
        let window = self.window(query)?;
        let coarse = resample(&window, &query.resample_params().spatial_only())?;

        let mut maps = BTreeMap::new();
        for (name, layer) in collapse_all(&coarse, query.time_aggregation) {
            let map = HeatMap::new(coarse.latitudes().to_vec(), coarse.longitudes().to_vec(), layer)?;
            maps.insert(name, map);
        }

        info!(
            variable = %query.variable,
            lats = coarse.latitudes().len(),
            lons = coarse.longitudes().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Single layer heat map complete"
        );
        Ok(maps)
    }

    /// Resample, keeping one layer per time bucket.
    pub fn heat_map_multi_layer(&self, query: &RasterQuery) -> QueryResult<Raster> {
        let start = Instant::now();
        let out = resample(&self.window(query)?, &query.resample_params())?;

        info!(
            variable = %query.variable,
            layers = out.times().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Multi layer heat map complete"
        );
        Ok(out)
    }

    /// Resample, then replace values failing `criteria` with `NaN`.
    pub fn value_criteria(&self, query: &RasterQuery, criteria: &Criteria) -> QueryResult<Raster> {
        let start = Instant::now();
        let resampled = resample(&self.window(query)?, &query.resample_params())?;
        let out = apply_criteria(&resampled, criteria)?;

        info!(
            variable = %query.variable,
            predicate = %criteria.predicate,
            threshold = criteria.threshold,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Value criteria query complete"
        );
        Ok(out)
    }

    /// Cells where `criteria` held at any (or every) time step.
    ///
    /// The criteria raster is returned with a `Mask::Spatial` per variable.
    pub fn area_finding(
        &self,
        query: &RasterQuery,
        criteria: &Criteria,
        mode: AnyOrAll,
    ) -> QueryResult<Raster> {
        let out = spatial_existence(&self.value_criteria(query, criteria)?, mode)?;
        info!(
            variable = %query.variable,
            mode = ?mode,
            cells = mask_count(&out),
            "Area finding complete"
        );
        Ok(out)
    }

    /// Time steps where `criteria` held in any (or every) cell.
    ///
    /// The criteria raster is returned with a `Mask::Temporal` per variable.
    pub fn time_period(
        &self,
        query: &RasterQuery,
        criteria: &Criteria,
        mode: AnyOrAll,
    ) -> QueryResult<Raster> {
        let out = temporal_existence(&self.value_criteria(query, criteria)?, mode)?;
        info!(
            variable = %query.variable,
            mode = ?mode,
            steps = mask_count(&out),
            "Time period query complete"
        );
        Ok(out)
    }

    /// Resample the envelope of a named or file-backed shape and attach its
    /// containment mask under [`SHAPE_MASK`].
    ///
    /// `query.bbox` is replaced by the shape's envelope.
    pub fn shape_query(&self, query: &RasterQuery, shape: &str) -> QueryResult<Raster> {
        let shape = load_shape(shape, &self.shapes_dir)?;
        self.shape_query_with(query, &shape)
    }

    /// [`shape_query`](Self::shape_query) for an already parsed shape.
    pub fn shape_query_with(&self, query: &RasterQuery, shape: &Shape) -> QueryResult<Raster> {
        let start = Instant::now();
        let query = RasterQuery {
            bbox: shape.selection_bbox(),
            ..query.clone()
        };
        let resampled = self.raster_data_access(&query)?;
        let mask = shape.rasterize(resampled.latitudes(), resampled.longitudes());
        let inside = mask.iter().filter(|v| **v).count();
        let out = resampled.with_mask(SHAPE_MASK, Mask::Shape(mask))?;

        info!(
            variable = %query.variable,
            polygons = shape.polygons().len(),
            cells_inside = inside,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Shape query complete"
        );
        Ok(out)
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("loader", &self.loader)
            .field("native_resolution", &self.native_resolution)
            .field("shapes_dir", &self.shapes_dir)
            .finish()
    }
}

fn mask_count(raster: &Raster) -> usize {
    raster.masks().values().map(Mask::count).sum()
}

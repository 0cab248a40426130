//! Query descriptors.
//!
//! A [`RasterQuery`] is built once per call and never mutated by the engine.
//! [`QueryParams`] is its string form, as it arrives from a request or a
//! config file; enumerations are parsed once at that boundary.

use serde::{Deserialize, Serialize};

use raster_processor::{coarsen_factor, ResampleParams};
use reanalysis_common::{
    AggregationMethod, BoundingBox, RasterError, RasterResult, TimeRange, TimeResolution,
    NATIVE_RESOLUTION,
};

/// What to load and how to resample it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterQuery {
    /// Request name, e.g. `2m_temperature`.
    pub variable: String,
    pub bbox: BoundingBox,
    /// Inclusive on both ends.
    pub time_range: TimeRange,
    /// Target grid spacing in degrees, a whole multiple of the native one.
    pub spatial_resolution: f64,
    pub spatial_aggregation: AggregationMethod,
    pub time_resolution: TimeResolution,
    pub time_aggregation: AggregationMethod,
}

impl RasterQuery {
    /// Native resolution, hourly, mean for both reductions.
    ///
    /// # Example
    /// ```rust
    /// use climate_query::RasterQuery;
    /// use reanalysis_common::{AggregationMethod, BoundingBox, TimeRange, TimeResolution};
    ///
    /// let range = TimeRange::parse("2023-01-01T00:00:00", "2023-01-31T23:00:00").unwrap();
    /// let query = RasterQuery::new("2m_temperature", BoundingBox::new(60.0, 80.0, 285.0, 350.0), range)
    ///     .with_spatial_resolution(1.0)
    ///     .with_time_resolution(TimeResolution::Day)
    ///     .with_time_aggregation(AggregationMethod::Max);
    /// assert_eq!(query.spatial_resolution, 1.0);
    /// ```
    pub fn new(variable: impl Into<String>, bbox: BoundingBox, time_range: TimeRange) -> Self {
        Self {
            variable: variable.into(),
            bbox,
            time_range,
            spatial_resolution: NATIVE_RESOLUTION,
            spatial_aggregation: AggregationMethod::Mean,
            time_resolution: TimeResolution::Hour,
            time_aggregation: AggregationMethod::Mean,
        }
    }

    pub fn with_spatial_resolution(mut self, resolution: f64) -> Self {
        self.spatial_resolution = resolution;
        self
    }

    pub fn with_spatial_aggregation(mut self, method: AggregationMethod) -> Self {
        self.spatial_aggregation = method;
        self
    }

    pub fn with_time_resolution(mut self, resolution: TimeResolution) -> Self {
        self.time_resolution = resolution;
        self
    }

    pub fn with_time_aggregation(mut self, method: AggregationMethod) -> Self {
        self.time_aggregation = method;
        self
    }

    /// Check everything that can be checked before I/O.
    pub fn validate(&self, native_resolution: f64) -> RasterResult<()> {
        if self.variable.trim().is_empty() {
            return Err(RasterError::invalid_parameter("variable", &self.variable));
        }
        coarsen_factor(self.spatial_resolution, native_resolution)?;
        Ok(())
    }

    /// Resampling part of the query.
    pub fn resample_params(&self) -> ResampleParams {
        ResampleParams::new(self.spatial_resolution)
            .with_spatial_aggregation(self.spatial_aggregation)
            .with_time_resolution(self.time_resolution)
            .with_time_aggregation(self.time_aggregation)
    }
}

/// String form of a [`RasterQuery`]. Optional fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub variable: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub start_datetime: String,
    pub end_datetime: String,
    #[serde(default)]
    pub spatial_resolution: Option<f64>,
    #[serde(default)]
    pub aggregation_method: Option<String>,
    #[serde(default)]
    pub time_resolution: Option<String>,
    #[serde(default)]
    pub time_agg_method: Option<String>,
}

impl QueryParams {
    /// Parse into a typed query. Errors name the offending parameter.
    pub fn into_query(self) -> RasterResult<RasterQuery> {
        let range = TimeRange::parse(&self.start_datetime, &self.end_datetime)?;
        let bbox = BoundingBox::new(self.min_lat, self.max_lat, self.min_lon, self.max_lon);
        let mut query = RasterQuery::new(self.variable, bbox, range);

        if let Some(resolution) = self.spatial_resolution {
            query = query.with_spatial_resolution(resolution);
        }
        if let Some(method) = self.aggregation_method.as_deref() {
            query = query
                .with_spatial_aggregation(AggregationMethod::parse_param("aggregation_method", method)?);
        }
        if let Some(resolution) = self.time_resolution.as_deref() {
            query = query.with_time_resolution(resolution.parse()?);
        }
        if let Some(method) = self.time_agg_method.as_deref() {
            query = query
                .with_time_aggregation(AggregationMethod::parse_param("time_agg_method", method)?);
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> QueryParams {
        QueryParams {
            variable: "2m_temperature".to_string(),
            min_lat: 60.0,
            max_lat: 80.0,
            min_lon: 285.0,
            max_lon: 350.0,
            start_datetime: "2023-01-01T00:00:00".to_string(),
            end_datetime: "2023-01-01T09:00:00".to_string(),
            ..QueryParams::default()
        }
    }

    #[test]
    fn test_defaults() {
        let query = params().into_query().unwrap();
        assert_eq!(query.spatial_resolution, 0.25);
        assert_eq!(query.spatial_aggregation, AggregationMethod::Mean);
        assert_eq!(query.time_resolution, TimeResolution::Hour);
        assert_eq!(query.time_aggregation, AggregationMethod::Mean);
        assert!(query.validate(0.25).is_ok());
    }

    #[test]
    fn test_string_parameters() {
        let query = QueryParams {
            spatial_resolution: Some(1.0),
            aggregation_method: Some("max".to_string()),
            time_resolution: Some("month".to_string()),
            time_agg_method: Some("min".to_string()),
            ..params()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.spatial_aggregation, AggregationMethod::Max);
        assert_eq!(query.time_resolution, TimeResolution::Month);
        assert_eq!(query.resample_params().time_aggregation, AggregationMethod::Min);
    }

    #[test]
    fn test_errors_name_the_parameter() {
        let err = QueryParams {
            time_agg_method: Some("median".to_string()),
            ..params()
        }
        .into_query()
        .unwrap_err();
        assert!(err.to_string().contains("time_agg_method"));
        assert!(err.to_string().contains("median"));

        let err = QueryParams {
            time_resolution: Some("week".to_string()),
            ..params()
        }
        .into_query()
        .unwrap_err();
        assert!(err.to_string().contains("time_resolution"));

        let err = QueryParams {
            end_datetime: "2022-12-31T00:00:00".to_string(),
            ..params()
        }
        .into_query()
        .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_validate_checks_resolution_multiple() {
        let query = params().into_query().unwrap().with_spatial_resolution(0.6);
        assert!(query.validate(0.25).unwrap_err().is_invalid_parameter());
        assert!(query.clone().with_spatial_resolution(0.75).validate(0.25).is_ok());

        let mut blank = query;
        blank.variable = " ".to_string();
        assert!(blank.validate(0.25).is_err());
    }
}

//! Integration tests: write Zarr day stores and load them back.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use ndarray::Array3;
use raster_io::{DayStoreWriter, RasterLoader, RasterReader, ZarrDayReader};
use reanalysis_common::{Raster, RasterError, TimeRange};
use test_utils::{
    assert_approx_eq, create_cube_with_nans, create_test_cube, hourly_times, synthetic_raster,
    DayStoreFixture, GridSpec,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
}

#[test]
fn test_write_then_read_preserves_values_and_axes() {
    test_utils::init_tracing();
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(80.0, 285.0, 5, 7);
    let raster = synthetic_raster(&spec, hourly_times(day(1), 0..4), "t2m", create_test_cube(4, 5, 7));
    let path = fixture.write_day("2m_temperature", day(1), &raster);

    let read = ZarrDayReader::new(0.25).read(&path, "t2m").unwrap();

    assert_eq!(read.shape(), (4, 5, 7));
    assert_eq!(read.latitudes(), spec.latitudes().as_slice());
    assert_eq!(read.longitudes(), spec.longitudes().as_slice());
    assert_eq!(read.times(), raster.times());
    let data = read.variable("t2m").unwrap();
    assert_eq!(data[[3, 4, 6]], 30406.0);
    assert_eq!(data, raster.variable("t2m").unwrap());
}

#[test]
fn test_nan_cells_survive_round_trip() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(10.0, 0.0, 3, 3);
    let cube = create_cube_with_nans(2, 3, 3, &[(0, 1, 1), (1, 0, 2)]);
    let raster = synthetic_raster(&spec, hourly_times(day(1), 0..2), "t2m", cube);
    let path = fixture.write_day("2m_temperature", day(1), &raster);

    let read = ZarrDayReader::new(0.25).read(&path, "t2m").unwrap();
    let data = read.variable("t2m").unwrap();
    assert!(data[[0, 1, 1]].is_nan());
    assert!(data[[1, 0, 2]].is_nan());
    assert_eq!(data.iter().filter(|v| v.is_nan()).count(), 2);
}

#[test]
fn test_missing_store_is_file_not_found() {
    let fixture = DayStoreFixture::new();
    let path = fixture.root().join("2m_temperature-2023-01-01.zarr");
    let err = ZarrDayReader::new(0.25).read(&path, "t2m").unwrap_err();
    assert!(matches!(err, RasterError::FileNotFound { .. }));
}

#[test]
fn test_unknown_variable_in_store_is_format_error() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(10.0, 0.0, 2, 2);
    let raster = synthetic_raster(&spec, hourly_times(day(1), 0..1), "t2m", create_test_cube(1, 2, 2));
    let path = fixture.write_day("2m_temperature", day(1), &raster);

    let err = ZarrDayReader::new(0.25).read(&path, "tp").unwrap_err();
    assert!(matches!(err, RasterError::FormatError(_)));
}

#[test]
fn test_empty_directory_is_format_error() {
    let fixture = DayStoreFixture::new();
    let path = fixture.root().join("2m_temperature-2023-01-01.zarr");
    std::fs::create_dir_all(&path).unwrap();
    let err = ZarrDayReader::new(0.25).read(&path, "t2m").unwrap_err();
    assert!(matches!(err, RasterError::FormatError(_)));
}

#[test]
fn test_decreasing_time_in_one_file_is_rejected() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(10.0, 0.0, 2, 2);
    let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let times = vec![base + Duration::hours(5), base + Duration::hours(1)];
    let raster = synthetic_raster(&spec, times, "t2m", create_test_cube(2, 2, 2));
    let path = fixture.write_day("2m_temperature", day(1), &raster);

    let err = ZarrDayReader::new(0.25).read(&path, "t2m").unwrap_err();
    assert!(err.to_string().contains("decreases"));
}

#[test]
fn test_resolution_mismatch_is_format_error() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(10.0, 0.0, 3, 3);
    let raster = synthetic_raster(&spec, hourly_times(day(1), 0..1), "t2m", create_test_cube(1, 3, 3));
    let path = fixture.write_day("2m_temperature", day(1), &raster);

    assert!(ZarrDayReader::new(0.5).read(&path, "t2m").is_err());
}

#[test]
fn test_multi_variable_store() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(10.0, 0.0, 2, 2);
    let mut variables = BTreeMap::new();
    variables.insert("u10".to_string(), Array3::from_elem((1, 2, 2), 3.0f32));
    variables.insert("v10".to_string(), Array3::from_elem((1, 2, 2), -4.0f32));
    let raster = Raster::new(
        spec.latitudes(),
        spec.longitudes(),
        hourly_times(day(1), 0..1),
        0.25,
        variables,
    )
    .unwrap();
    let path = fixture.root().join("wind-2023-01-01.zarr");
    DayStoreWriter::new().with_time_chunk(24).write(&path, &raster).unwrap();

    let reader = ZarrDayReader::new(0.25);
    assert_eq!(reader.read(&path, "u10").unwrap().variable("u10").unwrap()[[0, 1, 1]], 3.0);
    assert_eq!(reader.read(&path, "v10").unwrap().variable("v10").unwrap()[[0, 0, 0]], -4.0);
}

#[test]
fn test_load_range_over_disjoint_days_sums_time_steps() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(70.0, 300.0, 4, 6);
    fixture.write_temperature_days(&spec, day(1), 3, 24);

    let range = TimeRange::parse("2023-01-01T00:00", "2023-01-03T23:00").unwrap();
    for parallel in [false, true] {
        let loader = RasterLoader::zarr(fixture.root(), 0.25).with_parallel(parallel);
        let raster = loader.load_range("2m_temperature", &range).unwrap();
        assert_eq!(raster.shape(), (72, 4, 6));
        assert!(raster.times().windows(2).all(|w| w[0] < w[1]));

        // Day index shifts every value by one Kelvin.
        let data = raster.variable("t2m").unwrap();
        assert_approx_eq!(data[[24, 0, 0]] - data[[0, 0, 0]], 1.0, 1e-4);
        assert_approx_eq!(data[[48, 2, 3]] - data[[24, 2, 3]], 1.0, 1e-4);
    }
}

#[test]
fn test_load_range_reports_first_missing_day() {
    let fixture = DayStoreFixture::new();
    let spec = GridSpec::era5(70.0, 300.0, 2, 2);
    fixture.write_temperature_days(&spec, day(1), 2, 24);

    let range = TimeRange::parse("2023-01-01", "2023-01-04").unwrap();
    let err = RasterLoader::zarr(fixture.root(), 0.25)
        .load_range("2m_temperature", &range)
        .unwrap_err();
    match err {
        RasterError::FileNotFound { path } => {
            assert!(path.ends_with("2m_temperature-2023-01-03.zarr"))
        }
        other => panic!("expected FileNotFound, got {other}"),
    }
}

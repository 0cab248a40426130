//! Resampling and masking properties that hold for any valid input.

use chrono::NaiveDate;
use raster_processor::{
    apply_criteria, reduce_all, resample, select, spatial_existence, temporal_existence,
    ResampleParams, Shape,
};
use reanalysis_common::{
    AggregationMethod, AnyOrAll, BoundingBox, Criteria, Mask, Predicate, Raster, TimeRange,
    TimeResolution,
};
use test_utils::{
    assert_approx_eq, create_precipitation_cube, create_temperature_cube, hourly_times,
    synthetic_raster, GridSpec,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Greenland-sized window: 60N..80N, 285E..350E at 0.25 degrees.
fn greenland(hours: u32) -> Raster {
    let spec = GridSpec::era5(80.0, 285.0, 81, 261);
    synthetic_raster(
        &spec,
        hourly_times(day(), 0..hours),
        "t2m",
        create_temperature_cube(hours as usize, 81, 261),
    )
}

fn precipitation(hours: u32) -> Raster {
    let spec = GridSpec::era5(55.0, 10.0, 21, 21);
    synthetic_raster(
        &spec,
        hourly_times(day(), 0..hours),
        "tp",
        create_precipitation_cube(hours as usize, 21, 21, 7),
    )
}

#[test]
fn test_resample_counts_follow_floor_division() {
    test_utils::init_tracing();
    let raster = greenland(2);
    for (resolution, factor) in [(0.25, 1), (0.5, 2), (1.0, 4), (2.5, 10), (5.0, 20)] {
        for method in [AggregationMethod::Mean, AggregationMethod::Max, AggregationMethod::Min] {
            let params = ResampleParams::new(resolution).with_spatial_aggregation(method);
            let out = resample(&raster, &params).unwrap();
            assert_eq!(out.latitudes().len(), 81 / factor, "{resolution} {method}");
            assert_eq!(out.longitudes().len(), 261 / factor, "{resolution} {method}");
            assert_approx_eq!(out.resolution(), resolution, 1e-12);
            if out.latitudes().len() > 1 {
                assert_approx_eq!(out.latitudes()[0] - out.latitudes()[1], resolution, 1e-9);
            }
        }
    }
}

#[test]
fn test_hour_resampling_keeps_time_steps() {
    let raster = greenland(7);
    for resolution in [0.25, 1.0] {
        let out = resample(&raster, &ResampleParams::new(resolution)).unwrap();
        assert_eq!(out.times(), raster.times());
    }
}

#[test]
fn test_resample_is_idempotent() {
    let raster = greenland(3);
    for method in [AggregationMethod::Mean, AggregationMethod::Max, AggregationMethod::Min] {
        let params = ResampleParams::new(1.0)
            .with_spatial_aggregation(method)
            .with_time_aggregation(method);
        let once = resample(&raster, &params).unwrap();
        let twice = resample(&once, &params).unwrap();
        assert_eq!(once.shape(), twice.shape());
        assert_eq!(once.variable("t2m"), twice.variable("t2m"));
        assert_eq!(once.latitudes(), twice.latitudes());
    }
}

#[test]
fn test_mean_of_coarsened_matches_mean_of_native() {
    // 80 x 260 divides evenly by 4, so block means average to the global mean.
    let raster = greenland(1);
    let bbox = BoundingBox::new(60.25, 80.0, 285.0, 349.75);
    let range = TimeRange::new(raster.times()[0], raster.times()[0]).unwrap();
    let even = select(&raster, &bbox, &range).unwrap();
    assert_eq!(even.shape(), (1, 80, 260));

    let coarse = resample(&even, &ResampleParams::new(1.0)).unwrap();
    let native = reduce_all(&even, AggregationMethod::Mean)["t2m"];
    let coarsened = reduce_all(&coarse, AggregationMethod::Mean)["t2m"];
    assert_approx_eq!(native, coarsened, 1e-3);
}

#[test]
fn test_criteria_above_maximum_masks_everything() {
    let raster = precipitation(5);
    let max = reduce_all(&raster, AggregationMethod::Max)["tp"] as f32;

    let out = apply_criteria(&raster, &Criteria::new(Predicate::Gt, max)).unwrap();
    assert_eq!(out.shape(), raster.shape());
    assert!(out.variable("tp").unwrap().iter().all(|v| v.is_nan()));

    let at_max = apply_criteria(&raster, &Criteria::new(Predicate::Ge, max)).unwrap();
    assert!(at_max.variable("tp").unwrap().iter().any(|v| !v.is_nan()));
}

#[test]
fn test_all_is_subset_of_any() {
    let raster = precipitation(6);
    let wet = apply_criteria(&raster, &Criteria::new(Predicate::Gt, 0.0)).unwrap();

    let any = spatial_existence(&wet, AnyOrAll::Any).unwrap();
    let all = spatial_existence(&wet, AnyOrAll::All).unwrap();
    let any = any.mask("tp").and_then(Mask::as_grid).unwrap().clone();
    let all = all.mask("tp").and_then(Mask::as_grid).unwrap().clone();
    assert!(any.iter().zip(all.iter()).all(|(a, b)| *a || !*b));
    assert!(any.iter().filter(|v| **v).count() >= all.iter().filter(|v| **v).count());

    let any = temporal_existence(&wet, AnyOrAll::Any).unwrap();
    let all = temporal_existence(&wet, AnyOrAll::All).unwrap();
    let any = any.mask("tp").and_then(Mask::as_series).unwrap().clone();
    let all = all.mask("tp").and_then(Mask::as_series).unwrap().clone();
    assert!(any.iter().zip(all.iter()).all(|(a, b)| *a || !*b));
}

#[test]
fn test_daily_buckets_after_coarsening() {
    let raster = greenland(30);
    let params = ResampleParams::new(2.5)
        .with_time_resolution(TimeResolution::Day)
        .with_time_aggregation(AggregationMethod::Max);
    let out = resample(&raster, &params).unwrap();
    assert_eq!(out.shape(), (2, 8, 26));
    assert_eq!(out.times()[1].date_naive(), day().succ_opt().unwrap());
}

#[test]
fn test_shape_mask_on_resampled_grid() {
    let raster = greenland(1);
    let shape = Shape::from_wkt("POLYGON((-60 65, -30 65, -30 75, -60 75, -60 65))").unwrap();
    let bbox = shape.selection_bbox();
    assert_eq!(bbox, BoundingBox::new(65.0, 75.0, 300.0, 330.0));

    let range = TimeRange::new(raster.times()[0], raster.times()[0]).unwrap();
    let window = select(&raster, &bbox, &range).unwrap();
    let coarse = resample(&window, &ResampleParams::new(1.0)).unwrap();
    let mask = shape.rasterize(coarse.latitudes(), coarse.longitudes());
    assert_eq!(mask.dim(), (10, 30));
    assert!(mask.iter().all(|v| *v));
}

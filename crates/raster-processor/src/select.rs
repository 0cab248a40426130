//! Bounding selection over latitude, longitude and time.

use std::collections::BTreeMap;
use std::ops::Range;

use ndarray::{s, Axis};
use tracing::debug;

use reanalysis_common::{BoundingBox, Raster, RasterResult, TimeRange, COORD_EPSILON};

/// Slice `raster` to `bbox` and `range`, all bounds inclusive.
///
/// Latitude is descending, so the kept rows run from `max_lat` down to
/// `min_lat`. Time keeps every sample inside the interval in its original
/// order, duplicates included. A selection matching nothing yields an empty
/// raster. Masks on the input are dropped.
pub fn select(raster: &Raster, bbox: &BoundingBox, range: &TimeRange) -> RasterResult<Raster> {
    let lat = label_range(raster.latitudes(), |lat| {
        lat <= bbox.max_lat + COORD_EPSILON && lat >= bbox.min_lat - COORD_EPSILON
    });
    let lon = label_range(raster.longitudes(), |lon| {
        lon >= bbox.min_lon - COORD_EPSILON && lon <= bbox.max_lon + COORD_EPSILON
    });
    let time: Vec<usize> = raster
        .times()
        .iter()
        .enumerate()
        .filter(|(_, t)| range.contains(t))
        .map(|(i, _)| i)
        .collect();

    let mut variables = BTreeMap::new();
    for (name, data) in raster.variables() {
        let window = data.slice(s![.., lat.clone(), lon.clone()]);
        variables.insert(name.clone(), window.select(Axis(0), &time));
    }

    let selected = Raster::new(
        raster.latitudes()[lat].to_vec(),
        raster.longitudes()[lon].to_vec(),
        time.iter().map(|i| raster.times()[*i]).collect(),
        raster.resolution(),
        variables,
    )?;

    debug!(
        input = ?raster.shape(),
        output = ?selected.shape(),
        "Selected bounding box"
    );
    Ok(selected)
}

/// Contiguous index range of a monotonic axis whose labels satisfy `keep`.
fn label_range(axis: &[f64], keep: impl Fn(f64) -> bool) -> Range<usize> {
    match axis.iter().position(|v| keep(*v)) {
        Some(start) => {
            let len = axis[start..].iter().take_while(|v| keep(**v)).count();
            start..start + len
        }
        None => 0..0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ndarray::Array3;

    fn hours(n: i64) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|h| base + Duration::hours(h)).collect()
    }

    /// 8 x 8 grid from 80N / 285E, 12 hourly steps; value = t*10000 + row*100 + col.
    fn raster() -> Raster {
        let lats = (0..8).map(|i| 80.0 - i as f64 * 0.25).collect();
        let lons = (0..8).map(|i| 285.0 + i as f64 * 0.25).collect();
        let data = Array3::from_shape_fn((12, 8, 8), |(t, y, x)| (t * 10000 + y * 100 + x) as f32);
        let mut vars = BTreeMap::new();
        vars.insert("t2m".to_string(), data);
        Raster::new(lats, lons, hours(12), 0.25, vars).unwrap()
    }

    fn range(from: i64, to: i64) -> TimeRange {
        let h = hours(24);
        TimeRange::new(h[from as usize], h[to as usize]).unwrap()
    }

    #[test]
    fn test_select_inclusive_bounds() {
        let bbox = BoundingBox::new(79.0, 79.5, 285.25, 285.75);
        let out = select(&raster(), &bbox, &range(2, 5)).unwrap();

        assert_eq!(out.latitudes(), &[79.5, 79.25, 79.0]);
        assert_eq!(out.longitudes(), &[285.25, 285.5, 285.75]);
        assert_eq!(out.times().len(), 4);
        let data = out.variable("t2m").unwrap();
        // row 2, col 1 of the source at t = 2
        assert_eq!(data[[0, 0, 0]], 20201.0);
        assert_eq!(data[[3, 2, 2]], 50403.0);
    }

    #[test]
    fn test_select_outside_coverage_is_empty() {
        let bbox = BoundingBox::new(10.0, 20.0, 0.0, 10.0);
        let out = select(&raster(), &bbox, &range(0, 11)).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.shape(), (12, 0, 0));
        assert_eq!(out.variable("t2m").unwrap().len(), 0);
    }

    #[test]
    fn test_select_inverted_latitude_is_empty() {
        let bbox = BoundingBox::new(80.0, 79.0, 285.0, 287.0);
        let out = select(&raster(), &bbox, &range(0, 11)).unwrap();
        assert_eq!(out.latitudes().len(), 0);
        assert_eq!(out.longitudes().len(), 8);
    }

    #[test]
    fn test_select_time_outside_is_empty() {
        let bbox = BoundingBox::new(0.0, 90.0, 0.0, 360.0);
        let out = select(&raster(), &bbox, &range(13, 20)).unwrap();
        assert_eq!(out.shape(), (0, 8, 8));
        assert!(out.is_empty());
    }

    #[test]
    fn test_select_keeps_duplicate_timestamps() {
        let base = raster();
        let doubled = Raster::concat_time(vec![base.clone(), base]).unwrap();
        let bbox = BoundingBox::new(0.0, 90.0, 0.0, 360.0);
        let out = select(&doubled, &bbox, &range(0, 0)).unwrap();
        assert_eq!(out.times().len(), 2);
        assert_eq!(out.times()[0], out.times()[1]);
    }

    #[test]
    fn test_select_tolerates_float_noise() {
        let bbox = BoundingBox::new(79.75 + 1e-12, 80.0 - 1e-12, 285.0, 285.0);
        let out = select(&raster(), &bbox, &range(0, 0)).unwrap();
        assert_eq!(out.shape(), (1, 2, 1));
    }
}

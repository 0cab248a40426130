//! Polygon shapes and their rasterization onto a lat/lon grid.
//!
//! Shapes come from WKT (`POLYGON`, `MULTIPOLYGON`) or GeoJSON (`Polygon`,
//! `MultiPolygon`, `Feature`, `FeatureCollection`). Vertices are `(lon, lat)`
//! in degrees; the first ring of each polygon is its exterior and any
//! further rings are holes.
//!
//! Longitudes may be given in either -180..180 or 0..360. Containment is
//! tested against the point and its 360-degree alias, so a shape drawn in
//! one convention still matches a grid stored in the other.

use ndarray::Array2;
use serde::Deserialize;

use reanalysis_common::{BoundingBox, RasterError, RasterResult};

/// One polygon: an exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<(f64, f64)>,
    pub holes: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>, holes: Vec<Vec<(f64, f64)>>) -> RasterResult<Self> {
        check_ring(&exterior)?;
        for hole in &holes {
            check_ring(hole)?;
        }
        Ok(Self { exterior, holes })
    }

    /// True if `(lon, lat)` is inside the exterior and outside every hole.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        ring_contains(&self.exterior, lon, lat)
            && !self.holes.iter().any(|hole| ring_contains(hole, lon, lat))
    }
}

/// A set of polygons treated as their union.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    polygons: Vec<Polygon>,
}

impl Shape {
    pub fn new(polygons: Vec<Polygon>) -> RasterResult<Self> {
        if polygons.is_empty() {
            return Err(RasterError::shape("shape contains no polygons"));
        }
        Ok(Self { polygons })
    }

    /// Parse WKT or GeoJSON, deciding by the first non-blank character.
    pub fn parse(text: &str) -> RasterResult<Self> {
        if text.trim_start().starts_with('{') {
            Self::from_geojson(text)
        } else {
            Self::from_wkt(text)
        }
    }

    /// Parse a WKT `POLYGON` or `MULTIPOLYGON`.
    ///
    /// ```text
    /// POLYGON((lon lat, lon lat, lon lat, lon lat), (hole ...))
    /// MULTIPOLYGON(((ring)), ((ring), (hole)))
    /// ```
    pub fn from_wkt(wkt: &str) -> RasterResult<Self> {
        let wkt = wkt.trim();

        let polygons = if let Some(body) = strip_keyword(wkt, "MULTIPOLYGON") {
            top_level_groups(single_group(body)?)?
                .into_iter()
                .map(wkt_polygon)
                .collect::<RasterResult<Vec<_>>>()?
        } else if let Some(body) = strip_keyword(wkt, "POLYGON") {
            vec![wkt_polygon(single_group(body)?)?]
        } else {
            return Err(RasterError::shape(format!(
                "expected POLYGON or MULTIPOLYGON, got '{}'",
                wkt.chars().take(32).collect::<String>()
            )));
        };

        Self::new(polygons)
    }

    /// Parse a GeoJSON geometry, feature or feature collection.
    ///
    /// Non-polygon geometries inside a collection are skipped; the result
    /// must still hold at least one polygon.
    pub fn from_geojson(json: &str) -> RasterResult<Self> {
        let doc: GeoJson = serde_json::from_str(json)
            .map_err(|e| RasterError::shape(format!("invalid GeoJSON: {}", e)))?;

        let mut polygons = Vec::new();
        match doc {
            GeoJson::FeatureCollection { features } => {
                for feature in features {
                    if let Some(geometry) = feature.geometry {
                        geometry.collect_polygons(&mut polygons)?;
                    }
                }
            }
            GeoJson::Feature { geometry } => {
                if let Some(geometry) = geometry {
                    geometry.collect_polygons(&mut polygons)?;
                }
            }
            GeoJson::Polygon { coordinates } => {
                Geometry::Polygon { coordinates }.collect_polygons(&mut polygons)?
            }
            GeoJson::MultiPolygon { coordinates } => {
                Geometry::MultiPolygon { coordinates }.collect_polygons(&mut polygons)?
            }
            GeoJson::Other => {
                return Err(RasterError::shape(
                    "GeoJSON must be a Polygon, MultiPolygon, Feature or FeatureCollection",
                ))
            }
        }

        Self::new(polygons)
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Bounding box of all exterior rings, in the shape's own longitudes.
    pub fn envelope(&self) -> BoundingBox {
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;

        for (lon, lat) in self.polygons.iter().flat_map(|p| p.exterior.iter()) {
            min_lon = min_lon.min(*lon);
            max_lon = max_lon.max(*lon);
            min_lat = min_lat.min(*lat);
            max_lat = max_lat.max(*lat);
        }

        BoundingBox::new(min_lat, max_lat, min_lon, max_lon)
    }

    /// Envelope expressed in 0..360 longitudes, for selecting from a grid
    /// stored that way.
    ///
    /// A shape wholly west of the prime meridian is shifted east by 360
    /// degrees. A shape straddling it selects the full longitude band.
    pub fn selection_bbox(&self) -> BoundingBox {
        let env = self.envelope();
        if env.min_lon >= 0.0 {
            env
        } else if env.max_lon < 0.0 {
            BoundingBox::new(env.min_lat, env.max_lat, env.min_lon + 360.0, env.max_lon + 360.0)
        } else {
            BoundingBox::new(env.min_lat, env.max_lat, 0.0, 360.0)
        }
    }

    /// True if the point, or its 360-degree longitude alias, is inside any polygon.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let alias = if lon >= 180.0 { lon - 360.0 } else { lon + 360.0 };
        self.polygons
            .iter()
            .any(|p| p.contains(lon, lat) || p.contains(alias, lat))
    }

    /// Per-cell containment of the grid's cell centres.
    pub fn rasterize(&self, latitudes: &[f64], longitudes: &[f64]) -> Array2<bool> {
        Array2::from_shape_fn((latitudes.len(), longitudes.len()), |(y, x)| {
            self.contains(latitudes[y], longitudes[x])
        })
    }
}

/// Ray casting against one ring.
fn ring_contains(ring: &[(f64, f64)], lon: f64, lat: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn check_ring(ring: &[(f64, f64)]) -> RasterResult<()> {
    let mut distinct = ring.to_vec();
    if distinct.len() > 1 && distinct.first() == distinct.last() {
        distinct.pop();
    }
    if distinct.len() < 3 {
        return Err(RasterError::shape(format!(
            "ring needs at least 3 distinct vertices, got {}",
            distinct.len()
        )));
    }
    for (lon, lat) in ring {
        if !(-90.0..=90.0).contains(lat) || !(-180.0..=360.0).contains(lon) {
            return Err(RasterError::shape(format!(
                "vertex ({}, {}) is outside the valid lon/lat range",
                lon, lat
            )));
        }
    }
    Ok(())
}

/// Text after a case-insensitive WKT keyword.
fn strip_keyword<'a>(wkt: &'a str, keyword: &str) -> Option<&'a str> {
    let head = wkt.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| &wkt[keyword.len()..])
}

/// Contents of the parenthesised groups at depth 0 of `s`.
///
/// Only commas and whitespace may appear between groups.
fn top_level_groups(s: &str) -> RasterResult<Vec<&str>> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in s.char_indices() {
        match ch {
            '(' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| RasterError::shape("unbalanced ')' in WKT"))?;
                if depth == 0 {
                    groups.push(&s[start..i]);
                }
            }
            c if depth == 0 && !(c == ',' || c.is_whitespace()) => {
                return Err(RasterError::shape(format!("unexpected '{}' in WKT", c)));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(RasterError::shape("unbalanced '(' in WKT"));
    }
    Ok(groups)
}

fn single_group(s: &str) -> RasterResult<&str> {
    match top_level_groups(s)?.as_slice() {
        [only] => Ok(*only),
        groups => Err(RasterError::shape(format!(
            "expected one parenthesised body, found {}",
            groups.len()
        ))),
    }
}

/// `(ring), (hole), ...` into a polygon.
fn wkt_polygon(body: &str) -> RasterResult<Polygon> {
    let mut rings = top_level_groups(body)?
        .into_iter()
        .map(wkt_ring)
        .collect::<RasterResult<Vec<_>>>()?;
    if rings.is_empty() {
        return Err(RasterError::shape("polygon has no rings"));
    }
    let exterior = rings.remove(0);
    Polygon::new(exterior, rings)
}

fn wkt_ring(s: &str) -> RasterResult<Vec<(f64, f64)>> {
    s.split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.split_whitespace().collect();
            if !(2..=3).contains(&parts.len()) {
                return Err(RasterError::shape(format!(
                    "expected 'lon lat', got '{}'",
                    pair.trim()
                )));
            }
            let lon = parse_coord(parts[0])?;
            let lat = parse_coord(parts[1])?;
            Ok((lon, lat))
        })
        .collect()
}

fn parse_coord(s: &str) -> RasterResult<f64> {
    s.parse()
        .map_err(|_| RasterError::shape(format!("invalid coordinate '{}'", s)))
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        features: Vec<Feature>,
    },
    Feature {
        geometry: Option<Geometry>,
    },
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Other,
}

impl Geometry {
    fn collect_polygons(self, out: &mut Vec<Polygon>) -> RasterResult<()> {
        match self {
            Self::Polygon { coordinates } => out.push(json_polygon(coordinates)?),
            Self::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    out.push(json_polygon(polygon)?);
                }
            }
            Self::Other => {}
        }
        Ok(())
    }
}

fn json_polygon(rings: Vec<Vec<Vec<f64>>>) -> RasterResult<Polygon> {
    let mut rings = rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|position| match position.as_slice() {
                    [lon, lat, ..] => Ok((*lon, *lat)),
                    _ => Err(RasterError::shape("GeoJSON position needs two numbers")),
                })
                .collect::<RasterResult<Vec<_>>>()
        })
        .collect::<RasterResult<Vec<_>>>()?;
    if rings.is_empty() {
        return Err(RasterError::shape("GeoJSON polygon has no rings"));
    }
    let exterior = rings.remove(0);
    Polygon::new(exterior, rings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))";
    const SQUARE_WITH_HOLE: &str =
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), (4 4, 6 4, 6 6, 4 6, 4 4))";

    #[test]
    fn test_parse_wkt_polygon() {
        let shape = Shape::from_wkt(SQUARE).unwrap();
        assert_eq!(shape.polygons().len(), 1);
        assert_eq!(shape.polygons()[0].exterior.len(), 5);
        assert!(shape.contains(5.0, 5.0));
        assert!(!shape.contains(15.0, 5.0));
    }

    #[test]
    fn test_wkt_polygon_with_hole() {
        let shape = Shape::from_wkt(SQUARE_WITH_HOLE).unwrap();
        assert_eq!(shape.polygons()[0].holes.len(), 1);
        assert!(!shape.contains(5.0, 5.0));
        assert!(shape.contains(2.0, 2.0));
    }

    #[test]
    fn test_parse_wkt_multipolygon() {
        let shape = Shape::from_wkt(
            "multipolygon(((0 0, 1 0, 1 1, 0 1, 0 0)), ((5 5, 6 5, 6 6, 5 6, 5 5), (5.4 5.4, 5.6 5.4, 5.6 5.6, 5.4 5.6, 5.4 5.4)))",
        )
        .unwrap();
        assert_eq!(shape.polygons().len(), 2);
        assert_eq!(shape.polygons()[1].holes.len(), 1);
        assert!(shape.contains(0.5, 0.5));
        assert!(shape.contains(5.2, 5.2));
        assert!(!shape.contains(5.5, 5.5));
        assert!(!shape.contains(3.0, 3.0));
    }

    #[test]
    fn test_invalid_wkt() {
        for wkt in [
            "POINT(1 2)",
            "POLYGON((0 0, 1 1))",
            "POLYGON((0 0, 1 0, 1 1, 0 0)",
            "POLYGON((0 0, a 0, 1 1, 0 0))",
            "POLYGON((0 0, 1 0, 1 100, 0 0))",
        ] {
            let err = Shape::from_wkt(wkt).unwrap_err();
            assert!(matches!(err, RasterError::ShapeError(_)), "{wkt}");
        }
    }

    #[test]
    fn test_parse_geojson_variants() {
        let polygon = r#"{"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]}"#;
        assert!(Shape::parse(polygon).unwrap().contains(5.0, 5.0));

        let feature = format!(r#"{{"type": "Feature", "properties": {{}}, "geometry": {}}}"#, polygon);
        assert!(Shape::parse(&feature).unwrap().contains(5.0, 5.0));

        let collection = format!(
            r#"{{"type": "FeatureCollection", "features": [
                {{"type": "Feature", "geometry": {{"type": "Point", "coordinates": [1, 1]}}}},
                {{"type": "Feature", "geometry": {{"type": "MultiPolygon", "coordinates": [[[[20, 20, 0], [21, 20, 0], [21, 21, 0], [20, 20, 0]]]]}}}},
                {}
            ]}}"#,
            feature
        );
        let shape = Shape::parse(&collection).unwrap();
        assert_eq!(shape.polygons().len(), 2);
    }

    #[test]
    fn test_geojson_without_polygons_is_error() {
        let point = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(matches!(Shape::parse(point), Err(RasterError::ShapeError(_))));
        assert!(Shape::parse("{ not json").is_err());
    }

    #[test]
    fn test_longitude_alias() {
        let iceland_like = Shape::from_wkt("POLYGON((-25 63, -13 63, -13 67, -25 67, -25 63))").unwrap();
        assert!(iceland_like.contains(65.0, 341.0));
        assert!(iceland_like.contains(65.0, -19.0));
        assert_eq!(
            iceland_like.selection_bbox(),
            BoundingBox::new(63.0, 67.0, 335.0, 347.0)
        );

        let straddling = Shape::from_wkt("POLYGON((-5 50, 5 50, 5 55, -5 55, -5 50))").unwrap();
        assert!(straddling.contains(52.0, 358.0));
        assert!(straddling.contains(52.0, 2.0));
        assert_eq!(straddling.selection_bbox().max_lon, 360.0);
    }

    #[test]
    fn test_rasterize_cell_centres() {
        let shape = Shape::from_wkt("POLYGON((285.1 79.1, 285.6 79.1, 285.6 79.9, 285.1 79.9, 285.1 79.1))")
            .unwrap();
        let lats = [80.0, 79.75, 79.5, 79.25, 79.0];
        let lons = [285.0, 285.25, 285.5, 285.75];
        let mask = shape.rasterize(&lats, &lons);
        assert_eq!(mask.dim(), (5, 4));
        assert_eq!(mask.iter().filter(|v| **v).count(), 6);
        assert!(mask[[1, 1]] && mask[[3, 2]]);
        assert!(!mask[[0, 1]] && !mask[[1, 0]]);
    }
}

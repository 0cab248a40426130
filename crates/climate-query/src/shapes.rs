//! Loading polygon shapes from files or by name.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use raster_processor::Shape;
use reanalysis_common::{RasterError, RasterResult};

/// Extensions tried, in order, when resolving a bare shape name.
const SHAPE_EXTENSIONS: &[&str] = &["geojson", "json", "wkt"];

/// Resolve `shape` to a file.
///
/// An existing path is used as given. A value with a known extension may
/// also be a file name inside `shapes_dir`. Otherwise `shape` is a name
/// looked up as `<shapes_dir>/<name>.<ext>`.
pub fn resolve_shape_path(shape: &str, shapes_dir: &Path) -> RasterResult<PathBuf> {
    let direct = PathBuf::from(shape);
    let has_extension = direct
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SHAPE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);

    if direct.is_file() {
        return Ok(direct);
    }
    if has_extension {
        let in_dir = shapes_dir.join(shape);
        return if in_dir.is_file() {
            Ok(in_dir)
        } else {
            Err(RasterError::file_not_found(direct))
        };
    }

    SHAPE_EXTENSIONS
        .iter()
        .map(|ext| shapes_dir.join(format!("{}.{}", shape, ext)))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| RasterError::invalid_parameter("shape", shape))
}

/// Read and parse a shape file.
///
/// `.wkt` is WKT and `.geojson`/`.json` is GeoJSON; any other extension is
/// detected from the contents.
pub fn load_shape_file(path: &Path) -> RasterResult<Shape> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RasterError::file_not_found(path),
        _ => RasterError::Io(e),
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let shape = match extension.as_deref() {
        Some("wkt") => Shape::from_wkt(&text),
        Some("geojson") | Some("json") => Shape::from_geojson(&text),
        _ => Shape::parse(&text),
    }
    .map_err(|e| match e {
        RasterError::ShapeError(msg) => RasterError::shape(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;

    debug!(
        path = %path.display(),
        polygons = shape.polygons().len(),
        "Loaded shape"
    );
    Ok(shape)
}

/// Resolve and load `shape` in one step.
pub fn load_shape(shape: &str, shapes_dir: &Path) -> RasterResult<Shape> {
    load_shape_file(&resolve_shape_path(shape, shapes_dir)?)
}

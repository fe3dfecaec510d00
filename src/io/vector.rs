//! GeoJSON vector inputs. Coordinates must already be in the analysis CRS.
use std::path::Path;

use geo::{Geometry, GeometryCollection, MultiPolygon, Polygon};
use geojson::GeoJson;
use tracing::{debug, warn};

use crate::core::geometry::{FaultSet, Region};
use crate::error::Result;

fn read_geometries(path: &Path) -> Result<Vec<Geometry<f64>>> {
    let text = std::fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;
    let collection = GeometryCollection::<f64>::try_from(&geojson)?;
    debug!("{}: {} geometries", path.display(), collection.0.len());
    Ok(collection.0)
}

/// Flatten polygonal members into the region outline; other geometry kinds are skipped.
fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> usize {
    match geometry {
        Geometry::Polygon(p) => {
            out.push(p);
            0
        }
        Geometry::MultiPolygon(mp) => {
            out.extend(mp.0);
            0
        }
        Geometry::Rect(r) => {
            out.push(r.to_polygon());
            0
        }
        Geometry::GeometryCollection(gc) => gc.0.into_iter().map(|g| collect_polygons(g, out)).sum(),
        _ => 1,
    }
}

/// Region of interest from a GeoJSON file: the union of its polygons.
pub fn read_region(path: &Path) -> Result<Region> {
    region_from_geometries(read_geometries(path)?)
}

pub fn region_from_geometries(geometries: Vec<Geometry<f64>>) -> Result<Region> {
    let mut polygons = Vec::new();
    let skipped: usize = geometries
        .into_iter()
        .map(|g| collect_polygons(g, &mut polygons))
        .sum();
    if skipped > 0 {
        warn!("Region: ignored {} non-polygonal geometries", skipped);
    }
    Region::new(MultiPolygon(polygons))
}

/// Fault set from a GeoJSON file; lines, polygons and points are all kept.
pub fn read_faults(path: &Path) -> Result<FaultSet> {
    FaultSet::new(read_geometries(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const REGION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "a"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[100,0],[100,100],[0,100],[0,0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [5, 5]}}
        ]
    }"#;

    const FAULTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[0,0],[50,50]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiLineString", "coordinates": [[[10,0],[10,90]]]}}
        ]
    }"#;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn region_keeps_polygons_only() {
        let f = write_tmp(REGION);
        let region = read_region(f.path()).unwrap();
        assert_eq!(region.shape().0.len(), 1);
        assert!(region.contains_xy(50.0, 50.0));
        assert!(!region.contains_xy(150.0, 50.0));
    }

    #[test]
    fn faults_keep_every_geometry() {
        let f = write_tmp(FAULTS);
        assert_eq!(read_faults(f.path()).unwrap().len(), 2);
    }

    #[test]
    fn bare_geometry_document_is_one_fault() {
        let f = write_tmp(r#"{"type": "LineString", "coordinates": [[0, 0], [30, 40]]}"#);
        let faults = read_faults(f.path()).unwrap();
        assert_eq!(faults.len(), 1);
        assert!(matches!(faults.geometries()[0], Geometry::LineString(_)));
    }

    #[test]
    fn region_without_polygons_is_rejected() {
        let f = write_tmp(r#"{"type": "Point", "coordinates": [1, 2]}"#);
        assert!(read_region(f.path()).is_err());
    }
}

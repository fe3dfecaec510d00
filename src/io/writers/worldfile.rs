use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::core::raster::GeoTransform;
use crate::error::Result;

/// World file extension for an image path ("tif" -> "tfw"), "wld" when unknown.
fn world_extension(output_image: &Path) -> String {
    let ext = output_image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "tif" | "tiff" => "tfw".to_string(),
        "jpg" | "jpeg" => "jgw".to_string(),
        "png" => "pgw".to_string(),
        "" => "wld".to_string(),
        other => {
            // First letter + last letter + "w"
            let first = other.chars().next().unwrap_or('w');
            let last = other.chars().last().unwrap_or('w');
            format!("{first}{last}w")
        }
    }
}

/// Six-line world file body. The world file stores the transform in pixel-center convention.
pub fn world_file_contents(transform: &GeoTransform) -> String {
    let gt = transform.to_gdal();
    // A: pixel size in X, D: rotation about Y, B: rotation about X, E: pixel size Y
    // C, F: center of upper-left pixel
    let a = gt[1];
    let d = gt[4];
    let b = gt[2];
    let e = gt[5];
    let c = gt[0] + 0.5 * a + 0.5 * b;
    let f = gt[3] + 0.5 * d + 0.5 * e;
    let mut out = String::new();
    for v in [a, d, b, e, c, f] {
        let _ = writeln!(out, "{:.12}", v);
    }
    out
}

/// Write a world file next to the raster image.
pub fn write_world_file(output_image: &Path, transform: &GeoTransform) -> Result<PathBuf> {
    let world_path = output_image.with_extension(world_extension(output_image));
    std::fs::write(&world_path, world_file_contents(transform))?;
    Ok(world_path)
}

/// Write a .prj file with the provided projection (WKT or EPSG:XXXX)
pub fn write_prj_file(output_image: &Path, projection: &str) -> Result<PathBuf> {
    let prj_path = output_image.with_extension("prj");
    std::fs::write(&prj_path, projection.as_bytes())?;
    Ok(prj_path)
}

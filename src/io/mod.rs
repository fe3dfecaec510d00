//! I/O layer: GeoTIFF band readers (`tiff` crate, optional GDAL backend), GeoJSON vector
//! inputs, the scene manifest, and `writers` for GeoTIFF layers, sidecars and the report.
use thiserror::Error;

pub mod manifest;
pub mod raster;
pub mod vector;
pub mod writers;

#[cfg(feature = "gdal")]
pub mod gdal;

pub use self::manifest::{LandCoverEntry, Manifest, SceneBands, SceneEntry};
pub use self::raster::{RasterData, read_grid_header, read_band, read_classes, read_raster_f64, read_raster_u16};
pub use self::vector::{read_faults, read_region};

/// Errors raised by the raster readers
#[derive(Debug, Error)]
pub enum RasterIoError {
    #[error("{path}: no georeferencing (ModelPixelScale/ModelTiepoint tags missing)")]
    MissingGeoreference { path: String },
    #[error("{path}: unsupported pixel format {format}")]
    UnsupportedFormat { path: String, format: String },
    #[error("{path}: expected {expected} pixels, decoded {actual}")]
    DimensionMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },
    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] ::gdal::errors::GdalError),
}

use std::path::Path;

use gdal::Dataset;
use ndarray::Array2;
use tracing::warn;

use crate::core::raster::{GeoTransform, GridSpec};
use crate::error::{Error, Result};
use crate::io::RasterIoError;
use crate::io::raster::RasterData;

/// Metadata extracted from a GDAL-supported dataset
#[derive(Debug, Clone)]
pub struct GdalMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// Projection as "EPSG:XXXX" when an authority code is present, WKT otherwise
    pub projection: String,
}

/// Band reader for any GDAL-supported format (GeoTIFF, COG, NetCDF, ENVI)
pub struct GdalRasterReader {
    pub dataset: Dataset,
    pub metadata: GdalMetadata,
    path: String,
}

// Helper to extract EPSG code from WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    let start = wkt.rfind(KEY)? + KEY.len();
    let end = wkt[start..].find('"')?;
    Some(format!("EPSG:{}", &wkt[start..start + end]))
}

impl GdalRasterReader {
    pub fn open(path: &Path) -> Result<Self> {
        let dataset = Dataset::open(path).map_err(RasterIoError::from)?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterIoError::UnsupportedFormat {
                path: path.display().to_string(),
                format: "no raster bands".to_string(),
            }
            .into());
        }
        let geotransform = dataset.geo_transform().map_err(|_| RasterIoError::MissingGeoreference {
            path: path.display().to_string(),
        })?;
        let proj = dataset.projection();
        let projection = parse_epsg(&proj).unwrap_or(proj);
        Ok(Self {
            dataset,
            metadata: GdalMetadata {
                size_x,
                size_y,
                bands,
                geotransform,
                projection,
            },
            path: path.display().to_string(),
        })
    }

    /// Grid of the dataset labelled with the analysis CRS.
    pub fn grid(&self, crs: &str) -> Result<GridSpec> {
        let m = &self.metadata;
        if !m.projection.is_empty() && m.projection != crs {
            warn!("{}: projection {} differs from analysis CRS {}", self.path, m.projection, crs);
        }
        Ok(GridSpec::new(m.size_y, m.size_x, GeoTransform::from_gdal(m.geotransform), crs))
    }

    /// First band as f64 with its geotransform and nodata value.
    pub fn read_f64(&self) -> Result<RasterData<f64>> {
        let band = self.dataset.rasterband(1).map_err(RasterIoError::from)?;
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band
            .read_as::<f64>((0, 0), window, window, None)
            .map_err(RasterIoError::from)?;
        let values = buf.data().to_vec();
        if values.len() != window.0 * window.1 {
            return Err(RasterIoError::DimensionMismatch {
                path: self.path.clone(),
                expected: window.0 * window.1,
                actual: values.len(),
            }
            .into());
        }
        let data = Array2::from_shape_vec((window.1, window.0), values).map_err(Error::backend)?;
        Ok(RasterData {
            data,
            transform: GeoTransform::from_gdal(self.metadata.geotransform),
            nodata: band.no_data_value(),
        })
    }
}

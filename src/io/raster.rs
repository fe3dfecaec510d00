//! Single-band GeoTIFF reading.
//!
//! The default backend decodes with the `tiff` crate and takes the geotransform from the
//! ModelPixelScale (33550) and ModelTiepoint (33922) tags, and nodata from GDAL_NODATA
//! (42113). With the `gdal` feature every read goes through GDAL instead.
#[cfg(not(feature = "gdal"))]
use std::fs::File;
#[cfg(not(feature = "gdal"))]
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;
#[cfg(not(feature = "gdal"))]
use tiff::decoder::{Decoder, DecodingResult};
#[cfg(not(feature = "gdal"))]
use tiff::tags::Tag;
use tracing::debug;

use crate::core::raster::{Band, GeoBand, GeoTransform, GridSpec};
use crate::error::Result;
#[cfg(not(feature = "gdal"))]
use crate::error::Error;
#[cfg(not(feature = "gdal"))]
use crate::io::RasterIoError;

pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

/// Decoded pixels plus georeferencing.
#[derive(Debug, Clone)]
pub struct RasterData<T> {
    pub data: Array2<T>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
}

impl<T> RasterData<T> {
    pub fn grid(&self, crs: &str) -> GridSpec {
        let (rows, cols) = self.data.dim();
        GridSpec::new(rows, cols, self.transform, crs)
    }
}

/// Read a continuous band (reflectance DN, temperature DN, elevation) as f64.
pub fn read_raster_f64(path: &Path) -> Result<RasterData<f64>> {
    #[cfg(feature = "gdal")]
    {
        crate::io::gdal::GdalRasterReader::open(path)?.read_f64()
    }
    #[cfg(not(feature = "gdal"))]
    {
        let mut decoder = open_decoder(path)?;
        let (cols, rows) = dimensions(&mut decoder)?;
        let values = match decoder.read_image()? {
            DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
            DecodingResult::F64(buf) => buf,
            _ => return Err(unsupported(path, &mut decoder)),
        };
        finish(path, &mut decoder, rows, cols, values)
    }
}

/// Read a bit-packed or categorical band (QA_PIXEL, land-cover classes) as u16.
pub fn read_raster_u16(path: &Path) -> Result<RasterData<u16>> {
    #[cfg(feature = "gdal")]
    {
        let raster = crate::io::gdal::GdalRasterReader::open(path)?.read_f64()?;
        Ok(RasterData {
            data: raster.data.mapv(|v| if v.is_finite() { v.clamp(0.0, f64::from(u16::MAX)) as u16 } else { 0 }),
            transform: raster.transform,
            nodata: raster.nodata,
        })
    }
    #[cfg(not(feature = "gdal"))]
    {
        let mut decoder = open_decoder(path)?;
        let (cols, rows) = dimensions(&mut decoder)?;
        let values = match decoder.read_image()? {
            DecodingResult::U8(buf) => buf.into_iter().map(u16::from).collect(),
            DecodingResult::U16(buf) => buf,
            _ => return Err(unsupported(path, &mut decoder)),
        };
        finish(path, &mut decoder, rows, cols, values)
    }
}

/// Grid of a raster without decoding its pixels.
pub fn read_grid_header(path: &Path, crs: &str) -> Result<GridSpec> {
    #[cfg(feature = "gdal")]
    {
        crate::io::gdal::GdalRasterReader::open(path)?.grid(crs)
    }
    #[cfg(not(feature = "gdal"))]
    {
        let mut decoder = open_decoder(path)?;
        let (cols, rows) = dimensions(&mut decoder)?;
        let transform = read_geotransform(path, &mut decoder)?;
        Ok(GridSpec::new(rows, cols, transform, crs))
    }
}

/// Continuous band with nodata and non-finite pixels masked.
pub fn read_band(path: &Path, crs: &str) -> Result<GeoBand> {
    let raster = read_raster_f64(path)?;
    let grid = raster.grid(crs);
    let mut band = Band::from_data(raster.data);
    if let Some(nodata) = raster.nodata {
        let keep = band.data.mapv(|v| v != nodata);
        band.update_mask(&keep);
    }
    debug!(
        "Read {}: {}x{}, {} valid pixels",
        path.display(),
        grid.cols,
        grid.rows,
        band.valid_count()
    );
    GeoBand::new(grid, band)
}

/// Categorical band with its grid.
pub fn read_classes(path: &Path, crs: &str) -> Result<(GridSpec, Array2<u16>)> {
    let raster = read_raster_u16(path)?;
    Ok((raster.grid(crs), raster.data))
}

#[cfg(not(feature = "gdal"))]
fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

#[cfg(not(feature = "gdal"))]
fn dimensions<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<(usize, usize)> {
    let (width, height) = decoder.dimensions()?;
    Ok((width as usize, height as usize))
}

#[cfg(not(feature = "gdal"))]
fn unsupported<R: std::io::Read + std::io::Seek>(path: &Path, decoder: &mut Decoder<R>) -> Error {
    let format = decoder
        .colortype()
        .map(|c| format!("{c:?}"))
        .unwrap_or_else(|e| e.to_string());
    RasterIoError::UnsupportedFormat {
        path: path.display().to_string(),
        format,
    }
    .into()
}

#[cfg(not(feature = "gdal"))]
fn finish<T, R: std::io::Read + std::io::Seek>(
    path: &Path,
    decoder: &mut Decoder<R>,
    rows: usize,
    cols: usize,
    values: Vec<T>,
) -> Result<RasterData<T>> {
    if values.len() != rows * cols {
        return Err(RasterIoError::DimensionMismatch {
            path: path.display().to_string(),
            expected: rows * cols,
            actual: values.len(),
        }
        .into());
    }
    let data = Array2::from_shape_vec((rows, cols), values).map_err(Error::backend)?;
    let transform = read_geotransform(path, decoder)?;
    let nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());
    Ok(RasterData {
        data,
        transform,
        nodata,
    })
}

/// Geotransform from the pixel-scale and tiepoint tags.
#[cfg(not(feature = "gdal"))]
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    path: &Path,
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let missing = || -> Error {
        RasterIoError::MissingGeoreference {
            path: path.display().to_string(),
        }
        .into()
    };
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
        .map_err(|_| missing())?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
        .map_err(|_| missing())?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(missing());
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::Gray32Float;
use tiff::tags::Tag;

use crate::core::raster::{Band, GridSpec};
use crate::error::{Error, Result};
use crate::io::raster::{TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT};

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

fn epsg_code(crs: &str) -> Option<u16> {
    crs.strip_prefix("EPSG:")?.parse().ok()
}

/// GeoKeyDirectory: model type, pixel-is-area, and the EPSG code when the CRS carries one.
fn geo_keys(crs: &str) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::with_capacity(3);
    match epsg_code(crs) {
        Some(code) if (4000..5000).contains(&code) => {
            keys.push([GT_MODEL_TYPE, 0, 1, 2]);
            keys.push([GT_RASTER_TYPE, 0, 1, 1]);
            keys.push([GEOGRAPHIC_TYPE, 0, 1, code]);
        }
        Some(code) => {
            keys.push([GT_MODEL_TYPE, 0, 1, 1]);
            keys.push([GT_RASTER_TYPE, 0, 1, 1]);
            keys.push([PROJECTED_CS_TYPE, 0, 1, code]);
        }
        None => {
            keys.push([GT_MODEL_TYPE, 0, 1, 1]);
            keys.push([GT_RASTER_TYPE, 0, 1, 1]);
        }
    }
    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

/// Encode a band as a single-band Float32 GeoTIFF; masked pixels become NaN.
pub fn encode_band_f32<W: Write + Seek>(writer: W, band: &Band, grid: &GridSpec) -> Result<()> {
    if band.dim() != grid.shape() {
        return Err(Error::GridMismatch {
            expected: format!("{}x{}", grid.cols, grid.rows),
            actual: format!("{}x{}", band.dim().1, band.dim().0),
        });
    }
    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<Gray32Float>(grid.cols as u32, grid.rows as u32)?;

    let t = &grid.transform;
    let scale = [t.pixel_width, t.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    let keys = geo_keys(&grid.crs);
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), keys.as_slice())?;
    image.encoder().write_tag(Tag::Unknown(TAG_GDAL_NODATA), "nan")?;

    image.write_data(&band.to_f32_nan())?;
    Ok(())
}

/// Write `band` to `output` as a Float32 GeoTIFF.
pub fn write_band_f32(output: &Path, band: &Band, grid: &GridSpec) -> Result<()> {
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    encode_band_f32(&mut writer, band, grid)?;
    writer.flush().map_err(Error::from)
}

//! Radiometric scaling, QA cloud masking and NDVI for one raw scene.
use ndarray::{Array2, Zip};
use tracing::debug;

use crate::core::params::RadiometricScaling;
use crate::core::processing::ops::{linear_scale, normalized_difference};
use crate::core::processing::resample::resample;
use crate::core::raster::{Band, GridSpec};
use crate::core::scene::{PreparedScene, RawScene, Reflectance};
use crate::error::Result;
use crate::types::ResampleMethod;

/// QA_PIXEL bit 0: fill
pub const QA_FILL: u16 = 1 << 0;
/// QA_PIXEL bit 3: cloud
pub const QA_CLOUD: u16 = 1 << 3;
/// QA_PIXEL bit 4: cloud shadow
pub const QA_CLOUD_SHADOW: u16 = 1 << 4;

/// Keep-mask from QA bits: cloud and cloud shadow are independent hazards, either one
/// invalidates the pixel.
pub fn cloud_mask(qa: &Array2<u16>) -> Array2<bool> {
    qa.mapv(|q| q & QA_CLOUD == 0 && q & QA_CLOUD_SHADOW == 0)
}

/// Keep-mask of pixels carrying data: QA fill bit clear and no zero (fill) DN in any band.
fn fill_mask(raw: &RawScene) -> Array2<bool> {
    let b = &raw.bands;
    let mut keep = b.qa_pixel.mapv(|q| q & QA_FILL == 0);
    for dn in [&b.sr_b2, &b.sr_b3, &b.sr_b4, &b.sr_b5, &b.sr_b6, &b.sr_b7, &b.st_b10] {
        Zip::from(&mut keep)
            .and(dn)
            .for_each(|k, &v| *k = *k && v.is_finite() && v != 0.0);
    }
    keep
}

/// Scale, mask and align one scene onto the analysis grid.
///
/// Order: optical to reflectance, thermal to Kelvin, QA decoding, NDVI, then the combined
/// mask is applied to every band. The scene is moved onto `grid` with nearest neighbour
/// afterwards so mask edges stay crisp. A scene with no usable pixel is returned fully
/// masked.
pub fn prepare_scene(
    raw: &RawScene,
    grid: &GridSpec,
    scaling: &RadiometricScaling,
) -> Result<PreparedScene> {
    let b = &raw.bands;
    let optical = |dn: &Array2<f64>| linear_scale(dn, scaling.optical_gain, scaling.optical_offset);
    let blue = optical(&b.sr_b2);
    let green = optical(&b.sr_b3);
    let red = optical(&b.sr_b4);
    let nir = optical(&b.sr_b5);
    let swir1 = optical(&b.sr_b6);
    let swir2 = optical(&b.sr_b7);
    let thermal = linear_scale(&b.st_b10, scaling.thermal_gain, scaling.thermal_offset);

    let hazards = cloud_mask(&b.qa_pixel);
    let ndvi = normalized_difference(&nir, &red);

    let mut mask = fill_mask(raw);
    Zip::from(&mut mask)
        .and(&hazards)
        .and(&ndvi.mask)
        .for_each(|m, &h, &n| *m = *m && h && n);

    let align = |data: Array2<f64>| -> Result<Band> {
        let band = Band {
            data,
            mask: mask.clone(),
        };
        resample(&band, &raw.grid, grid, ResampleMethod::Nearest)
    };
    let blue = align(blue)?;
    let green = align(green)?;
    let red = align(red)?;
    let nir = align(nir)?;
    let swir1 = align(swir1)?;
    let swir2 = align(swir2)?;
    let thermal = align(thermal)?;
    let ndvi = align(ndvi.data)?;

    let mut shared = ndvi.mask.clone();
    for band in [&blue, &green, &red, &nir, &swir1, &swir2, &thermal] {
        Zip::from(&mut shared)
            .and(&band.mask)
            .for_each(|m, &k| *m = *m && k);
    }

    let prepared = PreparedScene {
        meta: raw.meta.clone(),
        reflectance: Reflectance {
            blue: blue.data,
            green: green.data,
            red: red.data,
            nir: nir.data,
            swir1: swir1.data,
            swir2: swir2.data,
        },
        brightness_temp: thermal.data,
        ndvi: ndvi.data,
        mask: shared,
    };
    debug!(
        "Prepared {}: {} valid pixels after cloud masking",
        prepared.meta.id,
        prepared.valid_count()
    );
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::GeoTransform;
    use crate::core::scene::{RawBands, SceneMeta};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::array;

    fn raw_scene(qa: Array2<u16>) -> RawScene {
        let dn = |v: f64| Array2::from_elem((1, 3), v);
        RawScene::new(
            SceneMeta {
                id: "LC08_TEST".to_string(),
                acquired: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
                cloud_cover: 3.0,
                processing_level: "L2SP".to_string(),
            },
            GridSpec::new(1, 3, GeoTransform::new(0.0, 30.0, 30.0, -30.0), "EPSG:32748"),
            RawBands {
                sr_b2: dn(10000.0),
                sr_b3: dn(10000.0),
                sr_b4: dn(12000.0),
                sr_b5: dn(24000.0),
                sr_b6: dn(15000.0),
                sr_b7: dn(12000.0),
                st_b10: dn(44000.0),
                qa_pixel: qa,
            },
        )
        .unwrap()
    }

    #[test]
    fn cloud_and_shadow_bits_are_independent() {
        let mask = cloud_mask(&array![[0, QA_CLOUD, QA_CLOUD_SHADOW, QA_CLOUD | QA_CLOUD_SHADOW, 1 << 6]]);
        assert_eq!(mask, array![[true, false, false, false, true]]);
    }

    #[test]
    fn scaling_and_ndvi_follow_collection2_factors() {
        let raw = raw_scene(array![[0u16, QA_CLOUD, 0]]);
        let prepared = prepare_scene(&raw, &raw.grid, &RadiometricScaling::default()).unwrap();
        let red = 12000.0 * 0.0000275 - 0.2;
        let nir = 24000.0 * 0.0000275 - 0.2;
        assert_relative_eq!(prepared.reflectance.red[[0, 0]], red, epsilon = 1e-12);
        assert_relative_eq!(
            prepared.brightness_temp[[0, 0]],
            44000.0 * 0.00341802 + 149.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(prepared.ndvi[[0, 0]], (nir - red) / (nir + red), epsilon = 1e-12);
        assert_eq!(prepared.mask, array![[true, false, true]]);
    }

    #[test]
    fn fill_pixels_are_masked() {
        let mut raw = raw_scene(array![[0u16, 0, QA_FILL]]);
        raw.bands.st_b10[[0, 0]] = 0.0;
        let prepared = prepare_scene(&raw, &raw.grid, &RadiometricScaling::default()).unwrap();
        assert_eq!(prepared.mask, array![[false, true, false]]);
    }
}

//! Water and urban exclusion masks. Both only narrow a scene's mask, so they are idempotent
//! and can be applied in either order.
use ndarray::Array2;
use tracing::debug;

use crate::core::processing::ops::{keep_where, normalized_difference};
use crate::core::processing::resample::resample_classes;
use crate::core::raster::{Band, GridSpec};
use crate::core::scene::PreparedScene;
use crate::error::{Error, Result};

/// MNDWI = (green - swir1) / (green + swir1) under the scene mask.
pub fn water_index(scene: &PreparedScene) -> Band {
    let r = &scene.reflectance;
    normalized_difference(&r.green, &r.swir1).with_mask(&scene.mask)
}

/// Keep pixels whose MNDWI is below `threshold`; water (and undefined index) is dropped.
pub fn mask_water(scene: &mut PreparedScene, threshold: f64) {
    let before = scene.valid_count();
    let keep = keep_where(&water_index(scene), |mndwi| mndwi < threshold);
    scene.update_mask(&keep);
    debug!(
        "Water mask on {}: {} -> {} valid pixels",
        scene.meta.id,
        before,
        scene.valid_count()
    );
}

/// Global land-cover classification for one reference year.
#[derive(Debug, Clone)]
pub struct LandCover {
    pub year: i32,
    pub grid: GridSpec,
    pub classes: Array2<u16>,
}

impl LandCover {
    /// Pick the product for `year` from the available ones.
    pub fn select(products: &[LandCover], year: i32) -> Result<&LandCover> {
        products
            .iter()
            .find(|lc| lc.year == year)
            .ok_or_else(|| Error::MissingInput {
                what: format!("land cover for reference year {year}"),
            })
    }

    /// Keep-mask on `grid`: true where the aligned class is known and differs from `urban_code`.
    pub fn urban_keep_mask(&self, grid: &GridSpec, urban_code: u16) -> Result<Array2<bool>> {
        let aligned = resample_classes(&self.classes, &self.grid, grid)?;
        Ok(keep_where(&aligned, |class| class != f64::from(urban_code)))
    }
}

/// Drop pixels classified as urban / built-up.
pub fn mask_urban(scene: &mut PreparedScene, urban_keep: &Array2<bool>) {
    let before = scene.valid_count();
    scene.update_mask(urban_keep);
    debug!(
        "Urban mask on {}: {} -> {} valid pixels",
        scene.meta.id,
        before,
        scene.valid_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::GeoTransform;
    use crate::core::scene::{Reflectance, SceneMeta};
    use chrono::NaiveDate;
    use ndarray::array;

    fn scene(green: Array2<f64>, swir1: Array2<f64>) -> PreparedScene {
        let shape = green.dim();
        let zeros = Array2::zeros(shape);
        PreparedScene {
            meta: SceneMeta {
                id: "S".to_string(),
                acquired: NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
                cloud_cover: 1.0,
                processing_level: "L2SP".to_string(),
            },
            reflectance: Reflectance {
                blue: zeros.clone(),
                green,
                red: zeros.clone(),
                nir: zeros.clone(),
                swir1,
                swir2: zeros.clone(),
            },
            brightness_temp: zeros.clone(),
            ndvi: zeros,
            mask: Array2::from_elem(shape, true),
        }
    }

    fn grid() -> GridSpec {
        GridSpec::new(1, 4, GeoTransform::new(0.0, 30.0, 30.0, -30.0), "EPSG:32748")
    }

    #[test]
    fn water_pixels_are_dropped() {
        // MNDWI: 0.5 (water), -0.6 (land), -0.25 (at threshold), undefined
        let mut s = scene(array![[0.3, 0.1, 0.3, 0.0]], array![[0.1, 0.4, 0.5, 0.0]]);
        mask_water(&mut s, -0.25);
        assert_eq!(s.mask, array![[false, true, false, false]]);
    }

    #[test]
    fn water_mask_is_idempotent() {
        let mut once = scene(array![[0.3, 0.1, 0.2, 0.05]], array![[0.1, 0.4, 0.5, 0.3]]);
        mask_water(&mut once, -0.25);
        let mut twice = once.clone();
        mask_water(&mut twice, -0.25);
        assert_eq!(once.mask, twice.mask);
    }

    #[test]
    fn urban_class_is_excluded_after_alignment() {
        let lc = LandCover {
            year: 2019,
            grid: GridSpec::new(1, 2, GeoTransform::new(0.0, 30.0, 60.0, -60.0), "EPSG:32748"),
            classes: array![[50, 40]],
        };
        let keep = lc.urban_keep_mask(&grid(), 50).unwrap();
        assert_eq!(keep, array![[false, false, true, true]]);

        let mut s = scene(Array2::zeros((1, 4)), Array2::zeros((1, 4)));
        s.mask[[0, 3]] = false;
        mask_urban(&mut s, &keep);
        assert_eq!(s.mask, array![[false, false, true, false]]);
    }

    #[test]
    fn missing_reference_year_is_reported() {
        assert!(matches!(
            LandCover::select(&[], 2019),
            Err(Error::MissingInput { .. })
        ));
    }
}

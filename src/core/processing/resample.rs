//! Explicit alignment of rasters onto the analysis grid.
//!
//! Source and target must share a CRS; only the pixel lattice changes. Target pixels whose
//! centre falls outside the source extent, or whose source neighbours are masked, are masked.
//! Bilinear falls back to the nearest source pixel along masked or outer edges.
use ndarray::{Array2, Zip};
use tracing::debug;

use crate::core::raster::{Band, GridSpec};
use crate::error::{Error, Result};
use crate::types::ResampleMethod;

pub fn resample(
    band: &Band,
    source: &GridSpec,
    target: &GridSpec,
    method: ResampleMethod,
) -> Result<Band> {
    if band.dim() != source.shape() {
        return Err(Error::GridMismatch {
            expected: format!("{}x{}", source.cols, source.rows),
            actual: format!("{}x{}", band.dim().1, band.dim().0),
        });
    }
    if source.crs != target.crs {
        return Err(Error::GridMismatch {
            expected: target.crs.clone(),
            actual: source.crs.clone(),
        });
    }
    if source.is_aligned_with(target) {
        return Ok(band.clone());
    }
    debug!(
        "Resampling {}x{} -> {}x{} ({})",
        source.cols, source.rows, target.cols, target.rows, method
    );

    let mut out = Band::masked(target.shape());
    Zip::indexed(&mut out.data)
        .and(&mut out.mask)
        .par_for_each(|(row, col), value, valid| {
            let (x, y) = target.pixel_center(row, col);
            let (fc, fr) = source.map_to_pixel(x, y);
            let sample = match method {
                ResampleMethod::Nearest => nearest(band, fc, fr),
                ResampleMethod::Bilinear => bilinear(band, fc, fr).or_else(|| nearest(band, fc, fr)),
            };
            if let Some(v) = sample {
                *value = v;
                *valid = true;
            }
        });
    Ok(out)
}

/// Resample a categorical raster (class codes) with nearest neighbour.
pub fn resample_classes(classes: &Array2<u16>, source: &GridSpec, target: &GridSpec) -> Result<Band> {
    let band = Band::from_data(classes.mapv(f64::from));
    resample(&band, source, target, ResampleMethod::Nearest)
}

fn nearest(band: &Band, fc: f64, fr: f64) -> Option<f64> {
    let (rows, cols) = band.dim();
    if fc < 0.0 || fr < 0.0 {
        return None;
    }
    let (c, r) = (fc.floor() as usize, fr.floor() as usize);
    if r >= rows || c >= cols {
        return None;
    }
    band.get(r, c)
}

fn bilinear(band: &Band, fc: f64, fr: f64) -> Option<f64> {
    let (rows, cols) = band.dim();
    // Shift to pixel-centre coordinates
    let u = fc - 0.5;
    let v = fr - 0.5;
    if u < 0.0 || v < 0.0 {
        return None;
    }
    let (c0, r0) = (u.floor() as usize, v.floor() as usize);
    let (c1, r1) = (c0 + 1, r0 + 1);
    if r1 >= rows || c1 >= cols {
        return None;
    }
    let (tx, ty) = (u - c0 as f64, v - r0 as f64);
    let q00 = band.get(r0, c0)?;
    let q01 = band.get(r0, c1)?;
    let q10 = band.get(r1, c0)?;
    let q11 = band.get(r1, c1)?;
    let top = q00 * (1.0 - tx) + q01 * tx;
    let bottom = q10 * (1.0 - tx) + q11 * tx;
    Some(top * (1.0 - ty) + bottom * ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::GeoTransform;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn grid(rows: usize, cols: usize, px: f64) -> GridSpec {
        GridSpec::new(rows, cols, GeoTransform::new(0.0, 120.0, px, -px), "EPSG:32748")
    }

    #[test]
    fn aligned_input_is_returned_unchanged() {
        let g = grid(2, 2, 60.0);
        let band = Band::from_data(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(resample(&band, &g, &g, ResampleMethod::Bilinear).unwrap(), band);
    }

    #[test]
    fn nearest_upsamples_by_replication() {
        let coarse = grid(2, 2, 60.0);
        let fine = grid(4, 4, 30.0);
        let band = Band::from_data(array![[1.0, 2.0], [3.0, 4.0]]);
        let out = resample(&band, &coarse, &fine, ResampleMethod::Nearest).unwrap();
        assert_eq!(out.get(0, 0), Some(1.0));
        assert_eq!(out.get(1, 3), Some(2.0));
        assert_eq!(out.get(3, 0), Some(3.0));
        assert_eq!(out.valid_count(), 16);
    }

    #[test]
    fn bilinear_interpolates_interior() {
        let coarse = grid(2, 2, 60.0);
        let fine = grid(4, 4, 30.0);
        let band = Band::from_data(array![[0.0, 10.0], [0.0, 10.0]]);
        let out = resample(&band, &coarse, &fine, ResampleMethod::Bilinear).unwrap();
        // Fine pixel (1, 1) centre sits a quarter of the way between coarse centres
        assert_relative_eq!(out.get(1, 1).unwrap(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(out.get(1, 2).unwrap(), 7.5, epsilon = 1e-12);
    }

    #[test]
    fn outside_source_extent_is_masked() {
        let small = grid(1, 1, 60.0);
        let big = grid(2, 2, 60.0);
        let band = Band::from_data(array![[5.0]]);
        let out = resample(&band, &small, &big, ResampleMethod::Nearest).unwrap();
        assert_eq!(out.get(0, 0), Some(5.0));
        assert_eq!(out.valid_count(), 1);
    }

    #[test]
    fn different_crs_is_rejected() {
        let a = grid(2, 2, 60.0);
        let mut b = a.clone();
        b.crs = "EPSG:4326".to_string();
        let band = Band::constant((2, 2), 1.0);
        assert!(resample(&band, &a, &b, ResampleMethod::Nearest).is_err());
    }
}

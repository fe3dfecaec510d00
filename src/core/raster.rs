//! Raster primitives: the affine `GeoTransform`, the `GridSpec` every band is aligned to,
//! and `Band`, a value grid carrying its own validity mask.
//!
//! Masked pixels keep whatever value sits underneath them; every consumer must consult the
//! mask. Operations combining bands always intersect masks, they never widen them.
use geo::{Coord, Rect};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// North-up affine transform (GDAL ordering, rotation terms unsupported).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Usually negative
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Create from GDAL-style array [origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height]
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self::new(coeffs[0], coeffs[3], coeffs[1], coeffs[5])
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }
}

/// Pixel grid shared by every band of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    /// CRS identifier (e.g. "EPSG:32748"); all inputs must share it
    pub crs: String,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform, crs: impl Into<String>) -> Self {
        Self {
            rows,
            cols,
            transform,
            crs: crs.into(),
        }
    }

    /// North-up grid of `scale`-sized pixels covering `bounds`, snapped to multiples of `scale`.
    pub fn covering(bounds: Rect<f64>, scale: f64, crs: impl Into<String>) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidArgument {
                arg: "scale_m",
                value: scale.to_string(),
            });
        }
        let origin_x = (bounds.min().x / scale).floor() * scale;
        let origin_y = (bounds.max().y / scale).ceil() * scale;
        let cols = (((bounds.max().x - origin_x) / scale).ceil() as usize).max(1);
        let rows = (((origin_y - bounds.min().y) / scale).ceil() as usize).max(1);
        Ok(Self::new(
            rows,
            cols,
            GeoTransform::new(origin_x, origin_y, scale, -scale),
            crs,
        ))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nominal pixel edge length in CRS units.
    pub fn pixel_size(&self) -> f64 {
        self.transform.pixel_width.abs()
    }

    /// Map coordinates of a pixel centre.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let t = &self.transform;
        (
            t.origin_x + (col as f64 + 0.5) * t.pixel_width,
            t.origin_y + (row as f64 + 0.5) * t.pixel_height,
        )
    }

    /// Fractional (col, row) position of a map coordinate, pixel corners at integers.
    pub fn map_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let t = &self.transform;
        (
            (x - t.origin_x) / t.pixel_width,
            (y - t.origin_y) / t.pixel_height,
        )
    }

    pub fn bounds(&self) -> Rect<f64> {
        let t = &self.transform;
        let x1 = t.origin_x + self.cols as f64 * t.pixel_width;
        let y1 = t.origin_y + self.rows as f64 * t.pixel_height;
        Rect::new(
            Coord {
                x: t.origin_x,
                y: t.origin_y,
            },
            Coord { x: x1, y: y1 },
        )
    }

    /// Same shape, CRS and transform within a small tolerance.
    pub fn is_aligned_with(&self, other: &GridSpec) -> bool {
        const EPS: f64 = 1e-6;
        let (a, b) = (&self.transform, &other.transform);
        self.shape() == other.shape()
            && self.crs == other.crs
            && (a.origin_x - b.origin_x).abs() < EPS
            && (a.origin_y - b.origin_y).abs() < EPS
            && (a.pixel_width - b.pixel_width).abs() < EPS
            && (a.pixel_height - b.pixel_height).abs() < EPS
    }

    pub fn ensure_aligned(&self, other: &GridSpec) -> Result<()> {
        if self.is_aligned_with(other) {
            Ok(())
        } else {
            Err(Error::GridMismatch {
                expected: self.describe(),
                actual: other.describe(),
            })
        }
    }

    fn describe(&self) -> String {
        format!(
            "{}x{} @ ({}, {}) px {} {}",
            self.cols,
            self.rows,
            self.transform.origin_x,
            self.transform.origin_y,
            self.transform.pixel_width,
            self.crs
        )
    }
}

/// A value grid plus its validity mask (`true` = valid).
#[derive(Debug, Clone)]
pub struct Band {
    pub data: Array2<f64>,
    pub mask: Array2<bool>,
}

/// Equal when the masks match and every valid pixel holds the same value; whatever sits
/// under masked pixels is ignored.
impl PartialEq for Band {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .zip(self.mask.iter())
                .all(|((a, b), &m)| !m || a == b)
    }
}

impl Band {
    pub fn new(data: Array2<f64>, mask: Array2<bool>) -> Result<Self> {
        if data.dim() != mask.dim() {
            let (r, c) = data.dim();
            let (mr, mc) = mask.dim();
            return Err(Error::GridMismatch {
                expected: format!("{c}x{r}"),
                actual: format!("{mc}x{mr}"),
            });
        }
        Ok(Self { data, mask })
    }

    /// Band whose mask is the set of finite values.
    pub fn from_data(data: Array2<f64>) -> Self {
        let mask = data.mapv(f64::is_finite);
        Self { data, mask }
    }

    /// Every pixel valid with the same value.
    pub fn constant(shape: (usize, usize), value: f64) -> Self {
        Self {
            data: Array2::from_elem(shape, value),
            mask: Array2::from_elem(shape, true),
        }
    }

    /// Every pixel masked; the empty-input composite.
    pub fn masked(shape: (usize, usize)) -> Self {
        Self {
            data: Array2::from_elem(shape, f64::NAN),
            mask: Array2::from_elem(shape, false),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if self.mask[[row, col]] {
            Some(self.data[[row, col]])
        } else {
            None
        }
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn is_fully_masked(&self) -> bool {
        !self.mask.iter().any(|&m| m)
    }

    /// Values of valid pixels in row-major order.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .zip(self.mask.iter())
            .filter_map(|(&v, &m)| if m { Some(v) } else { None })
    }

    /// Narrow the mask by intersection with `keep`.
    pub fn update_mask(&mut self, keep: &Array2<bool>) {
        Zip::from(&mut self.mask)
            .and(keep)
            .for_each(|m, &k| *m = *m && k);
    }

    /// Same as `update_mask` but consuming.
    pub fn with_mask(mut self, keep: &Array2<bool>) -> Self {
        self.update_mask(keep);
        self
    }

    /// Per-pixel transform; results that are not finite become masked.
    pub fn map<F>(&self, f: F) -> Band
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        let mut out = Band::masked(self.dim());
        Zip::from(&mut out.data)
            .and(&mut out.mask)
            .and(&self.data)
            .and(&self.mask)
            .par_for_each(|o, om, &v, &m| {
                if m {
                    let r = f(v);
                    if r.is_finite() {
                        *o = r;
                        *om = true;
                    }
                }
            });
        out
    }

    /// Binary per-pixel expression; the output mask is the intersection of both inputs.
    pub fn zip_map<F>(&self, other: &Band, f: F) -> Result<Band>
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        self.ensure_same_shape(other)?;
        let mut out = Band::masked(self.dim());
        Zip::from(&mut out.data)
            .and(&mut out.mask)
            .and(&self.data)
            .and(&self.mask)
            .and(&other.data)
            .and(&other.mask)
            .par_for_each(|o, om, &a, &ma, &b, &mb| {
                if ma && mb {
                    let r = f(a, b);
                    if r.is_finite() {
                        *o = r;
                        *om = true;
                    }
                }
            });
        Ok(out)
    }

    /// 1.0 where the value exceeds `threshold`, 0.0 elsewhere; mask unchanged.
    pub fn gt(&self, threshold: f64) -> Band {
        self.map(|v| if v > threshold { 1.0 } else { 0.0 })
    }

    /// Mask every zero pixel, keeping only the non-zero ones.
    pub fn self_mask(&self) -> Band {
        let mut out = self.clone();
        Zip::from(&mut out.mask)
            .and(&self.data)
            .for_each(|m, &v| *m = *m && v != 0.0);
        out
    }

    /// Row-major f32 values with masked pixels as NaN, ready for a Float32 GeoTIFF.
    pub fn to_f32_nan(&self) -> Vec<f32> {
        self.data
            .iter()
            .zip(self.mask.iter())
            .map(|(&v, &m)| if m { v as f32 } else { f32::NAN })
            .collect()
    }

    fn ensure_same_shape(&self, other: &Band) -> Result<()> {
        if self.dim() != other.dim() {
            let (r, c) = self.dim();
            let (or, oc) = other.dim();
            return Err(Error::GridMismatch {
                expected: format!("{c}x{r}"),
                actual: format!("{oc}x{or}"),
            });
        }
        Ok(())
    }
}

/// A band on its own source grid, before alignment onto the analysis grid.
#[derive(Debug, Clone)]
pub struct GeoBand {
    pub grid: GridSpec,
    pub band: Band,
}

impl GeoBand {
    pub fn new(grid: GridSpec, band: Band) -> Result<Self> {
        if band.dim() != grid.shape() {
            return Err(Error::GridMismatch {
                expected: format!("{}x{}", grid.cols, grid.rows),
                actual: format!("{}x{}", band.dim().1, band.dim().0),
            });
        }
        Ok(Self { grid, band })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn covering_grid_snaps_to_scale() {
        let bounds = Rect::new(Coord { x: 10.0, y: 5.0 }, Coord { x: 95.0, y: 61.0 });
        let grid = GridSpec::covering(bounds, 30.0, "EPSG:32748").unwrap();
        assert_eq!(grid.transform.origin_x, 0.0);
        assert_eq!(grid.transform.origin_y, 90.0);
        assert_eq!(grid.cols, 4);
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.pixel_center(0, 0), (15.0, 75.0));
    }

    #[test]
    fn map_to_pixel_inverts_pixel_center() {
        let grid = GridSpec::new(4, 4, GeoTransform::new(100.0, 200.0, 10.0, -10.0), "EPSG:3857");
        let (x, y) = grid.pixel_center(2, 3);
        let (col, row) = grid.map_to_pixel(x, y);
        assert_eq!((col, row), (3.5, 2.5));
    }

    #[test]
    fn zip_map_intersects_masks() {
        let a = Band::new(array![[1.0, 2.0], [3.0, 4.0]], array![[true, false], [true, true]])
            .unwrap();
        let b = Band::new(array![[1.0, 1.0], [1.0, 1.0]], array![[true, true], [false, true]])
            .unwrap();
        let sum = a.zip_map(&b, |x, y| x + y).unwrap();
        assert_eq!(sum.mask, array![[true, false], [false, true]]);
        assert_eq!(sum.get(1, 1), Some(5.0));
    }

    #[test]
    fn non_finite_results_are_masked() {
        let band = Band::from_data(array![[0.0, 1.0]]);
        let inv = band.map(|v| 1.0 / v);
        assert_eq!(inv.get(0, 0), None);
        assert_eq!(inv.get(0, 1), Some(1.0));
    }

    #[test]
    fn self_mask_keeps_only_non_zero() {
        let band = Band::from_data(array![[0.0, 1.0, 2.0]]).gt(0.5).self_mask();
        assert_eq!(band.mask, array![[false, true, true]]);
    }

    #[test]
    fn equality_ignores_values_under_the_mask() {
        let a = Band::new(array![[1.0, f64::NAN]], array![[true, false]]).unwrap();
        let b = Band::new(array![[1.0, 7.0]], array![[true, false]]).unwrap();
        assert_eq!(a, b);
        let c = Band::new(array![[2.0, f64::NAN]], array![[true, false]]).unwrap();
        assert_ne!(a, c);
        let d = Band::new(array![[1.0, 7.0]], array![[true, true]]).unwrap();
        assert_ne!(b, d);
    }
}

use ndarray::{Array2, Zip};

use crate::core::raster::Band;

/// Normalized difference: (a - b) / (a + b); pixels with a zero sum are masked
pub fn normalized_difference(a: &Array2<f64>, b: &Array2<f64>) -> Band {
    let mut out = Band::masked(a.dim());
    Zip::from(&mut out.data)
        .and(&mut out.mask)
        .and(a)
        .and(b)
        .par_for_each(|res, valid, &a_val, &b_val| {
            let sum = a_val + b_val;
            if sum.abs() > 1e-10 {
                let nd = (a_val - b_val) / sum;
                if nd.is_finite() {
                    *res = nd;
                    *valid = true;
                }
            }
        });
    out
}

/// Linear rescale: value * gain + offset
pub fn linear_scale(values: &Array2<f64>, gain: f64, offset: f64) -> Array2<f64> {
    values.mapv(|v| v * gain + offset)
}

/// Boolean keep-mask from a band: true where the band is valid and `keep` holds
pub fn keep_where<F>(band: &Band, keep: F) -> Array2<bool>
where
    F: Fn(f64) -> bool + Sync + Send,
{
    let mut out = Array2::from_elem(band.dim(), false);
    Zip::from(&mut out)
        .and(&band.data)
        .and(&band.mask)
        .par_for_each(|o, &v, &m| *o = m && keep(v));
    out
}

/// Per-pixel mean over every band valid at that pixel.
/// Pixels with no contributing band stay masked; an empty input is fully masked.
pub fn mean_composite<'a, I>(bands: I, shape: (usize, usize)) -> Band
where
    I: IntoIterator<Item = &'a Band>,
{
    let mut sum = Array2::<f64>::zeros(shape);
    let mut count = Array2::<u32>::zeros(shape);
    for band in bands {
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&band.data)
            .and(&band.mask)
            .par_for_each(|s, c, &v, &m| {
                if m {
                    *s += v;
                    *c += 1;
                }
            });
    }
    let mut out = Band::masked(shape);
    Zip::from(&mut out.data)
        .and(&mut out.mask)
        .and(&sum)
        .and(&count)
        .par_for_each(|o, valid, &s, &c| {
            if c > 0 {
                *o = s / c as f64;
                *valid = true;
            }
        });
    out
}

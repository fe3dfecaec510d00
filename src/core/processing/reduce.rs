//! Regional reductions: scalar summaries of a band over the region of interest.
//!
//! Reductions are evaluated at a pixel scale. When the scale is coarser than the analysis
//! grid, pixels are aggregated into `stride × stride` blocks (mean of the valid pixels in
//! the block) before reducing, so a 1000 m chart reduction over a 30 m grid reads
//! 33 × 33 blocks. The number of region pixels/blocks read is checked against a cap before
//! any value is collected.
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::raster::Band;
use crate::error::{Error, Result};
use crate::types::Reducer;

/// One-pass summary of a band over the region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Ordinary least squares `y = offset + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub offset: f64,
    pub count: usize,
}

/// Scale and pixel cap for one reduction site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceOptions {
    pub scale: f64,
    pub max_pixels: u64,
}

impl ReduceOptions {
    pub fn new(scale: f64, max_pixels: u64) -> Self {
        Self { scale, max_pixels }
    }
}

/// Reduces bands over the pixels of a region mask.
#[derive(Debug, Clone, Copy)]
pub struct RegionReducer<'a> {
    region: &'a Array2<bool>,
    pixel_size: f64,
}

impl<'a> RegionReducer<'a> {
    pub fn new(region: &'a Array2<bool>, pixel_size: f64) -> Self {
        Self { region, pixel_size }
    }

    pub fn region(&self) -> &Array2<bool> {
        self.region
    }

    fn stride(&self, scale: f64) -> usize {
        if self.pixel_size <= 0.0 {
            return 1;
        }
        ((scale / self.pixel_size).round() as usize).max(1)
    }

    /// Collect N-component samples over the region. `value` yields a sample only where
    /// every contributing band is valid.
    fn collect<const N: usize, F>(
        &self,
        opts: ReduceOptions,
        reducer: Reducer,
        name: &str,
        value: F,
    ) -> Result<Vec<[f64; N]>>
    where
        F: Fn(usize, usize) -> Option<[f64; N]>,
    {
        let (rows, cols) = self.region.dim();
        let stride = self.stride(opts.scale);
        let mut read: u64 = 0;
        let mut samples = Vec::new();

        if stride == 1 {
            read = self.region.iter().filter(|&&m| m).count() as u64;
            check_cap(read, opts.max_pixels, reducer, name)?;
            for ((r, c), &inside) in self.region.indexed_iter() {
                if inside {
                    if let Some(v) = value(r, c) {
                        samples.push(v);
                    }
                }
            }
        } else {
            let mut blocks: Vec<(usize, usize)> = Vec::new();
            for br in (0..rows).step_by(stride) {
                for bc in (0..cols).step_by(stride) {
                    let touches = (br..(br + stride).min(rows))
                        .any(|r| (bc..(bc + stride).min(cols)).any(|c| self.region[[r, c]]));
                    if touches {
                        blocks.push((br, bc));
                    }
                }
            }
            read += blocks.len() as u64;
            check_cap(read, opts.max_pixels, reducer, name)?;
            for (br, bc) in blocks {
                let mut acc = [0.0; N];
                let mut n = 0usize;
                for r in br..(br + stride).min(rows) {
                    for c in bc..(bc + stride).min(cols) {
                        if !self.region[[r, c]] {
                            continue;
                        }
                        if let Some(v) = value(r, c) {
                            for (a, x) in acc.iter_mut().zip(v) {
                                *a += x;
                            }
                            n += 1;
                        }
                    }
                }
                if n > 0 {
                    samples.push(acc.map(|a| a / n as f64));
                }
            }
        }

        debug!(
            "{} {}: read {} cells at stride {}, {} valid samples",
            name,
            reducer,
            read,
            stride,
            samples.len()
        );
        if samples.is_empty() {
            return Err(Error::fully_masked(format!("{name} {reducer}")));
        }
        Ok(samples)
    }

    fn values(
        &self,
        band: &Band,
        opts: ReduceOptions,
        reducer: Reducer,
        name: &str,
    ) -> Result<Vec<f64>> {
        self.ensure_shape(band)?;
        let samples = self.collect::<1, _>(opts, reducer, name, |r, c| band.get(r, c).map(|v| [v]))?;
        Ok(samples.into_iter().map(|[v]| v).collect())
    }

    /// Count, mean, population standard deviation, min and max in one pass (Welford).
    pub fn summary(
        &self,
        band: &Band,
        opts: ReduceOptions,
        reducer: Reducer,
        name: &str,
    ) -> Result<SummaryStats> {
        let values = self.values(band, opts, reducer, name)?;
        let mut count = 0u64;
        let mut mean = 0.0_f64;
        let mut m2 = 0.0_f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            let delta = v - mean;
            mean += delta / count as f64;
            m2 += delta * (v - mean);
        }
        let std_dev = if count > 1 {
            (m2 / count as f64).sqrt()
        } else {
            0.0
        };
        Ok(SummaryStats {
            count: count as usize,
            mean,
            std_dev,
            min,
            max,
        })
    }

    pub fn mean(&self, band: &Band, opts: ReduceOptions, name: &str) -> Result<f64> {
        Ok(self.summary(band, opts, Reducer::Mean, name)?.mean)
    }

    pub fn min_max(&self, band: &Band, opts: ReduceOptions, name: &str) -> Result<(f64, f64)> {
        let s = self.summary(band, opts, Reducer::MinMax, name)?;
        Ok((s.min, s.max))
    }

    /// Exact median; the mean of the two middle values for an even count.
    pub fn median(&self, band: &Band, opts: ReduceOptions, name: &str) -> Result<f64> {
        let mut values = self.values(band, opts, Reducer::Median, name)?;
        values.sort_by(f64::total_cmp);
        let n = values.len();
        Ok(if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        } else {
            values[n / 2]
        })
    }

    /// Least-squares fit of `y` on `x` over pixels where both are valid.
    pub fn linear_fit(
        &self,
        x: &Band,
        y: &Band,
        opts: ReduceOptions,
        name: &str,
    ) -> Result<LinearFit> {
        self.ensure_shape(x)?;
        self.ensure_shape(y)?;
        let pairs = self.collect::<2, _>(opts, Reducer::LinearFit, name, |r, c| {
            match (x.get(r, c), y.get(r, c)) {
                (Some(a), Some(b)) => Some([a, b]),
                _ => None,
            }
        })?;
        let n = pairs.len() as f64;
        let mean_x = pairs.iter().map(|p| p[0]).sum::<f64>() / n;
        let mean_y = pairs.iter().map(|p| p[1]).sum::<f64>() / n;
        let (mut sxy, mut sxx) = (0.0_f64, 0.0_f64);
        for [a, b] in &pairs {
            sxy += (a - mean_x) * (b - mean_y);
            sxx += (a - mean_x) * (a - mean_x);
        }
        let slope = sxy / sxx;
        if !slope.is_finite() {
            return Err(Error::NumericDomain {
                quantity: "regression slope",
                value: slope,
            });
        }
        Ok(LinearFit {
            slope,
            offset: mean_y - slope * mean_x,
            count: pairs.len(),
        })
    }

    fn ensure_shape(&self, band: &Band) -> Result<()> {
        if band.dim() != self.region.dim() {
            let (r, c) = self.region.dim();
            let (br, bc) = band.dim();
            return Err(Error::GridMismatch {
                expected: format!("{c}x{r}"),
                actual: format!("{bc}x{br}"),
            });
        }
        Ok(())
    }
}

fn check_cap(read: u64, max_pixels: u64, reducer: Reducer, name: &str) -> Result<()> {
    if read > max_pixels {
        return Err(Error::TooManyPixels {
            reducer: format!("{name} {reducer}"),
            count: read,
            max_pixels,
        });
    }
    Ok(())
}

//! Lapse-rate correction: regress the series-mean LST on elevation over the region, then
//! remove `slope * (elevation - reference)` from every scene.
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::processing::reduce::{ReduceOptions, RegionReducer};
use crate::core::raster::Band;
use crate::core::scene::{CorrectedScene, LstScene};
use crate::error::{Error, Result};

/// Regression result used by the correction. Every field is validated finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationFit {
    /// Local lapse rate in °C per meter
    pub slope: f64,
    /// Regression intercept in °C
    pub intercept: f64,
    /// Median elevation over the region in meters
    pub reference_elevation: f64,
    pub sample_count: usize,
}

/// Fit the lapse rate from the uncorrected series-mean LST composite.
pub fn fit_elevation(
    reducer: &RegionReducer<'_>,
    mean_lst: &Band,
    dem: &Band,
    fit_opts: ReduceOptions,
    median_opts: ReduceOptions,
) -> Result<ElevationFit> {
    let fit = reducer.linear_fit(dem, mean_lst, fit_opts, "LST~elevation")?;
    let reference_elevation = reducer.median(dem, median_opts, "elevation")?;
    if !reference_elevation.is_finite() {
        return Err(Error::NumericDomain {
            quantity: "reference elevation",
            value: reference_elevation,
        });
    }
    info!(
        "Local lapse rate (slope): {:.6} °C/m, intercept {:.3} °C, reference elevation {:.1} m ({} samples)",
        fit.slope, fit.offset, reference_elevation, fit.count
    );
    Ok(ElevationFit {
        slope: fit.slope,
        intercept: fit.offset,
        reference_elevation,
        sample_count: fit.count,
    })
}

/// `lst - slope * (elevation - reference)`; pixels without elevation are masked.
pub fn apply_correction(lst: &Band, dem: &Band, slope: f64, reference_elevation: f64) -> Result<Band> {
    lst.zip_map(dem, |t, elev| t - slope * (elev - reference_elevation))
}

/// Correct one scene. Only an `LstScene` is accepted, so a corrected scene is never corrected again.
pub fn correct_scene(scene: &LstScene, dem: &Band, fit: &ElevationFit) -> Result<CorrectedScene> {
    let lst_corrected = apply_correction(&scene.lst, dem, fit.slope, fit.reference_elevation)?;
    Ok(CorrectedScene {
        meta: scene.meta.clone(),
        lst_corrected,
    })
}

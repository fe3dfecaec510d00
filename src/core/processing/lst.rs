//! Land-surface temperature by the mono-window algorithm with NDVI-derived emissivity.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::raster::Band;
use crate::core::scene::{LstScene, PreparedScene};
use crate::error::{Error, Result};

/// Effective wavelength of TIRS band 10 (m)
pub const EFFECTIVE_WAVELENGTH: f64 = 10.895e-6;
/// h·c/σ (m·K)
pub const RHO: f64 = 1.438e-2;
pub const KELVIN_OFFSET: f64 = 273.15;
pub const EMISSIVITY_SOIL: f64 = 0.986;
pub const EMISSIVITY_VEGETATION_GAIN: f64 = 0.004;

/// NDVI extrema over the region, used to normalize the vegetation proportion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NdviRange {
    pub min: f64,
    pub max: f64,
}

/// Proportion of vegetation, `((ndvi - min) / (max - min))²` with the ratio clamped to [0, 1].
/// A degenerate range (max <= min) yields 0.
pub fn vegetation_proportion(ndvi: f64, range: NdviRange) -> f64 {
    let span = range.max - range.min;
    if span <= 0.0 {
        return 0.0;
    }
    let ratio = ((ndvi - range.min) / span).clamp(0.0, 1.0);
    ratio * ratio
}

pub fn emissivity(pv: f64) -> f64 {
    EMISSIVITY_VEGETATION_GAIN * pv + EMISSIVITY_SOIL
}

/// Mono-window LST in °C from brightness temperature (K) and emissivity.
pub fn mono_window(tb: f64, em: f64) -> Result<f64> {
    if !(em > 0.0 && em <= 1.0) {
        return Err(Error::NumericDomain {
            quantity: "emissivity",
            value: em,
        });
    }
    Ok(lst_celsius(tb, em))
}

#[inline]
fn lst_celsius(tb: f64, em: f64) -> f64 {
    tb / (1.0 + (EFFECTIVE_WAVELENGTH * tb / RHO) * em.ln()) - KELVIN_OFFSET
}

/// Retrieve PV, emissivity and LST for a masked scene.
///
/// `ndvi_range` is None when the scene has no valid pixel in the region; the scene then
/// carries fully masked bands rather than failing.
pub fn retrieve_lst(scene: &PreparedScene, ndvi_range: Option<NdviRange>) -> Result<LstScene> {
    let shape = scene.dim();
    let Some(range) = ndvi_range else {
        warn!("{}: no valid pixels in region, LST left fully masked", scene.meta.id);
        return Ok(LstScene {
            meta: scene.meta.clone(),
            pv: Band::masked(shape),
            emissivity: Band::masked(shape),
            lst: Band::masked(shape),
        });
    };
    if range.max <= range.min {
        warn!(
            "{}: degenerate NDVI range [{}, {}], vegetation proportion set to 0",
            scene.meta.id, range.min, range.max
        );
    }

    let pv = scene.ndvi_band().map(|ndvi| vegetation_proportion(ndvi, range));
    let em = pv.map(emissivity);
    if let Some(bad) = em.valid_values().find(|&e| !(e > 0.0 && e <= 1.0)) {
        return Err(Error::NumericDomain {
            quantity: "emissivity",
            value: bad,
        });
    }
    let lst = scene.brightness_temp_band().zip_map(&em, lst_celsius)?;
    debug!(
        "LST for {}: NDVI range [{:.3}, {:.3}], {} valid pixels",
        scene.meta.id,
        range.min,
        range.max,
        lst.valid_count()
    );

    Ok(LstScene {
        meta: scene.meta.clone(),
        pv,
        emissivity: em,
        lst,
    })
}

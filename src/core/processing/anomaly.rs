//! Regional anomaly classification of the final corrected LST composite.
//!
//! Thresholds are `µ + k·σ` with µ and σ taken over the region. Because every tier uses the
//! same µ and σ and multipliers are validated increasing, strong ⊆ medium ⊆ weak ⊆ main.
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::params::AnomalyMultipliers;
use crate::core::processing::reduce::{ReduceOptions, RegionReducer};
use crate::core::raster::Band;
use crate::error::{Error, Result};
use crate::types::{AnomalyTier, Reducer};

/// Regional mean and standard deviation of the final composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionalStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl RegionalStats {
    /// Reduce `composite` over the region; both statistics must be finite.
    pub fn compute(reducer: &RegionReducer<'_>, composite: &Band, opts: ReduceOptions) -> Result<Self> {
        let s = reducer.summary(composite, opts, Reducer::StdDev, "LST_corrected")?;
        for (quantity, value) in [("regional mean", s.mean), ("regional standard deviation", s.std_dev)] {
            if !value.is_finite() {
                return Err(Error::NumericDomain { quantity, value });
            }
        }
        info!("Regional LST mean (µ): {:.3} °C", s.mean);
        info!("Regional LST standard deviation (σ): {:.3} °C", s.std_dev);
        Ok(Self {
            mean: s.mean,
            std_dev: s.std_dev,
            count: s.count,
        })
    }
}

/// Anomaly thresholds in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub main: f64,
    pub weak: f64,
    pub medium: f64,
    pub strong: f64,
}

impl Thresholds {
    pub fn from_stats(stats: &RegionalStats, multipliers: &AnomalyMultipliers) -> Self {
        let at = |k: f64| stats.mean + k * stats.std_dev;
        Self {
            main: at(AnomalyMultipliers::MAIN),
            weak: at(multipliers.weak),
            medium: at(multipliers.medium),
            strong: at(multipliers.strong),
        }
    }

    pub fn get(&self, tier: AnomalyTier) -> f64 {
        match tier {
            AnomalyTier::Main => self.main,
            AnomalyTier::Weak => self.weak,
            AnomalyTier::Medium => self.medium,
            AnomalyTier::Strong => self.strong,
        }
    }

    pub fn log(&self, multipliers: &AnomalyMultipliers) {
        info!("Main anomaly threshold (> µ + 1σ): {:.3} °C", self.main);
        info!("Weak anomaly threshold (> µ + {}σ): {:.3} °C", multipliers.weak, self.weak);
        info!("Medium anomaly threshold (> µ + {}σ): {:.3} °C", multipliers.medium, self.medium);
        info!("Strong anomaly threshold (> µ + {}σ): {:.3} °C", multipliers.strong, self.strong);
    }
}

/// Anomaly rasters over the final composite.
#[derive(Debug, Clone)]
pub struct AnomalyLayers {
    /// 0/1 above the main threshold, zeros kept valid
    pub main: Band,
    /// 1 above the tier threshold, everything else masked
    pub weak: Band,
    pub medium: Band,
    pub strong: Band,
    /// Highest tier exceeded per pixel (0 none .. 4 strong)
    pub tier_class: Band,
}

impl AnomalyLayers {
    pub fn classify(composite: &Band, thresholds: &Thresholds) -> Self {
        let main = composite.gt(thresholds.main);
        let weak = composite.gt(thresholds.weak).self_mask();
        let medium = composite.gt(thresholds.medium).self_mask();
        let strong = composite.gt(thresholds.strong).self_mask();
        let tier_class = tier_class(composite, thresholds);
        Self {
            main,
            weak,
            medium,
            strong,
            tier_class,
        }
    }
}

/// Code of the highest tier whose threshold the pixel exceeds, 0 if none.
pub fn tier_class(composite: &Band, thresholds: &Thresholds) -> Band {
    let mut out = composite.clone();
    Zip::from(&mut out.data)
        .and(&composite.mask)
        .par_for_each(|v, &valid| {
            if valid {
                let lst = *v;
                *v = AnomalyTier::ALL
                    .iter()
                    .rev()
                    .find(|&&tier| lst > thresholds.get(tier))
                    .map_or(0.0, |tier| f64::from(tier.class_code()));
            }
        });
    out
}

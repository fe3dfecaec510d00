use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Seasonal calendar window by month, inclusive on both ends.
/// `start_month > end_month` wraps over the new year (e.g. 10 → 4 is October..April).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonWindow {
    pub start_month: u32,
    pub end_month: u32,
}

impl SeasonWindow {
    pub fn contains_month(&self, month: u32) -> bool {
        if self.start_month <= self.end_month {
            month >= self.start_month && month <= self.end_month
        } else {
            month >= self.start_month || month <= self.end_month
        }
    }
}

impl Default for SeasonWindow {
    fn default() -> Self {
        // Rainy season on Java
        Self {
            start_month: 10,
            end_month: 4,
        }
    }
}

/// Standard-deviation multipliers for the weak/medium/strong anomaly tiers.
/// The main tier is always µ + 1σ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyMultipliers {
    pub weak: f64,
    pub medium: f64,
    pub strong: f64,
}

impl AnomalyMultipliers {
    pub const MAIN: f64 = 1.0;
}

impl Default for AnomalyMultipliers {
    fn default() -> Self {
        Self {
            weak: 1.5,
            medium: 2.0,
            strong: 2.5,
        }
    }
}

/// Land-cover product settings for the urban exclusion mask.
/// The class code depends on the land-cover product version and must be checked per study area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrbanMaskParams {
    pub reference_year: i32,
    pub class_code: u16,
}

impl Default for UrbanMaskParams {
    fn default() -> Self {
        Self {
            reference_year: 2019,
            class_code: 50,
        }
    }
}

/// Pixel-count safety caps, one per reduction site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelCaps {
    pub ndvi_minmax: u64,
    pub linear_fit: u64,
    pub median: u64,
    pub regional_stats: u64,
    pub lst_minmax: u64,
    pub chart: u64,
}

impl Default for PixelCaps {
    fn default() -> Self {
        Self {
            ndvi_minmax: 1_000_000_000,
            linear_fit: 1_000_000_000,
            median: 1_000_000_000,
            regional_stats: 10_000_000_000_000,
            lst_minmax: 1_000_000_000,
            chart: 1_000_000_000,
        }
    }
}

/// Linear transforms from digital numbers to physical units (Collection 2 Level-2 defaults).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiometricScaling {
    pub optical_gain: f64,
    pub optical_offset: f64,
    pub thermal_gain: f64,
    pub thermal_offset: f64,
}

impl Default for RadiometricScaling {
    fn default() -> Self {
        Self {
            optical_gain: 0.0000275,
            optical_offset: -0.2,
            thermal_gain: 0.00341802,
            thermal_offset: 149.0,
        }
    }
}

/// Analysis parameters suitable for config files. Immutable once validated and passed
/// by reference into every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// First day of the scene date range (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the scene date range (exclusive)
    pub end_date: NaiveDate,
    pub season: SeasonWindow,
    /// Scenes with cloud cover at or above this percentage are dropped
    pub cloud_cover_max: f64,
    pub processing_level: String,
    /// Fault buffer distance in grid CRS units (meters)
    pub fault_buffer_m: f64,
    pub multipliers: AnomalyMultipliers,
    /// Pixels with MNDWI at or above this value are treated as water
    pub water_index_threshold: f64,
    pub urban: UrbanMaskParams,
    /// Analysis pixel size in meters
    pub scale_m: f64,
    /// Pixel scale used for the annual chart reductions
    pub chart_scale_m: f64,
    pub max_pixels: PixelCaps,
    pub scaling: RadiometricScaling,
    /// Worker threads for scene loading and every parallel analysis stage; None uses all cores
    pub workers: Option<usize>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            start_date: ymd(2017, 1, 1),
            end_date: ymd(2023, 12, 31),
            season: SeasonWindow::default(),
            cloud_cover_max: 10.0,
            processing_level: "L2SP".to_string(),
            fault_buffer_m: 1000.0,
            multipliers: AnomalyMultipliers::default(),
            water_index_threshold: -0.25,
            urban: UrbanMaskParams::default(),
            scale_m: 30.0,
            chart_scale_m: 1000.0,
            max_pixels: PixelCaps::default(),
            scaling: RadiometricScaling::default(),
            workers: None,
        }
    }
}

impl AnalysisParams {
    /// Check every option before any raster is touched.
    pub fn validate(&self) -> Result<()> {
        if self.start_date >= self.end_date {
            return Err(Error::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        for (arg, month) in [
            ("season.start_month", self.season.start_month),
            ("season.end_month", self.season.end_month),
        ] {
            if !(1..=12).contains(&month) {
                return Err(Error::InvalidArgument {
                    arg,
                    value: month.to_string(),
                });
            }
        }
        if !(0.0..=100.0).contains(&self.cloud_cover_max) {
            return Err(Error::InvalidArgument {
                arg: "cloud_cover_max",
                value: self.cloud_cover_max.to_string(),
            });
        }
        if !self.fault_buffer_m.is_finite() || self.fault_buffer_m < 0.0 {
            return Err(Error::InvalidArgument {
                arg: "fault_buffer_m",
                value: self.fault_buffer_m.to_string(),
            });
        }
        let m = self.multipliers;
        let finite = m.weak.is_finite() && m.medium.is_finite() && m.strong.is_finite();
        if !finite || m.weak < AnomalyMultipliers::MAIN || m.weak >= m.medium || m.medium >= m.strong
        {
            return Err(Error::NonMonotonicMultipliers {
                weak: m.weak,
                medium: m.medium,
                strong: m.strong,
            });
        }
        if !self.water_index_threshold.is_finite() {
            return Err(Error::InvalidArgument {
                arg: "water_index_threshold",
                value: self.water_index_threshold.to_string(),
            });
        }
        for (arg, scale) in [("scale_m", self.scale_m), ("chart_scale_m", self.chart_scale_m)] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(Error::InvalidArgument {
                    arg,
                    value: scale.to_string(),
                });
            }
        }
        let caps = self.max_pixels;
        for (arg, cap) in [
            ("max_pixels.ndvi_minmax", caps.ndvi_minmax),
            ("max_pixels.linear_fit", caps.linear_fit),
            ("max_pixels.median", caps.median),
            ("max_pixels.regional_stats", caps.regional_stats),
            ("max_pixels.lst_minmax", caps.lst_minmax),
            ("max_pixels.chart", caps.chart),
        ] {
            if cap == 0 {
                return Err(Error::InvalidArgument {
                    arg,
                    value: cap.to_string(),
                });
            }
        }
        if self.workers == Some(0) {
            return Err(Error::InvalidArgument {
                arg: "workers",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Whether a capture date falls in the half-open date range.
    pub fn in_date_range(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }

    /// Calendar years covered by the annual series, inclusive on both ends.
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_date.year()..=self.end_date.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_reversed_dates() {
        let params = AnalysisParams {
            start_date: ymd(2023, 1, 1),
            end_date: ymd(2017, 1, 1),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn rejects_non_monotonic_multipliers() {
        let params = AnalysisParams {
            multipliers: AnomalyMultipliers {
                weak: 2.0,
                medium: 2.0,
                strong: 2.5,
            },
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::NonMonotonicMultipliers { .. })
        ));
    }

    #[test]
    fn rejects_weak_multiplier_below_main() {
        let params = AnalysisParams {
            multipliers: AnomalyMultipliers {
                weak: 0.5,
                medium: 2.0,
                strong: 2.5,
            },
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn season_window_wraps_over_new_year() {
        let season = SeasonWindow::default();
        for month in [10, 11, 12, 1, 2, 3, 4] {
            assert!(season.contains_month(month), "month {month}");
        }
        for month in 5..=9 {
            assert!(!season.contains_month(month), "month {month}");
        }
        let summer = SeasonWindow {
            start_month: 6,
            end_month: 8,
        };
        assert!(summer.contains_month(7));
        assert!(!summer.contains_month(9));
    }

    #[test]
    fn years_span_start_to_end_inclusive() {
        let params = AnalysisParams::default();
        let years: Vec<i32> = params.years().collect();
        assert_eq!(years, (2017..=2023).collect::<Vec<_>>());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let params: AnalysisParams =
            serde_json::from_str(r#"{ "fault_buffer_m": 2000.0 }"#).unwrap();
        assert_eq!(params.fault_buffer_m, 2000.0);
        assert_eq!(params.urban.class_code, 50);
        assert_eq!(params.processing_level, "L2SP");
    }

    #[test]
    fn partial_nested_sections_fill_defaults() {
        let params: AnalysisParams =
            serde_json::from_str(r#"{ "multipliers": { "strong": 3.0 } }"#).unwrap();
        assert_eq!(params.multipliers.strong, 3.0);
        assert_eq!(params.multipliers.weak, 1.5);
        assert_eq!(params.multipliers.medium, 2.0);
        assert!(params.validate().is_ok());

        let params: AnalysisParams =
            serde_json::from_str(r#"{ "max_pixels": { "chart": 5000 }, "urban": { "class_code": 190 } }"#)
                .unwrap();
        assert_eq!(params.max_pixels.chart, 5000);
        assert_eq!(params.max_pixels.ndvi_minmax, PixelCaps::default().ndvi_minmax);
        assert_eq!(params.urban.class_code, 190);
        assert_eq!(params.urban.reference_year, 2019);

        let params: AnalysisParams =
            serde_json::from_str(r#"{ "season": { "end_month": 3 }, "scaling": { "thermal_offset": 150.0 } }"#)
                .unwrap();
        assert_eq!(params.season.start_month, 10);
        assert_eq!(params.season.end_month, 3);
        assert_eq!(params.scaling.thermal_offset, 150.0);
        assert_eq!(params.scaling.optical_gain, RadiometricScaling::default().optical_gain);
    }
}

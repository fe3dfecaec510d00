//! Annual aggregation of the corrected series.
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::processing::ops::mean_composite;
use crate::core::processing::reduce::{ReduceOptions, RegionReducer};
use crate::core::raster::Band;
use crate::core::scene::CorrectedScene;
use crate::error::{Error, Result};

/// Mean corrected LST of one calendar year.
#[derive(Debug, Clone)]
pub struct AnnualComposite {
    pub year: i32,
    /// January 1 of `year`
    pub time_start: NaiveDate,
    pub composite: Band,
    pub scene_count: usize,
}

impl AnnualComposite {
    pub fn is_empty(&self) -> bool {
        self.scene_count == 0
    }
}

/// One point of the annual chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub year: i32,
    pub time_start: NaiveDate,
    pub scene_count: usize,
    /// Regional mean LST, None when the year has no valid pixel
    pub mean_lst: Option<f64>,
}

/// One composite per year of `years`, in increasing year order. Years without scenes
/// yield a fully masked composite.
pub fn annual_composites(
    scenes: &[CorrectedScene],
    years: RangeInclusive<i32>,
    shape: (usize, usize),
) -> Result<Vec<AnnualComposite>> {
    years
        .map(|year| {
            let time_start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| Error::InvalidArgument {
                arg: "year",
                value: year.to_string(),
            })?;
            let members: Vec<&Band> = scenes
                .iter()
                .filter(|s| s.meta.year() == year)
                .map(|s| &s.lst_corrected)
                .collect();
            if members.is_empty() {
                warn!("No scenes for {}, annual composite fully masked", year);
            } else {
                debug!("{}: {} scenes in annual composite", year, members.len());
            }
            Ok(AnnualComposite {
                year,
                time_start,
                scene_count: members.len(),
                composite: mean_composite(members.iter().copied(), shape),
            })
        })
        .collect()
}

/// Regional mean of every annual composite. Only "no valid pixel" turns into a gap; every
/// other failure (pixel cap, grid mismatch) is returned.
pub fn chart_series(
    reducer: &RegionReducer<'_>,
    annual: &[AnnualComposite],
    opts: ReduceOptions,
) -> Result<Vec<ChartPoint>> {
    annual
        .iter()
        .map(|a| {
            let name = format!("annual LST {}", a.year);
            let mean_lst = match reducer.mean(&a.composite, opts, &name) {
                Ok(v) => Some(v),
                Err(Error::FullyMasked { .. }) => None,
                Err(e) => return Err(e),
            };
            Ok(ChartPoint {
                year: a.year,
                time_start: a.time_start,
                scene_count: a.scene_count,
                mean_lst,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::SceneMeta;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn corrected(year: i32, month: u32, value: f64) -> CorrectedScene {
        CorrectedScene {
            meta: SceneMeta {
                id: format!("LC08_{year}{month:02}"),
                acquired: NaiveDate::from_ymd_opt(year, month, 10).unwrap(),
                cloud_cover: 2.0,
                processing_level: "L2SP".to_string(),
            },
            lst_corrected: Band::constant((2, 2), value),
        }
    }

    #[test]
    fn every_year_in_range_is_present_in_order() {
        let scenes = vec![
            corrected(2018, 1, 25.0),
            corrected(2018, 11, 27.0),
            corrected(2021, 3, 30.0),
        ];
        let annual = annual_composites(&scenes, 2017..=2023, (2, 2)).unwrap();
        let years: Vec<i32> = annual.iter().map(|a| a.year).collect();
        assert_eq!(years, (2017..=2023).collect::<Vec<_>>());
        assert!(annual[0].is_empty());
        assert!(annual[0].composite.is_fully_masked());
        assert_eq!(annual[1].scene_count, 2);
        assert_eq!(annual[1].composite.get(0, 0), Some(26.0));
        assert_eq!(annual[1].time_start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
    }

    #[test]
    fn chart_series_leaves_gaps_for_empty_years() {
        let scenes = vec![corrected(2019, 2, 28.0)];
        let annual = annual_composites(&scenes, 2018..=2020, (2, 2)).unwrap();
        let region = Array2::from_elem((2, 2), true);
        let reducer = RegionReducer::new(&region, 30.0);
        let series = chart_series(&reducer, &annual, ReduceOptions::new(1000.0, 10)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].mean_lst, None);
        assert_relative_eq!(series[1].mean_lst.unwrap(), 28.0);
        assert_eq!(series[2].mean_lst, None);
    }
}

//! Scene collection filtering: date range, region bounds, seasonal window, cloud cover and
//! processing level.
use chrono::Datelike;
use geo::Rect;
use tracing::debug;

use crate::core::geometry::Region;
use crate::core::params::AnalysisParams;
use crate::core::scene::{RawScene, SceneMeta};
use crate::error::{Error, Result};

/// Anything carrying scene metadata and a footprint can be filtered before its pixels are read.
pub trait SceneRecord {
    fn meta(&self) -> &SceneMeta;
    fn footprint(&self) -> Rect<f64>;
}

impl SceneRecord for RawScene {
    fn meta(&self) -> &SceneMeta {
        &self.meta
    }

    fn footprint(&self) -> Rect<f64> {
        self.grid.bounds()
    }
}

impl<T: SceneRecord + ?Sized> SceneRecord for &T {
    fn meta(&self) -> &SceneMeta {
        (**self).meta()
    }

    fn footprint(&self) -> Rect<f64> {
        (**self).footprint()
    }
}

/// Why a scene was rejected; the first failing criterion wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutsideDateRange,
    OutsideRegion,
    OutOfSeason,
    Cloudy,
    ProcessingLevel,
}

#[derive(Debug, Clone, Copy)]
pub struct SceneFilter<'a> {
    params: &'a AnalysisParams,
    region: &'a Region,
}

impl<'a> SceneFilter<'a> {
    pub fn new(params: &'a AnalysisParams, region: &'a Region) -> Self {
        Self { params, region }
    }

    pub fn check(&self, meta: &SceneMeta, footprint: &Rect<f64>) -> std::result::Result<(), Rejection> {
        let p = self.params;
        if !p.in_date_range(meta.acquired) {
            return Err(Rejection::OutsideDateRange);
        }
        if !self.region.intersects_rect(footprint) {
            return Err(Rejection::OutsideRegion);
        }
        if !p.season.contains_month(meta.acquired.month()) {
            return Err(Rejection::OutOfSeason);
        }
        if meta.cloud_cover.is_nan() || meta.cloud_cover >= p.cloud_cover_max {
            return Err(Rejection::Cloudy);
        }
        if meta.processing_level != p.processing_level {
            return Err(Rejection::ProcessingLevel);
        }
        Ok(())
    }

    /// Keep the accepted records in their original order. An empty result is `NoScenes`.
    pub fn apply<T: SceneRecord>(&self, records: Vec<T>) -> Result<Vec<T>> {
        let total = records.len();
        let kept: Vec<T> = records
            .into_iter()
            .filter(|r| match self.check(r.meta(), &r.footprint()) {
                Ok(()) => true,
                Err(reason) => {
                    debug!("Skipping {}: {:?}", r.meta().id, reason);
                    false
                }
            })
            .collect();
        debug!("Collection filter kept {} of {} scenes", kept.len(), total);
        if kept.is_empty() {
            return Err(Error::NoScenes { stage: "collection filter" });
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geo::{Coord, MultiPolygon, polygon};

    #[derive(Debug)]
    struct Record {
        meta: SceneMeta,
        footprint: Rect<f64>,
    }

    impl SceneRecord for Record {
        fn meta(&self) -> &SceneMeta {
            &self.meta
        }
        fn footprint(&self) -> Rect<f64> {
            self.footprint
        }
    }

    fn region() -> Region {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 0.0, y: 1000.0),
        ];
        Region::new(MultiPolygon(vec![square])).unwrap()
    }

    fn record(id: &str, date: (i32, u32, u32), cloud: f64, level: &str, x0: f64) -> Record {
        Record {
            meta: SceneMeta {
                id: id.to_string(),
                acquired: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                cloud_cover: cloud,
                processing_level: level.to_string(),
            },
            footprint: Rect::new(Coord { x: x0, y: 0.0 }, Coord { x: x0 + 500.0, y: 500.0 }),
        }
    }

    #[test]
    fn filter_applies_every_criterion() {
        let params = AnalysisParams::default();
        let region = region();
        let filter = SceneFilter::new(&params, &region);
        let kept = filter
            .apply(vec![
                record("ok", (2018, 11, 3), 4.0, "L2SP", 0.0),
                record("dry-season", (2018, 7, 3), 4.0, "L2SP", 0.0),
                record("cloudy", (2018, 11, 3), 10.0, "L2SP", 0.0),
                record("l1", (2018, 11, 3), 4.0, "L1TP", 0.0),
                record("elsewhere", (2018, 11, 3), 4.0, "L2SP", 5000.0),
                record("too-early", (2016, 12, 3), 4.0, "L2SP", 0.0),
                record("end-excluded", (2023, 12, 31), 4.0, "L2SP", 0.0),
                record("wrapped-season", (2019, 2, 3), 0.0, "L2SP", 0.0),
            ])
            .unwrap();
        let ids: Vec<&str> = kept.iter().map(|r| r.meta.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "wrapped-season"]);
    }

    #[test]
    fn empty_result_is_no_scenes() {
        let params = AnalysisParams::default();
        let region = region();
        let err = SceneFilter::new(&params, &region)
            .apply(vec![record("dry", (2018, 7, 3), 4.0, "L2SP", 0.0)])
            .unwrap_err();
        assert!(matches!(err, Error::NoScenes { .. }));
    }
}

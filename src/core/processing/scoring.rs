//! Hotspot scoring: combines the strong-anomaly layer with proximity to structural faults.
use serde::Serialize;
use tracing::info;

use crate::core::geometry::FaultBuffer;
use crate::core::raster::{Band, GridSpec};
use crate::error::Result;

/// Score rasters. Score 1 is every strong-anomaly pixel; Score 2 keeps only the strong
/// anomalies inside the fault buffer, so it is always a subset of Score 1.
#[derive(Debug, Clone)]
pub struct ScoreLayers {
    /// 1 within the buffer distance of any fault, 0 elsewhere, fully valid
    pub near_fault: Band,
    pub score1: Band,
    pub score2: Band,
}

/// Pixel counts of each score, for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub near_fault_pixels: usize,
    pub score1_pixels: usize,
    pub score2_pixels: usize,
}

impl ScoreLayers {
    pub fn compute(composite: &Band, strong_threshold: f64, faults: &FaultBuffer<'_>, grid: &GridSpec) -> Result<Self> {
        let near_fault = faults.rasterize(grid)?;
        let strong_base = composite.gt(strong_threshold);
        let score1 = strong_base.self_mask();
        let total = strong_base.zip_map(&near_fault, |a, b| a + b)?;
        let score2 = total.map(|s| if s >= 2.0 { 1.0 } else { 0.0 }).self_mask();

        let layers = Self {
            near_fault,
            score1,
            score2,
        };
        let summary = layers.summary();
        info!(
            "Fault buffer {} m: {} near-fault pixels, Score 1 {} pixels, Score 2 {} pixels",
            faults.distance(),
            summary.near_fault_pixels,
            summary.score1_pixels,
            summary.score2_pixels
        );
        Ok(layers)
    }

    pub fn summary(&self) -> ScoreSummary {
        let ones = |b: &Band| b.valid_values().filter(|&v| v == 1.0).count();
        ScoreSummary {
            near_fault_pixels: ones(&self.near_fault),
            score1_pixels: self.score1.valid_count(),
            score2_pixels: self.score2.valid_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::FaultSet;
    use crate::core::raster::GeoTransform;
    use geo::{Geometry, line_string};
    use ndarray::{Array2, array};

    fn grid() -> GridSpec {
        GridSpec::new(1, 6, GeoTransform::new(0.0, 100.0, 100.0, -100.0), "EPSG:32748")
    }

    fn faults() -> FaultSet {
        // Vertical fault at x = 50
        let line = line_string![(x: 50.0, y: -1000.0), (x: 50.0, y: 1000.0)];
        FaultSet::new(vec![Geometry::LineString(line)]).unwrap()
    }

    fn composite() -> Band {
        let data = array![[30.0, 10.0, 30.0, 30.0, 10.0, 30.0]];
        let mut mask = Array2::from_elem((1, 6), true);
        mask[[0, 3]] = false;
        Band::new(data, mask).unwrap()
    }

    #[test]
    fn score2_is_subset_of_score1() {
        let fs = faults();
        let layers = ScoreLayers::compute(&composite(), 20.0, &fs.buffer(250.0), &grid()).unwrap();
        // Pixel centres 50, 150, 250 lie within 250 m of the fault
        assert_eq!(layers.near_fault.data, array![[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]]);
        assert_eq!(layers.score1.mask, array![[true, false, true, false, false, true]]);
        assert_eq!(layers.score2.mask, array![[true, false, true, false, false, false]]);
        for ((r, c), &in2) in layers.score2.mask.indexed_iter() {
            assert!(!in2 || layers.score1.mask[[r, c]]);
        }
    }

    #[test]
    fn near_fault_layer_is_never_masked() {
        let fs = faults();
        let layers = ScoreLayers::compute(&composite(), 20.0, &fs.buffer(100.0), &grid()).unwrap();
        assert_eq!(layers.near_fault.valid_count(), 6);
        assert_eq!(layers.summary().near_fault_pixels, 2);
    }
}

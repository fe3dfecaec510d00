//! Pull-based analysis plan.
//!
//! Every intermediate product is computed on first request and memoized, so each regional
//! reduction runs exactly once and is validated before anything depending on it. Every
//! parallel stage (per-scene work, compositing, rasterization, resampling) runs on a
//! dedicated rayon pool sized from `AnalysisParams::workers`.
use ndarray::Array2;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::geometry::{FaultSet, Region};
use crate::core::params::AnalysisParams;
use crate::core::processing::anomaly::{AnomalyLayers, RegionalStats, Thresholds};
use crate::core::processing::collection::SceneFilter;
use crate::core::processing::elevation::{ElevationFit, correct_scene, fit_elevation};
use crate::core::processing::lst::{NdviRange, retrieve_lst};
use crate::core::processing::masking::{LandCover, mask_urban, mask_water};
use crate::core::processing::ops::mean_composite;
use crate::core::processing::preprocess::prepare_scene;
use crate::core::processing::reduce::{ReduceOptions, RegionReducer};
use crate::core::processing::resample::resample;
use crate::core::processing::scoring::{ScoreLayers, ScoreSummary};
use crate::core::processing::temporal::{AnnualComposite, ChartPoint, annual_composites, chart_series};
use crate::core::raster::{Band, GeoBand, GridSpec};
use crate::core::scene::{CorrectedScene, LstScene, PreparedScene, RawScene};
use crate::error::{Error, Result};
use crate::types::ResampleMethod;

/// Everything the analysis reads.
#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    pub scenes: Vec<RawScene>,
    pub dem: GeoBand,
    pub land_cover: Vec<LandCover>,
    pub region: Region,
    pub faults: FaultSet,
}

/// Scalar results, in the order the console report prints them.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub scene_count: usize,
    pub elevation_fit: ElevationFit,
    pub regional_stats: RegionalStats,
    pub thresholds: Thresholds,
    pub lst_min: f64,
    pub lst_max: f64,
    pub scores: ScoreSummary,
    pub annual_series: Vec<ChartPoint>,
}

/// Every product of a completed run.
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub grid: GridSpec,
    pub summary: AnalysisSummary,
    pub mean_lst: Band,
    pub anomalies: AnomalyLayers,
    pub scores: ScoreLayers,
    pub annual: Vec<AnnualComposite>,
}

pub struct Pipeline<'a> {
    params: &'a AnalysisParams,
    inputs: &'a AnalysisInputs,
    grid: GridSpec,
    pool: rayon::ThreadPool,
    scenes: OnceCell<Vec<&'a RawScene>>,
    region_mask: OnceCell<Array2<bool>>,
    dem: OnceCell<Band>,
    urban_keep: OnceCell<Array2<bool>>,
    lst_series: OnceCell<Vec<LstScene>>,
    mean_lst_uncorrected: OnceCell<Band>,
    elevation_fit: OnceCell<ElevationFit>,
    corrected: OnceCell<Vec<CorrectedScene>>,
    composite: OnceCell<Band>,
    regional_stats: OnceCell<RegionalStats>,
    thresholds: OnceCell<Thresholds>,
    lst_range: OnceCell<(f64, f64)>,
    anomalies: OnceCell<AnomalyLayers>,
    scores: OnceCell<ScoreLayers>,
    annual: OnceCell<Vec<AnnualComposite>>,
    chart: OnceCell<Vec<ChartPoint>>,
}

impl<'a> Pipeline<'a> {
    /// Validate the configuration and fix the analysis grid. No raster work happens here.
    pub fn new(params: &'a AnalysisParams, inputs: &'a AnalysisInputs) -> Result<Self> {
        params.validate()?;
        let crs = inputs
            .scenes
            .first()
            .map(|s| s.grid.crs.clone())
            .unwrap_or_else(|| inputs.dem.grid.crs.clone());
        let grid = GridSpec::covering(inputs.region.bounds(), params.scale_m, crs)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.workers.unwrap_or(0))
            .build()
            .map_err(Error::backend)?;
        info!(
            "Analysis grid {}x{} at {} m ({}), {} worker threads",
            grid.cols,
            grid.rows,
            params.scale_m,
            grid.crs,
            pool.current_num_threads()
        );
        Ok(Self {
            params,
            inputs,
            grid,
            pool,
            scenes: OnceCell::new(),
            region_mask: OnceCell::new(),
            dem: OnceCell::new(),
            urban_keep: OnceCell::new(),
            lst_series: OnceCell::new(),
            mean_lst_uncorrected: OnceCell::new(),
            elevation_fit: OnceCell::new(),
            corrected: OnceCell::new(),
            composite: OnceCell::new(),
            regional_stats: OnceCell::new(),
            thresholds: OnceCell::new(),
            lst_range: OnceCell::new(),
            anomalies: OnceCell::new(),
            scores: OnceCell::new(),
            annual: OnceCell::new(),
            chart: OnceCell::new(),
        })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn params(&self) -> &AnalysisParams {
        self.params
    }

    fn opts(&self, max_pixels: u64) -> ReduceOptions {
        ReduceOptions::new(self.params.scale_m, max_pixels)
    }

    fn reducer(&self) -> Result<RegionReducer<'_>> {
        Ok(RegionReducer::new(self.region_mask()?, self.grid.pixel_size()))
    }

    /// Scenes passing the collection filter.
    pub fn scenes(&self) -> Result<&[&'a RawScene]> {
        self.scenes
            .get_or_try_init(|| {
                let filter = SceneFilter::new(self.params, &self.inputs.region);
                let kept = filter.apply(self.inputs.scenes.iter().collect::<Vec<_>>())?;
                info!("Scenes available after initial filtering: {}", kept.len());
                Ok(kept)
            })
            .map(Vec::as_slice)
    }

    pub fn region_mask(&self) -> Result<&Array2<bool>> {
        self.region_mask
            .get_or_try_init(|| self.pool.install(|| self.inputs.region.mask(&self.grid)))
    }

    /// Elevation aligned onto the analysis grid with bilinear interpolation.
    pub fn dem(&self) -> Result<&Band> {
        self.dem.get_or_try_init(|| {
            let dem = &self.inputs.dem;
            self.pool
                .install(|| resample(&dem.band, &dem.grid, &self.grid, ResampleMethod::Bilinear))
        })
    }

    pub fn urban_keep(&self) -> Result<&Array2<bool>> {
        self.urban_keep.get_or_try_init(|| {
            let urban = self.params.urban;
            let cover = LandCover::select(&self.inputs.land_cover, urban.reference_year)?;
            self.pool
                .install(|| cover.urban_keep_mask(&self.grid, urban.class_code))
        })
    }

    /// NDVI extrema of one masked scene over the region; None when nothing is left.
    fn ndvi_range(&self, scene: &PreparedScene) -> Result<Option<NdviRange>> {
        let reducer = self.reducer()?;
        let name = format!("NDVI {}", scene.meta.id);
        match reducer.min_max(&scene.ndvi_band(), self.opts(self.params.max_pixels.ndvi_minmax), &name) {
            Ok((min, max)) => Ok(Some(NdviRange { min, max })),
            Err(Error::FullyMasked { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn process_scene(&self, raw: &RawScene, urban_keep: &Array2<bool>) -> Result<LstScene> {
        let mut scene = prepare_scene(raw, &self.grid, &self.params.scaling)?;
        mask_water(&mut scene, self.params.water_index_threshold);
        mask_urban(&mut scene, urban_keep);
        let range = self.ndvi_range(&scene)?;
        retrieve_lst(&scene, range)
    }

    /// Per-scene LST before elevation correction.
    pub fn lst_series(&self) -> Result<&[LstScene]> {
        self.lst_series
            .get_or_try_init(|| {
                let scenes = self.scenes()?;
                // Shared inputs are resolved before entering the pool
                self.region_mask()?;
                let urban_keep = self.urban_keep()?;
                let series: Vec<LstScene> = self.pool.install(|| {
                    scenes
                        .par_iter()
                        .map(|raw| self.process_scene(raw, urban_keep))
                        .collect::<Result<Vec<_>>>()
                })?;
                let empty = series.iter().filter(|s| s.lst.is_fully_masked()).count();
                if empty == series.len() {
                    return Err(Error::fully_masked("LST series"));
                }
                if empty > 0 {
                    warn!("{} of {} scenes fully masked after cloud/water/urban masking", empty, series.len());
                }
                Ok(series)
            })
            .map(Vec::as_slice)
    }

    /// Series-mean uncorrected LST clipped to the region, the regression response.
    pub fn mean_lst_uncorrected(&self) -> Result<&Band> {
        self.mean_lst_uncorrected.get_or_try_init(|| {
            let series = self.lst_series()?;
            let region = self.region_mask()?;
            let mean = self
                .pool
                .install(|| mean_composite(series.iter().map(|s| &s.lst), self.grid.shape()));
            Ok(mean.with_mask(region))
        })
    }

    pub fn elevation_fit(&self) -> Result<ElevationFit> {
        self.elevation_fit
            .get_or_try_init(|| {
                let caps = self.params.max_pixels;
                fit_elevation(
                    &self.reducer()?,
                    self.mean_lst_uncorrected()?,
                    self.dem()?,
                    self.opts(caps.linear_fit),
                    self.opts(caps.median),
                )
            })
            .copied()
    }

    /// Elevation-corrected series, in filter order.
    pub fn corrected(&self) -> Result<&[CorrectedScene]> {
        self.corrected
            .get_or_try_init(|| {
                let fit = self.elevation_fit()?;
                let dem = self.dem()?;
                let series = self.lst_series()?;
                self.pool.install(|| {
                    series
                        .par_iter()
                        .map(|s| correct_scene(s, dem, &fit))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .map(Vec::as_slice)
    }

    /// Final mean corrected LST, clipped to the region.
    pub fn composite(&self) -> Result<&Band> {
        self.composite.get_or_try_init(|| {
            let corrected = self.corrected()?;
            let region = self.region_mask()?;
            let composite = self
                .pool
                .install(|| mean_composite(corrected.iter().map(|s| &s.lst_corrected), self.grid.shape()))
                .with_mask(region);
            if composite.is_fully_masked() {
                return Err(Error::fully_masked("final LST composite"));
            }
            Ok(composite)
        })
    }

    pub fn regional_stats(&self) -> Result<RegionalStats> {
        self.regional_stats
            .get_or_try_init(|| {
                RegionalStats::compute(
                    &self.reducer()?,
                    self.composite()?,
                    self.opts(self.params.max_pixels.regional_stats),
                )
            })
            .copied()
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        self.thresholds
            .get_or_try_init(|| {
                let t = Thresholds::from_stats(&self.regional_stats()?, &self.params.multipliers);
                t.log(&self.params.multipliers);
                Ok(t)
            })
            .copied()
    }

    /// Minimum and maximum of the final composite over the region.
    pub fn lst_range(&self) -> Result<(f64, f64)> {
        self.lst_range
            .get_or_try_init(|| {
                let (min, max) = self.reducer()?.min_max(
                    self.composite()?,
                    self.opts(self.params.max_pixels.lst_minmax),
                    "LST_corrected",
                )?;
                info!("LST minimum: {:.3} °C, maximum: {:.3} °C", min, max);
                Ok((min, max))
            })
            .copied()
    }

    pub fn anomalies(&self) -> Result<&AnomalyLayers> {
        self.anomalies.get_or_try_init(|| {
            let (composite, thresholds) = (self.composite()?, self.thresholds()?);
            Ok(self.pool.install(|| AnomalyLayers::classify(composite, &thresholds)))
        })
    }

    pub fn scores(&self) -> Result<&ScoreLayers> {
        self.scores.get_or_try_init(|| {
            let buffer = self.inputs.faults.buffer(self.params.fault_buffer_m);
            let (composite, strong) = (self.composite()?, self.thresholds()?.strong);
            self.pool
                .install(|| ScoreLayers::compute(composite, strong, &buffer, &self.grid))
        })
    }

    pub fn annual(&self) -> Result<&[AnnualComposite]> {
        self.annual
            .get_or_try_init(|| {
                let corrected = self.corrected()?;
                self.pool
                    .install(|| annual_composites(corrected, self.params.years(), self.grid.shape()))
            })
            .map(Vec::as_slice)
    }

    /// Regional mean per year at the chart scale.
    pub fn chart(&self) -> Result<&[ChartPoint]> {
        self.chart
            .get_or_try_init(|| {
                let opts = ReduceOptions::new(self.params.chart_scale_m, self.params.max_pixels.chart);
                chart_series(&self.reducer()?, self.annual()?, opts)
            })
            .map(Vec::as_slice)
    }

    /// Pull every product in dependency order.
    pub fn run(&self) -> Result<AnalysisOutputs> {
        let scene_count = self.scenes()?.len();
        let elevation_fit = self.elevation_fit()?;
        let regional_stats = self.regional_stats()?;
        let thresholds = self.thresholds()?;
        let (lst_min, lst_max) = self.lst_range()?;
        let scores = self.scores()?;
        let annual_series = self.chart()?.to_vec();
        Ok(AnalysisOutputs {
            grid: self.grid.clone(),
            summary: AnalysisSummary {
                scene_count,
                elevation_fit,
                regional_stats,
                thresholds,
                lst_min,
                lst_max,
                scores: scores.summary(),
                annual_series,
            },
            mean_lst: self.composite()?.clone(),
            anomalies: self.anomalies()?.clone(),
            scores: scores.clone(),
            annual: self.annual()?.to_vec(),
        })
    }
}

//! JSON run report: parameters, grid, the scalar results and the written layers.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::params::AnalysisParams;
use crate::core::processing::pipeline::AnalysisSummary;
use crate::core::processing::temporal::ChartPoint;
use crate::core::raster::GridSpec;
use crate::error::Result;
use crate::types::OutputLayer;

/// One GeoTIFF written by a run.
#[derive(Debug, Clone, Serialize)]
pub struct LayerRecord {
    pub layer: OutputLayer,
    /// Calendar year for annual layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub path: PathBuf,
    pub valid_pixels: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
    pub params: &'a AnalysisParams,
    pub grid: &'a GridSpec,
    /// GDAL ordering
    pub geotransform: [f64; 6],
    #[serde(flatten)]
    pub summary: &'a AnalysisSummary,
    pub layers: Vec<LayerRecord>,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(params: &'a AnalysisParams, grid: &'a GridSpec, summary: &'a AnalysisSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            params,
            grid,
            geotransform: grid.transform.to_gdal(),
            summary,
            layers: Vec::new(),
        }
    }
}

pub fn write_report(path: &Path, report: &AnalysisReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Annual chart series as its own table (one record per year, `null` mean for empty years).
pub fn write_annual_series(path: &Path, series: &[ChartPoint]) -> Result<()> {
    let json = serde_json::to_string_pretty(series)?;
    std::fs::write(path, json)?;
    Ok(())
}

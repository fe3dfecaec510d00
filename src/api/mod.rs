//! High-level library API: load a manifest, run the analysis, and write every product to a
//! directory. Prefer these entrypoints over the processing stages when integrating GEOTHERM.
use std::path::Path;

use tracing::info;

use crate::core::params::AnalysisParams;
use crate::core::processing::pipeline::{AnalysisInputs, AnalysisOutputs, Pipeline};
use crate::core::raster::Band;
use crate::error::{Error, Result};
use crate::io::manifest::Manifest;
use crate::io::writers::{
    AnalysisReport, LayerRecord, write_annual_series, write_band_f32, write_prj_file, write_report,
    write_world_file,
};
use crate::types::OutputLayer;

pub const REPORT_FILE: &str = "report.json";
pub const ANNUAL_SERIES_FILE: &str = "annual_series.json";

/// Load analysis parameters from a JSON file. Missing fields take their defaults.
pub fn load_params(path: &Path) -> Result<AnalysisParams> {
    let text = std::fs::read_to_string(path)?;
    let params: AnalysisParams = serde_json::from_str(&text)?;
    params.validate()?;
    Ok(params)
}

/// Run the full analysis on in-memory inputs.
pub fn run_analysis(params: &AnalysisParams, inputs: &AnalysisInputs) -> Result<AnalysisOutputs> {
    Pipeline::new(params, inputs)?.run()
}

/// Load the inputs listed in a manifest and run the analysis.
pub fn run_manifest(manifest: &Path, params: &AnalysisParams) -> Result<AnalysisOutputs> {
    params.validate()?;
    let manifest = Manifest::load(manifest)?;
    let inputs = manifest.load_inputs(params)?;
    run_analysis(params, &inputs)
}

fn layer_bands(outputs: &AnalysisOutputs, layer: OutputLayer) -> Vec<(Option<i32>, &Band)> {
    let a = &outputs.anomalies;
    let s = &outputs.scores;
    match layer {
        OutputLayer::MeanLst => vec![(None, &outputs.mean_lst)],
        OutputLayer::MainAnomaly => vec![(None, &a.main)],
        OutputLayer::WeakAnomaly => vec![(None, &a.weak)],
        OutputLayer::MediumAnomaly => vec![(None, &a.medium)],
        OutputLayer::StrongAnomaly => vec![(None, &a.strong)],
        OutputLayer::TierClass => vec![(None, &a.tier_class)],
        OutputLayer::NearFault => vec![(None, &s.near_fault)],
        OutputLayer::Score1 => vec![(None, &s.score1)],
        OutputLayer::Score2 => vec![(None, &s.score2)],
        OutputLayer::Annual => outputs
            .annual
            .iter()
            .map(|y| (Some(y.year), &y.composite))
            .collect(),
    }
}

/// Write the selected layers (GeoTIFF + world file + .prj), the annual series table and the
/// JSON report into `output_dir`.
pub fn write_outputs(
    outputs: &AnalysisOutputs,
    params: &AnalysisParams,
    output_dir: &Path,
    layers: &[OutputLayer],
) -> Result<Vec<LayerRecord>> {
    std::fs::create_dir_all(output_dir)?;
    let grid = &outputs.grid;
    let mut records = Vec::new();
    for &layer in layers {
        for (year, band) in layer_bands(outputs, layer) {
            let file = match year {
                Some(y) => format!("{}_{}.tif", layer.file_stem(), y),
                None => format!("{}.tif", layer.file_stem()),
            };
            let path = output_dir.join(file);
            write_band_f32(&path, band, grid)?;
            write_world_file(&path, &grid.transform)?;
            write_prj_file(&path, &grid.crs)?;
            info!("Wrote {} ({} valid pixels)", path.display(), band.valid_count());
            records.push(LayerRecord {
                layer,
                year,
                path,
                valid_pixels: band.valid_count(),
            });
        }
    }

    write_annual_series(&output_dir.join(ANNUAL_SERIES_FILE), &outputs.summary.annual_series)?;
    let mut report = AnalysisReport::new(params, grid, &outputs.summary);
    report.layers = records.clone();
    write_report(&output_dir.join(REPORT_FILE), &report)?;
    Ok(records)
}

/// Manifest in, products out.
pub fn process_manifest_to_dir(
    manifest: &Path,
    output_dir: &Path,
    params: &AnalysisParams,
    layers: &[OutputLayer],
) -> Result<AnalysisOutputs> {
    if layers.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "layers",
            value: "(none)".to_string(),
        });
    }
    let outputs = run_manifest(manifest, params)?;
    write_outputs(&outputs, params, output_dir, layers)?;
    Ok(outputs)
}

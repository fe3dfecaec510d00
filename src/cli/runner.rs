use std::fs;
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use geotherm::api::{REPORT_FILE, load_params, process_manifest_to_dir};
use geotherm::core::params::AnalysisParams;
use geotherm::types::OutputLayer;

use super::args::CliArgs;
use super::errors::AppError;

/// Config file (or defaults) with command-line overrides applied, then validated.
fn resolve_params(args: &CliArgs) -> Result<AnalysisParams, AppError> {
    let mut params = match &args.config {
        Some(path) => load_params(path)?,
        None => AnalysisParams::default(),
    };
    if let Some(d) = args.start_date {
        params.start_date = d;
    }
    if let Some(d) = args.end_date {
        params.end_date = d;
    }
    if let Some(m) = args.fault_buffer_m {
        params.fault_buffer_m = m;
    }
    if let Some(c) = args.cloud_cover_max {
        params.cloud_cover_max = c;
    }
    if let Some(s) = args.scale_m {
        params.scale_m = s;
    }
    if args.workers.is_some() {
        params.workers = args.workers;
    }
    params.validate()?;
    Ok(params)
}

fn prepare_output_dir(dir: &Path) -> Result<(), AppError> {
    if dir.exists() && !dir.is_dir() {
        return Err(AppError::NotADirectory {
            path: dir.display().to_string(),
        });
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let params = resolve_params(&args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    let manifest = args.manifest.as_ref().ok_or(AppError::MissingArgument {
        arg: "--manifest".to_string(),
    })?;
    let output_dir = args.output_dir.as_ref().ok_or(AppError::MissingArgument {
        arg: "--output-dir".to_string(),
    })?;
    prepare_output_dir(output_dir)?;

    let layers: Vec<OutputLayer> = if args.layers.is_empty() {
        OutputLayer::ALL.to_vec()
    } else {
        args.layers.clone()
    };

    info!("Manifest: {:?}", manifest);
    info!("Output directory: {:?}", output_dir);
    let outputs = process_manifest_to_dir(manifest, output_dir, &params, &layers)
        .map_err(AppError::from)?;

    let s = &outputs.summary;
    println!("Scenes after filtering: {}", s.scene_count);
    println!(
        "Lapse rate: {:.6} °C/m (intercept {:.3} °C), reference elevation {:.1} m",
        s.elevation_fit.slope, s.elevation_fit.intercept, s.elevation_fit.reference_elevation
    );
    println!(
        "Regional LST: µ = {:.3} °C, σ = {:.3} °C, range [{:.3}, {:.3}] °C",
        s.regional_stats.mean, s.regional_stats.std_dev, s.lst_min, s.lst_max
    );
    println!(
        "Thresholds: main {:.3}, weak {:.3}, medium {:.3}, strong {:.3} °C",
        s.thresholds.main, s.thresholds.weak, s.thresholds.medium, s.thresholds.strong
    );
    println!(
        "Score 1: {} pixels, Score 2: {} pixels",
        s.scores.score1_pixels, s.scores.score2_pixels
    );
    println!("Report: {}", output_dir.join(REPORT_FILE).display());
    Ok(())
}

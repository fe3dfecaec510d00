use clap::Parser;
use std::path::PathBuf;

use chrono::NaiveDate;
use geotherm::types::OutputLayer;

#[derive(Parser)]
#[command(name = "geotherm", version, about = "GEOTHERM CLI")]
pub struct CliArgs {
    /// Input manifest (scenes.json) listing scenes, DEM, land cover, region and faults
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Output directory for GeoTIFF layers and the JSON report
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Analysis parameters as JSON; fields left out keep their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// First acquisition date (inclusive), overrides the config
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// End of the date range (exclusive), overrides the config
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Fault buffer distance in meters, overrides the config
    #[arg(long)]
    pub fault_buffer_m: Option<f64>,

    /// Maximum scene cloud cover in percent, overrides the config
    #[arg(long)]
    pub cloud_cover_max: Option<f64>,

    /// Analysis pixel size in meters, overrides the config
    #[arg(long)]
    pub scale_m: Option<f64>,

    /// Worker threads for scene loading and analysis (default: all cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Layers to write (comma separated). Default: all
    #[arg(long, value_enum, value_delimiter = ',')]
    pub layers: Vec<OutputLayer>,

    /// Print the effective parameters as JSON and exit
    #[arg(long, default_value_t = false)]
    pub print_config: bool,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}

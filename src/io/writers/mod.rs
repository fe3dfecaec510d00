//! Output writers: Float32 GeoTIFF layers, world file / .prj sidecars and the JSON report.
pub mod report;
pub mod tiff;
pub mod worldfile;

pub use self::report::{AnalysisReport, LayerRecord, write_annual_series, write_report};
pub use self::tiff::{encode_band_f32, write_band_f32};
pub use self::worldfile::{write_prj_file, write_world_file};

//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, TIFF, JSON and GeoJSON errors, and provides semantic variants
//! for configuration validation, data sufficiency, numeric-domain guards and backend failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Raster reader error: {0}")]
    Raster(#[from] crate::io::RasterIoError),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error(
        "Anomaly multipliers must be strictly increasing (weak < medium < strong), got {weak} / {medium} / {strong}"
    )]
    NonMonotonicMultipliers { weak: f64, medium: f64, strong: f64 },

    #[error("Missing required input: {what}")]
    MissingInput { what: String },

    #[error("Region of interest covers no pixels of the analysis grid")]
    EmptyRegion,

    #[error("No scenes left for {stage} after filtering")]
    NoScenes { stage: &'static str },

    #[error("Scenes are present but every pixel is masked for {statistic}")]
    FullyMasked { statistic: String },

    #[error("Reducer {reducer} would read {count} pixels, above the cap of {max_pixels}")]
    TooManyPixels {
        reducer: String,
        count: u64,
        max_pixels: u64,
    },

    #[error("Numeric domain error: {quantity} = {value}")]
    NumericDomain { quantity: &'static str, value: f64 },

    #[error("Grid mismatch: expected {expected}, got {actual}")]
    GridMismatch { expected: String, actual: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn backend<E: std::fmt::Display>(e: E) -> Self {
        Error::Backend(e.to_string())
    }

    pub fn fully_masked(statistic: impl Into<String>) -> Self {
        Error::FullyMasked {
            statistic: statistic.into(),
        }
    }
}

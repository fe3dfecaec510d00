//! Scene types for each pipeline stage.
//!
//! A scene moves through `RawScene` → `PreparedScene` → `LstScene` → `CorrectedScene`.
//! Each stage is a distinct type, so elevation correction can only ever be applied once.
use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::raster::{Band, GridSpec};
use crate::error::{Error, Result};

/// Scalar metadata attached to a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMeta {
    pub id: String,
    pub acquired: NaiveDate,
    /// Scene-level cloud cover in percent
    pub cloud_cover: f64,
    pub processing_level: String,
}

impl SceneMeta {
    pub fn year(&self) -> i32 {
        self.acquired.year()
    }
}

/// Digital numbers as delivered (Landsat 8/9 Collection 2 Level-2 band naming).
#[derive(Debug, Clone)]
pub struct RawBands {
    pub sr_b2: Array2<f64>,
    pub sr_b3: Array2<f64>,
    pub sr_b4: Array2<f64>,
    pub sr_b5: Array2<f64>,
    pub sr_b6: Array2<f64>,
    pub sr_b7: Array2<f64>,
    pub st_b10: Array2<f64>,
    pub qa_pixel: Array2<u16>,
}

impl RawBands {
    fn shapes(&self) -> [(usize, usize); 8] {
        [
            self.sr_b2.dim(),
            self.sr_b3.dim(),
            self.sr_b4.dim(),
            self.sr_b5.dim(),
            self.sr_b6.dim(),
            self.sr_b7.dim(),
            self.st_b10.dim(),
            self.qa_pixel.dim(),
        ]
    }
}

/// An ingested scene. Immutable; only derived bands flow downstream.
#[derive(Debug, Clone)]
pub struct RawScene {
    pub meta: SceneMeta,
    pub grid: GridSpec,
    pub bands: RawBands,
}

impl RawScene {
    pub fn new(meta: SceneMeta, grid: GridSpec, bands: RawBands) -> Result<Self> {
        if let Some(bad) = bands.shapes().into_iter().find(|&s| s != grid.shape()) {
            return Err(Error::GridMismatch {
                expected: format!("{}x{} ({})", grid.cols, grid.rows, meta.id),
                actual: format!("{}x{}", bad.1, bad.0),
            });
        }
        Ok(Self { meta, grid, bands })
    }
}

/// Surface reflectance bands after radiometric scaling.
#[derive(Debug, Clone)]
pub struct Reflectance {
    pub blue: Array2<f64>,
    pub green: Array2<f64>,
    pub red: Array2<f64>,
    pub nir: Array2<f64>,
    pub swir1: Array2<f64>,
    pub swir2: Array2<f64>,
}

/// A scaled scene on the analysis grid. All bands share `mask`.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    pub meta: SceneMeta,
    pub reflectance: Reflectance,
    /// Brightness temperature in Kelvin
    pub brightness_temp: Array2<f64>,
    pub ndvi: Array2<f64>,
    pub mask: Array2<bool>,
}

impl PreparedScene {
    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Narrow the shared mask; values are never touched.
    pub fn update_mask(&mut self, keep: &Array2<bool>) {
        ndarray::Zip::from(&mut self.mask)
            .and(keep)
            .for_each(|m, &k| *m = *m && k);
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// View one of the scene arrays as a band carrying the shared mask.
    pub fn band(&self, data: &Array2<f64>) -> Band {
        Band {
            data: data.clone(),
            mask: self.mask.clone(),
        }
    }

    pub fn ndvi_band(&self) -> Band {
        self.band(&self.ndvi)
    }

    pub fn brightness_temp_band(&self) -> Band {
        self.band(&self.brightness_temp)
    }
}

/// Output of LST retrieval: vegetation proportion, emissivity and LST in °C.
#[derive(Debug, Clone)]
pub struct LstScene {
    pub meta: SceneMeta,
    pub pv: Band,
    pub emissivity: Band,
    pub lst: Band,
}

/// LST after the lapse-rate correction.
#[derive(Debug, Clone)]
pub struct CorrectedScene {
    pub meta: SceneMeta,
    pub lst_corrected: Band,
}

//! Input manifest (`scenes.json`): where every raster and vector input lives.
//!
//! Relative paths are resolved against the manifest's directory. Scene footprints are read
//! from the QA band header, so scenes rejected by the collection filter are never decoded.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use geo::Rect;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::params::AnalysisParams;
use crate::core::processing::collection::{SceneFilter, SceneRecord};
use crate::core::processing::masking::LandCover;
use crate::core::processing::pipeline::AnalysisInputs;
use crate::core::raster::GridSpec;
use crate::core::scene::{RawBands, RawScene, SceneMeta};
use crate::error::{Error, Result};
use crate::io::raster::{read_grid_header, read_band, read_classes, read_raster_f64, read_raster_u16};
use crate::io::vector::{read_faults, read_region};

fn default_processing_level() -> String {
    "L2SP".to_string()
}

/// Band files of one Landsat Collection 2 Level-2 scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SceneBands {
    pub sr_b2: PathBuf,
    pub sr_b3: PathBuf,
    pub sr_b4: PathBuf,
    pub sr_b5: PathBuf,
    pub sr_b6: PathBuf,
    pub sr_b7: PathBuf,
    pub st_b10: PathBuf,
    pub qa_pixel: PathBuf,
}

impl SceneBands {
    fn paths_mut(&mut self) -> [&mut PathBuf; 8] {
        [
            &mut self.sr_b2,
            &mut self.sr_b3,
            &mut self.sr_b4,
            &mut self.sr_b5,
            &mut self.sr_b6,
            &mut self.sr_b7,
            &mut self.st_b10,
            &mut self.qa_pixel,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    #[serde(default = "default_processing_level")]
    pub processing_level: String,
    pub bands: SceneBands,
}

impl SceneEntry {
    pub fn meta(&self) -> SceneMeta {
        SceneMeta {
            id: self.id.clone(),
            acquired: self.date,
            cloud_cover: self.cloud_cover,
            processing_level: self.processing_level.clone(),
        }
    }

    /// Decode every band onto the scene's own grid.
    pub fn load(&self, crs: &str) -> Result<RawScene> {
        let b = &self.bands;
        let qa = read_raster_u16(&b.qa_pixel)?;
        let grid = qa.grid(crs);
        let dn = |path: &Path| -> Result<ndarray::Array2<f64>> { Ok(read_raster_f64(path)?.data) };
        let bands = RawBands {
            sr_b2: dn(&b.sr_b2)?,
            sr_b3: dn(&b.sr_b3)?,
            sr_b4: dn(&b.sr_b4)?,
            sr_b5: dn(&b.sr_b5)?,
            sr_b6: dn(&b.sr_b6)?,
            sr_b7: dn(&b.sr_b7)?,
            st_b10: dn(&b.st_b10)?,
            qa_pixel: qa.data,
        };
        RawScene::new(self.meta(), grid, bands)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandCoverEntry {
    pub year: i32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// CRS shared by every input, e.g. "EPSG:32748"
    pub crs: String,
    /// GeoJSON with the region of interest
    pub region: PathBuf,
    /// GeoJSON with the fault lines / zones
    pub faults: PathBuf,
    /// Elevation raster in meters
    pub dem: PathBuf,
    #[serde(default)]
    pub land_cover: Vec<LandCoverEntry>,
    pub scenes: Vec<SceneEntry>,
}

/// A manifest scene paired with its grid read from the QA header.
struct Candidate<'m> {
    entry: &'m SceneEntry,
    meta: SceneMeta,
    grid: GridSpec,
}

impl SceneRecord for Candidate<'_> {
    fn meta(&self) -> &SceneMeta {
        &self.meta
    }

    fn footprint(&self) -> Rect<f64> {
        self.grid.bounds()
    }
}

impl Manifest {
    /// Parse a manifest file and resolve its relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut manifest: Manifest = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve_paths(base);
        Ok(manifest)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.region);
        resolve(&mut self.faults);
        resolve(&mut self.dem);
        for lc in &mut self.land_cover {
            resolve(&mut lc.path);
        }
        for scene in &mut self.scenes {
            for p in scene.bands.paths_mut() {
                resolve(p);
            }
        }
    }

    /// Read vectors and rasters for an analysis with `params`. Only scenes passing the
    /// collection filter and the land cover of the reference year are decoded.
    pub fn load_inputs(&self, params: &AnalysisParams) -> Result<AnalysisInputs> {
        let region = read_region(&self.region)?;
        let faults = read_faults(&self.faults)?;
        let dem = read_band(&self.dem, &self.crs)?;

        let candidates = self
            .scenes
            .iter()
            .map(|entry| {
                Ok(Candidate {
                    entry,
                    meta: entry.meta(),
                    grid: read_grid_header(&entry.bands.qa_pixel, &self.crs)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let selected = SceneFilter::new(params, &region).apply(candidates)?;
        info!("Loading {} of {} manifest scenes", selected.len(), self.scenes.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.workers.unwrap_or(0))
            .build()
            .map_err(Error::backend)?;
        let scenes = pool.install(|| {
            selected
                .par_iter()
                .map(|c| c.entry.load(&self.crs))
                .collect::<Result<Vec<_>>>()
        })?;

        let year = params.urban.reference_year;
        let entry = self
            .land_cover
            .iter()
            .find(|lc| lc.year == year)
            .ok_or_else(|| Error::MissingInput {
                what: format!("land cover for reference year {year} in manifest"),
            })?;
        let (grid, classes) = read_classes(&entry.path, &self.crs)?;
        let land_cover = vec![LandCover {
            year: entry.year,
            grid,
            classes,
        }];

        Ok(AnalysisInputs {
            scenes,
            dem,
            land_cover,
            region,
            faults,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "crs": "EPSG:32748",
        "region": "vectors/region.geojson",
        "faults": "/abs/faults.geojson",
        "dem": "dem.tif",
        "land_cover": [{"year": 2019, "path": "lc_2019.tif"}],
        "scenes": [{
            "id": "LC08_122065_20191103",
            "date": "2019-11-03",
            "cloud_cover": 4.2,
            "bands": {
                "SR_B2": "s/b2.tif", "SR_B3": "s/b3.tif", "SR_B4": "s/b4.tif",
                "SR_B5": "s/b5.tif", "SR_B6": "s/b6.tif", "SR_B7": "s/b7.tif",
                "ST_B10": "s/b10.tif", "QA_PIXEL": "s/qa.tif"
            }
        }]
    }"#;

    #[test]
    fn manifest_parses_and_resolves_relative_paths() {
        let mut m: Manifest = serde_json::from_str(MANIFEST).unwrap();
        m.resolve_paths(Path::new("/data/java"));
        assert_eq!(m.region, PathBuf::from("/data/java/vectors/region.geojson"));
        assert_eq!(m.faults, PathBuf::from("/abs/faults.geojson"));
        assert_eq!(m.scenes[0].processing_level, "L2SP");
        assert_eq!(m.scenes[0].bands.qa_pixel, PathBuf::from("/data/java/s/qa.tif"));
        assert_eq!(m.scenes[0].meta().acquired, NaiveDate::from_ymd_opt(2019, 11, 3).unwrap());
    }
}

#![doc = r#"
GEOTHERM: land-surface-temperature anomaly mapping for geothermal prospecting.

This crate turns a multi-year series of Landsat 8/9 Collection 2 Level-2 scenes into a
long-term mean land-surface temperature (LST) map, corrected for elevation, and flags
statistically anomalous hot spots, optionally weighted by proximity to structural faults.
It powers the GEOTHERM CLI and can be embedded in your own Rust applications.

Processing chain
----------------
1. Collection filtering (date range, region bounds, seasonal window, cloud cover,
   processing level).
2. Per scene: radiometric scaling, QA cloud/shadow masking, NDVI, water (MNDWI) and urban
   (land cover) exclusion, then LST by the mono-window algorithm with NDVI-derived
   emissivity.
3. Lapse-rate correction: the series-mean LST is regressed on elevation over the region and
   every scene is shifted by `slope · (elevation − median elevation)`.
4. Regional statistics of the final composite (µ, σ) and the anomaly tiers
   `µ + kσ` (main k = 1, weak/medium/strong configurable).
5. Scoring: Score 1 = strong anomaly, Score 2 = strong anomaly within the fault buffer.
6. Annual composites with a regional-mean chart series.

Stability
---------
The public library API is experimental in initial releases and may evolve.

Requirements
------------
- Rust 2024 edition toolchain.
- Optional: GDAL development headers when building with the `gdal` feature.

Quick start: manifest to output directory
-----------------------------------------
```rust,no_run
use std::path::Path;
use geotherm::{AnalysisParams, OutputLayer, process_manifest_to_dir};

fn main() -> geotherm::Result<()> {
    let params = AnalysisParams {
        fault_buffer_m: 1500.0,
        ..AnalysisParams::default()
    };
    let outputs = process_manifest_to_dir(
        Path::new("/data/java/scenes.json"),
        Path::new("/out/java"),
        &params,
        &OutputLayer::ALL,
    )?;
    println!("strong threshold: {:.2} °C", outputs.summary.thresholds.strong);
    Ok(())
}
```

In-memory analysis
------------------
```rust,no_run
use geotherm::{AnalysisInputs, AnalysisParams, Pipeline};

fn analyse(inputs: &AnalysisInputs) -> geotherm::Result<()> {
    let params = AnalysisParams::default();
    let pipeline = Pipeline::new(&params, inputs)?;
    // Products are computed on demand and memoized
    let fit = pipeline.elevation_fit()?;
    let thresholds = pipeline.thresholds()?;
    println!("slope {:.5} °C/m, main threshold {:.2} °C", fit.slope, thresholds.main);
    let score2 = &pipeline.scores()?.score2;
    println!("{} Score 2 pixels", score2.valid_count());
    Ok(())
}
```

Error handling
--------------
All public functions return `geotherm::Result<T>`; match on `geotherm::Error` to tell apart
configuration errors, "no scenes" versus "fully masked" data-sufficiency errors, numeric
domain violations, and I/O or backend failures.

```rust,no_run
use std::path::Path;
use geotherm::{AnalysisParams, Error, run_manifest};

fn main() {
    match run_manifest(Path::new("scenes.json"), &AnalysisParams::default()) {
        Ok(out) => println!("{} scenes", out.summary.scene_count),
        Err(Error::NoScenes { stage }) => eprintln!("nothing left after {stage}"),
        Err(Error::FullyMasked { statistic }) => eprintln!("all pixels masked for {statistic}"),
        Err(other) => eprintln!("error: {other}"),
    }
}
```

Feature flags
-------------
- `gdal`: read input rasters through GDAL instead of the built-in GeoTIFF decoder.

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`]: parameters, raster/vector primitives and the processing stages.
- [`types`]: shared enums (`Reducer`, `ResampleMethod`, `AnomalyTier`, `OutputLayer`).
- [`io`]: GeoTIFF/GeoJSON readers, the manifest, and writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::geometry::{FaultBuffer, FaultSet, Region};
pub use crate::core::params::{
    AnalysisParams, AnomalyMultipliers, PixelCaps, RadiometricScaling, SeasonWindow,
    UrbanMaskParams,
};
pub use crate::core::raster::{Band, GeoBand, GeoTransform, GridSpec};
pub use crate::core::scene::{CorrectedScene, LstScene, PreparedScene, RawBands, RawScene, SceneMeta};
pub use error::{Error, Result};
pub use types::{AnomalyTier, OutputLayer, Reducer, ResampleMethod};

// Pipeline and products
pub use crate::core::processing::anomaly::{AnomalyLayers, RegionalStats, Thresholds};
pub use crate::core::processing::elevation::ElevationFit;
pub use crate::core::processing::masking::LandCover;
pub use crate::core::processing::pipeline::{AnalysisInputs, AnalysisOutputs, AnalysisSummary, Pipeline};
pub use crate::core::processing::scoring::{ScoreLayers, ScoreSummary};
pub use crate::core::processing::temporal::{AnnualComposite, ChartPoint};

// Readers
pub use io::{Manifest, RasterIoError};

// High-level API re-exports
pub use api::{load_params, process_manifest_to_dir, run_analysis, run_manifest, write_outputs};

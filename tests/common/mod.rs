#![allow(dead_code)]
//! Synthetic study area shared by the integration tests.
//!
//! A 20×20 grid of 30 m pixels (600 m square, EPSG:32748) with:
//! - elevation rising 20 m per column and a -6.5 K/km lapse in brightness temperature,
//! - two +10 K hot clusters, one straddling a north-south fault at x = 300 m,
//! - a water patch in the north-east corner and an urban patch in the south-west,
//! - six usable scenes over 2017–2023 (none in 2022) plus three the filter must drop.
use chrono::NaiveDate;
use geo::{Coord, Geometry, LineString, MultiPolygon, Rect};
use ndarray::Array2;

use geotherm::core::params::{AnalysisParams, RadiometricScaling};
use geotherm::core::processing::masking::LandCover;
use geotherm::core::processing::preprocess::QA_CLOUD;
use geotherm::core::processing::pipeline::AnalysisInputs;
use geotherm::core::raster::{Band, GeoBand, GeoTransform, GridSpec};
use geotherm::core::scene::{RawBands, RawScene, SceneMeta};
use geotherm::core::geometry::{FaultSet, Region};

pub const CRS: &str = "EPSG:32748";
pub const N: usize = 20;
pub const PIXEL: f64 = 30.0;
pub const FAULT_X: f64 = 300.0;
pub const LAPSE_K_PER_M: f64 = -0.0065;
pub const HOT_K: f64 = 10.0;

/// Pixels of the hot cluster straddling the fault.
pub const HOT_NEAR_FAULT: [(usize, usize); 4] = [(8, 9), (8, 10), (9, 9), (9, 10)];
/// Pixels of the hot cluster far from the fault.
pub const HOT_FAR: [(usize, usize); 4] = [(3, 2), (3, 3), (4, 2), (4, 3)];

pub fn is_water(row: usize, col: usize) -> bool {
    row < 2 && col >= 16
}

pub fn is_urban(row: usize, col: usize) -> bool {
    row >= 18 && col < 3
}

pub fn grid() -> GridSpec {
    GridSpec::new(N, N, GeoTransform::new(0.0, N as f64 * PIXEL, PIXEL, -PIXEL), CRS)
}

pub fn elevation(col: usize) -> f64 {
    20.0 * col as f64
}

fn optical_dn(reflectance: f64) -> f64 {
    let s = RadiometricScaling::default();
    (reflectance - s.optical_offset) / s.optical_gain
}

fn thermal_dn(kelvin: f64) -> f64 {
    let s = RadiometricScaling::default();
    (kelvin - s.thermal_offset) / s.thermal_gain
}

fn is_hot(row: usize, col: usize) -> bool {
    HOT_NEAR_FAULT.contains(&(row, col)) || HOT_FAR.contains(&(row, col))
}

/// Brightness temperature of a pixel in a scene with the given offset.
pub fn brightness_temp(row: usize, col: usize, offset: f64) -> f64 {
    let hot = if is_hot(row, col) { HOT_K } else { 0.0 };
    300.0 + offset + LAPSE_K_PER_M * elevation(col) + hot
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One scene on the fixture grid. `cloudy_rows` get the QA cloud bit.
pub fn scene(id: &str, acquired: NaiveDate, cloud_cover: f64, offset: f64, cloudy_rows: &[usize]) -> RawScene {
    let field = |f: &dyn Fn(usize, usize) -> f64| Array2::from_shape_fn((N, N), |(r, c)| f(r, c));
    let water = |r: usize, c: usize, wet: f64, dry: f64| if is_water(r, c) { wet } else { dry };
    let bands = RawBands {
        sr_b2: field(&|_, _| optical_dn(0.05)),
        sr_b3: field(&|r, c| optical_dn(water(r, c, 0.10, 0.08))),
        sr_b4: field(&|_, _| optical_dn(0.10)),
        sr_b5: field(&|r, c| optical_dn(water(r, c, 0.03, 0.30 + 0.005 * r as f64))),
        sr_b6: field(&|r, c| optical_dn(water(r, c, 0.02, 0.20))),
        sr_b7: field(&|_, _| optical_dn(0.12)),
        st_b10: field(&|r, c| thermal_dn(brightness_temp(r, c, offset))),
        qa_pixel: Array2::from_shape_fn((N, N), |(r, _)| if cloudy_rows.contains(&r) { QA_CLOUD } else { 0 }),
    };
    let meta = SceneMeta {
        id: id.to_string(),
        acquired,
        cloud_cover,
        processing_level: "L2SP".to_string(),
    };
    RawScene::new(meta, grid(), bands).unwrap()
}

/// Scenes kept by the default filter, in acquisition order.
pub fn usable_scenes() -> Vec<RawScene> {
    vec![
        scene("LC08_2017", date(2017, 1, 15), 4.0, 0.0, &[12, 13]),
        scene("LC08_2018", date(2018, 2, 10), 2.0, 0.3, &[]),
        scene("LC08_2019", date(2019, 3, 5), 6.0, 0.6, &[]),
        scene("LC08_2020", date(2020, 11, 20), 1.0, 0.9, &[]),
        scene("LC09_2021", date(2021, 12, 1), 3.0, 1.2, &[]),
        scene("LC09_2023", date(2023, 10, 10), 5.0, 1.5, &[]),
    ]
}

/// Scenes the collection filter must drop: dry season, too cloudy, past the end date.
pub fn rejected_scenes() -> Vec<RawScene> {
    vec![
        scene("LC08_dry", date(2019, 7, 15), 1.0, 5.0, &[]),
        scene("LC08_cloudy", date(2020, 1, 10), 55.0, 5.0, &[]),
        scene("LC09_late", date(2024, 1, 10), 1.0, 5.0, &[]),
    ]
}

pub fn region() -> Region {
    let side = N as f64 * PIXEL;
    let square = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: side, y: side }).to_polygon();
    Region::new(MultiPolygon(vec![square])).unwrap()
}

pub fn faults() -> FaultSet {
    let line = LineString::from(vec![(FAULT_X, -100.0), (FAULT_X, 700.0)]);
    FaultSet::new(vec![Geometry::LineString(line)]).unwrap()
}

pub fn dem() -> GeoBand {
    let band = Band::from_data(Array2::from_shape_fn((N, N), |(_, c)| elevation(c)));
    GeoBand::new(grid(), band).unwrap()
}

pub fn land_cover(year: i32) -> LandCover {
    LandCover {
        year,
        grid: grid(),
        classes: Array2::from_shape_fn((N, N), |(r, c)| if is_urban(r, c) { 50 } else { 10 }),
    }
}

pub fn inputs() -> AnalysisInputs {
    let mut scenes = usable_scenes();
    scenes.extend(rejected_scenes());
    AnalysisInputs {
        scenes,
        dem: dem(),
        land_cover: vec![land_cover(2019)],
        region: region(),
        faults: faults(),
    }
}

pub fn params() -> AnalysisParams {
    AnalysisParams {
        fault_buffer_m: 100.0,
        workers: Some(2),
        ..AnalysisParams::default()
    }
}

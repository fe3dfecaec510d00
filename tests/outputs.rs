mod common;

use approx::assert_relative_eq;
use tempfile::tempdir;

use geotherm::api::{ANNUAL_SERIES_FILE, REPORT_FILE};
use geotherm::io::raster::read_band;
use geotherm::io::writers::write_band_f32;
use geotherm::{OutputLayer, run_analysis, write_outputs};

use common::*;

#[test]
fn every_layer_is_written_with_sidecars() {
    let params = params();
    let outputs = run_analysis(&params, &inputs()).unwrap();
    let dir = tempdir().unwrap();

    let records = write_outputs(&outputs, &params, dir.path(), &OutputLayer::ALL).unwrap();
    // Nine single layers plus one per year
    assert_eq!(records.len(), 9 + 7);
    for record in &records {
        assert!(record.path.exists(), "{}", record.path.display());
        assert!(record.path.with_extension("tfw").exists());
        assert!(record.path.with_extension("prj").exists());
    }
    assert!(dir.path().join("mean_lst.tif").exists());
    assert!(dir.path().join("score2_hotspot_fault.tif").exists());
    assert!(dir.path().join("annual_lst_2022.tif").exists());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(report["scene_count"], 6);
    assert_eq!(report["scores"]["score2_pixels"], 4);
    assert_eq!(report["layers"].as_array().unwrap().len(), records.len());

    let series: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(ANNUAL_SERIES_FILE)).unwrap()).unwrap();
    let series = series.as_array().unwrap();
    assert_eq!(series.len(), 7);
    assert!(series[5]["mean_lst"].is_null());
}

#[test]
fn selected_layers_only() {
    let params = params();
    let outputs = run_analysis(&params, &inputs()).unwrap();
    let dir = tempdir().unwrap();
    let records = write_outputs(&outputs, &params, dir.path(), &[OutputLayer::Score1]).unwrap();
    assert_eq!(records.len(), 1);
    assert!(!dir.path().join("mean_lst.tif").exists());
    assert!(dir.path().join(REPORT_FILE).exists());
}

#[test]
fn mean_lst_survives_geotiff_round_trip() {
    let params = params();
    let outputs = run_analysis(&params, &inputs()).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("mean_lst.tif");
    write_band_f32(&path, &outputs.mean_lst, &outputs.grid).unwrap();

    let read = read_band(&path, CRS).unwrap();
    assert_eq!(read.grid, outputs.grid);
    assert_eq!(read.band.mask, outputs.mean_lst.mask);
    for (a, b) in read.band.valid_values().zip(outputs.mean_lst.valid_values()) {
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }
}

#[test]
fn masked_pixels_read_back_as_masked() {
    let params = params();
    let outputs = run_analysis(&params, &inputs()).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("strong.tif");
    write_band_f32(&path, &outputs.anomalies.strong, &outputs.grid).unwrap();

    let read = read_band(&path, CRS).unwrap();
    assert_eq!(read.band.valid_count(), 8);
    assert!(read.band.valid_values().all(|v| v == 1.0));
}

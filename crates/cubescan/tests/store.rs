mod common;

use common::rough_calibration;
use cubescan::{CalibrationStore, JsonCalibrationStore, ScanConfig, StoreError};
use std::fs;

#[test]
fn missing_calibration_file_means_no_calibration() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = JsonCalibrationStore::new(tmp.path().join("calibration.json"));
    assert!(store.load().expect("load").is_none());
}

#[test]
fn calibration_round_trips_through_json() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut store = JsonCalibrationStore::new(tmp.path().join("nested/calibration.json"));
    let cal = rough_calibration();
    store.save(&cal).expect("save");

    let loaded = store.load().expect("load").expect("present");
    assert_eq!(loaded.centers(), cal.centers());
    assert!(loaded.is_complete());
}

#[test]
fn reads_hand_written_calibration_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("calibration.json");
    fs::write(&path, r#"{"U": [0, 10, 240], "R": [178, 230, 200]}"#).expect("write");

    let cal = JsonCalibrationStore::new(&path)
        .load()
        .expect("load")
        .expect("present");
    assert_eq!(cal.centers().len(), 2);
    assert!(!cal.is_complete());
}

#[test]
fn malformed_calibration_is_a_json_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("calibration.json");
    fs::write(&path, r#"{"Q": [1, 2, 3]}"#).expect("write");
    let err = JsonCalibrationStore::new(&path).load().unwrap_err();
    assert!(matches!(err, StoreError::Json(_)));
}

#[test]
fn config_round_trips() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("scan.json");
    let mut cfg = ScanConfig::default();
    cfg.face_size = 240;
    cfg.detect.min_area = 500.0;
    cfg.write_json(&path).expect("write");
    assert_eq!(ScanConfig::load_json(&path).expect("load"), cfg);
}

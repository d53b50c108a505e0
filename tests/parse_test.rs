// tests/parse_test.rs

use mocap_align::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// A trimmed export in the Vicon layout: a devices section, then trajectories.
const EXPORT: &str = "\
Trajectories
,,Subject:LFHD,,,Subject:RFHD,,,Subject:LBHD,,
Frame,Sub Frame,X,Y,Z,X,Y,Z,X,Y,Z
,,mm,mm,mm,mm,mm,mm,mm,mm,mm
";

fn export_with_rows(rows: &str) -> String {
    // junk line, then the two delimiter lines
    format!("Devices\n\n\n{EXPORT}{rows}")
}

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn minimal_scenario_from_disk() {
    let file = write_temp("x\n\nskip\nLabel:LFHD,Label:RFHD\nskip\n1,0,1.0,2.0,3.0,4.0,5.0,6.0\n");
    let dataset = load_dataset_from_file(file.path()).unwrap();

    assert_eq!(dataset.frame_count(), 1);
    assert_eq!(dataset.position_at_frame("LFHD", 1), Some(Position::new(1.0, 3.0, 2.0)));
    assert_eq!(dataset.position_at_frame("RFHD", 1), Some(Position::new(4.0, 6.0, 5.0)));
}

#[test]
fn vicon_layout_with_gaps_and_dropouts() {
    let text = format!(
        "Devices\n\n\nTrajectories\n,,Subject:LFHD,,,Subject:RFHD,,,Subject:LBHD,,\nFrame,Sub Frame,X,Y,Z,X,Y,Z,X,Y,Z\n\
         1,0,10.5,20.25,30,11,21,31,,,\n\
         3,0,12,22,32,13,23,33,14,24,34\n\
         2,0,-1.5e2,0,1,x,y,z,15,25,35\n"
    );
    let dataset = load_dataset_from_string(&text).unwrap();

    assert_eq!(dataset.titles(), &["LFHD", "RFHD", "LBHD"]);
    assert_eq!(dataset.frame_count(), 3);
    assert_eq!(dataset.position_at_frame("LFHD", 1), Some(Position::new(10.5, 30.0, 20.25)));
    assert_eq!(dataset.position_at_frame("LFHD", 2), Some(Position::new(-150.0, 1.0, 0.0)));
    assert_eq!(dataset.position_at_frame("RFHD", 2), None);
    assert_eq!(dataset.position_at_frame("LBHD", 1), None);
    assert_eq!(dataset.position_at_frame("LBHD", 3), Some(Position::new(14.0, 34.0, 24.0)));
    assert_eq!(dataset.position_at_frame("LBHD", 4), None);
}

#[test]
fn reparsing_is_deterministic() {
    let text = export_with_rows("1,0,1,2,3,4,5,6,7,8,9\n2,0,1.5,2.5,3.5,,,,7,8,9\nbad,0,1,1,1,1,1,1,1,1,1\n");
    let file = write_temp(&text);

    let first = load_dataset_from_file(file.path()).unwrap();
    let second = load_dataset_from_file(file.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, load_dataset_from_string(&text).unwrap());
}

#[test]
fn frame_count_ignores_row_order() {
    let forward = export_with_rows("1,0,1,1,1,1,1,1,1,1,1\n5,0,1,1,1,1,1,1,1,1,1\n9,0,1,1,1,1,1,1,1,1,1\n");
    let shuffled = export_with_rows("9,0,1,1,1,1,1,1,1,1,1\n1,0,1,1,1,1,1,1,1,1,1\n5,0,1,1,1,1,1,1,1,1,1\n");

    let forward = load_dataset_from_string(&forward).unwrap();
    let shuffled = load_dataset_from_string(&shuffled).unwrap();
    assert_eq!(forward.frame_count(), 9);
    assert_eq!(shuffled.frame_count(), 9);
    assert_eq!(forward, shuffled);
}

#[test]
fn unreadable_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_dataset_from_file(dir.path().join("missing.csv")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn truncated_header_reports_missing_data_section() {
    let file = write_temp("Devices\n100\n\n");
    let err = load_dataset_from_file(file.path()).unwrap_err();
    match err {
        LoadError::Format { reason, .. } => assert_eq!(reason, FormatReason::NoDataSection),
        other => panic!("expected a format error, got {other:?}"),
    }
    let message = load_dataset_from_string("").unwrap_err().to_string();
    assert!(message.contains("no data section found"));
}

#[test]
fn non_utf8_header_bytes_are_tolerated() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"Devices \xB5s\nx\n\nskip\nL:LFHD\nskip\n1,0,1,2,3\n").unwrap();
    file.flush().unwrap();

    let dataset = load_dataset_from_file(file.path()).unwrap();
    assert_eq!(dataset.frame_count(), 1);
    assert_eq!(dataset.position_at_frame("LFHD", 1), Some(Position::new(1.0, 3.0, 2.0)));
}

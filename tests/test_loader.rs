//! Integration tests for dataset loading

use hfpipe::pipeline::{load_dataset, read_frame, PipelineError, REQUIRED_COLUMNS, TARGET_COLUMN};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_load_csv_with_raw_headers() {
    let mut df = create_heart_dataframe(40, 1);
    let (_temp_dir, csv_path) = create_temp_csv(&mut df);

    let dataset = load_dataset(&csv_path, 100).unwrap();

    assert_eq!(dataset.height(), 40);
    assert_eq!(dataset.column_names(), REQUIRED_COLUMNS);
    assert!(dataset.has_column(TARGET_COLUMN));
}

#[test]
fn test_load_parquet_matches_csv() {
    let mut df = create_heart_dataframe(25, 2);
    let (_csv_dir, csv_path) = create_temp_csv(&mut df);
    let (_pq_dir, parquet_path) = create_temp_parquet(&mut df);

    let from_csv = load_dataset(&csv_path, 100).unwrap();
    let from_parquet = load_dataset(&parquet_path, 100).unwrap();

    assert_eq!(from_csv.labels().unwrap(), from_parquet.labels().unwrap());
    assert_eq!(
        from_csv.column_values("age").unwrap(),
        from_parquet.column_values("age").unwrap()
    );
}

#[test]
fn test_full_schema_scan() {
    let mut df = create_heart_dataframe(15, 3);
    let (_temp_dir, csv_path) = create_temp_csv(&mut df);

    let frame = read_frame(&csv_path, 0).unwrap();
    assert_eq!(frame.height(), 15);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_dataset(std::path::Path::new("/nonexistent/heart.csv"), 100).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}

#[test]
fn test_unsupported_extension() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("heart.xlsx");
    std::fs::write(&path, "irrelevant").unwrap();

    let err = load_dataset(&path, 100).unwrap_err();
    assert!(matches!(err, PipelineError::DataFormat(_)));
}

#[test]
fn test_empty_cell_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("gap.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "{}", RAW_HEADERS.join(",")).unwrap();
    writeln!(file, "4,1,1,0,0,1,0,75,20,130,1.9,265000,582").unwrap();
    writeln!(file, "6,0,1,0,1,0,0,,38,136,1.1,263358,7861").unwrap();
    drop(file);

    let err = load_dataset(&csv_path, 100).unwrap_err();
    match err {
        PipelineError::MissingData { column, count } => {
            assert_eq!(column, "age");
            assert_eq!(count, 1);
        }
        other => panic!("expected MissingData, got {:?}", other),
    }
}

#[test]
fn test_non_binary_outcome_is_rejected() {
    let mut df = create_ten_row_dataframe();
    df.with_column(Column::new(
        "Event".into(),
        [1i64, 2, 1, 0, 0, 0, 0, 0, 0, 0],
    ))
    .unwrap();
    let (_temp_dir, csv_path) = create_temp_csv(&mut df);

    let err = load_dataset(&csv_path, 100).unwrap_err();
    assert!(matches!(err, PipelineError::DataFormat(_)));
}

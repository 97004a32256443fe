//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tempfile::TempDir;

/// Headers as they appear in the published clinical records file
pub const RAW_HEADERS: &[&str] = &[
    "TIME",
    "Event",
    "Gender",
    "Smoking",
    "Diabetes",
    "BP",
    "Anaemia",
    "Age",
    "Ejection.Fraction",
    "Sodium",
    "Creatinine",
    "Pletelets",
    "CPK",
];

/// Create a synthetic clinical table with raw headers.
///
/// Deaths are driven by older age, low ejection fraction and high creatinine
/// so the models have something to learn. Every value lies inside the
/// discretization ranges.
pub fn create_heart_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut age = Vec::with_capacity(rows);
    let mut ef = Vec::with_capacity(rows);
    let mut creatinine = Vec::with_capacity(rows);
    let mut event = Vec::with_capacity(rows);
    let mut time = Vec::with_capacity(rows);

    for i in 0..rows {
        let a: f64 = rng.gen_range(40.0..95.0);
        let e: i64 = rng.gen_range(14..=80);
        let c: f64 = rng.gen_range(0.5..4.0);
        let risk = (a - 40.0) / 55.0 + (80 - e) as f64 / 66.0 + (c - 0.5) / 3.5;
        let noise: f64 = rng.gen_range(-0.4..0.4);
        // Force both classes on tiny fixtures
        let died = match i {
            0 => true,
            1 => false,
            _ => risk + noise > 1.6,
        };
        age.push(a.round());
        ef.push(e);
        creatinine.push((c * 10.0).round() / 10.0);
        event.push(died as i64);
        let follow_up: i64 = if died {
            rng.gen_range(4..90)
        } else {
            rng.gen_range(60..285)
        };
        time.push(follow_up);
    }

    let binary = |rng: &mut ChaCha8Rng| -> Vec<i64> { (0..rows).map(|_| rng.gen_range(0..2)).collect() };
    let gender = binary(&mut rng);
    let smoking = binary(&mut rng);
    let diabetes = binary(&mut rng);
    let bp = binary(&mut rng);
    let anaemia = binary(&mut rng);
    let sodium: Vec<i64> = (0..rows).map(|_| rng.gen_range(125..146)).collect();
    let platelets: Vec<f64> = (0..rows).map(|_| rng.gen_range(150000.0..400000.0)).collect();
    let cpk: Vec<i64> = (0..rows).map(|_| rng.gen_range(50..3000)).collect();

    df! {
        "TIME" => time,
        "Event" => event,
        "Gender" => gender,
        "Smoking" => smoking,
        "Diabetes" => diabetes,
        "BP" => bp,
        "Anaemia" => anaemia,
        "Age" => age,
        "Ejection.Fraction" => ef,
        "Sodium" => sodium,
        "Creatinine" => creatinine,
        "Pletelets" => platelets,
        "CPK" => cpk,
    }
    .unwrap()
}

/// Ten rows, seven survivors and three deaths
pub fn create_ten_row_dataframe() -> DataFrame {
    df! {
        "TIME" => [4i64, 8, 10, 120, 150, 180, 200, 210, 240, 250],
        "Event" => [1i64, 1, 1, 0, 0, 0, 0, 0, 0, 0],
        "Gender" => [1i64, 0, 1, 1, 0, 1, 0, 1, 1, 0],
        "Smoking" => [0i64, 1, 0, 0, 0, 1, 0, 1, 0, 0],
        "Diabetes" => [1i64, 0, 0, 1, 0, 0, 1, 0, 0, 1],
        "BP" => [1i64, 1, 0, 0, 1, 0, 0, 0, 1, 0],
        "Anaemia" => [0i64, 1, 1, 0, 0, 1, 0, 0, 0, 1],
        "Age" => [85.0f64, 78.0, 90.0, 50.0, 55.0, 60.0, 45.0, 62.0, 58.0, 49.0],
        "Ejection.Fraction" => [20i64, 25, 15, 40, 45, 38, 60, 35, 50, 55],
        "Sodium" => [128i64, 130, 127, 137, 138, 136, 140, 139, 135, 141],
        "Creatinine" => [2.7f64, 1.9, 3.5, 1.0, 0.9, 1.1, 0.8, 1.2, 1.0, 0.7],
        "Pletelets" => [
            162000.0f64, 210000.0, 127000.0, 265000.0, 263358.0, 300000.0, 250000.0, 222000.0,
            275000.0, 305000.0
        ],
        "CPK" => [582i64, 7861, 146, 111, 160, 47, 246, 315, 157, 123],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("heart.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("heart.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

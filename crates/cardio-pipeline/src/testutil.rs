//! Shared fixtures for pipeline tests.

use crate::download::{write_clean_csv, CleanRow};
use cardio_core::FEATURE_COUNT;
use std::path::{Path, PathBuf};

/// Write a small synthetic cleaned CSV, separable on `thalach`, `exang`,
/// `oldpeak`, and `ca`.
pub(crate) fn synthetic_csv(dir: &Path, n: usize) -> PathBuf {
    let mut rows = Vec::new();
    for i in 0..n {
        let sick = i % 2 == 1;
        let v = (i / 2) as f64;
        let mut features = [0.0; FEATURE_COUNT];
        features[0] = 50.0 + v; // age
        features[1] = (i % 2) as f64; // sex
        features[2] = (i % 4) as f64; // cp
        features[3] = 125.0 + v; // trestbps
        features[4] = 210.0 + 2.0 * v; // chol
        features[6] = 1.0; // restecg
        features[7] = if sick { 110.0 + v } else { 160.0 + v }; // thalach
        features[8] = f64::from(sick); // exang
        features[9] = if sick { 2.5 } else { 0.5 }; // oldpeak
        features[10] = 1.0; // slope
        features[11] = f64::from(sick); // ca
        features[12] = 2.0; // thal
        rows.push(CleanRow {
            features,
            target: u8::from(sick),
        });
    }
    let path = dir.join("clean.csv");
    write_clean_csv(&rows, &path).unwrap();
    path
}

//! Shared fixtures for model-layer tests.

use cardio_core::FEATURE_COUNT;
use ndarray::Array2;

/// Small synthetic 13-column dataset, separable on `thalach`, `exang`,
/// `oldpeak`, and `ca`.
pub(crate) fn synthetic_dataset(n: usize) -> (Array2<f64>, Vec<u8>) {
    let mut flat = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n {
        let sick = i % 2 == 1;
        let v = (i / 2) as f64;
        let thalach = if sick { 110.0 + v } else { 160.0 + v };
        let oldpeak = if sick { 2.0 + 0.1 * v } else { 0.2 + 0.1 * v };
        flat.extend_from_slice(&[
            50.0 + v,                     // age
            (i % 2) as f64,               // sex
            (i % 4) as f64,               // cp
            125.0 + v,                    // trestbps
            210.0 + 2.0 * v,              // chol
            0.0,                          // fbs
            1.0,                          // restecg
            thalach,                      // thalach
            f64::from(sick),              // exang
            oldpeak,                      // oldpeak
            1.0,                          // slope
            if sick { 1.0 } else { 0.0 }, // ca
            2.0,                          // thal
        ]);
        labels.push(u8::from(sick));
    }
    (
        Array2::from_shape_vec((n, FEATURE_COUNT), flat).unwrap(),
        labels,
    )
}

//! Binary-classification metrics.
//!
//! Confusion-matrix-derived accuracy/precision/recall plus area under the
//! ROC curve computed from ranked scores with trapezoidal integration
//! (tie groups collapse to single ROC points, so tied scores are handled
//! the same way either ordering of them would be).

use serde::{Deserialize, Serialize};

/// Confusion matrix for binary classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True positives.
    pub tp: usize,
    /// True negatives.
    pub tn: usize,
    /// False positives.
    pub fp: usize,
    /// False negatives.
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction.
    pub fn record(&mut self, actual: u8, predicted: u8) {
        match (actual, predicted) {
            (1, 1) => self.tp += 1,
            (0, 0) => self.tn += 1,
            (0, 1) => self.fp += 1,
            (1, 0) => self.fn_ += 1,
            _ => {}
        }
    }

    /// Total number of recorded samples.
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Aggregate evaluation metrics for one fold or one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Overall accuracy.
    pub accuracy: f64,
    /// Precision = TP / (TP + FP).
    pub precision: f64,
    /// Recall = TP / (TP + FN).
    pub recall: f64,
    /// Area under the ROC curve.
    pub roc_auc: f64,
    /// Raw confusion matrix at the 0.5 threshold.
    pub confusion: ConfusionMatrix,
}

impl EvalMetrics {
    /// Compute all metrics from labels and class-1 scores.
    ///
    /// Labels are thresholded at `threshold` for the confusion-matrix
    /// metrics; AUC uses the raw scores.
    pub fn from_scores(labels: &[u8], scores: &[f64], threshold: f64) -> Self {
        let mut cm = ConfusionMatrix::new();
        for (&label, &score) in labels.iter().zip(scores.iter()) {
            cm.record(label, u8::from(score >= threshold));
        }

        let total = cm.total() as f64;
        let accuracy = if total > 0.0 {
            (cm.tp + cm.tn) as f64 / total
        } else {
            0.0
        };
        let precision = if cm.tp + cm.fp > 0 {
            cm.tp as f64 / (cm.tp + cm.fp) as f64
        } else {
            0.0
        };
        let recall = if cm.tp + cm.fn_ > 0 {
            cm.tp as f64 / (cm.tp + cm.fn_) as f64
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            roc_auc: roc_auc_score(labels, scores),
            confusion: cm,
        }
    }
}

impl std::fmt::Display for EvalMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "acc={:.4} prec={:.4} rec={:.4} auc={:.4} (tp={} fp={} tn={} fn={})",
            self.accuracy,
            self.precision,
            self.recall,
            self.roc_auc,
            self.confusion.tp,
            self.confusion.fp,
            self.confusion.tn,
            self.confusion.fn_,
        )
    }
}

/// Area under the ROC curve from labels and class-1 scores.
///
/// Sorts scores descending and sweeps the threshold, accumulating
/// trapezoids between consecutive distinct-score ROC points. Degenerate
/// inputs (a single class present) return 0.5.
pub fn roc_auc_score(labels: &[u8], scores: &[f64]) -> f64 {
    debug_assert_eq!(labels.len(), scores.len());

    let mut pairs: Vec<(f64, u8)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let pos = labels.iter().filter(|&&l| l == 1).count() as f64;
    let neg = labels.len() as f64 - pos;
    if pos == 0.0 || neg == 0.0 {
        return 0.5;
    }

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0_f64, 0.0_f64);
    let (mut prev_tp, mut prev_fp) = (0.0_f64, 0.0_f64);

    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        // Consume the whole tie group before emitting an ROC point.
        while i < pairs.len() && pairs[i].0 == score {
            if pairs[i].1 == 1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        auc += (fp - prev_fp) * (tp + prev_tp) / 2.0;
        prev_tp = tp;
        prev_fp = fp;
    }

    auc / (pos * neg)
}

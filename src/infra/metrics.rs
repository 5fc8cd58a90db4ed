// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two concerns live here:
//
//   1. The scoring-policy family used to judge document
//      predictions: a fixed, enumerated set {F-beta, precision,
//      recall} selected by value — no runtime function factories.
//      All scores are computed from *rounded* predictions, and the
//      zero-positive / zero-prediction edge cases return 0 instead
//      of dividing by zero.
//
//   2. The epoch metrics CSV logger. One row is appended per
//      epoch so learning curves survive the run.
//
// The F-beta form used:
//   f = (beta + 1) * p * r / (r + beta * p)   when the denominator
//   is positive, else 0.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// Which score to compute from (y_true, y_pred).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringPolicy {
    FBeta(f64),
    Precision,
    Recall,
}

impl ScoringPolicy {
    /// Score rounded predictions against binary ground truth.
    /// Inputs are probabilities in [0, 1]; predictions are rounded
    /// to {0, 1} first.
    pub fn score(&self, y_true: &[f32], y_pred: &[f32]) -> f64 {
        let mut tp = 0.0f64;
        let mut num_true = 0.0f64;
        let mut num_pred = 0.0f64;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            let t = t.round() as f64;
            let p = p.round() as f64;
            num_true += t;
            num_pred += p;
            tp += t * p;
        }

        let recall = if num_true > 0.0 { tp / num_true } else { 0.0 };
        if matches!(self, ScoringPolicy::Recall) {
            return recall;
        }

        let precision = if num_pred > 0.0 { tp / num_pred } else { 0.0 };
        if matches!(self, ScoringPolicy::Precision) {
            return precision;
        }

        let beta = match self {
            ScoringPolicy::FBeta(beta) => *beta,
            _ => unreachable!(),
        };
        let precision_recall_sum = recall + beta * precision;
        if precision_recall_sum > 0.0 {
            (beta + 1.0) * (precision * recall) / precision_recall_sum
        } else {
            0.0
        }
    }
}

/// Fraction of rounded predictions matching ground truth.
pub fn accuracy(y_true: &[f32], y_pred: &[f32]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(&t, &p)| t.round() == p.round())
        .count();
    correct as f64 / y_true.len() as f64
}

// ─── Epoch metrics logging ────────────────────────────────────────────────────

/// One row of metrics for a single training epoch. Both training
/// stages append to the same file, tagged by `stage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// "sentence" or "doc"
    pub stage: String,
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub val_acc: f64,
    /// F-beta on the validation set; NaN-free (guarded to 0).
    /// The sentence stage has no F-score and logs 0 here.
    pub val_f: f64,
}

/// Appends epoch metrics to `metrics.csv` in the checkpoint
/// directory so learning curves can be plotted after the run.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so a
    /// resumed run appends instead of clobbering.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "stage,epoch,train_loss,val_loss,val_acc,val_f")?;
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6},{:.6}",
            m.stage, m.epoch, m.train_loss, m.val_loss, m.val_acc, m.val_f,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

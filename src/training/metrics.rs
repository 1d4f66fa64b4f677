//! Validation metrics (higher is better for all of them)

use crate::error::{KolosalError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score reported for a fitted representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Accuracy,
    /// Mean per-class recall
    BalancedAccuracy,
    /// Coefficient of determination
    R2,
}

impl Metric {
    pub fn compute(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(KolosalError::ValueError("cannot score an empty split".to_string()));
        }

        let score = match self {
            Metric::Accuracy => {
                let correct = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .filter(|(t, p)| (*t - *p).abs() < 0.5)
                    .count();
                correct as f64 / y_true.len() as f64
            }
            Metric::BalancedAccuracy => {
                // class -> (hits, total)
                let mut per_class: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
                for (t, p) in y_true.iter().zip(y_pred.iter()) {
                    let entry = per_class.entry(t.round() as i64).or_insert((0, 0));
                    entry.1 += 1;
                    if (t - p).abs() < 0.5 {
                        entry.0 += 1;
                    }
                }
                per_class
                    .values()
                    .map(|&(hits, total)| hits as f64 / total as f64)
                    .sum::<f64>()
                    / per_class.len() as f64
            }
            Metric::R2 => {
                let mean = y_true.mean().unwrap_or(0.0);
                let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
                let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
                if ss_tot == 0.0 {
                    if ss_res == 0.0 { 1.0 } else { 0.0 }
                } else {
                    1.0 - ss_res / ss_tot
                }
            }
        };

        if !score.is_finite() {
            return Err(KolosalError::ComputationError(format!(
                "{:?} produced a non-finite score",
                self
            )));
        }
        Ok(score)
    }
}

//! Representation evaluators
//!
//! An evaluator maps a [`DataNode`] to a quality score, higher is better.
//! Recoverable errors drop the candidate being scored; any other error class
//! aborts the search.

use crate::data::{DataNode, TaskType};
use crate::error::{KolosalError, Result};
use crate::training::{ExtraTrees, Metric};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Scores a representation
pub trait Evaluator {
    fn evaluate(&self, node: &DataNode) -> Result<f64>;
}

impl<F> Evaluator for F
where
    F: Fn(&DataNode) -> Result<f64>,
{
    fn evaluate(&self, node: &DataNode) -> Result<f64> {
        self(node)
    }
}

/// Configuration for [`HoldoutEvaluator`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldoutConfig {
    /// Fraction of rows held out for validation
    pub validation_fraction: f64,
    pub n_estimators: usize,
    pub max_depth: usize,
    /// `None` picks balanced accuracy for classification and R2 for regression
    pub metric: Option<Metric>,
    pub seed: u64,
}

impl Default for HoldoutConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.2,
            n_estimators: 30,
            max_depth: 10,
            metric: None,
            seed: 1,
        }
    }
}

/// Fits extra trees on a seeded shuffled split and scores the held-out rows
#[derive(Debug, Clone)]
pub struct HoldoutEvaluator {
    config: HoldoutConfig,
}

impl Default for HoldoutEvaluator {
    fn default() -> Self {
        Self::new(HoldoutConfig::default())
    }
}

impl HoldoutEvaluator {
    pub fn new(config: HoldoutConfig) -> Self {
        Self { config }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn config(&self) -> &HoldoutConfig {
        &self.config
    }

    fn metric_for(&self, task: TaskType) -> Metric {
        self.config.metric.unwrap_or(match task {
            TaskType::Classification => Metric::BalancedAccuracy,
            TaskType::Regression => Metric::R2,
        })
    }

    /// (train rows, validation rows)
    fn split(&self, n_rows: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        let fraction = self.config.validation_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(KolosalError::ConfigError(format!(
                "validation fraction must be in (0, 1), got {}",
                fraction
            )));
        }

        let n_valid = ((n_rows as f64) * fraction).round() as usize;
        if n_valid == 0 || n_valid >= n_rows {
            return Err(KolosalError::ValueError(format!(
                "{} rows are too few for a {:.0}% holdout split",
                n_rows,
                fraction * 100.0
            )));
        }

        let mut rows: Vec<usize> = (0..n_rows).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rows.shuffle(&mut rng);
        let valid = rows.split_off(n_rows - n_valid);
        Ok((rows, valid))
    }
}

impl Evaluator for HoldoutEvaluator {
    fn evaluate(&self, node: &DataNode) -> Result<f64> {
        let (train, valid) = self.split(node.features.nrows())?;

        let x_train: Array2<f64> = node.features.select(Axis(0), &train);
        let y_train: Array1<f64> = node.target.select(Axis(0), &train);
        let x_valid: Array2<f64> = node.features.select(Axis(0), &valid);
        let y_valid: Array1<f64> = node.target.select(Axis(0), &valid);

        let mut model = match node.task {
            TaskType::Classification => ExtraTrees::new_classifier(self.config.n_estimators),
            TaskType::Regression => ExtraTrees::new_regressor(self.config.n_estimators),
        }
        .with_max_depth(self.config.max_depth)
        .with_random_state(self.config.seed);

        model.fit(&x_train, &y_train)?;
        let predictions = model.predict(&x_valid)?;
        self.metric_for(node.task).compute(&y_valid, &predictions)
    }
}

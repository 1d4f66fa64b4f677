//! Feature representations
//!
//! A [`DataNode`] is one feature-engineered view of the dataset: the feature
//! matrix, its per-column type metadata, and the search bookkeeping (depth,
//! score, transformation history) the beam search attaches to it.

mod loader;

pub use loader::{DataLoader, DataSummary, ColumnSummary};

use crate::error::{KolosalError, Result};
use crate::transformers::TransKind;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Column data type as seen by the transformation catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    Numerical,
    /// Label-encoded categorical column (codes stored as f64)
    Categorical,
}

/// Learning task of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Classification,
    Regression,
}

impl std::str::FromStr for TaskType {
    type Err = KolosalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "classification" | "cls" => Ok(TaskType::Classification),
            "regression" | "reg" => Ok(TaskType::Regression),
            other => Err(KolosalError::ConfigError(format!("Invalid task type: {}", other))),
        }
    }
}

/// A feature-engineered representation of the dataset
#[derive(Debug, Clone)]
pub struct DataNode {
    /// Feature matrix, rows x columns
    pub features: Array2<f64>,
    /// Target values (class codes for classification)
    pub target: Array1<f64>,
    /// Type of each feature column
    pub feature_types: Vec<FeatureType>,
    /// Name of each feature column
    pub feature_names: Vec<String>,
    pub task: TaskType,
    /// Distance from the root; the root has depth 1
    pub depth: usize,
    /// Evaluator output, `None` until scored
    pub score: Option<f64>,
    /// Transformation kinds applied along the ancestry, oldest first
    pub trans_hist: Vec<TransKind>,
}

impl DataNode {
    /// Create a root representation
    pub fn new(
        features: Array2<f64>,
        target: Array1<f64>,
        feature_types: Vec<FeatureType>,
        task: TaskType,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("target length = {}", features.nrows()),
                actual: format!("target length = {}", target.len()),
            });
        }
        if features.ncols() != feature_types.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} feature types", features.ncols()),
                actual: format!("{} feature types", feature_types.len()),
            });
        }

        let feature_names = (0..features.ncols()).map(|i| format!("x{}", i)).collect();
        Ok(Self {
            features,
            target,
            feature_types,
            feature_names,
            task,
            depth: 1,
            score: None,
            trans_hist: Vec::new(),
        })
    }

    /// Set column names
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.features.ncols() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} feature names", self.features.ncols()),
                actual: format!("{} feature names", names.len()),
            });
        }
        self.feature_names = names;
        Ok(self)
    }

    /// Build a child view of this node with new feature columns.
    ///
    /// Target, task, depth and history are inherited; the score is unset.
    /// The search engine is responsible for bumping depth and appending the
    /// producing kind.
    pub fn derive(
        &self,
        features: Array2<f64>,
        feature_types: Vec<FeatureType>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        self.derive_with_target(features, self.target.clone(), feature_types, feature_names)
    }

    /// Like [`DataNode::derive`] for transformations that change the row set.
    pub fn derive_with_target(
        &self,
        features: Array2<f64>,
        target: Array1<f64>,
        feature_types: Vec<FeatureType>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("target length = {}", features.nrows()),
                actual: format!("target length = {}", target.len()),
            });
        }
        if features.ncols() != feature_types.len() || features.ncols() != feature_names.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} column descriptors", features.ncols()),
                actual: format!(
                    "{} types, {} names",
                    feature_types.len(),
                    feature_names.len()
                ),
            });
        }

        Ok(Self {
            features,
            target,
            feature_types,
            feature_names,
            task: self.task,
            depth: self.depth,
            score: None,
            trans_hist: self.trans_hist.clone(),
        })
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.features.dim()
    }

    /// Number of categorical feature columns
    pub fn cat_num(&self) -> usize {
        self.feature_types
            .iter()
            .filter(|t| **t == FeatureType::Categorical)
            .count()
    }

    /// Number of numerical feature columns
    pub fn num_num(&self) -> usize {
        self.feature_types.len() - self.cat_num()
    }

    pub fn categorical_columns(&self) -> Vec<usize> {
        self.columns_of(FeatureType::Categorical)
    }

    pub fn numerical_columns(&self) -> Vec<usize> {
        self.columns_of(FeatureType::Numerical)
    }

    fn columns_of(&self, ftype: FeatureType) -> Vec<usize> {
        self.feature_types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == ftype)
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the transformation kind was already applied along the ancestry
    pub fn has_applied(&self, kind: TransKind) -> bool {
        self.trans_hist.contains(&kind)
    }
}

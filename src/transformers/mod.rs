//! Transformation operators
//!
//! Every operator maps one [`DataNode`] to a new one and is tagged with a
//! [`TransKind`]. The search applies a kind at most once along any path, so
//! the kind, not the operator instance, is the unit of history.
//!
//! - Scaling: standard and min-max ([`ScaleTransformation`])
//! - Discretization ([`KBinsDiscretizer`])
//! - Log transform ([`LogTransformation`])
//! - Feature crossing, numerical and categorical ([`PolynomialTransformation`])
//! - One-hot encoding ([`OneHotTransformation`])
//! - Feature selection ([`VarianceSelector`], [`ExtraTreeBasedSelector`])
//! - Class rebalancing ([`RandomOverSampling`])

mod scaler;
mod discretizer;
mod math;
mod generator;
mod encoder;
mod selector;
mod rebalance;

pub use scaler::{ScaleTransformation, ScaleMethod};
pub use discretizer::{KBinsDiscretizer, BinningStrategy};
pub use math::LogTransformation;
pub use generator::{PolynomialTransformation, CompoundMode};
pub use encoder::OneHotTransformation;
pub use selector::{VarianceSelector, ExtraTreeBasedSelector};
pub use rebalance::RandomOverSampling;

use crate::data::{DataNode, FeatureType};
use crate::error::{KolosalError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a family of transformations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransKind {
    Scaler,
    Normalizer,
    Discretizer,
    LogTransform,
    ArithmeticCross,
    CategoricalCross,
    OneHotEncoding,
    VarianceSelection,
    TreeSelection,
    /// Changes the row set; only legal directly below the root
    Rebalance,
}

impl TransKind {
    /// Every kind the search may use, in catalog order
    pub const SEARCHABLE: [TransKind; 10] = [
        TransKind::Scaler,
        TransKind::Normalizer,
        TransKind::Discretizer,
        TransKind::LogTransform,
        TransKind::ArithmeticCross,
        TransKind::CategoricalCross,
        TransKind::OneHotEncoding,
        TransKind::VarianceSelection,
        TransKind::TreeSelection,
        TransKind::Rebalance,
    ];

    /// Stable numeric identifier
    pub fn id(self) -> u8 {
        match self {
            TransKind::Scaler => 3,
            TransKind::Normalizer => 4,
            TransKind::Discretizer => 5,
            TransKind::LogTransform => 6,
            TransKind::ArithmeticCross => 7,
            TransKind::CategoricalCross => 8,
            TransKind::OneHotEncoding => 9,
            TransKind::VarianceSelection => 10,
            TransKind::TreeSelection => 11,
            TransKind::Rebalance => 17,
        }
    }

    /// Kinds with global side effects that must run once, at depth 1
    pub fn is_root_only(self) -> bool {
        matches!(self, TransKind::Rebalance)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransKind::Scaler => "scaler",
            TransKind::Normalizer => "normalizer",
            TransKind::Discretizer => "discretizer",
            TransKind::LogTransform => "log_transform",
            TransKind::ArithmeticCross => "arithmetic_cross",
            TransKind::CategoricalCross => "categorical_cross",
            TransKind::OneHotEncoding => "one_hot_encoding",
            TransKind::VarianceSelection => "variance_selection",
            TransKind::TreeSelection => "tree_selection",
            TransKind::Rebalance => "rebalance",
        }
    }
}

impl fmt::Display for TransKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transformation operator
///
/// `operate` must not touch `depth`, `score` or `trans_hist` beyond what
/// [`DataNode::derive`] does; the search engine owns that bookkeeping.
pub trait Transformer {
    /// Kind used for history and duplicate suppression
    fn kind(&self) -> TransKind;

    /// Display name for logs and graph edges
    fn name(&self) -> &str;

    /// Produce a new representation from `node`
    fn operate(&self, node: &DataNode) -> Result<DataNode>;
}

impl fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transformer({}, {})", self.kind(), self.name())
    }
}

/// Column-wise builder for transformer outputs
#[derive(Default)]
pub(crate) struct ColumnSet {
    columns: Vec<Vec<f64>>,
    types: Vec<FeatureType>,
    names: Vec<String>,
}

impl ColumnSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, values: Vec<f64>, ftype: FeatureType, name: String) {
        self.columns.push(values);
        self.types.push(ftype);
        self.names.push(name);
    }

    /// Copy a column of `node` unchanged
    pub(crate) fn keep(&mut self, node: &DataNode, col: usize) {
        self.push(
            node.features.column(col).to_vec(),
            node.feature_types[col],
            node.feature_names[col].clone(),
        );
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    /// Assemble a child node of `parent` with the same rows
    pub(crate) fn into_node(self, parent: &DataNode) -> Result<DataNode> {
        let n_rows = parent.features.nrows();
        if self.columns.is_empty() {
            return Err(KolosalError::ValueError(
                "transformation produced no feature columns".to_string(),
            ));
        }

        let mut features = Array2::zeros((n_rows, self.columns.len()));
        for (j, col) in self.columns.iter().enumerate() {
            if col.len() != n_rows {
                return Err(KolosalError::ShapeError {
                    expected: format!("{} rows", n_rows),
                    actual: format!("{} rows in column {}", col.len(), self.names[j]),
                });
            }
            for (i, &v) in col.iter().enumerate() {
                features[[i, j]] = v;
            }
        }

        parent.derive(features, self.types, self.names)
    }
}

/// Mean and population variance of a slice
pub(crate) fn mean_var(values: &[f64]) -> (f64, f64) {
    let n = values.len().max(1) as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var)
}

//! Categorical encoding

use super::{ColumnSet, TransKind, Transformer};
use crate::data::{DataNode, FeatureType};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// One-hot encodes every categorical column into numerical indicator columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotTransformation {
    /// Per-column cardinality limit
    max_categories: usize,
}

impl Default for OneHotTransformation {
    fn default() -> Self {
        Self::new(32)
    }
}

impl OneHotTransformation {
    pub fn new(max_categories: usize) -> Self {
        Self {
            max_categories: max_categories.max(2),
        }
    }
}

impl Transformer for OneHotTransformation {
    fn kind(&self) -> TransKind {
        TransKind::OneHotEncoding
    }

    fn name(&self) -> &str {
        "one_hot_encoder"
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        if node.cat_num() == 0 {
            return Err(KolosalError::ValueError(
                "one_hot_encoder: no categorical columns".to_string(),
            ));
        }

        let mut out = ColumnSet::new();
        for col in 0..node.features.ncols() {
            if node.feature_types[col] != FeatureType::Categorical {
                out.keep(node, col);
                continue;
            }

            let column = node.features.column(col);
            let mut categories: Vec<f64> = column.to_vec();
            categories.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            categories.dedup();

            if categories.len() > self.max_categories {
                return Err(KolosalError::MemoryError(format!(
                    "one_hot_encoder: column {} has {} categories (limit {})",
                    node.feature_names[col],
                    categories.len(),
                    self.max_categories
                )));
            }

            for category in &categories {
                out.push(
                    column.iter().map(|v| if v == category { 1.0 } else { 0.0 }).collect(),
                    FeatureType::Numerical,
                    format!("{}={}", node.feature_names[col], category),
                );
            }
        }
        out.into_node(node)
    }
}

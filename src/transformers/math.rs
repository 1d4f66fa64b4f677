//! Elementwise mathematical transforms

use super::{ColumnSet, TransKind, Transformer};
use crate::data::{DataNode, FeatureType};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// log(1 + x) over numerical columns
///
/// Fails with a value error when a column holds values at or below -1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogTransformation;

impl LogTransformation {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for LogTransformation {
    fn kind(&self) -> TransKind {
        TransKind::LogTransform
    }

    fn name(&self) -> &str {
        "log1p_transform"
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        if node.num_num() == 0 {
            return Err(KolosalError::ValueError(
                "log1p_transform: no numerical columns".to_string(),
            ));
        }

        let mut out = ColumnSet::new();
        for col in 0..node.features.ncols() {
            if node.feature_types[col] != FeatureType::Numerical {
                out.keep(node, col);
                continue;
            }
            let column = node.features.column(col);
            if let Some(bad) = column.iter().find(|&&v| v <= -1.0) {
                return Err(KolosalError::ValueError(format!(
                    "log1p_transform: column {} contains {} (<= -1)",
                    node.feature_names[col], bad
                )));
            }
            out.push(
                column.iter().map(|v| v.ln_1p()).collect(),
                FeatureType::Numerical,
                format!("log1p({})", node.feature_names[col]),
            );
        }
        out.into_node(node)
    }
}

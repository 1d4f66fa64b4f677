//! Feature scaling transformations

use super::{mean_var, ColumnSet, TransKind, Transformer};
use crate::data::{DataNode, FeatureType};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// Scaling method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMethod {
    /// (x - mean) / std
    Standard,
    /// (x - min) / (max - min)
    MinMax,
}

/// Rescales every numerical column; categorical columns pass through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleTransformation {
    method: ScaleMethod,
    name: String,
}

impl ScaleTransformation {
    pub fn new(method: ScaleMethod) -> Self {
        let name = match method {
            ScaleMethod::Standard => "standard_scaler",
            ScaleMethod::MinMax => "minmax_normalizer",
        };
        Self {
            method,
            name: name.to_string(),
        }
    }

    pub fn standard() -> Self {
        Self::new(ScaleMethod::Standard)
    }

    pub fn min_max() -> Self {
        Self::new(ScaleMethod::MinMax)
    }

    fn scale(&self, values: &[f64]) -> Vec<f64> {
        match self.method {
            ScaleMethod::Standard => {
                let (mean, var) = mean_var(values);
                let std = var.sqrt();
                // Constant columns are only centered
                let std = if std < 1e-12 { 1.0 } else { std };
                values.iter().map(|v| (v - mean) / std).collect()
            }
            ScaleMethod::MinMax => {
                let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                if range.abs() < 1e-12 {
                    vec![0.0; values.len()]
                } else {
                    values.iter().map(|v| (v - min) / range).collect()
                }
            }
        }
    }
}

impl Transformer for ScaleTransformation {
    fn kind(&self) -> TransKind {
        match self.method {
            ScaleMethod::Standard => TransKind::Scaler,
            ScaleMethod::MinMax => TransKind::Normalizer,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        if node.num_num() == 0 {
            return Err(KolosalError::ValueError(format!(
                "{}: no numerical columns to scale",
                self.name
            )));
        }

        let mut out = ColumnSet::new();
        for col in 0..node.features.ncols() {
            if node.feature_types[col] == FeatureType::Numerical {
                let values = node.features.column(col).to_vec();
                out.push(self.scale(&values), FeatureType::Numerical, node.feature_names[col].clone());
            } else {
                out.keep(node, col);
            }
        }
        out.into_node(node)
    }
}

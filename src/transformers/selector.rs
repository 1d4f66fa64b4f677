//! Feature selection transformations

use super::{mean_var, ColumnSet, TransKind, Transformer};
use crate::data::{DataNode, TaskType};
use crate::error::{KolosalError, Result};
use crate::training::ExtraTrees;
use serde::{Deserialize, Serialize};

/// Drops columns whose variance does not exceed `threshold`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceSelector {
    threshold: f64,
}

impl Default for VarianceSelector {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl VarianceSelector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.max(0.0),
        }
    }
}

impl Transformer for VarianceSelector {
    fn kind(&self) -> TransKind {
        TransKind::VarianceSelection
    }

    fn name(&self) -> &str {
        "variance_selector"
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        let mut out = ColumnSet::new();
        for col in 0..node.features.ncols() {
            let (_, var) = mean_var(&node.features.column(col).to_vec());
            if var > self.threshold {
                out.keep(node, col);
            }
        }
        if out.len() == 0 {
            return Err(KolosalError::ValueError(format!(
                "variance_selector: no column has variance above {}",
                self.threshold
            )));
        }
        out.into_node(node)
    }
}

/// Keeps features whose extra-trees importance is at least the mean importance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTreeBasedSelector {
    n_estimators: usize,
    random_state: u64,
}

impl Default for ExtraTreeBasedSelector {
    fn default() -> Self {
        Self::new(50, 1)
    }
}

impl ExtraTreeBasedSelector {
    pub fn new(n_estimators: usize, random_state: u64) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            random_state,
        }
    }

    /// Indices of the retained columns, in their original order
    pub fn select(&self, node: &DataNode) -> Result<Vec<usize>> {
        let mut model = match node.task {
            TaskType::Classification => ExtraTrees::new_classifier(self.n_estimators),
            TaskType::Regression => ExtraTrees::new_regressor(self.n_estimators),
        }
        .with_random_state(self.random_state);
        model.fit(&node.features, &node.target)?;

        let importances = model
            .feature_importances()
            .ok_or_else(|| KolosalError::ComputationError("no feature importances".to_string()))?;
        let threshold = importances.mean().unwrap_or(0.0);

        let selected: Vec<usize> = importances
            .iter()
            .enumerate()
            .filter(|(_, &imp)| imp >= threshold && imp > 0.0)
            .map(|(i, _)| i)
            .collect();

        if selected.is_empty() {
            return Err(KolosalError::ValueError(
                "extra_trees_selector: no informative features".to_string(),
            ));
        }
        Ok(selected)
    }
}

impl Transformer for ExtraTreeBasedSelector {
    fn kind(&self) -> TransKind {
        TransKind::TreeSelection
    }

    fn name(&self) -> &str {
        "extra_trees_selector"
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        let mut out = ColumnSet::new();
        for col in self.select(node)? {
            out.keep(node, col);
        }
        out.into_node(node)
    }
}

//! Class rebalancing by random oversampling

use super::{TransKind, Transformer};
use crate::data::{DataNode, TaskType};
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Duplicates minority-class rows until every class matches the majority
///
/// Changes the row set of everything derived from its output, which is why
/// the search only allows it directly below the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomOverSampling {
    seed: u64,
}

impl Default for RandomOverSampling {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomOverSampling {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Transformer for RandomOverSampling {
    fn kind(&self) -> TransKind {
        TransKind::Rebalance
    }

    fn name(&self) -> &str {
        "random_over_sampler"
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        if node.task != TaskType::Classification {
            return Err(KolosalError::ValueError(
                "random_over_sampler: requires a classification target".to_string(),
            ));
        }

        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &label) in node.target.iter().enumerate() {
            by_class.entry(label.round() as i64).or_default().push(i);
        }
        let majority = by_class.values().map(Vec::len).max().unwrap_or(0);
        if by_class.len() < 2 {
            return Err(KolosalError::ValueError(
                "random_over_sampler: target has a single class".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut rows: Vec<usize> = (0..node.target.len()).collect();
        for members in by_class.values() {
            for _ in members.len()..majority {
                rows.push(members[rng.gen_range(0..members.len())]);
            }
        }

        let n_cols = node.features.ncols();
        let mut features = Array2::zeros((rows.len(), n_cols));
        let mut target = Array1::zeros(rows.len());
        for (new_i, &old_i) in rows.iter().enumerate() {
            features.row_mut(new_i).assign(&node.features.row(old_i));
            target[new_i] = node.target[old_i];
        }

        node.derive_with_target(
            features,
            target,
            node.feature_types.clone(),
            node.feature_names.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureType;
    use ndarray::array;

    #[test]
    fn test_balances_classes() {
        let node = DataNode::new(
            array![[1.0], [2.0], [3.0], [4.0]],
            array![0.0, 0.0, 0.0, 1.0],
            vec![FeatureType::Numerical],
            TaskType::Classification,
        )
        .unwrap();
        let out = RandomOverSampling::default().operate(&node).unwrap();

        assert_eq!(out.shape(), (6, 1));
        let ones = out.target.iter().filter(|&&v| v == 1.0).count();
        assert_eq!(ones, 3);
        // duplicated rows carry their feature values
        assert!(out.features.rows().into_iter().skip(4).all(|r| r[0] == 4.0));
    }

    #[test]
    fn test_regression_rejected() {
        let node = DataNode::new(
            array![[1.0], [2.0]],
            array![0.5, 1.5],
            vec![FeatureType::Numerical],
            TaskType::Regression,
        )
        .unwrap();
        assert!(RandomOverSampling::default().operate(&node).is_err());
    }
}

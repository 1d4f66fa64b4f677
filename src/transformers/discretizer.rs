//! Binning of numerical columns into categorical codes

use super::{ColumnSet, TransKind, Transformer};
use crate::data::{DataNode, FeatureType};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// How bin edges are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinningStrategy {
    /// Equal-width bins between min and max
    Uniform,
    /// Equal-frequency bins
    Quantile,
}

/// Replaces numerical columns by their bin index, typed categorical
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KBinsDiscretizer {
    n_bins: usize,
    strategy: BinningStrategy,
}

impl Default for KBinsDiscretizer {
    fn default() -> Self {
        Self::new(5, BinningStrategy::Quantile)
    }
}

impl KBinsDiscretizer {
    pub fn new(n_bins: usize, strategy: BinningStrategy) -> Self {
        Self {
            n_bins: n_bins.max(2),
            strategy,
        }
    }

    /// Interior bin edges, ascending
    fn edges(&self, values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];

        let mut edges: Vec<f64> = match self.strategy {
            BinningStrategy::Uniform => {
                let width = (max - min) / self.n_bins as f64;
                (1..self.n_bins).map(|i| min + width * i as f64).collect()
            }
            BinningStrategy::Quantile => (1..self.n_bins)
                .map(|i| {
                    let pos = (i as f64 / self.n_bins as f64) * (sorted.len() - 1) as f64;
                    sorted[pos.round() as usize]
                })
                .collect(),
        };
        edges.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        edges
    }
}

impl Transformer for KBinsDiscretizer {
    fn kind(&self) -> TransKind {
        TransKind::Discretizer
    }

    fn name(&self) -> &str {
        "kbins_discretizer"
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        if node.num_num() == 0 {
            return Err(KolosalError::ValueError(
                "kbins_discretizer: no numerical columns".to_string(),
            ));
        }
        if node.features.nrows() == 0 {
            return Err(KolosalError::ValueError("kbins_discretizer: empty data".to_string()));
        }

        let mut out = ColumnSet::new();
        for col in 0..node.features.ncols() {
            if node.feature_types[col] != FeatureType::Numerical {
                out.keep(node, col);
                continue;
            }
            let values = node.features.column(col).to_vec();
            let edges = self.edges(&values);
            let codes = values
                .iter()
                .map(|v| edges.iter().filter(|&&e| *v > e).count() as f64)
                .collect();
            out.push(
                codes,
                FeatureType::Categorical,
                format!("bin({})", node.feature_names[col]),
            );
        }
        out.into_node(node)
    }
}

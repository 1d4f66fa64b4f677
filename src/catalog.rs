//! Transformation catalog
//!
//! The search engine asks the catalog which operators apply to a node. The
//! catalog decides applicability from feature types, shape and task only, so
//! the answer is deterministic for a given node.

use crate::data::{DataNode, TaskType};
use crate::error::{KolosalError, Result};
use crate::transformers::{
    BinningStrategy, ExtraTreeBasedSelector, KBinsDiscretizer, LogTransformation,
    OneHotTransformation, PolynomialTransformation, RandomOverSampling, ScaleTransformation,
    TransKind, Transformer, VarianceSelector,
};

/// Source of transformation operators
pub trait TransformationCatalog {
    /// Operators of the requested kinds applicable to `node`, in a fixed order.
    ///
    /// An error here means the catalog itself is misconfigured or the node is
    /// malformed; the search treats it as fatal.
    fn get_transformations(
        &self,
        node: &DataNode,
        trans_kinds: &[TransKind],
    ) -> Result<Vec<Box<dyn Transformer>>>;
}

/// Kinds the search may apply to a node at `depth`.
///
/// Root-only kinds are dropped below depth 1.
pub fn allowed_kinds(depth: usize) -> Vec<TransKind> {
    TransKind::SEARCHABLE
        .iter()
        .copied()
        .filter(|kind| depth <= 1 || !kind.is_root_only())
        .collect()
}

/// Default catalog over the built-in operators
#[derive(Debug, Clone)]
pub struct TransformerManager {
    seed: u64,
    n_bins: usize,
    max_one_hot_categories: usize,
    max_cross_columns: usize,
    selector_estimators: usize,
}

impl Default for TransformerManager {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TransformerManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            n_bins: 5,
            max_one_hot_categories: 32,
            max_cross_columns: 512,
            selector_estimators: 50,
        }
    }

    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    pub fn with_max_one_hot_categories(mut self, n: usize) -> Self {
        self.max_one_hot_categories = n;
        self
    }

    pub fn with_max_cross_columns(mut self, n: usize) -> Self {
        self.max_cross_columns = n;
        self
    }

    fn applicable(&self, node: &DataNode, kind: TransKind) -> bool {
        let n_cols = node.features.ncols();
        match kind {
            TransKind::Scaler
            | TransKind::Normalizer
            | TransKind::Discretizer
            | TransKind::LogTransform => node.num_num() >= 1,
            TransKind::ArithmeticCross => node.num_num() >= 2,
            TransKind::CategoricalCross => node.cat_num() >= 2,
            TransKind::OneHotEncoding => node.cat_num() >= 1,
            TransKind::VarianceSelection | TransKind::TreeSelection => n_cols >= 2,
            TransKind::Rebalance => node.task == TaskType::Classification,
        }
    }

    fn build(&self, kind: TransKind) -> Box<dyn Transformer> {
        match kind {
            TransKind::Scaler => Box::new(ScaleTransformation::standard()),
            TransKind::Normalizer => Box::new(ScaleTransformation::min_max()),
            TransKind::Discretizer => {
                Box::new(KBinsDiscretizer::new(self.n_bins, BinningStrategy::Quantile))
            }
            TransKind::LogTransform => Box::new(LogTransformation::new()),
            TransKind::ArithmeticCross => Box::new(
                PolynomialTransformation::new().with_max_output_columns(self.max_cross_columns),
            ),
            TransKind::CategoricalCross => Box::new(
                PolynomialTransformation::categorical()
                    .with_max_output_columns(self.max_cross_columns),
            ),
            TransKind::OneHotEncoding => {
                Box::new(OneHotTransformation::new(self.max_one_hot_categories))
            }
            TransKind::VarianceSelection => Box::new(VarianceSelector::default()),
            TransKind::TreeSelection => {
                Box::new(ExtraTreeBasedSelector::new(self.selector_estimators, self.seed))
            }
            TransKind::Rebalance => Box::new(RandomOverSampling::new(self.seed)),
        }
    }
}

impl TransformationCatalog for TransformerManager {
    fn get_transformations(
        &self,
        node: &DataNode,
        trans_kinds: &[TransKind],
    ) -> Result<Vec<Box<dyn Transformer>>> {
        let (n_rows, n_cols) = node.shape();
        if n_rows == 0 || n_cols == 0 {
            return Err(KolosalError::CatalogError(format!(
                "node has an empty feature matrix ({}x{})",
                n_rows, n_cols
            )));
        }
        if node.feature_types.len() != n_cols || node.feature_names.len() != n_cols {
            return Err(KolosalError::CatalogError(format!(
                "feature metadata covers {} types / {} names for {} columns",
                node.feature_types.len(),
                node.feature_names.len(),
                n_cols
            )));
        }

        // Canonical order, independent of how the caller lists the kinds
        Ok(TransKind::SEARCHABLE
            .iter()
            .copied()
            .filter(|kind| trans_kinds.contains(kind))
            .filter(|&kind| self.applicable(node, kind))
            .map(|kind| self.build(kind))
            .collect())
    }
}

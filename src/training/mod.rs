//! Models used to score and select representations
//!
//! - [`ExtraTrees`] backs both the tree-importance feature selector and the
//!   built-in holdout evaluator
//! - [`Metric`] computes the validation score a representation receives

pub mod extra_trees;
mod metrics;

pub use extra_trees::ExtraTrees;
pub use metrics::Metric;

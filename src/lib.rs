//! Kolosal AutoFE - evaluation-driven feature engineering
//!
//! Searches chains of feature transformations for the representation of a
//! tabular dataset that maximizes a caller-supplied score.
//!
//! # Modules
//!
//! - [`data`] - Representation nodes and CSV loading
//! - [`transformers`] - Transformation operators (scaling, crossing, selection, ...)
//! - [`catalog`] - Which operators apply to a node
//! - [`graph`] - Append-only transformation graph
//! - [`evaluator`] - Scoring of representations
//! - [`optimizer`] - Beam search, budget and post-processing
//! - [`training`] - Extra-trees models and metrics used by evaluation and selection
//! - [`config`] - Search configuration
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use kolosal_autofe::prelude::*;
//!
//! let root = DataLoader::new().load_node("train.csv", "label", TaskType::Classification)?;
//! let config = SearchConfig::default().with_max_evaluations(100);
//! let result = search(root, &HoldoutEvaluator::default(), config)?;
//! println!("{:.4} via {:?}", result.best_score(), result.best_path());
//! # Ok::<(), kolosal_autofe::KolosalError>(())
//! ```

pub mod error;

pub mod config;
pub mod data;
pub mod transformers;
pub mod training;

pub mod catalog;
pub mod graph;
pub mod evaluator;
pub mod optimizer;

pub mod cli;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{KolosalError, Result};

    pub use crate::config::SearchConfig;
    pub use crate::data::{DataLoader, DataNode, FeatureType, TaskType};
    pub use crate::transformers::{TransKind, Transformer};
    pub use crate::catalog::{TransformationCatalog, TransformerManager};
    pub use crate::graph::{NodeId, TransformationGraph};
    pub use crate::evaluator::{Evaluator, HoldoutConfig, HoldoutEvaluator};
    pub use crate::optimizer::{search, EvaluationBasedOptimizer, SearchResult};
}

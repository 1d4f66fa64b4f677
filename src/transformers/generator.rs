//! Pairwise feature crossing

use super::{ColumnSet, TransKind, Transformer};
use crate::data::{DataNode, FeatureType};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How two columns are combined into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundMode {
    /// a * b
    Multiply,
    /// Joint category of (a, b), relabelled in first-appearance order
    Concatenate,
}

impl CompoundMode {
    fn symbol(&self) -> &'static str {
        match self {
            CompoundMode::Multiply => "*",
            CompoundMode::Concatenate => "&",
        }
    }
}

/// Crosses every pair of columns of `input_type` and appends the results
///
/// With [`CompoundMode::Multiply`] over numerical inputs this is the
/// arithmetic crossing used during search. With [`CompoundMode::Concatenate`]
/// over categorical inputs it synthesises combined categorical features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialTransformation {
    compound_mode: CompoundMode,
    input_type: FeatureType,
    output_type: FeatureType,
    /// Keep the source columns in the output
    include_original: bool,
    /// Refuse to build wider outputs than this
    max_output_columns: usize,
    name: String,
}

impl Default for PolynomialTransformation {
    fn default() -> Self {
        Self::new()
    }
}

impl PolynomialTransformation {
    /// Numerical products, originals kept
    pub fn new() -> Self {
        Self {
            compound_mode: CompoundMode::Multiply,
            input_type: FeatureType::Numerical,
            output_type: FeatureType::Numerical,
            include_original: true,
            max_output_columns: 512,
            name: "polynomial_cross".to_string(),
        }
    }

    /// Categorical concatenation crossing
    pub fn categorical() -> Self {
        Self::new()
            .with_compound_mode(CompoundMode::Concatenate)
            .with_input_type(FeatureType::Categorical)
            .with_output_type(FeatureType::Categorical)
    }

    pub fn with_compound_mode(mut self, mode: CompoundMode) -> Self {
        self.compound_mode = mode;
        self.name = match mode {
            CompoundMode::Multiply => "polynomial_cross",
            CompoundMode::Concatenate => "categorical_cross",
        }
        .to_string();
        self
    }

    pub fn with_input_type(mut self, ftype: FeatureType) -> Self {
        self.input_type = ftype;
        self
    }

    pub fn with_output_type(mut self, ftype: FeatureType) -> Self {
        self.output_type = ftype;
        self
    }

    pub fn with_original(mut self, include: bool) -> Self {
        self.include_original = include;
        self
    }

    pub fn with_max_output_columns(mut self, n: usize) -> Self {
        self.max_output_columns = n.max(1);
        self
    }

    pub fn compound_mode(&self) -> CompoundMode {
        self.compound_mode
    }

    fn cross(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        match self.compound_mode {
            CompoundMode::Multiply => a.iter().zip(b).map(|(x, y)| x * y).collect(),
            CompoundMode::Concatenate => {
                let mut mapping: HashMap<(u64, u64), usize> = HashMap::new();
                a.iter()
                    .zip(b)
                    .map(|(x, y)| {
                        let next = mapping.len();
                        *mapping.entry((x.to_bits(), y.to_bits())).or_insert(next) as f64
                    })
                    .collect()
            }
        }
    }
}

impl Transformer for PolynomialTransformation {
    fn kind(&self) -> TransKind {
        match self.compound_mode {
            CompoundMode::Multiply => TransKind::ArithmeticCross,
            CompoundMode::Concatenate => TransKind::CategoricalCross,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn operate(&self, node: &DataNode) -> Result<DataNode> {
        let inputs: Vec<usize> = match self.input_type {
            FeatureType::Numerical => node.numerical_columns(),
            FeatureType::Categorical => node.categorical_columns(),
        };
        if inputs.len() < 2 {
            return Err(KolosalError::ValueError(format!(
                "{}: needs at least two {:?} columns, found {}",
                self.name,
                self.input_type,
                inputs.len()
            )));
        }

        let n_pairs = inputs.len() * (inputs.len() - 1) / 2;
        let n_output = n_pairs + if self.include_original { node.features.ncols() } else { 0 };
        if n_output > self.max_output_columns {
            return Err(KolosalError::MemoryError(format!(
                "{}: {} output columns exceeds limit {}",
                self.name, n_output, self.max_output_columns
            )));
        }

        let mut out = ColumnSet::new();
        if self.include_original {
            for col in 0..node.features.ncols() {
                out.keep(node, col);
            }
        }

        let sym = self.compound_mode.symbol();
        for (pos, &i) in inputs.iter().enumerate() {
            let a = node.features.column(i).to_vec();
            for &j in &inputs[pos + 1..] {
                let b = node.features.column(j).to_vec();
                out.push(
                    self.cross(&a, &b),
                    self.output_type,
                    format!("{}{}{}", node.feature_names[i], sym, node.feature_names[j]),
                );
            }
        }
        debug_assert_eq!(out.len(), n_output);

        out.into_node(node)
    }
}

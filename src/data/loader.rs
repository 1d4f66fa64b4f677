//! Loading tabular data into a root representation

use crate::data::{DataNode, FeatureType, TaskType};
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const MISSING_CATEGORY: &str = "__missing__";

/// Per-column description produced by [`DataLoader::describe`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub feature_type: FeatureType,
    /// Distinct values (categorical) or `None`
    pub n_categories: Option<usize>,
}

/// Dataset description for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSummary {
    pub n_rows: usize,
    pub target: String,
    pub task: TaskType,
    pub columns: Vec<ColumnSummary>,
}

/// Reads CSV files and converts them into a [`DataNode`]
///
/// Numeric columns become numerical features with nulls replaced by the column
/// mean. Everything else is label-encoded in first-appearance order and typed
/// categorical.
pub struct DataLoader {
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Rows scanned to infer column dtypes
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n.max(1);
        self
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(KolosalError::DataError(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Ok(df)
    }

    /// Load a CSV file straight into a root node
    pub fn load_node(&self, path: impl AsRef<Path>, target: &str, task: TaskType) -> Result<DataNode> {
        let df = self.load_csv(path)?;
        self.from_dataframe(&df, target, task)
    }

    /// Convert a data frame into a root node
    pub fn from_dataframe(&self, df: &DataFrame, target: &str, task: TaskType) -> Result<DataNode> {
        let n_rows = df.height();
        if n_rows == 0 {
            return Err(KolosalError::DataError("dataset has no rows".to_string()));
        }

        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        if !names.iter().any(|n| n == target) {
            return Err(KolosalError::DataError(format!("target column not found: {}", target)));
        }

        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut feature_types = Vec::new();
        let mut feature_names = Vec::new();

        for name in names.iter().filter(|n| n.as_str() != target) {
            let series = df.column(name)?.as_materialized_series();
            if is_numeric(series.dtype()) {
                columns.push(numeric_values(series)?);
                feature_types.push(FeatureType::Numerical);
            } else {
                let (codes, _) = label_encode(series)?;
                columns.push(codes);
                feature_types.push(FeatureType::Categorical);
            }
            feature_names.push(name.clone());
        }

        if columns.is_empty() {
            return Err(KolosalError::DataError("dataset has no feature columns".to_string()));
        }

        let target_series = df.column(target)?.as_materialized_series();
        let target_values = match task {
            TaskType::Classification => label_encode(target_series)?.0,
            TaskType::Regression if is_numeric(target_series.dtype()) => numeric_values(target_series)?,
            TaskType::Regression => {
                return Err(KolosalError::DataError(format!(
                    "regression target {} is not numeric",
                    target
                )))
            }
        };

        let n_cols = columns.len();
        let mut features = Array2::zeros((n_rows, n_cols));
        for (j, col) in columns.iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                features[[i, j]] = v;
            }
        }

        DataNode::new(features, Array1::from_vec(target_values), feature_types, task)?
            .with_feature_names(feature_names)
    }

    /// Describe column typing the way [`DataLoader::from_dataframe`] sees it
    pub fn describe(&self, df: &DataFrame, target: &str, task: TaskType) -> Result<DataSummary> {
        let mut columns = Vec::new();
        for name in df.get_column_names() {
            if name.as_str() == target {
                continue;
            }
            let series = df.column(name.as_str())?.as_materialized_series();
            let summary = if is_numeric(series.dtype()) {
                ColumnSummary {
                    name: name.to_string(),
                    feature_type: FeatureType::Numerical,
                    n_categories: None,
                }
            } else {
                let (_, n_categories) = label_encode(series)?;
                ColumnSummary {
                    name: name.to_string(),
                    feature_type: FeatureType::Categorical,
                    n_categories: Some(n_categories),
                }
            };
            columns.push(summary);
        }

        Ok(DataSummary {
            n_rows: df.height(),
            target: target.to_string(),
            task,
            columns,
        })
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = casted.f64()?.into_iter().collect();

    let present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let mean = if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    };

    Ok(values
        .into_iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => x,
            _ => mean,
        })
        .collect())
}

/// Returns the codes and the number of distinct categories
fn label_encode(series: &Series) -> Result<(Vec<f64>, usize)> {
    let casted = series.cast(&DataType::String)?;
    let mut mapping: HashMap<String, usize> = HashMap::new();
    let mut codes = Vec::with_capacity(casted.len());

    for value in casted.str()?.into_iter() {
        let key = value.unwrap_or(MISSING_CATEGORY).to_string();
        let next = mapping.len();
        let code = *mapping.entry(key).or_insert(next);
        codes.push(code as f64);
    }

    Ok((codes, mapping.len()))
}

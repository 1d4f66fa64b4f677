//! Extremely randomized trees
//!
//! Each split draws a random subset of features and a uniform random
//! threshold per feature, keeping the candidate with the lowest weighted
//! impurity. Trees are fitted in parallel with one seeded ChaCha stream per
//! tree, so a fixed `random_state` gives identical forests regardless of the
//! thread count. Class votes go through ordered maps so ties resolve to the
//! smallest class code.

use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Growth limits shared by every tree of a forest
#[derive(Debug, Clone, Copy)]
struct Growth {
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    classification: bool,
}

/// One fitted tree plus the impurity decrease it attributes to each feature
struct FittedTree {
    root: Node,
    importances: Vec<f64>,
}

/// Extra Trees ensemble (classifier or regressor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTrees {
    trees: Vec<Node>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split, `None` for sqrt (classification) or all (regression)
    pub max_features: Option<usize>,
    pub random_state: u64,
    classification: bool,
    n_features: usize,
    importances: Option<Array1<f64>>,
}

impl ExtraTrees {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self::new(n_estimators, true)
    }

    pub fn new_regressor(n_estimators: usize) -> Self {
        Self::new(n_estimators, false)
    }

    fn new(n_estimators: usize, classification: bool) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: Some(12),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 1,
            classification,
            n_features: 0,
            importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_max_features(mut self, mf: usize) -> Self {
        self.max_features = Some(mf);
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn growth(&self, n_features: usize) -> Growth {
        let max_features = match self.max_features {
            Some(mf) => mf.clamp(1, n_features),
            None if self.classification => ((n_features as f64).sqrt().ceil() as usize).max(1),
            None => n_features,
        };
        Growth {
            max_features,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
            classification: self.classification,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(KolosalError::ValueError(format!(
                "cannot fit extra trees on a {}x{} matrix",
                n_samples, n_features
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(KolosalError::ValueError(
                "input contains NaN or infinite values".to_string(),
            ));
        }

        let growth = self.growth(n_features);
        let indices: Vec<usize> = (0..n_samples).collect();
        let seed = self.random_state;

        // No bootstrap: every tree sees the full sample set
        let fitted: Vec<FittedTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let mut importances = vec![0.0; n_features];
                let root = build(x, y, &indices, &growth, 0, &mut rng, &mut importances);
                FittedTree { root, importances }
            })
            .collect();

        let mut total = vec![0.0; n_features];
        for tree in &fitted {
            for (acc, v) in total.iter_mut().zip(&tree.importances) {
                *acc += v;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }

        self.trees = fitted.into_iter().map(|t| t.root).collect();
        self.n_features = n_features;
        self.importances = Some(Array1::from_vec(total));
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(KolosalError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(KolosalError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample = row.to_vec();
                if self.classification {
                    let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
                    for tree in &self.trees {
                        *votes.entry(tree.predict(&sample).round() as i64).or_insert(0) += 1;
                    }
                    majority(&votes)
                } else {
                    self.trees.iter().map(|t| t.predict(&sample)).sum::<f64>() / self.trees.len() as f64
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Normalised total impurity decrease per feature
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.importances.as_ref()
    }
}

/// Highest vote count, smallest class on ties
fn majority(counts: &BTreeMap<i64, usize>) -> f64 {
    let mut best: Option<(i64, usize)> = None;
    for (&class, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((class, count));
        }
    }
    best.map(|(class, _)| class as f64).unwrap_or(0.0)
}

fn impurity(y: &Array1<f64>, indices: &[usize], classification: bool) -> f64 {
    let n = indices.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    if classification {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for &i in indices {
            *counts.entry(y[i].round() as i64).or_insert(0) += 1;
        }
        1.0 - counts.values().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
    } else {
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n;
        indices.iter().map(|&i| (y[i] - mean).powi(2)).sum::<f64>() / n
    }
}

fn leaf_value(y: &Array1<f64>, indices: &[usize], classification: bool) -> f64 {
    if classification {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for &i in indices {
            *counts.entry(y[i].round() as i64).or_insert(0) += 1;
        }
        majority(&counts)
    } else {
        indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len().max(1) as f64
    }
}

fn build(
    x: &Array2<f64>,
    y: &Array1<f64>,
    indices: &[usize],
    growth: &Growth,
    depth: usize,
    rng: &mut ChaCha8Rng,
    importances: &mut [f64],
) -> Node {
    let n = indices.len();
    let node_impurity = impurity(y, indices, growth.classification);

    if n < growth.min_samples_split
        || growth.max_depth.map_or(false, |d| depth >= d)
        || node_impurity < 1e-15
    {
        return Node::Leaf { value: leaf_value(y, indices, growth.classification) };
    }

    // Partial Fisher-Yates over the feature ids
    let n_features = x.ncols();
    let mut features: Vec<usize> = (0..n_features).collect();
    for i in 0..growth.max_features {
        let j = rng.gen_range(i..n_features);
        features.swap(i, j);
    }
    features.truncate(growth.max_features);

    let mut best: Option<(usize, f64, f64)> = None;
    for &f in &features {
        let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            (lo.min(x[[i, f]]), hi.max(x[[i, f]]))
        });
        if hi - lo < 1e-15 {
            continue;
        }
        let threshold = rng.gen_range(lo..hi);

        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, f]] <= threshold);
        if left.len() < growth.min_samples_leaf || right.len() < growth.min_samples_leaf {
            continue;
        }

        let weighted = (left.len() as f64 * impurity(y, &left, growth.classification)
            + right.len() as f64 * impurity(y, &right, growth.classification))
            / n as f64;
        if best.map_or(true, |(_, _, s)| weighted < s) {
            best = Some((f, threshold, weighted));
        }
    }

    let Some((feature, threshold, child_impurity)) = best else {
        return Node::Leaf { value: leaf_value(y, indices, growth.classification) };
    };

    importances[feature] += n as f64 * (node_impurity - child_impurity);

    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&i| x[[i, feature]] <= threshold);
    Node::Split {
        feature,
        threshold,
        left: Box::new(build(x, y, &left, growth, depth + 1, rng, importances)),
        right: Box::new(build(x, y, &right, growth, depth + 1, rng, importances)),
    }
}

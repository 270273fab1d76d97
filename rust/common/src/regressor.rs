//! Regressors that can be loaded from a model bundle.
//!
//! Two families are supported:
//! - [`LinearModel`]: intercept plus a dot product with the feature row
//! - [`TreeEnsemble`]: boosted (summed) or bagged (averaged) regression trees
//!
//! Trees use a struct-of-arrays layout. A node whose left child is `0` is a
//! leaf; the root is never anyone's child, so `0` is free as a marker.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, PredictError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

impl Regressor {
    pub fn kind(&self) -> &'static str {
        match self {
            Regressor::Linear(_) => "linear",
            Regressor::TreeEnsemble(_) => "tree_ensemble",
        }
    }

    /// Checks the model is usable with rows of `n_features` columns.
    pub fn validate(&self, n_features: usize) -> Result<(), BundleError> {
        match self {
            Regressor::Linear(model) => model.validate(n_features),
            Regressor::TreeEnsemble(ensemble) => ensemble.validate(n_features),
        }
    }

    /// Predicts one value per row. The model must have passed [`Regressor::validate`]
    /// for the row width.
    pub fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, PredictError> {
        match self {
            Regressor::Linear(model) => model.predict(rows),
            Regressor::TreeEnsemble(ensemble) => ensemble.predict(rows),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    fn validate(&self, n_features: usize) -> Result<(), BundleError> {
        if self.coefficients.len() != n_features {
            return Err(BundleError::InvalidModel(format!(
                "linear model has {} coefficients for {} features",
                self.coefficients.len(),
                n_features
            )));
        }
        Ok(())
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, PredictError> {
        if rows.ncols() != self.coefficients.len() {
            return Err(PredictError::Shape {
                expected: self.coefficients.len(),
                actual: rows.ncols(),
            });
        }
        let weights = ArrayView1::from(self.coefficients.as_slice());
        Ok(rows.dot(&weights) + self.intercept)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Gradient boosting: leaf values add up.
    Sum,
    /// Random forest: leaf values are averaged.
    Mean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    fn validate(&self, n_features: usize) -> Result<(), BundleError> {
        if self.aggregation == Aggregation::Mean && self.trees.is_empty() {
            return Err(BundleError::InvalidModel(
                "averaged ensemble has no trees".to_string(),
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|reason| BundleError::InvalidModel(format!("tree {index}: {reason}")))?;
        }
        Ok(())
    }

    /// Smallest row width every split can index into.
    fn required_features(&self) -> usize {
        self.trees
            .iter()
            .map(Tree::required_features)
            .max()
            .unwrap_or(0)
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, PredictError> {
        let required = self.required_features();
        if rows.ncols() < required {
            return Err(PredictError::Shape {
                expected: required,
                actual: rows.ncols(),
            });
        }
        Ok(rows
            .rows()
            .into_iter()
            .map(|row| {
                let total: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
                match self.aggregation {
                    Aggregation::Sum => self.base_score + total,
                    Aggregation::Mean => self.base_score + total / self.trees.len() as f64,
                }
            })
            .collect())
    }
}

/// Single regression tree.
///
/// A sample goes left when `feature <= threshold`. NaN features follow
/// `default_left`, which defaults to left for every node when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub split_indices: Vec<u32>,
    pub thresholds: Vec<f64>,
    pub children_left: Vec<u32>,
    pub children_right: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_left: Vec<bool>,
    pub values: Vec<f64>,
}

impl Tree {
    pub fn n_nodes(&self) -> usize {
        self.values.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == 0
    }

    fn required_features(&self) -> usize {
        (0..self.children_left.len())
            .filter(|&node| !self.is_leaf(node))
            .filter_map(|node| self.split_indices.get(node))
            .map(|&feature| feature as usize + 1)
            .max()
            .unwrap_or(0)
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err("tree has no nodes".to_string());
        }
        let lengths = [
            ("split_indices", self.split_indices.len()),
            ("thresholds", self.thresholds.len()),
            ("children_left", self.children_left.len()),
            ("children_right", self.children_right.len()),
        ];
        for (name, len) in lengths {
            if len != n_nodes {
                return Err(format!("{name} has {len} entries, expected {n_nodes}"));
            }
        }
        if !self.default_left.is_empty() && self.default_left.len() != n_nodes {
            return Err(format!(
                "default_left has {} entries, expected {n_nodes}",
                self.default_left.len()
            ));
        }

        for node in 0..n_nodes {
            if self.is_leaf(node) {
                continue;
            }
            let feature = self.split_indices[node] as usize;
            if feature >= n_features {
                return Err(format!(
                    "node {node} splits on feature {feature}, model has {n_features}"
                ));
            }
            // Children must come after their parent, which rules out cycles.
            for child in [self.children_left[node], self.children_right[node]] {
                let child = child as usize;
                if child <= node || child >= n_nodes {
                    return Err(format!("node {node} has invalid child {child}"));
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `row`.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            let value = row[self.split_indices[node] as usize];
            let go_left = if value.is_nan() {
                self.default_left.get(node).copied().unwrap_or(true)
            } else {
                value <= self.thresholds[node]
            };
            let next = if go_left {
                self.children_left[node]
            } else {
                self.children_right[node]
            };
            node = next as usize;
        }
        self.values[node]
    }
}

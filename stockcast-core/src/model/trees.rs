//! Gradient-boosted regression tree ensemble, inference only.
//!
//! Trees are flat node arrays rooted at index 0. A split sends `x < threshold`
//! left and everything else right; a missing (NaN) input follows
//! `default_left`. The prediction is `base_score` plus the sum of leaf values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_true")]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Check that the node array is a well-formed tree over `n_inputs` inputs.
    ///
    /// Children must point strictly forward, which rules out cycles.
    pub fn validate(&self, n_inputs: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_inputs {
                        return Err(format!(
                            "node {i} splits on input {feature}, only {n_inputs} available"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= len {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} has non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `inputs`. Assumes a validated tree.
    pub fn eval(&self, inputs: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = inputs[feature];
                    idx = if x.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn validate(&self, n_inputs: usize) -> Result<(), String> {
        if !self.base_score.is_finite() {
            return Err("non-finite base_score".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_inputs).map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    pub fn eval(&self, inputs: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.eval(inputs)).sum::<f64>()
    }
}

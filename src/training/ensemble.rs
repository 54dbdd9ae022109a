//! Regression tree ensemble: storage layout, traversal and importance.
//!
//! Trees are flat node arrays rooted at index 0. Children are always stored
//! after their parent, which keeps traversal acyclic for any artefact that
//! passes [`Ensemble::validate`].

use serde::{Deserialize, Serialize};

use crate::common::error::PredictionError;

/// One tree node. Rows with `value < threshold` descend left.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Loss reduction achieved by this split.
        gain: f64,
        /// Hessian sum of the rows that reached the node.
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// A single-leaf tree.
    pub fn leaf(value: f64, cover: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value, cover }],
        }
    }

    /// Walk the tree using `feature_at` to read row values. Returns `None` when
    /// a node index is out of range.
    pub fn predict_with<F>(&self, feature_at: F) -> Option<f64>
    where
        F: Fn(usize) -> f64,
    {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx)? {
                Node::Leaf { value, .. } => return Some(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if feature_at(*feature) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Additive tree ensemble with a constant base score.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl Ensemble {
    /// Raw (unrounded) prediction for one feature row.
    pub fn predict(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut total = self.base_score;
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            total += tree
                .predict_with(|feature| row.get(feature).copied().unwrap_or(f64::NAN))
                .ok_or(PredictionError::BrokenTree {
                    tree: tree_idx,
                    node: tree.nodes.len(),
                })?;
        }
        if total.is_finite() {
            Ok(total)
        } else {
            Err(PredictionError::NonFiniteOutput)
        }
    }

    /// Structural checks run on every loaded artefact.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if !self.base_score.is_finite() {
            return Err("base score is not finite".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {tree_idx} has no nodes"));
            }
            for (idx, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Leaf { value, .. } => {
                        if !value.is_finite() {
                            return Err(format!("tree {tree_idx} leaf {idx} is not finite"));
                        }
                    }
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= n_features {
                            return Err(format!(
                                "tree {tree_idx} node {idx} splits on feature {feature} of {n_features}"
                            ));
                        }
                        if threshold.is_nan() {
                            return Err(format!("tree {tree_idx} node {idx} has a NaN threshold"));
                        }
                        let len = tree.nodes.len();
                        if *left <= idx || *right <= idx || *left >= len || *right >= len {
                            return Err(format!(
                                "tree {tree_idx} node {idx} has invalid children {left}/{right}"
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Average split gain per feature, normalised to sum to one. Features that
    /// never split score zero.
    pub fn gain_importance(&self, n_features: usize) -> Vec<f64> {
        let mut gain = vec![0.0; n_features];
        let mut splits = vec![0usize; n_features];
        for node in self.trees.iter().flat_map(|tree| tree.nodes.iter()) {
            if let Node::Split {
                feature, gain: g, ..
            } = node
            {
                if *feature < n_features {
                    gain[*feature] += g;
                    splits[*feature] += 1;
                }
            }
        }

        let average: Vec<f64> = gain
            .iter()
            .zip(&splits)
            .map(|(g, &n)| if n == 0 { 0.0 } else { g / n as f64 })
            .collect();
        let total: f64 = average.iter().sum();
        if total > 0.0 {
            average.iter().map(|a| a / total).collect()
        } else {
            average
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64, gain: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    gain,
                    cover: 2.0,
                },
                Node::Leaf { value: left, cover: 1.0 },
                Node::Leaf { value: right, cover: 1.0 },
            ],
        }
    }

    #[test]
    fn traversal_follows_strict_less_than() {
        let tree = stump(0, 2.0, -1.0, 1.0, 1.0);
        assert_eq!(tree.predict_with(|_| 1.999), Some(-1.0));
        assert_eq!(tree.predict_with(|_| 2.0), Some(1.0));
    }

    #[test]
    fn ensemble_adds_trees_to_base_score() {
        let ensemble = Ensemble {
            base_score: 100.0,
            trees: vec![stump(0, 2.0, -1.0, 1.0, 1.0), stump(1, 5.0, 0.5, 3.0, 1.0)],
        };
        assert_eq!(ensemble.predict(&[1.0, 9.0]).unwrap(), 102.0);
        assert_eq!(ensemble.predict(&[3.0, 0.0]).unwrap(), 101.5);
    }

    #[test]
    fn dangling_child_is_reported() {
        let ensemble = Ensemble {
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 1,
                    right: 2,
                    gain: 1.0,
                    cover: 1.0,
                }],
            }],
        };
        assert!(ensemble.validate(1).is_err());
        assert!(matches!(
            ensemble.predict(&[0.0]),
            Err(PredictionError::BrokenTree { tree: 0, .. })
        ));
    }

    #[test]
    fn backwards_child_is_rejected() {
        let ensemble = Ensemble {
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Leaf { value: 0.0, cover: 1.0 },
                    Node::Split {
                        feature: 0,
                        threshold: 1.0,
                        left: 0,
                        right: 0,
                        gain: 1.0,
                        cover: 1.0,
                    },
                ],
            }],
        };
        assert!(ensemble.validate(1).is_err());
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let ensemble = Ensemble {
            base_score: 0.0,
            trees: vec![stump(4, 1.0, 0.0, 0.0, 1.0)],
        };
        assert!(ensemble.validate(3).is_err());
        assert!(ensemble.validate(5).is_ok());
    }

    #[test]
    fn importance_averages_gain_per_split() {
        let ensemble = Ensemble {
            base_score: 0.0,
            trees: vec![
                stump(0, 1.0, 0.0, 0.0, 6.0),
                stump(0, 1.0, 0.0, 0.0, 2.0),
                stump(2, 1.0, 0.0, 0.0, 12.0),
            ],
        };
        let importance = ensemble.gain_importance(3);
        assert_eq!(importance, vec![0.25, 0.0, 0.75]);
    }

    #[test]
    fn serialized_nodes_are_tagged() {
        let json = serde_json::to_string(&Tree::leaf(1.5, 3.0)).unwrap();
        assert_eq!(json, r#"{"nodes":[{"kind":"leaf","value":1.5,"cover":3.0}]}"#);
    }

    #[test]
    fn depth_counts_split_levels() {
        assert_eq!(Tree::leaf(0.0, 1.0).depth(), 0);
        assert_eq!(stump(0, 1.0, 0.0, 0.0, 1.0).depth(), 1);
    }
}

//! Gradient boosting with exact greedy split finding.
//!
//! Each round fits one depth-wise tree to the squared-error gradients of the
//! current ensemble. Every feature column is pre-sorted once; each tree level
//! then scans the sorted columns and evaluates every boundary between distinct
//! values for every open node. Row and column subsampling draw from a single
//! seeded generator, so identical inputs and params give identical trees.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::common::error::{ReimburseResult, TrainingDataError};

use super::domain::{BoosterParams, RegularizationParams};
use super::ensemble::{Ensemble, Node, Tree};

/// Splits must improve the loss by more than this to be kept.
const RT_EPS: f64 = 1e-6;
const NO_NODE: usize = usize::MAX;

/// Column-major feature storage.
#[derive(Clone, Debug)]
pub struct FeatureMatrix {
    n_rows: usize,
    columns: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build from row slices. All rows must have the same width as the first.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let n_features = rows.first().map_or(0, |row| row.as_ref().len());
        let mut columns = vec![Vec::with_capacity(rows.len()); n_features];
        for row in rows {
            for (column, value) in columns.iter_mut().zip(row.as_ref()) {
                column.push(*value);
            }
        }
        Self {
            n_rows: rows.len(),
            columns,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, row: usize, feature: usize) -> f64 {
        self.columns[feature][row]
    }
}

/// Squared-error gradient pair.
fn gradient(prediction: f64, label: f64) -> (f64, f64) {
    (prediction - label, 1.0)
}

fn threshold_l1(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

fn leaf_score(g: f64, h: f64, reg: &RegularizationParams) -> f64 {
    let denom = h + reg.lambda;
    if denom <= 0.0 {
        return 0.0;
    }
    let t = threshold_l1(g, reg.alpha);
    t * t / denom
}

fn leaf_weight(g: f64, h: f64, reg: &RegularizationParams) -> f64 {
    let denom = h + reg.lambda;
    if denom <= 0.0 {
        return 0.0;
    }
    -threshold_l1(g, reg.alpha) / denom
}

#[derive(Copy, Clone, Debug)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_g: f64,
    left_h: f64,
}

#[derive(Copy, Clone, Debug, Default)]
struct ScanState {
    g: f64,
    h: f64,
    last: Option<f64>,
}

/// Per-tree inputs that stay fixed while the tree grows.
struct TreeBuilder<'a> {
    x: &'a FeatureMatrix,
    sorted: &'a [Vec<usize>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoosterParams,
}

impl TreeBuilder<'_> {
    fn build(&self, in_sample: &[bool], columns: &[usize]) -> Tree {
        let n = self.x.n_rows();
        let reg = &self.params.regularization;
        let mut position = vec![NO_NODE; n];
        let (mut g0, mut h0) = (0.0, 0.0);
        for row in (0..n).filter(|&row| in_sample[row]) {
            position[row] = 0;
            g0 += self.grad[row];
            h0 += self.hess[row];
        }
        if h0 <= 0.0 {
            return Tree::leaf(0.0, 0.0);
        }

        let mut nodes = vec![Node::Leaf { value: 0.0, cover: h0 }];
        let mut stats = vec![(g0, h0)];
        let mut frontier = vec![0usize];

        for depth in 0..=self.params.tree.max_depth {
            if frontier.is_empty() {
                break;
            }
            let best = if depth < self.params.tree.max_depth {
                self.find_splits(&position, &stats, &frontier, columns)
            } else {
                vec![None; nodes.len()]
            };

            let mut next = Vec::with_capacity(frontier.len() * 2);
            for &node in &frontier {
                let (g, h) = stats[node];
                match best[node] {
                    Some(split) => {
                        let left = nodes.len();
                        let right = left + 1;
                        nodes.push(Node::Leaf { value: 0.0, cover: split.left_h });
                        nodes.push(Node::Leaf { value: 0.0, cover: h - split.left_h });
                        stats.push((split.left_g, split.left_h));
                        stats.push((g - split.left_g, h - split.left_h));
                        nodes[node] = Node::Split {
                            feature: split.feature,
                            threshold: split.threshold,
                            left,
                            right,
                            gain: split.gain,
                            cover: h,
                        };
                        next.push(left);
                        next.push(right);
                    }
                    None => {
                        nodes[node] = Node::Leaf {
                            value: self.params.learning_rate * leaf_weight(g, h, reg),
                            cover: h,
                        };
                    }
                }
            }

            for row in 0..n {
                let node = position[row];
                if node == NO_NODE {
                    continue;
                }
                position[row] = match nodes[node] {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        ..
                    } => {
                        if self.x.value(row, feature) < threshold {
                            left
                        } else {
                            right
                        }
                    }
                    Node::Leaf { .. } => NO_NODE,
                };
            }
            frontier = next;
        }

        Tree { nodes }
    }

    /// Best split per open node, indexed by node id.
    fn find_splits(
        &self,
        position: &[usize],
        stats: &[(f64, f64)],
        frontier: &[usize],
        columns: &[usize],
    ) -> Vec<Option<SplitCandidate>> {
        let reg = &self.params.regularization;
        let min_child = self.params.tree.min_child_weight;
        let min_gain = self.params.tree.min_split_loss.max(RT_EPS);

        let mut open = vec![false; stats.len()];
        for &node in frontier {
            open[node] = true;
        }
        let parent_score: Vec<f64> = stats
            .iter()
            .map(|&(g, h)| leaf_score(g, h, reg))
            .collect();
        let mut best: Vec<Option<SplitCandidate>> = vec![None; stats.len()];

        for &feature in columns {
            let mut scan = vec![ScanState::default(); stats.len()];
            for &row in &self.sorted[feature] {
                let node = position[row];
                if node == NO_NODE || !open[node] {
                    continue;
                }
                let value = self.x.value(row, feature);
                if value.is_nan() {
                    continue;
                }
                let state = &mut scan[node];
                if let Some(last) = state.last {
                    if value > last {
                        let (g, h) = stats[node];
                        let (left_g, left_h) = (state.g, state.h);
                        let right_h = h - left_h;
                        if left_h >= min_child && right_h >= min_child {
                            let gain = leaf_score(left_g, left_h, reg)
                                + leaf_score(g - left_g, right_h, reg)
                                - parent_score[node];
                            let improves = best[node].map_or(true, |current| gain > current.gain);
                            if gain > min_gain && improves {
                                let mut threshold = (last + value) * 0.5;
                                if threshold <= last {
                                    threshold = value;
                                }
                                best[node] = Some(SplitCandidate {
                                    feature,
                                    threshold,
                                    gain,
                                    left_g,
                                    left_h,
                                });
                            }
                        }
                    }
                }
                state.g += self.grad[row];
                state.h += self.hess[row];
                state.last = Some(value);
            }
        }

        best
    }
}

fn presort(x: &FeatureMatrix) -> Vec<Vec<usize>> {
    (0..x.n_features())
        .map(|feature| {
            let mut order: Vec<usize> = (0..x.n_rows()).collect();
            order.sort_by(|&a, &b| x.value(a, feature).total_cmp(&x.value(b, feature)));
            order
        })
        .collect()
}

fn sample_rows(rng: &mut StdRng, n_rows: usize, fraction: f64) -> Vec<bool> {
    if fraction >= 1.0 {
        return vec![true; n_rows];
    }
    (0..n_rows).map(|_| rng.gen::<f64>() < fraction).collect()
}

fn sample_columns(rng: &mut StdRng, n_features: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n_features).collect();
    }
    let k = ((fraction * n_features as f64) as usize).clamp(1, n_features.max(1));
    let mut picked = index::sample(rng, n_features, k.min(n_features)).into_vec();
    picked.sort_unstable();
    picked
}

fn mean_abs_error(predictions: &[f64], labels: &[f64]) -> f64 {
    let total: f64 = predictions
        .iter()
        .zip(labels)
        .map(|(p, y)| (p - y).abs())
        .sum();
    total / labels.len().max(1) as f64
}

/// Fit an ensemble to `labels`. Runs on the calling thread only.
pub fn fit(x: &FeatureMatrix, labels: &[f64], params: &BoosterParams) -> ReimburseResult<Ensemble> {
    params.validate()?;
    let n = x.n_rows();
    if n == 0 || n != labels.len() {
        return Err(TrainingDataError::TooSmall(n).into());
    }

    let base_score = labels.iter().sum::<f64>() / n as f64;
    let sorted = presort(x);
    let mut rng = StdRng::seed_from_u64(params.sampling.seed);
    let mut predictions = vec![base_score; n];
    let mut grad = vec![0.0; n];
    let mut hess = vec![0.0; n];
    let mut trees = Vec::with_capacity(params.rounds);
    let progress_every = (params.rounds / 10).max(1);

    for round in 0..params.rounds {
        for row in 0..n {
            let (g, h) = gradient(predictions[row], labels[row]);
            grad[row] = g;
            hess[row] = h;
        }

        let in_sample = sample_rows(&mut rng, n, params.sampling.subsample);
        let columns = sample_columns(&mut rng, x.n_features(), params.sampling.colsample_bytree);
        let tree = TreeBuilder {
            x,
            sorted: &sorted,
            grad: &grad,
            hess: &hess,
            params,
        }
        .build(&in_sample, &columns);

        for (row, prediction) in predictions.iter_mut().enumerate() {
            *prediction += tree.predict_with(|feature| x.value(row, feature)).unwrap_or(0.0);
        }
        trees.push(tree);

        if (round + 1) % progress_every == 0 {
            debug!(
                round = round + 1,
                rounds = params.rounds,
                train_mae = mean_abs_error(&predictions, labels),
                "boosting progress"
            );
        }
    }

    Ok(Ensemble { base_score, trees })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::domain::{SamplingParams, TreeParams};

    fn plain_params(rounds: usize, learning_rate: f64, max_depth: usize) -> BoosterParams {
        BoosterParams {
            rounds,
            learning_rate,
            tree: TreeParams {
                max_depth,
                min_child_weight: 1.0,
                min_split_loss: 0.0,
            },
            regularization: RegularizationParams {
                alpha: 0.0,
                lambda: 0.0,
            },
            sampling: SamplingParams {
                subsample: 1.0,
                colsample_bytree: 1.0,
                seed: 42,
            },
        }
    }

    #[test]
    fn single_split_lands_on_midpoint() {
        let x = FeatureMatrix::from_rows(&[[1.0], [3.0]]);
        let ensemble = fit(&x, &[0.0, 10.0], &plain_params(1, 1.0, 1)).unwrap();

        assert_eq!(ensemble.base_score, 5.0);
        match &ensemble.trees[0].nodes[0] {
            Node::Split {
                feature,
                threshold,
                gain,
                ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 2.0);
                assert_eq!(*gain, 50.0);
            }
            other => panic!("expected a split, got {other:?}"),
        }
        assert_eq!(ensemble.predict(&[1.0]).unwrap(), 0.0);
        assert_eq!(ensemble.predict(&[3.0]).unwrap(), 10.0);
    }

    #[test]
    fn learns_a_step_function() {
        let rows: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, (i % 3) as f64]).collect();
        let labels: Vec<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 100.0 }).collect();
        let x = FeatureMatrix::from_rows(&rows);

        let mut params = plain_params(200, 0.3, 2);
        params.regularization.lambda = 1.0;
        let ensemble = fit(&x, &labels, &params).unwrap();

        for (row, label) in rows.iter().zip(&labels) {
            let prediction = ensemble.predict(row).unwrap();
            assert!((prediction - label).abs() < 0.5, "{row:?}: {prediction}");
        }
    }

    #[test]
    fn identical_seed_gives_identical_ensemble() {
        let rows: Vec<[f64; 3]> = (0..40)
            .map(|i| [i as f64, ((i * 7) % 11) as f64, ((i * 13) % 5) as f64])
            .collect();
        let labels: Vec<f64> = rows.iter().map(|r| r[0] * 2.0 + r[1] - r[2]).collect();
        let x = FeatureMatrix::from_rows(&rows);
        let params = BoosterParams::default().with_rounds(25);

        let a = fit(&x, &labels, &params).unwrap();
        let b = fit(&x, &labels, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trees.len(), 25);
        assert!(a.trees.iter().all(|tree| tree.depth() <= 8));
    }

    #[test]
    fn constant_labels_produce_leaf_only_trees() {
        let x = FeatureMatrix::from_rows(&[[1.0], [2.0], [3.0]]);
        let ensemble = fit(&x, &[7.0, 7.0, 7.0], &plain_params(3, 0.5, 3)).unwrap();
        assert!(ensemble
            .trees
            .iter()
            .all(|tree| matches!(tree.nodes.as_slice(), [Node::Leaf { .. }])));
        assert_eq!(ensemble.predict(&[2.0]).unwrap(), 7.0);
    }

    #[test]
    fn min_child_weight_blocks_tiny_children() {
        let x = FeatureMatrix::from_rows(&[[1.0], [2.0], [3.0]]);
        let mut params = plain_params(1, 1.0, 2);
        params.tree.min_child_weight = 2.0;
        let ensemble = fit(&x, &[0.0, 0.0, 9.0], &params).unwrap();
        // Any split of three rows leaves one side with a single row.
        assert!(matches!(ensemble.trees[0].nodes.as_slice(), [Node::Leaf { .. }]));
    }

    #[test]
    fn l1_penalty_shrinks_leaf_weights() {
        let reg = RegularizationParams {
            alpha: 1.0,
            lambda: 1.0,
        };
        assert_eq!(leaf_weight(5.0, 1.0, &reg), -2.0);
        assert_eq!(leaf_weight(-0.5, 1.0, &reg), 0.0);
        assert_eq!(leaf_score(-5.0, 1.0, &reg), 8.0);
    }

    #[test]
    fn column_sampling_keeps_the_requested_share() {
        let mut rng = StdRng::seed_from_u64(42);
        let picked = sample_columns(&mut rng, 18, 0.8);
        assert_eq!(picked.len(), 14);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn mismatched_labels_are_rejected() {
        let x = FeatureMatrix::from_rows(&[[1.0], [2.0]]);
        assert!(fit(&x, &[1.0], &plain_params(1, 0.1, 1)).is_err());
    }
}

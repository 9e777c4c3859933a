//! Isolation Forest
//!
//! Unsupervised outlier scoring by random axis-aligned partitioning. Points
//! that are isolated after few splits are anomalous.
//!
//! # Scoring
//! - `score(x) = -2^(-E[h(x)] / c(psi))`, where `h` is the path length in one
//!   tree (plus `c(leaf size)` for unresolved leaves) and `psi` the sub-sample
//!   size. Lower means more anomalous.
//! - The decision offset is the `contamination` percentile of the training
//!   scores, so `decision(x) = score(x) - offset` is negative for roughly that
//!   share of the training corpus.

use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::stats;
use crate::error::{AnalyticsError, Result};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestParameters {
    pub n_estimators: usize,
    /// Upper bound on rows drawn (without replacement) per tree
    pub max_samples: usize,
    /// Expected outlier share in the training data, in (0, 0.5]
    pub contamination: f64,
    pub seed: Option<u64>,
}

impl Default for IsolationForestParameters {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_samples: 256,
            contamination: 0.05,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One isolation tree, nodes stored in an arena with the root at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build<R: Rng>(x: &[Vec<f64>], sample: Vec<usize>, height_limit: usize, rng: &mut R) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, sample, 0, height_limit, rng);
        tree
    }

    fn grow<R: Rng>(
        &mut self,
        x: &[Vec<f64>],
        rows: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut R,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= height_limit || rows.len() <= 1 {
            return id;
        }

        // Only features that still vary inside this node can split it
        let n_features = x[rows[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..n_features)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    (lo.min(x[r][f]), hi.max(x[r][f]))
                });
                (lo < hi).then_some((f, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| x[r][feature] < threshold);

        let left = self.grow(x, left_rows, depth + 1, height_limit, rng);
        let right = self.grow(x, right_rows, depth + 1, height_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Fitted isolation forest. Immutable after `fit`; scoring needs only `&self`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn fit(x: &[Vec<f64>], params: &IsolationForestParameters) -> Result<Self> {
        let n_features = x
            .first()
            .map(Vec::len)
            .ok_or_else(|| AnalyticsError::Model("cannot fit isolation forest on empty data".to_string()))?;
        if let Some(row) = x.iter().find(|row| row.len() != n_features) {
            return Err(AnalyticsError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
        if params.n_estimators == 0 {
            return Err(AnalyticsError::Model("isolation forest needs at least one tree".to_string()));
        }

        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let sample_size = params.max_samples.min(x.len()).max(1);
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..params.n_estimators)
            .map(|_| {
                let sample = index::sample(&mut rng, x.len(), sample_size).into_vec();
                IsolationTree::build(x, sample, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            n_features,
            sample_size,
            offset: 0.0,
        };

        let training_scores: Vec<f64> = x.iter().map(|row| forest.raw_score(row)).collect();
        forest.offset = stats::percentile(&training_scores, params.contamination * 100.0)
            .unwrap_or(-0.5);

        Ok(forest)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn raw_score(&self, row: &[f64]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        let normaliser = average_path_length(self.sample_size).max(f64::EPSILON);
        -(2f64.powf(-mean_path / normaliser))
    }

    /// Anomaly score in [-1, 0); lower is more anomalous
    pub fn score_sample(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(AnalyticsError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(self.raw_score(row))
    }

    /// Score shifted by the contamination offset; negative means outlier
    pub fn decision_function(&self, row: &[f64]) -> Result<f64> {
        Ok(self.score_sample(row)? - self.offset)
    }

    pub fn is_outlier(&self, row: &[f64]) -> Result<bool> {
        Ok(self.decision_function(row)? < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, Normal};

    fn clustered_data(n: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|_| vec![normal.sample(&mut rng), normal.sample(&mut rng)])
            .collect()
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) is a well-known constant of the method
        assert!((average_path_length(256) - 10.24).abs() < 0.01);
    }

    #[test]
    fn test_outlier_scores_lower_than_inlier() {
        let data = clustered_data(500, 7);
        let params = IsolationForestParameters {
            n_estimators: 100,
            seed: Some(42),
            ..Default::default()
        };
        let forest = IsolationForest::fit(&data, &params).unwrap();

        let inlier = forest.score_sample(&[0.0, 0.0]).unwrap();
        let outlier = forest.score_sample(&[8.0, -8.0]).unwrap();
        assert!(outlier < inlier);
        assert!(forest.is_outlier(&[8.0, -8.0]).unwrap());
        assert!(!forest.is_outlier(&[0.0, 0.0]).unwrap());
    }

    #[test]
    fn test_contamination_share_on_training_data() {
        let data = clustered_data(1000, 11);
        let params = IsolationForestParameters {
            n_estimators: 100,
            contamination: 0.05,
            seed: Some(3),
            ..Default::default()
        };
        let forest = IsolationForest::fit(&data, &params).unwrap();

        let flagged = data
            .iter()
            .filter(|row| forest.is_outlier(row).unwrap())
            .count();
        // strictly below the interpolated percentile: close to, never above, 5%
        assert!(flagged >= 40 && flagged <= 50, "flagged {}", flagged);
    }

    #[test]
    fn test_constant_data_does_not_split() {
        let data = vec![vec![1.0, 1.0]; 20];
        let forest = IsolationForest::fit(&data, &IsolationForestParameters::default()).unwrap();
        assert_eq!(forest.n_trees(), 200);
        let score = forest.score_sample(&[1.0, 1.0]).unwrap();
        assert!(score < 0.0 && score >= -1.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(IsolationForest::fit(&[], &IsolationForestParameters::default()).is_err());
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(IsolationForest::fit(&ragged, &IsolationForestParameters::default()).is_err());
    }
}

//! Isolation forest
//!
//! Outliers separate from the bulk of the data in fewer random splits, so a
//! short average path length across the ensemble means a high anomaly score.
//! All randomness comes from the generator handed to [`IsolationForest::fit`]
//! or [`IsolationForest::fit_score`].

use super::scorer::percentile;
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index;
use rand::Rng;

/// Euler–Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation tree node
#[derive(Debug, Clone)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split value; samples `<= threshold` go left
        threshold: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of training samples that reached this leaf
        size: usize,
    },
}

impl IsolationTree {
    /// Grow a tree over the rows in `indices`
    pub fn grow<R: Rng + ?Sized>(
        x: ArrayView2<'_, f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut R,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Only columns that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min, max) = indices.iter().map(|&i| x[[i, feature]]).fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), v| (lo.min(v), hi.max(v)),
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let (feature, min_val, max_val) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(min_val..max_val);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);

        let left = Box::new(Self::grow(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::grow(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Path length of a sample: leaf depth plus the expected remaining depth
    /// of the unbuilt subtree below the leaf
    pub fn path_length(&self, sample: ArrayView1<'_, f64>) -> f64 {
        let mut node = self;
        let mut depth = 0usize;

        loop {
            match node {
                IsolationTree::External { size } => {
                    return depth as f64 + average_path_length(*size);
                }
                IsolationTree::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                    depth += 1;
                }
            }
        }
    }

    /// Maximum depth of the tree
    pub fn depth(&self) -> usize {
        match self {
            IsolationTree::External { .. } => 0,
            IsolationTree::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree
/// of `n` nodes: `c(n) = 2 H(n-1) - 2(n-1)/n`
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

/// Isolation forest anomaly detector
#[derive(Debug, Clone)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Maximum rows sub-sampled per tree
    max_samples: usize,
    /// Expected proportion of outliers
    contamination: f64,
    trees: Vec<IsolationTree>,
    /// Rows per tree used in the last fit
    sample_size: usize,
    /// Score at the contamination quantile of the training data
    offset: Option<f64>,
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            trees: Vec::new(),
            sample_size: 0,
            offset: None,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    /// Rows sub-sampled per tree in the last fit
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Decision offset derived from the contamination ratio
    pub fn offset(&self) -> Option<f64> {
        self.offset
    }

    /// Grow the ensemble on `x`; the offset stays unset until rows are scored
    /// through [`IsolationForest::fit_score`]
    pub fn fit<R: Rng + ?Sized>(&mut self, x: ArrayView2<'_, f64>, rng: &mut R) {
        let n_samples = x.nrows();
        self.trees.clear();
        self.offset = None;
        self.sample_size = self.max_samples.min(n_samples);

        if n_samples == 0 {
            return;
        }

        let max_height = (self.sample_size.max(2) as f64).log2().ceil() as usize;

        self.trees.reserve(self.n_estimators);
        for _ in 0..self.n_estimators {
            let indices = index::sample(rng, n_samples, self.sample_size).into_vec();
            self.trees
                .push(IsolationTree::grow(x, &indices, 0, max_height, rng));
        }
    }

    /// Grow the ensemble on `x` and score its rows in a single pass
    ///
    /// The decision offset is taken from these scores.
    pub fn fit_score<R: Rng + ?Sized>(
        &mut self,
        x: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> Vec<f64> {
        self.fit(x, rng);
        if self.trees.is_empty() {
            return Vec::new();
        }

        let scores = self.score_samples(x);
        self.offset = Some(percentile(&scores, 100.0 * (1.0 - self.contamination)));
        scores
    }

    /// Anomaly score per row in (0, 1]; higher is more anomalous
    ///
    /// `s(x) = 2^(-E[h(x)] / c(sample_size))`
    pub fn score_samples(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![0.0; x.nrows()];
        }

        let normalizer = match average_path_length(self.sample_size) {
            c if c > 0.0 => c,
            _ => 1.0,
        };

        x.rows()
            .into_iter()
            .map(|sample| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(sample))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2.0_f64.powf(-mean_path / normalizer)
            })
            .collect()
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clustered_with_outliers() -> Array2<f64> {
        let mut data = Vec::new();
        for i in 0..50 {
            data.push((i % 10) as f64);
            data.push(((i % 10) + 1) as f64);
        }
        data.extend_from_slice(&[100.0, 100.0]);
        data.extend_from_slice(&[-50.0, -50.0]);
        Array2::from_shape_vec((52, 2), data).unwrap()
    }

    #[test]
    fn test_outliers_score_higher() {
        let x = clustered_with_outliers();
        let mut rng = StdRng::seed_from_u64(42);
        let mut forest = IsolationForest::new().with_n_estimators(50);
        let scores = forest.fit_score(x.view(), &mut rng);

        assert!(scores[50] > scores[0]);
        assert!(scores[51] > scores[0]);
        assert!(scores.iter().all(|s| *s > 0.0 && *s <= 1.0));

        let offset = forest.offset().unwrap();
        assert!(scores[50] >= offset && scores[51] >= offset);
    }

    #[test]
    fn test_fit_score_matches_separate_scoring() {
        let x = clustered_with_outliers();

        let mut single = IsolationForest::new().with_n_estimators(20);
        let combined = single.fit_score(x.view(), &mut StdRng::seed_from_u64(9));

        let mut separate = IsolationForest::new().with_n_estimators(20);
        separate.fit(x.view(), &mut StdRng::seed_from_u64(9));
        assert!(separate.offset().is_none());
        let rescored = separate.score_samples(x.view());

        let bits = |v: &[f64]| v.iter().map(|s| s.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&combined), bits(&rescored));
    }

    #[test]
    fn test_tree_respects_height_limit() {
        let x = clustered_with_outliers();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let tree = IsolationTree::grow(x.view(), &indices, 0, 3, &mut rng);
        assert!(tree.depth() <= 3);
        assert!(tree.path_length(x.row(0)) > 0.0);
    }

    #[test]
    fn test_constant_data_is_single_leaf() {
        let x = Array2::from_elem((8, 3), 1.0);
        let indices: Vec<usize> = (0..8).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = IsolationTree::grow(x.view(), &indices, 0, 3, &mut rng);
        assert!(matches!(tree, IsolationTree::External { size: 8 }));
    }

    #[test]
    fn test_sample_size_capped_by_rows() {
        let x = clustered_with_outliers();
        let mut rng = StdRng::seed_from_u64(42);
        let mut forest = IsolationForest::new().with_n_estimators(5);
        let scores = forest.fit_score(x.view(), &mut rng);

        assert_eq!(forest.sample_size(), 52);
        assert_eq!(forest.trees().len(), 5);
        assert_eq!(scores.len(), 52);
        assert!(forest.offset().is_some());
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(3) - 1.207_392).abs() < 1e-5);
        assert!(average_path_length(256) > average_path_length(64));
    }
}

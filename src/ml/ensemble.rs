//! Random forest over [`DecisionTree`]s
//!
//! Each tree is grown on a bootstrap resample of the training rows with its
//! own generator, seeded from one master generator. The forest's crisis
//! probability is the mean of the trees' leaf probabilities.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::tree::{DecisionTree, TreeParams};

/// Forest construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    /// Features searched per split; `None` uses `floor(sqrt(n_features))`
    pub max_features: Option<usize>,
    pub seed: u64,
}

/// Fitted random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on rows `x` with binary labels `y`.
    ///
    /// `class_weights[c]` scales every row of class `c`.
    pub fn fit(x: &[Vec<f64>], y: &[u8], class_weights: [f64; 2], params: ForestParams) -> Self {
        let n = x.len();
        let n_features = x.first().map_or(0, Vec::len);
        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1));
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            max_features,
        };

        let mut master = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        let mut counts = vec![0u32; n];
        let mut weights = vec![0.0; n];

        for _ in 0..params.n_trees {
            let mut rng = StdRng::seed_from_u64(master.random());

            counts.iter_mut().for_each(|c| *c = 0);
            for _ in 0..n {
                counts[rng.random_range(0..n)] += 1;
            }
            let mut rows = Vec::with_capacity(n);
            for i in 0..n {
                weights[i] = class_weights[usize::from(y[i])] * f64::from(counts[i]);
                if counts[i] > 0 {
                    rows.push(i);
                }
            }

            trees.push(DecisionTree::fit(x, y, &weights, rows, tree_params, &mut rng));
        }

        let importances = aggregate_importances(&trees, n_features);
        debug!(
            "Forest fitted: {} trees, max_features {}, mean nodes {:.1}",
            trees.len(),
            max_features,
            trees.iter().map(|t| t.node_count()).sum::<usize>() as f64 / trees.len().max(1) as f64
        );

        Self {
            trees,
            n_features,
            importances,
        }
    }

    /// Mean crisis probability across trees, in [0, 1]
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Normalized mean impurity decrease per feature (sums to 1)
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

/// Average per-tree importances over trees that split at least once, then
/// renormalize. Falls back to uniform when no tree split at all.
fn aggregate_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n_features];
    let mut contributing = 0usize;
    for imp in trees.iter().filter_map(DecisionTree::feature_importances) {
        for (acc, v) in sum.iter_mut().zip(imp) {
            *acc += v;
        }
        contributing += 1;
    }

    let total: f64 = sum.iter().sum();
    if contributing == 0 || total <= 0.0 {
        if n_features > 0 {
            warn!("No tree found a split; reporting uniform feature importances");
        }
        return vec![1.0 / n_features.max(1) as f64; n_features];
    }
    sum.iter().map(|v| v / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<Vec<f64>>, Vec<u8>) {
        // Feature 0 drives the label, feature 1 is noise
        let x: Vec<Vec<f64>> = (0..200)
            .map(|i| vec![(i % 50) as f64, ((i * 37) % 11) as f64])
            .collect();
        let y = x.iter().map(|r| u8::from(r[0] >= 40.0)).collect();
        (x, y)
    }

    fn params(seed: u64) -> ForestParams {
        ForestParams {
            n_trees: 25,
            max_depth: None,
            max_features: None,
            seed,
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = dataset();
        let a = RandomForest::fit(&x, &y, [1.0, 1.0], params(42));
        let b = RandomForest::fit(&x, &y, [1.0, 1.0], params(42));
        for row in &x {
            assert_eq!(a.predict_proba(row).to_bits(), b.predict_proba(row).to_bits());
        }
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_learns_informative_feature() {
        let (x, y) = dataset();
        let all_features = ForestParams {
            max_features: Some(2),
            ..params(7)
        };
        let forest = RandomForest::fit(&x, &y, [1.0, 1.0], all_features);
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict_proba(&[45.0, 3.0]), 1.0);
        assert_eq!(forest.predict_proba(&[10.0, 3.0]), 0.0);

        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_uniform_importances_without_splits() {
        let x = vec![vec![1.0, 2.0]; 20];
        let y: Vec<u8> = (0..20).map(|i| u8::from(i % 4 == 0)).collect();
        let forest = RandomForest::fit(&x, &y, [1.0, 3.0], params(1));
        assert_eq!(forest.feature_importances(), &[0.5, 0.5]);
        let p = forest.predict_proba(&[1.0, 2.0]);
        assert!((0.0..=1.0).contains(&p));
    }
}

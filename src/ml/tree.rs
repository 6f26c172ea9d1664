//! Weighted CART classification tree (binary labels, Gini impurity)
//!
//! Nodes live in a flat vector; node 0 is the root. At each split only a
//! random subset of `max_features` non-constant features is searched, as in
//! a random forest. Thresholds sit halfway between adjacent distinct values
//! and `value <= threshold` goes left.

use rand::rngs::StdRng;
use rand::Rng;

/// A single node of a fitted tree
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Weighted share of crisis rows reaching this leaf
        crisis_probability: f64,
    },
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    /// Features searched per split (non-constant ones)
    pub max_features: usize,
}

/// Weighted class totals of a node
#[derive(Debug, Clone, Copy, Default)]
struct ClassWeights {
    stable: f64,
    crisis: f64,
}

impl ClassWeights {
    fn add(&mut self, label: u8, w: f64) {
        if label == 1 {
            self.crisis += w;
        } else {
            self.stable += w;
        }
    }

    fn total(&self) -> f64 {
        self.stable + self.crisis
    }

    fn gini(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let p0 = self.stable / total;
        let p1 = self.crisis / total;
        1.0 - p0 * p0 - p1 * p1
    }

    /// sum_c w_c^2 / total; larger is purer
    fn purity_proxy(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            0.0
        } else {
            (self.stable * self.stable + self.crisis * self.crisis) / total
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    proxy: f64,
    left: ClassWeights,
    right: ClassWeights,
}

/// Fitted classification tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    /// Unnormalized weighted impurity decrease per feature
    impurity_decrease: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `rows`.
    ///
    /// `weights[i]` is the total weight of row `i` (class weight times
    /// bootstrap multiplicity); rows not listed are ignored.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[u8],
        weights: &[f64],
        rows: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut nodes = vec![TreeNode::Leaf {
            crisis_probability: 0.0,
        }];
        let mut impurity_decrease = vec![0.0; n_features];
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, rows, 0)];

        while let Some((node_idx, rows, depth)) = stack.pop() {
            let mut totals = ClassWeights::default();
            for &i in &rows {
                totals.add(y[i], weights[i]);
            }

            let leaf = TreeNode::Leaf {
                crisis_probability: if totals.total() > 0.0 {
                    totals.crisis / totals.total()
                } else {
                    0.0
                },
            };

            let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
            if rows.len() < 2 || totals.gini() <= 0.0 || depth_reached {
                nodes[node_idx] = leaf;
                continue;
            }

            let Some(split) = best_split(x, y, weights, &rows, n_features, params, rng) else {
                nodes[node_idx] = leaf;
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&i| x[i][split.feature] <= split.threshold);

            // Rounding can push a zero-gain split slightly below 0
            let decrease = totals.total() * totals.gini()
                - split.left.total() * split.left.gini()
                - split.right.total() * split.right.gini();
            impurity_decrease[split.feature] += decrease.max(0.0);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf {
                crisis_probability: 0.0,
            });
            nodes.push(TreeNode::Leaf {
                crisis_probability: 0.0,
            });
            nodes[node_idx] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push((right, right_rows, depth + 1));
            stack.push((left, left_rows, depth + 1));
        }

        Self {
            nodes,
            impurity_decrease,
        }
    }

    /// Crisis probability of the leaf `features` falls into
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { crisis_probability } => return *crisis_probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = features.get(*feature).copied().unwrap_or(f64::NAN);
                    // NaN goes left
                    idx = if v.is_nan() || v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let TreeNode::Split { left, right, .. } = self.nodes[idx] {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Per-feature impurity decrease normalized to sum 1, or `None` for a
    /// single-leaf tree
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return None;
        }
        Some(self.impurity_decrease.iter().map(|v| v / total).collect())
    }
}

/// Search a random subset of features for the split with the purest children
fn best_split(
    x: &[Vec<f64>],
    y: &[u8],
    weights: &[f64],
    rows: &[usize],
    n_features: usize,
    params: TreeParams,
    rng: &mut StdRng,
) -> Option<Split> {
    let mut order: Vec<usize> = (0..n_features).collect();
    let mut best: Option<Split> = None;
    let mut searched = 0;

    let mut sorted: Vec<(f64, u8, f64)> = Vec::with_capacity(rows.len());

    // Lazy Fisher-Yates: draw features one at a time until enough
    // non-constant ones have been searched
    for k in 0..n_features {
        if searched >= params.max_features {
            break;
        }
        let pick = rng.random_range(k..n_features);
        order.swap(k, pick);
        let feature = order[k];

        sorted.clear();
        sorted.extend(rows.iter().map(|&i| (x[i][feature], y[i], weights[i])));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (first, last) = (sorted[0].0, sorted[sorted.len() - 1].0);
        if first >= last {
            continue;
        }
        searched += 1;

        let mut totals = ClassWeights::default();
        for &(_, label, w) in &sorted {
            totals.add(label, w);
        }

        let mut left = ClassWeights::default();
        for pos in 0..sorted.len() - 1 {
            let (value, label, w) = sorted[pos];
            left.add(label, w);
            let next = sorted[pos + 1].0;
            if value >= next {
                continue;
            }
            let right = ClassWeights {
                stable: totals.stable - left.stable,
                crisis: totals.crisis - left.crisis,
            };
            let proxy = left.purity_proxy() + right.purity_proxy();
            if best.map_or(true, |b| proxy > b.proxy) {
                let mut threshold = value / 2.0 + next / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = value;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    proxy,
                    left,
                    right,
                });
            }
        }
    }

    best
}

//! Binary decision trees stored as flat node arenas.
//!
//! Two builders share the [`Tree`] representation: a Gini classification
//! tree (leaves hold the CONFIRMED fraction) used by the random forest, and a
//! second-order regression tree (leaves hold a weighted score) used by
//! gradient boosting. Rows go left when `x[feature] <= threshold`.
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tree node. Children are indices into [`Tree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `row`. The root is node 0.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Reserve a slot for a node whose children are not built yet.
    fn reserve(&mut self) -> usize {
        self.nodes.push(Node::Leaf { value: 0.0 });
        self.nodes.len() - 1
    }

    fn leaf(&mut self, value: f64) -> usize {
        self.nodes.push(Node::Leaf { value });
        self.nodes.len() - 1
    }
}

/// Midpoint between two sorted distinct values. Falls back to the lower one
/// when the midpoint rounds up to the upper value.
fn split_threshold(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid >= upper {
        lower
    } else {
        mid
    }
}

fn sorted_by_feature(x: &Array2<f64>, rows: &[usize], feature: usize) -> Vec<(f64, usize)> {
    let mut values = rows
        .iter()
        .map(|&i| (x[(i, feature)], i))
        .collect::<Vec<_>>();
    values.sort_by(|a, b| a.0.total_cmp(&b.0));
    values
}

fn partition(x: &Array2<f64>, rows: &[usize], feature: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    rows.iter().partition(|&&i| x[(i, feature)] <= threshold)
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

// Gini impurity of a binary node with `positives` of `n` rows in class 1.
fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

#[derive(Debug, Clone)]
pub struct ClassificationTreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features sampled at each node.
    pub max_features: usize,
}

/// Fit a Gini classification tree on `rows` (duplicates allowed, as in a
/// bootstrap sample). Returns the tree and the unnormalised impurity decrease
/// per feature.
pub fn fit_classification_tree(
    x: &Array2<f64>,
    y: &[usize],
    rows: &[usize],
    params: &ClassificationTreeParams,
    rng: &mut StdRng,
) -> (Tree, Vec<f64>) {
    let mut builder = ClassificationBuilder {
        x,
        y,
        params,
        tree: Tree::default(),
        importances: vec![0.0; x.ncols()],
    };
    builder.build(rows, 0, rng);
    (builder.tree, builder.importances)
}

struct ClassificationBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    params: &'a ClassificationTreeParams,
    tree: Tree,
    importances: Vec<f64>,
}

impl ClassificationBuilder<'_> {
    fn build(&mut self, rows: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let n = rows.len();
        let positives = rows.iter().filter(|&&i| self.y[i] == 1).count();
        let value = if n == 0 { 0.0 } else { positives as f64 / n as f64 };

        let should_stop = n < self.params.min_samples_split
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || positives == 0
            || positives == n;
        if should_stop {
            return self.tree.leaf(value);
        }

        let Some(split) = self.best_split(rows, positives, rng) else {
            return self.tree.leaf(value);
        };

        let (left_rows, right_rows) = partition(self.x, rows, split.feature, split.threshold);
        let parent = n as f64 * gini(positives, n);
        self.importances[split.feature] += parent - split.score;

        let idx = self.tree.reserve();
        let left = self.build(&left_rows, depth + 1, rng);
        let right = self.build(&right_rows, depth + 1, rng);
        self.tree.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    /// Lowest weighted child impurity over a random feature subset.
    fn best_split(&self, rows: &[usize], positives: usize, rng: &mut StdRng) -> Option<SplitCandidate> {
        let n_features = self.x.ncols();
        let n = rows.len();
        let amount = self.params.max_features.clamp(1, n_features);
        let mut best: Option<SplitCandidate> = None;

        for feature in index::sample(rng, n_features, amount).into_iter() {
            let sorted = sorted_by_feature(self.x, rows, feature);
            let mut left_pos = 0usize;
            for i in 0..n - 1 {
                if self.y[sorted[i].1] == 1 {
                    left_pos += 1;
                }
                let (lower, upper) = (sorted[i].0, sorted[i + 1].0);
                if lower == upper {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                let score = n_left as f64 * gini(left_pos, n_left)
                    + n_right as f64 * gini(positives - left_pos, n_right);
                if best.map_or(true, |b| score < b.score) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: split_threshold(lower, upper),
                        score,
                    });
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
pub struct GradientTreeParams {
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
}

/// Fit one boosting round. `grad` holds the negative gradient (`y - p`) and
/// `hess` the hessian (`p(1 - p)`) of every row. Leaf values already include
/// the learning rate. Returns the tree and the `(feature, gain)` of each split.
pub fn fit_gradient_tree(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    params: &GradientTreeParams,
) -> (Tree, Vec<(usize, f64)>) {
    let mut builder = GradientBuilder {
        x,
        grad,
        hess,
        params,
        tree: Tree::default(),
        gains: Vec::new(),
    };
    builder.build(rows, 0);
    (builder.tree, builder.gains)
}

struct GradientBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a GradientTreeParams,
    tree: Tree,
    gains: Vec<(usize, f64)>,
}

impl GradientBuilder<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.params.reg_lambda;
        if denom > 0.0 {
            g * g / denom
        } else {
            0.0
        }
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.params.reg_lambda;
        if denom > 0.0 {
            self.params.learning_rate * g / denom
        } else {
            0.0
        }
    }

    fn build(&mut self, rows: &[usize], depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();

        if depth >= self.params.max_depth || rows.len() < 2 {
            let value = self.leaf_value(g, h);
            return self.tree.leaf(value);
        }

        let Some(split) = self.best_split(rows, g, h) else {
            let value = self.leaf_value(g, h);
            return self.tree.leaf(value);
        };

        self.gains.push((split.feature, split.score));
        let (left_rows, right_rows) = partition(self.x, rows, split.feature, split.threshold);

        let idx = self.tree.reserve();
        let left = self.build(&left_rows, depth + 1);
        let right = self.build(&right_rows, depth + 1);
        self.tree.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    /// Highest positive gain over all features; ties keep the lower feature index.
    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent = self.score(g, h);
        let per_feature = (0..self.x.ncols())
            .into_par_iter()
            .map(|feature| self.best_split_for_feature(rows, feature, g, h, parent))
            .collect::<Vec<_>>();

        let mut best: Option<SplitCandidate> = None;
        for candidate in per_feature.into_iter().flatten() {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        rows: &[usize],
        feature: usize,
        g: f64,
        h: f64,
        parent: f64,
    ) -> Option<SplitCandidate> {
        let sorted = sorted_by_feature(self.x, rows, feature);
        let mcw = self.params.min_child_weight;
        let (mut gl, mut hl) = (0.0f64, 0.0f64);
        let mut best: Option<SplitCandidate> = None;

        for i in 0..sorted.len() - 1 {
            let row = sorted[i].1;
            gl += self.grad[row];
            hl += self.hess[row];
            let (lower, upper) = (sorted[i].0, sorted[i + 1].0);
            if lower == upper {
                continue;
            }
            let (gr, hr) = (g - gl, h - hl);
            if hl < mcw || hr < mcw {
                continue;
            }
            let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent);
            if gain > 0.0 && best.map_or(true, |b| gain > b.score) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: split_threshold(lower, upper),
                    score: gain,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 5.0],
            [1.0, 3.0],
            [2.0, 4.0],
            [10.0, 3.5],
            [11.0, 4.5],
            [12.0, 5.5],
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn classification_tree_separates_on_informative_feature() {
        let (x, y) = separable();
        let params = ClassificationTreeParams {
            max_depth: None,
            min_samples_split: 2,
            max_features: 2,
        };
        let rows = (0..6).collect::<Vec<_>>();
        let mut rng = StdRng::seed_from_u64(1);
        let (tree, importances) = fit_classification_tree(&x, &y, &rows, &params, &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.nodes[0], Node::Split { feature: 0, threshold: 6.0, left: 1, right: 2 });
        assert_eq!(tree.predict_row(x.row(0)), 0.0);
        assert_eq!(tree.predict_row(x.row(5)), 1.0);
        assert!(importances[0] > 0.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn classification_tree_respects_max_depth() {
        let (x, _) = separable();
        let y = vec![0, 1, 0, 1, 0, 1];
        let params = ClassificationTreeParams {
            max_depth: Some(1),
            min_samples_split: 2,
            max_features: 2,
        };
        let rows = (0..6).collect::<Vec<_>>();
        let mut rng = StdRng::seed_from_u64(3);
        let (tree, _) = fit_classification_tree(&x, &y, &rows, &params, &mut rng);
        assert!(tree.depth() <= 1);
        for r in 0..6 {
            let p = tree.predict_row(x.row(r));
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn threshold_falls_back_to_lower_value() {
        let lower = 1.0f64;
        let upper = f64::from_bits(lower.to_bits() + 1);
        assert_eq!(split_threshold(lower, upper), lower);
        assert_eq!(split_threshold(1.0, 2.0), 1.5);
    }

    #[test]
    fn gradient_tree_moves_scores_toward_labels() {
        let (x, y) = separable();
        // p = 0.5 everywhere
        let grad = y.iter().map(|&l| l as f64 - 0.5).collect::<Vec<_>>();
        let hess = vec![0.25; 6];
        let params = GradientTreeParams {
            max_depth: 3,
            learning_rate: 1.0,
            min_child_weight: 0.0,
            reg_lambda: 0.0,
        };
        let rows = (0..6).collect::<Vec<_>>();
        let (tree, gains) = fit_gradient_tree(&x, &grad, &hess, &rows, &params);

        assert_eq!(gains.len(), 1);
        assert_eq!(gains[0].0, 0);
        // leaf = G / H = (3 * 0.5) / (3 * 0.25)
        assert!((tree.predict_row(x.row(4)) - 2.0).abs() < 1e-12);
        assert!((tree.predict_row(x.row(1)) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn min_child_weight_blocks_light_children() {
        let (x, y) = separable();
        let grad = y.iter().map(|&l| l as f64 - 0.5).collect::<Vec<_>>();
        let hess = vec![0.25; 6];
        let params = GradientTreeParams {
            max_depth: 3,
            learning_rate: 0.1,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
        };
        let rows = (0..6).collect::<Vec<_>>();
        let (tree, gains) = fit_gradient_tree(&x, &grad, &hess, &rows, &params);
        assert!(gains.is_empty());
        assert_eq!(tree.n_nodes(), 1);
    }
}

//! Random forest of CART trees: Gini impurity, bootstrap rows, random feature subsets.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Class distribution of the training rows that reached this leaf
    Leaf { proba: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: StdRng,
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &r in rows {
        counts[y[r]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

impl TreeBuilder<'_> {
    fn leaf(&self, rows: &[usize]) -> Node {
        let counts = class_counts(self.y, rows, self.n_classes);
        let total = rows.len().max(1) as f64;
        Node::Leaf {
            proba: counts.iter().map(|&c| c as f64 / total).collect(),
        }
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> Node {
        let counts = class_counts(self.y, &rows, self.n_classes);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || rows.len() < self.min_samples_split {
            return self.leaf(&rows);
        }

        let Some((feature, threshold)) = self.best_split(&rows, &counts) else {
            return self.leaf(&rows);
        };
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| self.x[[r, feature]] <= threshold);
        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    /// Best (feature, threshold) among a random feature subset, if any split
    /// lowers the impurity.
    fn best_split(&mut self, rows: &[usize], parent_counts: &[usize]) -> Option<(usize, f64)> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let n = rows.len();
        let parent = gini(parent_counts, n);
        let mut best: Option<(usize, f64, f64)> = None;

        // Keep drawing features past the subset size until some split is valid.
        for (visited, &f) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let mut sorted: Vec<usize> = rows.to_vec();
            sorted.sort_by(|&a, &b| self.x[[a, f]].total_cmp(&self.x[[b, f]]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.to_vec();
            for i in 0..n - 1 {
                let cls = self.y[sorted[i]];
                left[cls] += 1;
                right[cls] -= 1;
                let lo = self.x[[sorted[i], f]];
                let hi = self.x[[sorted[i + 1], f]];
                if lo == hi {
                    continue;
                }
                let nl = i + 1;
                let nr = n - nl;
                let weighted = (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / n as f64;
                let gain = parent - weighted;
                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((f, (lo + hi) / 2.0, gain));
                }
            }
        }
        best.map(|(f, t, _)| (f, t))
    }
}

impl DecisionTree {
    fn proba(&self, sample: ArrayView1<f64>) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Ensemble of trees; class probabilities are the mean of the trees' leaf distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on `x` (rows × features) with class indices `y` in `0..n_classes`.
    /// With no rows the forest has no trees and predicts all-zero probabilities.
    pub fn fit(x: &Array2<f64>, y: &[usize], n_classes: usize, params: &ForestParams) -> Self {
        let n = x.nrows().min(y.len());
        if n == 0 {
            return Self {
                n_classes,
                trees: Vec::new(),
            };
        }
        let max_features = ((x.ncols() as f64).sqrt().round() as usize).clamp(1, x.ncols().max(1));
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let tree_seed: u64 = rng.gen();
                let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                let rows: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                let mut builder = TreeBuilder {
                    x,
                    y,
                    n_classes,
                    max_features,
                    max_depth: params.max_depth,
                    min_samples_split: params.min_samples_split.max(2),
                    rng: tree_rng,
                };
                DecisionTree {
                    root: builder.build(rows, 0),
                }
            })
            .collect();

        Self { n_classes, trees }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        if self.trees.is_empty() {
            return out;
        }
        for (i, sample) in x.outer_iter().enumerate() {
            for tree in &self.trees {
                for (c, p) in tree.proba(sample).iter().enumerate() {
                    out[[i, c]] += p;
                }
            }
        }
        out /= self.trees.len() as f64;
        out
    }

    /// Class index with the highest mean probability (lowest index on ties)
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        self.predict_proba(x)
            .outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0usize, f64::MIN), |best, (c, &p)| if p > best.1 { (c, p) } else { best })
                    .0
            })
            .collect()
    }
}

//! CART classification tree (Gini impurity, binary labels).

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, FEATURE_COUNT};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Non-constant features examined per split
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Fraction of CKD samples that reached this leaf
        probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Best split found at a node.
struct Candidate {
    feature: usize,
    threshold: f64,
    /// Sample-weighted Gini of the two children
    weighted_impurity: f64,
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// A fitted decision tree stored as a flat node arena (root at index 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Mean decrease in impurity per feature, normalised to sum to 1
    importances: Vec<f64>,
}

struct Builder<'a, R> {
    rows: &'a [FeatureVector],
    labels: &'a [bool],
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows selected by `sample` (duplicates allowed).
    ///
    /// `sample` must be non-empty and index into `rows` and `labels`.
    pub fn fit<R: Rng>(
        rows: &[FeatureVector],
        labels: &[bool],
        sample: Vec<usize>,
        params: TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut builder = Builder {
            rows,
            labels,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; FEATURE_COUNT],
        };
        let mut sample = sample;
        builder.grow(&mut sample, 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        Self {
            nodes: builder.nodes,
            importances,
        }
    }

    /// Probability of the CKD class for an already-scaled row.
    #[must_use]
    pub fn predict(&self, row: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { probability } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row.0[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a single-leaf tree has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl<R: Rng> Builder<'_, R> {
    fn grow(&mut self, sample: &mut [usize], depth: usize) -> usize {
        let n = sample.len();
        let positives = sample.iter().filter(|&&i| self.labels[i]).count();
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probability: positives as f64 / n as f64,
        });

        let pure = positives == 0 || positives == n;
        if pure || depth >= self.params.max_depth || n < self.params.min_samples_split {
            return node_idx;
        }

        let Some(split) = self.best_split(sample, positives) else {
            return node_idx;
        };

        let decrease = n as f64 * gini(positives, n) - split.weighted_impurity;
        self.importances[split.feature] += decrease.max(0.0);

        // Partition in place: rows going left first.
        let mut boundary = 0;
        for k in 0..n {
            if self.rows[sample[k]].0[split.feature] <= split.threshold {
                sample.swap(boundary, k);
                boundary += 1;
            }
        }
        let (left_sample, right_sample) = sample.split_at_mut(boundary);

        let left = self.grow(left_sample, depth + 1);
        let right = self.grow(right_sample, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Scan features in random order until `max_features` non-constant ones
    /// have been examined. Ties keep the first split found.
    fn best_split(&mut self, sample: &[usize], positives: usize) -> Option<Candidate> {
        let n = sample.len();
        let mut order: Vec<usize> = (0..FEATURE_COUNT).collect();
        order.shuffle(&mut *self.rng);

        let mut best: Option<Candidate> = None;
        let mut examined = 0;
        let mut values: Vec<(f64, bool)> = Vec::with_capacity(n);

        for feature in order {
            if examined >= self.params.max_features {
                break;
            }

            values.clear();
            values.extend(
                sample
                    .iter()
                    .map(|&i| (self.rows[i].0[feature], self.labels[i])),
            );
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            if values[0].0 == values[n - 1].0 {
                continue;
            }
            examined += 1;

            let mut left_pos = 0;
            for k in 0..n - 1 {
                if values[k].1 {
                    left_pos += 1;
                }
                if values[k].0 == values[k + 1].0 {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                let weighted = n_left as f64 * gini(left_pos, n_left)
                    + n_right as f64 * gini(positives - left_pos, n_right);

                if best
                    .as_ref()
                    .map_or(true, |b| weighted < b.weighted_impurity)
                {
                    let mut threshold = (values[k].0 + values[k + 1].0) / 2.0;
                    if threshold >= values[k + 1].0 {
                        threshold = values[k].0;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        weighted_impurity: weighted,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            max_features: FEATURE_COUNT,
        }
    }

    fn separable_rows() -> (Vec<FeatureVector>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let mut row = FeatureVector::zeros();
            row.0[3] = i as f64;
            rows.push(row);
            labels.push(i >= 10);
        }
        (rows, labels)
    }

    #[test]
    fn test_single_split_separates() {
        let (rows, labels) = separable_rows();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&rows, &labels, (0..20).collect(), params(10), &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&rows[2]), 0.0);
        assert_eq!(tree.predict(&rows[15]), 1.0);
        assert!((tree.importances()[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_depth_limit_gives_mixed_leaf() {
        let (rows, labels) = separable_rows();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&rows, &labels, (0..20).collect(), params(0), &mut rng);

        assert_eq!(tree.depth(), 0);
        assert!((tree.predict(&rows[0]) - 0.5).abs() < 1e-12);
        assert!(tree.importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_pure_sample_is_leaf() {
        let (rows, labels) = separable_rows();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&rows, &labels, vec![11, 12, 13], params(10), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&rows[0]), 1.0);
    }
}

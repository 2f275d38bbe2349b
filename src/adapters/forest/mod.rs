//! Random forest adapter: Implementation of RiskModel.
//!
//! Bootstrap-aggregated CART trees over standardized features.
//!
//! # Reproducibility
//!
//! Per-tree seeds are drawn sequentially from the master seed before the
//! trees are grown in parallel, so a given seed yields the same forest (and
//! the same fingerprint) regardless of the rayon thread count.

mod scaler;
mod tree;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{FeatureVector, TrainingCorpus, DEFAULT_SEED, FEATURE_COUNT};
use crate::ports::{ModelError, RiskModel};

pub use scaler::StandardScaler;
pub use tree::{DecisionTree, TreeParams};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,

    /// Features examined per split; `None` means floor(sqrt(n_features))
    pub max_features: Option<usize>,

    /// Grow each tree on a bootstrap resample of the corpus
    pub bootstrap: bool,

    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
            bootstrap: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), ModelError> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParameter("n_trees must be > 0".into()));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParameter(
                "min_samples_split must be >= 2".into(),
            ));
        }
        if let Some(k) = self.max_features {
            if k == 0 || k > FEATURE_COUNT {
                return Err(ModelError::InvalidParameter(format!(
                    "max_features must be in 1..={FEATURE_COUNT}, got {k}"
                )));
            }
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        let sqrt = (FEATURE_COUNT as f64).sqrt().floor() as usize;
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features.unwrap_or(sqrt.max(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedForest {
    scaler: StandardScaler,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

/// Random forest CKD classifier.
pub struct ForestModel {
    params: ForestParams,
    fitted: Option<FittedForest>,
    fingerprint: Option<String>,
}

impl ForestModel {
    /// Create an unfitted forest. It reports unavailable until [`RiskModel::fit`].
    #[must_use]
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            fitted: None,
            fingerprint: None,
        }
    }

    /// Create and fit in one step.
    ///
    /// # Errors
    /// Returns error if the parameters or corpus are unusable.
    pub fn trained(params: ForestParams, corpus: &TrainingCorpus) -> Result<Self, ModelError> {
        let mut model = Self::new(params);
        model.fit(corpus)?;
        Ok(model)
    }

    #[must_use]
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.trees.len())
    }

    fn check_corpus(corpus: &TrainingCorpus) -> Result<(), ModelError> {
        if corpus.is_empty() {
            return Err(ModelError::EmptyCorpus);
        }
        if corpus.features.len() != corpus.labels.len() {
            return Err(ModelError::LabelMismatch {
                features: corpus.features.len(),
                labels: corpus.labels.len(),
            });
        }
        let positives = corpus.positive_count();
        if positives == 0 || positives == corpus.len() {
            return Err(ModelError::SingleClass);
        }
        Ok(())
    }

    /// Average the per-tree importances and renormalise.
    fn aggregate_importances(trees: &[DecisionTree]) -> Vec<f64> {
        let mut total = vec![0.0; FEATURE_COUNT];
        for tree in trees {
            for (t, v) in total.iter_mut().zip(tree.importances()) {
                *t += v;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for t in &mut total {
                *t /= sum;
            }
        }
        total
    }

    fn compute_fingerprint(fitted: &FittedForest) -> Result<String, ModelError> {
        let bytes =
            serde_json::to_vec(fitted).map_err(|e| ModelError::Serialization(e.to_string()))?;
        let digest = Sha256::digest(&bytes);
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }
}

impl Default for ForestModel {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl RiskModel for ForestModel {
    fn name(&self) -> &'static str {
        "random-forest"
    }

    fn fit(&mut self, corpus: &TrainingCorpus) -> Result<(), ModelError> {
        self.params.validate()?;
        Self::check_corpus(corpus)?;

        let scaler = StandardScaler::fit(&corpus.features).ok_or(ModelError::EmptyCorpus)?;
        let scaled: Vec<FeatureVector> = corpus.features.iter().map(|r| scaler.transform(r)).collect();
        let labels = &corpus.labels;
        let n = scaled.len();

        let mut master = ChaCha20Rng::seed_from_u64(self.params.seed);
        let tree_seeds: Vec<u64> = (0..self.params.n_trees).map(|_| master.gen()).collect();
        let tree_params = self.params.tree_params();
        let bootstrap = self.params.bootstrap;

        tracing::info!(
            "Training random forest: {} trees, max_depth={}, max_features={}, {} samples",
            self.params.n_trees,
            tree_params.max_depth,
            tree_params.max_features,
            n
        );

        let trees: Vec<DecisionTree> = tree_seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = ChaCha20Rng::seed_from_u64(seed);
                let sample: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(&scaled, labels, sample, tree_params, &mut rng)
            })
            .collect();

        let importances = Self::aggregate_importances(&trees);
        let fitted = FittedForest {
            scaler,
            trees,
            importances,
        };
        let fingerprint = Self::compute_fingerprint(&fitted)?;

        tracing::info!(
            "Random forest trained (fingerprint {})",
            &fingerprint[..16]
        );

        self.fitted = Some(fitted);
        self.fingerprint = Some(fingerprint);
        Ok(())
    }

    fn predict(&self, features: &FeatureVector) -> Option<f64> {
        let fitted = self.fitted.as_ref()?;
        let scaled = fitted.scaler.transform(features);
        let total: f64 = fitted.trees.iter().map(|t| t.predict(&scaled)).sum();
        Some((total / fitted.trees.len() as f64).clamp(0.0, 1.0))
    }

    fn feature_weights(&self) -> &[f64] {
        match &self.fitted {
            Some(f) => &f.importances,
            None => &[],
        }
    }

    fn is_available(&self) -> bool {
        self.fitted.is_some()
    }

    fn fingerprint(&self) -> Option<String> {
        self.fingerprint.clone()
    }
}

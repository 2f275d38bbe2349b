//! Risk model port: Trait for the CKD probability model.
//!
//! Two adapters implement it: a trained random forest and a null model used
//! when training is deliberately skipped. Callers see the same contract and
//! can only tell them apart through [`RiskModel::is_available`].

use crate::domain::{CorpusError, FeatureVector, TrainingCorpus};

/// Errors raised while fitting a model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("Training corpus is empty")]
    EmptyCorpus,

    #[error("Training corpus has {features} feature rows but {labels} labels")]
    LabelMismatch { features: usize, labels: usize },

    #[error("Training corpus contains a single class")]
    SingleClass,

    #[error("Invalid model parameter: {0}")]
    InvalidParameter(String),

    #[error("Model serialization failed: {0}")]
    Serialization(String),

    #[error("Training corpus generation failed: {0}")]
    Corpus(#[from] CorpusError),
}

/// Trait for CKD probability models.
///
/// A model is fitted once and then shared read-only between threads.
pub trait RiskModel: Send + Sync {
    /// Short name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Fit the model on a labelled corpus.
    ///
    /// # Errors
    /// Returns `ModelError` if the corpus or parameters are unusable.
    fn fit(&mut self, corpus: &TrainingCorpus) -> Result<(), ModelError>;

    /// Probability in `[0, 1]` that the features belong to the CKD class.
    ///
    /// # Returns
    /// `None` when no trained model is present.
    fn predict(&self, features: &FeatureVector) -> Option<f64>;

    /// Global importance per feature, in canonical feature order.
    ///
    /// Empty when no trained model is present.
    fn feature_weights(&self) -> &[f64];

    /// Whether `predict` produces real estimates.
    fn is_available(&self) -> bool;

    /// Content hash identifying the fitted parameters, if any.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

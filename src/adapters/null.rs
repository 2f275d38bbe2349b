//! Null adapter: a `RiskModel` that never produces estimates.
//!
//! Selected when the engine runs without a trained model. Scoring still
//! returns eGFR and stage; risk figures report as unavailable.

use crate::domain::{FeatureVector, TrainingCorpus};
use crate::ports::{ModelError, RiskModel};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullModel;

impl NullModel {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RiskModel for NullModel {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn fit(&mut self, corpus: &TrainingCorpus) -> Result<(), ModelError> {
        tracing::warn!(
            "Null model ignores training corpus of {} samples",
            corpus.len()
        );
        Ok(())
    }

    fn predict(&self, _features: &FeatureVector) -> Option<f64> {
        None
    }

    fn feature_weights(&self) -> &[f64] {
        &[]
    }

    fn is_available(&self) -> bool {
        false
    }
}

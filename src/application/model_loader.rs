//! Model construction from configuration.

use std::sync::Arc;

use crate::adapters::{ForestModel, NullModel};
use crate::config::{EngineConfig, ModelVariant};
use crate::domain::SyntheticCohort;
use crate::ports::{ModelError, RiskModel};

/// Build and train the model selected by `config.model_variant`.
///
/// The trained variant generates the synthetic cohort and fits the forest
/// before returning; the result is immutable from here on.
///
/// # Errors
/// Returns `ModelError` if cohort generation or training fails.
pub fn load_model(config: &EngineConfig) -> Result<Arc<dyn RiskModel>, ModelError> {
    match config.model_variant {
        ModelVariant::Unavailable => {
            tracing::info!("Model variant 'unavailable': risk estimates disabled");
            Ok(Arc::new(NullModel::new()))
        }
        ModelVariant::Trained => {
            let corpus =
                SyntheticCohort::new(config.training_samples, config.forest.seed).generate()?;
            tracing::info!(
                "Generated synthetic cohort: {} samples ({} CKD)",
                corpus.len(),
                corpus.positive_count()
            );
            let model = ForestModel::trained(config.forest, &corpus)?;
            Ok(Arc::new(model))
        }
    }
}

/// Like [`load_model`], but degrades to the null model if training fails.
#[must_use]
pub fn load_model_or_fallback(config: &EngineConfig) -> Arc<dyn RiskModel> {
    load_model(config).unwrap_or_else(|e| {
        tracing::error!("Model training failed, continuing without risk estimates: {e}");
        Arc::new(NullModel::new())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.training_samples = 200;
        config.forest.n_trees = 10;
        config
    }

    #[test]
    fn test_load_trained() {
        let model = load_model(&small_config()).expect("Should train");
        assert!(model.is_available());
        assert_eq!(model.name(), "random-forest");
        assert!(model.fingerprint().is_some());
    }

    #[test]
    fn test_load_unavailable() {
        let config = EngineConfig {
            model_variant: ModelVariant::Unavailable,
            ..EngineConfig::default()
        };
        let model = load_model(&config).expect("Null model always loads");
        assert!(!model.is_available());
    }

    #[test]
    fn test_fallback_on_training_error() {
        let mut config = small_config();
        config.forest.min_samples_split = 1;
        assert!(matches!(
            load_model(&config),
            Err(ModelError::InvalidParameter(_))
        ));
        assert!(!load_model_or_fallback(&config).is_available());
    }
}

//! Engine configuration.
//!
//! Every setting has a default; environment variables override them on a
//! best-effort basis (unparseable or out-of-range values are ignored with a
//! warning).
//!
//! Supported:
//! - `RENALRISK_MODEL_VARIANT` = `trained` | `unavailable`
//! - `RENALRISK_SEED` (u64)
//! - `RENALRISK_TRAINING_SAMPLES` (>= 2)
//! - `RENALRISK_TREES` (>= 1)
//! - `RENALRISK_MAX_DEPTH`
//! - `RENALRISK_VALIDATION` = `lenient` | `strict`
//! - `RENALRISK_FREE_LAB_UPLOADS` (u32, per patient)

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adapters::ForestParams;
use crate::domain::{DEFAULT_TRAINING_SAMPLES, FREE_LAB_UPLOADS};

/// Which risk model backs the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    #[default]
    Trained,
    /// No model: scores carry eGFR and stage only
    Unavailable,
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trained" | "forest" => Ok(Self::Trained),
            "unavailable" | "none" | "null" => Ok(Self::Unavailable),
            other => Err(format!("unknown model variant '{other}'")),
        }
    }
}

/// How measurements are checked before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Missing or odd values fall back to defaults
    #[default]
    Lenient,
    /// Reject measurements with any validation issue
    Strict,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown validation mode '{other}'")),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub model_variant: ModelVariant,
    pub forest: ForestParams,
    /// Size of the synthetic training cohort
    pub training_samples: usize,
    pub validation: ValidationMode,
    /// Lab uploads each patient may record
    pub free_lab_uploads: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_variant: ModelVariant::default(),
            forest: ForestParams::default(),
            training_samples: DEFAULT_TRAINING_SAMPLES,
            validation: ValidationMode::default(),
            free_lab_uploads: FREE_LAB_UPLOADS,
        }
    }
}

impl EngineConfig {
    /// Load config overrides from the process environment (best-effort).
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config overrides from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = parsed::<ModelVariant, _>(&lookup, "RENALRISK_MODEL_VARIANT") {
            cfg.model_variant = v;
        }
        if let Some(v) = parsed::<u64, _>(&lookup, "RENALRISK_SEED") {
            cfg.forest.seed = v;
        }
        if let Some(v) = parsed::<usize, _>(&lookup, "RENALRISK_TRAINING_SAMPLES") {
            if v >= 2 {
                cfg.training_samples = v;
            } else {
                tracing::warn!("Ignoring RENALRISK_TRAINING_SAMPLES={v}: need at least 2");
            }
        }
        if let Some(v) = parsed::<usize, _>(&lookup, "RENALRISK_TREES") {
            if v >= 1 {
                cfg.forest.n_trees = v;
            } else {
                tracing::warn!("Ignoring RENALRISK_TREES=0");
            }
        }
        if let Some(v) = parsed::<usize, _>(&lookup, "RENALRISK_MAX_DEPTH") {
            cfg.forest.max_depth = v;
        }
        if let Some(v) = parsed::<ValidationMode, _>(&lookup, "RENALRISK_VALIDATION") {
            cfg.validation = v;
        }
        if let Some(v) = parsed::<u32, _>(&lookup, "RENALRISK_FREE_LAB_UPLOADS") {
            cfg.free_lab_uploads = v;
        }

        cfg
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Ignoring {key}={raw:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config_from(&[]);
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.model_variant, ModelVariant::Trained);
        assert_eq!(cfg.training_samples, 1000);
        assert_eq!(cfg.forest.n_trees, 100);
        assert_eq!(cfg.forest.max_depth, 10);
        assert_eq!(cfg.forest.seed, 42);
        assert_eq!(cfg.validation, ValidationMode::Lenient);
        assert_eq!(cfg.free_lab_uploads, 2);
    }

    #[test]
    fn test_overrides() {
        let cfg = config_from(&[
            ("RENALRISK_MODEL_VARIANT", "Unavailable"),
            ("RENALRISK_SEED", " 7 "),
            ("RENALRISK_TRAINING_SAMPLES", "200"),
            ("RENALRISK_TREES", "25"),
            ("RENALRISK_MAX_DEPTH", "6"),
            ("RENALRISK_VALIDATION", "strict"),
            ("RENALRISK_FREE_LAB_UPLOADS", "5"),
        ]);
        assert_eq!(cfg.model_variant, ModelVariant::Unavailable);
        assert_eq!(cfg.forest.seed, 7);
        assert_eq!(cfg.training_samples, 200);
        assert_eq!(cfg.forest.n_trees, 25);
        assert_eq!(cfg.forest.max_depth, 6);
        assert_eq!(cfg.validation, ValidationMode::Strict);
        assert_eq!(cfg.free_lab_uploads, 5);
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let cfg = config_from(&[
            ("RENALRISK_MODEL_VARIANT", "quantum"),
            ("RENALRISK_SEED", "-1"),
            ("RENALRISK_TRAINING_SAMPLES", "1"),
            ("RENALRISK_TREES", "0"),
            ("RENALRISK_VALIDATION", "maybe"),
            ("RENALRISK_FREE_LAB_UPLOADS", "-3"),
        ]);
        assert_eq!(cfg, EngineConfig::default());
    }
}

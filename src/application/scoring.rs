//! Scoring service: turns one measurement into a risk assessment.
//!
//! Combines the kidney-function rules (eGFR, stage) with the probability
//! model and the feature importance ranking. Scoring never fails in lenient
//! mode; degraded inputs and an absent model are reported on the assessment.

use std::sync::Arc;

use rayon::prelude::*;

use crate::domain::{
    assess_kidney_function, missing_features, prepare_features, round_to, validate_measurement,
    ClinicalField, DefaultedInputs, FeatureContribution, FeatureVector, PatientMeasurement,
    RiskAssessment, RiskLevel, ValidationError,
};
use crate::ports::RiskModel;

/// Features with a global weight at or below this are left out of the ranking.
const MIN_IMPORTANCE: f64 = 0.01;

/// Maximum entries in the ranking.
const TOP_FEATURES: usize = 5;

/// Service for scoring patient measurements.
pub struct ScoringService<M: RiskModel + ?Sized> {
    model: Arc<M>,
}

impl<M: RiskModel + ?Sized> Clone for ScoringService<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
        }
    }
}

impl<M: RiskModel + ?Sized> ScoringService<M> {
    /// Create a new scoring service around a fitted (or null) model.
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model_available(&self) -> bool {
        self.model.is_available()
    }

    #[must_use]
    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// Score one measurement.
    ///
    /// Missing features are zero-filled and missing eGFR inputs take their
    /// defaults; both are listed in `used_defaults`. Without a trained model
    /// the risk level is [`RiskLevel::Unavailable`].
    #[must_use]
    pub fn score(&self, measurement: &PatientMeasurement) -> RiskAssessment {
        let features = prepare_features(measurement);
        let kidney = assess_kidney_function(measurement);

        let (risk_percentage, risk_level, feature_importance, model_available) =
            match self.model.predict(&features) {
                Some(probability) => {
                    let pct = risk_percentage(probability);
                    (
                        pct,
                        RiskLevel::from_percentage(pct),
                        self.rank_features(&features),
                        true,
                    )
                }
                None => (0, RiskLevel::Unavailable, Vec::new(), false),
            };

        tracing::debug!(
            "Scored measurement: risk={}% level={} stage={} egfr={}",
            risk_percentage,
            risk_level,
            kidney.stage,
            kidney.egfr
        );

        RiskAssessment {
            patient_id: measurement.patient_id.clone(),
            patient_name: measurement.patient_name.clone(),
            risk_percentage,
            stage: kidney.stage,
            risk_level,
            feature_importance,
            egfr: kidney.egfr,
            model_available,
            used_defaults: DefaultedInputs {
                features: missing_features(measurement),
                kidney: kidney.defaulted,
            },
        }
    }

    /// Score one measurement after strict validation.
    ///
    /// # Errors
    /// Returns `ValidationError` listing every issue if the measurement is
    /// incomplete, unreadable or out of physiological range.
    pub fn score_strict(
        &self,
        measurement: &PatientMeasurement,
    ) -> Result<RiskAssessment, ValidationError> {
        validate_measurement(measurement)?;
        Ok(self.score(measurement))
    }

    /// Score each measurement independently, preserving order. Every result
    /// carries a patient id and name ("Unknown" when absent).
    #[must_use]
    pub fn score_batch(&self, measurements: &[PatientMeasurement]) -> Vec<RiskAssessment> {
        measurements
            .iter()
            .map(|m| self.score(m).tagged_from(m))
            .collect()
    }

    /// Same output as [`Self::score_batch`], computed on the rayon pool.
    #[must_use]
    pub fn score_batch_parallel(&self, measurements: &[PatientMeasurement]) -> Vec<RiskAssessment> {
        tracing::debug!("Scoring batch of {} in parallel", measurements.len());
        measurements
            .par_iter()
            .map(|m| self.score(m).tagged_from(m))
            .collect()
    }

    fn rank_features(&self, features: &FeatureVector) -> Vec<FeatureContribution> {
        let weights = self.model.feature_weights();
        let mut ranked: Vec<(ClinicalField, f64)> = ClinicalField::ALL
            .iter()
            .zip(weights)
            .filter(|(_, &w)| w > MIN_IMPORTANCE)
            .map(|(&field, &w)| (field, w))
            .collect();

        // Stable sort keeps canonical order among equal weights.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(TOP_FEATURES);

        ranked
            .into_iter()
            .map(|(field, weight)| FeatureContribution {
                field,
                label: field.label(),
                value: round_to(features.get(field), 2),
                importance: round_to(weight * 100.0, 2),
            })
            .collect()
    }
}

/// Truncated percentage, clamped to `0..=100`.
fn risk_percentage(probability: f64) -> u8 {
    if !probability.is_finite() {
        return 0;
    }
    (probability * 100.0).floor().clamp(0.0, 100.0) as u8
}

//! Risk assessment output types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::kidney::{CkdStage, KidneyInput};
use super::measurement::{ClinicalField, PatientMeasurement};

/// Placeholder tag for records scored without an identifier or name.
pub const UNKNOWN_PATIENT: &str = "Unknown";

/// Qualitative CKD risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Risk below 20%
    Low,
    /// Risk 20-49%
    Moderate,
    /// Risk 50-74%
    High,
    /// Risk 75% and above
    Critical,
    /// No trained model: the risk percentage carries no information
    Unavailable,
}

impl RiskLevel {
    /// Bucket a risk percentage. Never returns [`RiskLevel::Unavailable`].
    #[must_use]
    pub fn from_percentage(risk_percentage: u8) -> Self {
        if risk_percentage < 20 {
            Self::Low
        } else if risk_percentage < 50 {
            Self::Moderate
        } else if risk_percentage < 75 {
            Self::High
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - routine monitoring",
            Self::Moderate => "Moderate risk - follow-up recommended",
            Self::High => "High risk - nephrology referral advised",
            Self::Critical => "Critical risk - immediate consultation advised",
            Self::Unavailable => "Risk unavailable - no trained model loaded",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
            Self::Unavailable => write!(f, "Unavailable"),
        }
    }
}

/// One entry of the ranked explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub field: ClinicalField,

    /// Display label, e.g. "Serum Creatinine"
    pub label: String,

    /// Observed value (0.0 when absent), rounded to 2 decimals
    pub value: f64,

    /// Global model importance as a percentage, rounded to 2 decimals
    pub importance: f64,
}

/// Inputs that were not supplied and were filled by policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultedInputs {
    /// Model features read as 0.0
    pub features: BTreeSet<ClinicalField>,

    /// eGFR inputs defaulted or substituted
    pub kidney: BTreeSet<KidneyInput>,
}

impl DefaultedInputs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.kidney.is_empty()
    }
}

/// Result of scoring one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,

    /// Probability of CKD as a truncated percentage (0 when unavailable)
    pub risk_percentage: u8,

    pub stage: CkdStage,

    pub risk_level: RiskLevel,

    /// Up to five features, most important first
    pub feature_importance: Vec<FeatureContribution>,

    pub egfr: f64,

    /// Whether a trained model produced the risk figures
    pub model_available: bool,

    pub used_defaults: DefaultedInputs,
}

impl RiskAssessment {
    /// Tag with the measurement's identifier and name, or [`UNKNOWN_PATIENT`].
    #[must_use]
    pub fn tagged_from(mut self, measurement: &PatientMeasurement) -> Self {
        self.patient_id = Some(
            measurement
                .patient_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
        );
        self.patient_name = Some(
            measurement
                .patient_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        let cases = [
            (0, RiskLevel::Low),
            (19, RiskLevel::Low),
            (20, RiskLevel::Moderate),
            (49, RiskLevel::Moderate),
            (50, RiskLevel::High),
            (74, RiskLevel::High),
            (75, RiskLevel::Critical),
            (100, RiskLevel::Critical),
        ];
        for (pct, level) in cases {
            assert_eq!(RiskLevel::from_percentage(pct), level, "{pct}%");
        }
    }

    #[test]
    fn test_unavailable_is_distinct_from_low() {
        assert_ne!(RiskLevel::Unavailable, RiskLevel::Low);
        assert!(!RiskLevel::Unavailable.is_available());
        assert!(RiskLevel::Low.is_available());
        assert_eq!(RiskLevel::Unavailable.to_string(), "Unavailable");
    }

    #[test]
    fn test_tagging_defaults_to_unknown() {
        let assessment = RiskAssessment {
            patient_id: None,
            patient_name: None,
            risk_percentage: 0,
            stage: CkdStage::Stage1,
            risk_level: RiskLevel::Low,
            feature_importance: Vec::new(),
            egfr: 95.0,
            model_available: true,
            used_defaults: DefaultedInputs::default(),
        };

        let m = PatientMeasurement::new().with_id("P042");
        let tagged = assessment.tagged_from(&m);
        assert_eq!(tagged.patient_id.as_deref(), Some("P042"));
        assert_eq!(tagged.patient_name.as_deref(), Some(UNKNOWN_PATIENT));
    }
}

//! Domain layer: Core business types and logic.
//!
//! Pure scoring rules (eGFR, staging, risk buckets), measurement and
//! assessment types, strict validation and the synthetic training cohort.

mod assessment;
mod corpus;
mod kidney;
mod measurement;
mod record;
mod validation;

pub use assessment::{
    DefaultedInputs, FeatureContribution, RiskAssessment, RiskLevel, UNKNOWN_PATIENT,
};
pub use corpus::{
    CorpusError, SyntheticCohort, TrainingCorpus, DEFAULT_SEED, DEFAULT_TRAINING_SAMPLES,
};
pub use kidney::{
    assess_kidney_function, classify_stage, estimate_egfr, CkdStage, KidneyFunction,
    KidneyInput, DEFAULT_AGE, DEFAULT_CREATININE, DEFAULT_GENDER,
};
pub(crate) use kidney::round_to;
pub use measurement::{
    missing_features, parse_measurements, prepare_features, ClinicalField, FeatureVector,
    Gender, PatientMeasurement, FEATURE_COUNT,
};
pub use record::{
    LabResult, PatientRecord, PatientSummary, TrendSeries, UploadQuota, FREE_LAB_UPLOADS,
};
pub use validation::{validate_measurement, ValidationError, ValidationIssue};

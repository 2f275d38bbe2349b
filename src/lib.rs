//! # renalrisk
//!
//! Chronic kidney disease risk scoring.
//!
//! This crate provides:
//! - A random forest CKD model trained on a seeded synthetic cohort
//! - An approximate eGFR estimate (neither CKD-EPI nor MDRD) and CKD stage classification
//! - Risk bucketing with a per-patient feature importance ranking
//! - An in-memory patient registry with lab-history trends
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure rules (measurements, eGFR, staging, assessments)
//! - `ports`: Trait definitions for the risk model and registry storage
//! - `adapters`: Concrete implementations (random forest, null model, in-memory storage)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven engine settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{RecordService, ScoringService};
pub use config::{EngineConfig, ModelVariant, ValidationMode};
pub use domain::{CkdStage, PatientMeasurement, RiskAssessment, RiskLevel};

/// Result type for renalrisk operations
pub type Result<T> = std::result::Result<T, RenalRiskError>;

/// Main error type for renalrisk
#[derive(Debug, thiserror::Error)]
pub enum RenalRiskError {
    #[error("Invalid measurement: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("No free lab uploads remaining for {patient_id} ({used} of {limit} used)")]
    UploadQuotaExceeded {
        patient_id: String,
        used: u32,
        limit: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

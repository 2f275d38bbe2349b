//! Storage port: Trait for the patient registry backend.
//!
//! Stores scored patients keyed by patient identifier, plus a dated lab
//! history and a lab-upload counter per patient. The shipped adapter is
//! in-memory; nothing here assumes durability.

use crate::domain::{LabResult, PatientRecord};

/// Trait for patient registry storage.
pub trait Storage: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert or replace a patient record.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_patient(&self, record: &PatientRecord) -> Result<(), Self::Error>;

    /// Load a patient record.
    ///
    /// # Returns
    /// `None` if no record exists for the identifier.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, Self::Error>;

    /// Load all patient records, ordered by identifier.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list_patients(&self) -> Result<Vec<PatientRecord>, Self::Error>;

    /// Get the number of registered patients.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_patients(&self) -> Result<usize, Self::Error>;

    /// Delete a patient, their lab history and their upload counter.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_patient(&self, patient_id: &str) -> Result<(), Self::Error>;

    /// Append a lab result to a patient's history.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn append_lab_result(&self, patient_id: &str, result: &LabResult) -> Result<(), Self::Error>;

    /// Load a patient's lab history in insertion order.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_lab_history(&self, patient_id: &str) -> Result<Vec<LabResult>, Self::Error>;

    /// Number of lab uploads counted against a patient.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn lab_uploads_used(&self, patient_id: &str) -> Result<u32, Self::Error>;

    /// Count one lab upload if fewer than `limit` have been counted.
    ///
    /// Check and increment happen atomically.
    ///
    /// # Returns
    /// `false` (and nothing counted) when the limit is already reached.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn claim_lab_upload(&self, patient_id: &str, limit: u32) -> Result<bool, Self::Error>;

    /// Clear all data (patients, histories and upload counters).
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn clear_all(&self) -> Result<(), Self::Error>;
}

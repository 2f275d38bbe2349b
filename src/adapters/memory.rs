//! In-memory adapter: Implementation of Storage.
//!
//! Holds the patient registry for the lifetime of the process. All maps are
//! behind one `Mutex` so a patient, their lab history and their upload count
//! change together.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::{LabResult, PatientRecord};
use crate::ports::Storage;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage lock poisoned by a panicked thread")]
    LockPoisoned,
}

#[derive(Default)]
struct State {
    patients: BTreeMap<String, PatientRecord>,
    labs: BTreeMap<String, Vec<LabResult>>,
    uploads: BTreeMap<String, u32>,
}

/// Process-local patient registry.
#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Storage for InMemoryStorage {
    type Error = StorageError;

    fn save_patient(&self, record: &PatientRecord) -> Result<(), Self::Error> {
        self.lock()?
            .patients
            .insert(record.patient_id.clone(), record.clone());
        Ok(())
    }

    fn load_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, Self::Error> {
        Ok(self.lock()?.patients.get(patient_id).cloned())
    }

    fn list_patients(&self) -> Result<Vec<PatientRecord>, Self::Error> {
        Ok(self.lock()?.patients.values().cloned().collect())
    }

    fn count_patients(&self) -> Result<usize, Self::Error> {
        Ok(self.lock()?.patients.len())
    }

    fn delete_patient(&self, patient_id: &str) -> Result<(), Self::Error> {
        let mut state = self.lock()?;
        state.labs.remove(patient_id);
        state.uploads.remove(patient_id);
        state
            .patients
            .remove(patient_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(patient_id.to_string()))
    }

    fn append_lab_result(&self, patient_id: &str, result: &LabResult) -> Result<(), Self::Error> {
        self.lock()?
            .labs
            .entry(patient_id.to_string())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    fn load_lab_history(&self, patient_id: &str) -> Result<Vec<LabResult>, Self::Error> {
        Ok(self
            .lock()?
            .labs
            .get(patient_id)
            .cloned()
            .unwrap_or_default())
    }

    fn lab_uploads_used(&self, patient_id: &str) -> Result<u32, Self::Error> {
        Ok(self.lock()?.uploads.get(patient_id).copied().unwrap_or(0))
    }

    fn claim_lab_upload(&self, patient_id: &str, limit: u32) -> Result<bool, Self::Error> {
        let mut state = self.lock()?;
        let used = state.uploads.entry(patient_id.to_string()).or_insert(0);
        if *used >= limit {
            return Ok(false);
        }
        *used += 1;
        Ok(true)
    }

    fn clear_all(&self) -> Result<(), Self::Error> {
        let mut state = self.lock()?;
        state.patients.clear();
        state.labs.clear();
        state.uploads.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CkdStage, DefaultedInputs, PatientMeasurement, RiskAssessment, RiskLevel,
    };
    use chrono::NaiveDate;

    fn record(id: &str) -> PatientRecord {
        let assessment = RiskAssessment {
            patient_id: Some(id.to_string()),
            patient_name: None,
            risk_percentage: 10,
            stage: CkdStage::Stage2,
            risk_level: RiskLevel::Low,
            feature_importance: Vec::new(),
            egfr: 75.0,
            model_available: true,
            used_defaults: DefaultedInputs::default(),
        };
        PatientRecord::new(id, PatientMeasurement::new().with_id(id), assessment)
    }

    fn lab(day: u32) -> LabResult {
        LabResult {
            date: NaiveDate::from_ymd_opt(2025, 9, day).expect("Valid date"),
            serum_creatinine: 1.1,
            blood_urea: 30.0,
            egfr: Some(70.0),
            hemoglobin: 13.0,
            bp_systolic: 125.0,
            bp_diastolic: 80.0,
        }
    }

    #[test]
    fn test_patient_crud() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.count_patients().expect("Should count"), 0);

        storage.save_patient(&record("P002")).expect("Should save");
        storage.save_patient(&record("P001")).expect("Should save");
        storage.save_patient(&record("P001")).expect("Should replace");
        assert_eq!(storage.count_patients().expect("Should count"), 2);

        let ids: Vec<String> = storage
            .list_patients()
            .expect("Should list")
            .into_iter()
            .map(|r| r.patient_id)
            .collect();
        assert_eq!(ids, vec!["P001", "P002"]);

        assert!(storage.load_patient("P001").expect("Should load").is_some());
        assert!(storage.load_patient("P999").expect("Should load").is_none());

        storage.delete_patient("P001").expect("Should delete");
        assert!(matches!(
            storage.delete_patient("P001"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_lab_history_and_clear() {
        let storage = InMemoryStorage::new();
        storage.save_patient(&record("P001")).expect("Should save");
        storage.append_lab_result("P001", &lab(3)).expect("Should append");
        storage.append_lab_result("P001", &lab(1)).expect("Should append");

        let history = storage.load_lab_history("P001").expect("Should load");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], lab(3));
        assert!(storage.load_lab_history("P404").expect("Should load").is_empty());

        storage.clear_all().expect("Should clear");
        assert_eq!(storage.count_patients().expect("Should count"), 0);
        assert!(storage.load_lab_history("P001").expect("Should load").is_empty());
    }

    #[test]
    fn test_upload_counter_stops_at_limit() {
        let storage = InMemoryStorage::new();
        storage.save_patient(&record("P001")).expect("Should save");
        assert_eq!(storage.lab_uploads_used("P001").expect("Should read"), 0);

        assert!(storage.claim_lab_upload("P001", 2).expect("Should claim"));
        assert!(storage.claim_lab_upload("P001", 2).expect("Should claim"));
        assert!(!storage.claim_lab_upload("P001", 2).expect("Should refuse"));
        assert_eq!(storage.lab_uploads_used("P001").expect("Should read"), 2);
        assert_eq!(storage.lab_uploads_used("P002").expect("Should read"), 0);

        storage.delete_patient("P001").expect("Should delete");
        assert_eq!(storage.lab_uploads_used("P001").expect("Should read"), 0);

        assert!(storage.claim_lab_upload("P003", 1).expect("Should claim"));
        storage.clear_all().expect("Should clear");
        assert_eq!(storage.lab_uploads_used("P003").expect("Should read"), 0);
    }
}

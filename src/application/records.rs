//! Record service: the patient registry use cases.
//!
//! Registers scored patients, answers roster queries and keeps a dated lab
//! history per patient for trend charts. Lab uploads are limited per patient
//! (see [`FREE_LAB_UPLOADS`]); imported history is not counted.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{
    estimate_egfr, LabResult, PatientMeasurement, PatientRecord, PatientSummary, TrendSeries,
    UploadQuota, FREE_LAB_UPLOADS,
};
use crate::ports::{RiskModel, Storage};
use crate::RenalRiskError;

use super::ScoringService;

/// Prefix for identifiers assigned to patients registered without one.
const AUTO_ID_PREFIX: &str = "AUTO_";

/// Service for the patient registry.
pub struct RecordService<S, M>
where
    S: Storage,
    M: RiskModel + ?Sized,
{
    storage: Arc<S>,
    scoring: ScoringService<M>,
    upload_limit: u32,
}

impl<S, M> RecordService<S, M>
where
    S: Storage,
    S::Error: Into<StorageError>,
    M: RiskModel + ?Sized,
{
    /// Create a new record service with the default upload allowance.
    pub fn new(storage: Arc<S>, scoring: ScoringService<M>) -> Self {
        Self {
            storage,
            scoring,
            upload_limit: FREE_LAB_UPLOADS,
        }
    }

    /// Set how many lab uploads each patient may record.
    #[must_use]
    pub fn with_upload_limit(mut self, limit: u32) -> Self {
        self.upload_limit = limit;
        self
    }

    #[must_use]
    pub fn scoring(&self) -> &ScoringService<M> {
        &self.scoring
    }

    /// Score a measurement and store it, replacing any record with the same id.
    ///
    /// Measurements without an id get the next free `AUTO_<n>` identifier.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn register(&self, measurement: PatientMeasurement) -> crate::Result<PatientRecord> {
        let mut measurement = measurement;
        let patient_id = match measurement.patient_id.clone() {
            Some(id) => id,
            None => self.next_auto_id()?,
        };
        measurement.patient_id = Some(patient_id.clone());

        let assessment = self.scoring.score(&measurement).tagged_from(&measurement);
        let record = PatientRecord::new(patient_id, measurement, assessment);
        self.storage
            .save_patient(&record)
            .map_err(|e| RenalRiskError::Storage(e.into()))?;

        tracing::info!(
            "Registered patient_id={} risk={}% stage={}",
            record.patient_id,
            record.assessment.risk_percentage,
            record.assessment.stage
        );
        Ok(record)
    }

    /// Register each measurement in order.
    ///
    /// # Errors
    /// Stops at the first storage failure; earlier records stay registered.
    pub fn register_batch(
        &self,
        measurements: Vec<PatientMeasurement>,
    ) -> crate::Result<Vec<PatientRecord>> {
        measurements.into_iter().map(|m| self.register(m)).collect()
    }

    /// Load a registered patient.
    ///
    /// # Errors
    /// Returns `PatientNotFound` for an unknown id, or a storage error.
    pub fn patient(&self, patient_id: &str) -> crate::Result<PatientRecord> {
        self.storage
            .load_patient(patient_id)
            .map_err(|e| RenalRiskError::Storage(e.into()))?
            .ok_or_else(|| RenalRiskError::PatientNotFound(patient_id.to_string()))
    }

    /// Dashboard roster, ordered by patient id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn roster(&self) -> crate::Result<Vec<PatientSummary>> {
        let mut summaries: Vec<PatientSummary> = self
            .storage
            .list_patients()
            .map_err(|e| RenalRiskError::Storage(e.into()))?
            .iter()
            .map(PatientRecord::summary)
            .collect();
        summaries.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));
        Ok(summaries)
    }

    /// Upload a lab result for a registered patient.
    ///
    /// Each upload counts against the patient's allowance; once it is used up
    /// the result is refused. A result without eGFR gets one computed from
    /// its creatinine and the patient's age and gender (defaults when those
    /// are unknown).
    ///
    /// # Errors
    /// Returns `PatientNotFound` for an unknown id, `UploadQuotaExceeded`
    /// when no uploads remain, or a storage error.
    pub fn record_lab_result(
        &self,
        patient_id: &str,
        result: LabResult,
    ) -> crate::Result<LabResult> {
        let record = self.patient(patient_id)?;
        let claimed = self
            .storage
            .claim_lab_upload(patient_id, self.upload_limit)
            .map_err(|e| RenalRiskError::Storage(e.into()))?;
        if !claimed {
            let used = self
                .storage
                .lab_uploads_used(patient_id)
                .map_err(|e| RenalRiskError::Storage(e.into()))?;
            tracing::warn!(
                "Lab upload refused for patient_id={patient_id}: {used} of {} used",
                self.upload_limit
            );
            return Err(RenalRiskError::UploadQuotaExceeded {
                patient_id: patient_id.to_string(),
                used,
                limit: self.upload_limit,
            });
        }

        let stored = self.store_lab_result(&record, result)?;
        tracing::info!(
            "Lab result recorded for patient_id={patient_id} ({} upload(s) left)",
            self.upload_quota(patient_id)?.remaining
        );
        Ok(stored)
    }

    /// Import existing lab history without counting it as uploads.
    ///
    /// # Errors
    /// Returns `PatientNotFound` for an unknown id, or a storage error.
    pub fn import_lab_history(
        &self,
        patient_id: &str,
        history: Vec<LabResult>,
    ) -> crate::Result<Vec<LabResult>> {
        let record = self.patient(patient_id)?;
        history
            .into_iter()
            .map(|result| self.store_lab_result(&record, result))
            .collect()
    }

    /// Uploads used and remaining for a registered patient.
    ///
    /// # Errors
    /// Returns `PatientNotFound` for an unknown id, or a storage error.
    pub fn upload_quota(&self, patient_id: &str) -> crate::Result<UploadQuota> {
        self.patient(patient_id)?;
        let used = self
            .storage
            .lab_uploads_used(patient_id)
            .map_err(|e| RenalRiskError::Storage(e.into()))?;
        Ok(UploadQuota::new(used, self.upload_limit))
    }

    /// Chronological lab series for a registered patient (empty without history).
    ///
    /// # Errors
    /// Returns `PatientNotFound` for an unknown id, or a storage error.
    pub fn trends(&self, patient_id: &str) -> crate::Result<TrendSeries> {
        let record = self.patient(patient_id)?;
        let history = self
            .storage
            .load_lab_history(patient_id)
            .map_err(|e| RenalRiskError::Storage(e.into()))?;
        let (age, gender) = record.egfr_inputs();
        Ok(TrendSeries::from_history(&history, age, gender))
    }

    fn store_lab_result(
        &self,
        record: &PatientRecord,
        mut result: LabResult,
    ) -> crate::Result<LabResult> {
        if result.egfr.is_none() {
            let (age, gender) = record.egfr_inputs();
            result.egfr = Some(estimate_egfr(age, result.serum_creatinine, gender));
        }
        self.storage
            .append_lab_result(&record.patient_id, &result)
            .map_err(|e| RenalRiskError::Storage(e.into()))?;
        Ok(result)
    }

    fn next_auto_id(&self) -> crate::Result<String> {
        let mut n = self
            .storage
            .count_patients()
            .map_err(|e| RenalRiskError::Storage(e.into()))?
            + 1;
        loop {
            let candidate = format!("{AUTO_ID_PREFIX}{n}");
            let taken = self
                .storage
                .load_patient(&candidate)
                .map_err(|e| RenalRiskError::Storage(e.into()))?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

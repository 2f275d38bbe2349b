//! Patient registry records: scored patients and their lab history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::assessment::{RiskAssessment, RiskLevel, UNKNOWN_PATIENT};
use super::kidney::{estimate_egfr, CkdStage, DEFAULT_AGE, DEFAULT_GENDER};
use super::measurement::{ClinicalField, Gender, PatientMeasurement};

/// A registered patient with their latest assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub measurement: PatientMeasurement,
    pub assessment: RiskAssessment,
    pub recorded_at: DateTime<Utc>,
}

impl PatientRecord {
    #[must_use]
    pub fn new(
        patient_id: impl Into<String>,
        measurement: PatientMeasurement,
        assessment: RiskAssessment,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            measurement,
            assessment,
            recorded_at: Utc::now(),
        }
    }

    /// Age and gender for eGFR estimates, defaulted when not on record.
    #[must_use]
    pub fn egfr_inputs(&self) -> (f64, Gender) {
        (
            self.measurement
                .get(ClinicalField::Age)
                .unwrap_or(DEFAULT_AGE),
            self.measurement.gender.unwrap_or(DEFAULT_GENDER),
        )
    }

    /// Roster line for this record.
    #[must_use]
    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            patient_id: self.patient_id.clone(),
            name: self
                .measurement
                .patient_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
            age: self.measurement.get(ClinicalField::Age),
            risk_percentage: self.assessment.risk_percentage,
            stage: self.assessment.stage,
            risk_level: self.assessment.risk_level,
            egfr: self.assessment.egfr,
        }
    }
}

/// One row of the clinician dashboard roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient_id: String,
    pub name: String,
    pub age: Option<f64>,
    pub risk_percentage: u8,
    pub stage: CkdStage,
    pub risk_level: RiskLevel,
    pub egfr: f64,
}

/// A dated set of kidney-related lab values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub date: NaiveDate,
    pub serum_creatinine: f64,
    pub blood_urea: f64,
    /// Filled from creatinine, age and gender when not reported by the lab
    #[serde(default)]
    pub egfr: Option<f64>,
    pub hemoglobin: f64,
    pub bp_systolic: f64,
    pub bp_diastolic: f64,
}

/// Lab uploads each patient may record before further uploads are refused.
pub const FREE_LAB_UPLOADS: u32 = 2;

/// A patient's lab-upload allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadQuota {
    pub used: u32,
    pub remaining: u32,
}

impl UploadQuota {
    #[must_use]
    pub fn new(used: u32, limit: u32) -> Self {
        Self {
            used,
            remaining: limit.saturating_sub(used),
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Chronological series for trend charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub dates: Vec<NaiveDate>,
    pub creatinine: Vec<f64>,
    pub egfr: Vec<f64>,
    pub blood_urea: Vec<f64>,
    pub hemoglobin: Vec<f64>,
}

impl TrendSeries {
    /// Build the series oldest-first, whatever order the history is stored in.
    ///
    /// Results without a reported eGFR get one estimated from their
    /// creatinine with the given age and gender.
    #[must_use]
    pub fn from_history(history: &[LabResult], age: f64, gender: Gender) -> Self {
        let mut sorted: Vec<&LabResult> = history.iter().collect();
        sorted.sort_by_key(|r| r.date);

        let mut series = Self::default();
        for r in sorted {
            series.dates.push(r.date);
            series.creatinine.push(r.serum_creatinine);
            series.egfr.push(
                r.egfr
                    .unwrap_or_else(|| estimate_egfr(age, r.serum_creatinine, gender)),
            );
            series.blood_urea.push(r.blood_urea);
            series.hemoglobin.push(r.hemoglobin);
        }
        series
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(date: &str, creatinine: f64, egfr: Option<f64>) -> LabResult {
        LabResult {
            date: date.parse().expect("Valid date"),
            serum_creatinine: creatinine,
            blood_urea: 40.0,
            egfr,
            hemoglobin: 12.0,
            bp_systolic: 140.0,
            bp_diastolic: 90.0,
        }
    }

    #[test]
    fn test_trend_is_chronological() {
        let history = vec![
            lab("2025-10-01", 1.5, Some(58.0)),
            lab("2025-08-01", 1.2, Some(68.0)),
            lab("2025-09-01", 1.3, None),
        ];
        let series = TrendSeries::from_history(&history, 65.0, Gender::Male);

        assert_eq!(series.len(), 3);
        assert_eq!(series.dates[0].to_string(), "2025-08-01");
        assert_eq!(series.creatinine, vec![1.2, 1.3, 1.5]);
        assert_eq!(series.egfr[0], 68.0);
        assert_eq!(series.egfr[2], 58.0);
    }

    #[test]
    fn test_missing_egfr_is_estimated_not_zero() {
        let history = vec![lab("2025-09-01", 1.3, None), lab("2025-10-01", 0.0, None)];
        let series = TrendSeries::from_history(&history, 65.0, Gender::Female);

        assert_eq!(series.egfr[0], estimate_egfr(65.0, 1.3, Gender::Female));
        assert_eq!(series.egfr[1], estimate_egfr(65.0, 1.0, Gender::Female));
        assert!(series.egfr.iter().all(|&e| e > 0.0));
    }

    #[test]
    fn test_egfr_inputs_default_when_unrecorded() {
        let assessment = RiskAssessment {
            patient_id: None,
            patient_name: None,
            risk_percentage: 0,
            stage: CkdStage::Stage2,
            risk_level: RiskLevel::Unavailable,
            feature_importance: Vec::new(),
            egfr: 72.0,
            model_available: false,
            used_defaults: Default::default(),
        };
        let bare = PatientRecord::new("P020", PatientMeasurement::new(), assessment.clone());
        assert_eq!(bare.egfr_inputs(), (DEFAULT_AGE, DEFAULT_GENDER));

        let known = PatientRecord::new(
            "P021",
            PatientMeasurement::new()
                .with(ClinicalField::Age, 58.0)
                .with_gender(Gender::Female),
            assessment,
        );
        assert_eq!(known.egfr_inputs(), (58.0, Gender::Female));
    }

    #[test]
    fn test_upload_quota_counts_down() {
        let fresh = UploadQuota::new(0, FREE_LAB_UPLOADS);
        assert_eq!(fresh, UploadQuota { used: 0, remaining: 2 });
        assert!(!fresh.is_exhausted());

        let spent = UploadQuota::new(2, FREE_LAB_UPLOADS);
        assert!(spent.is_exhausted());
        assert_eq!(UploadQuota::new(5, 2).remaining, 0);
    }

    #[test]
    fn test_empty_history() {
        assert!(TrendSeries::from_history(&[], DEFAULT_AGE, DEFAULT_GENDER).is_empty());
    }
}

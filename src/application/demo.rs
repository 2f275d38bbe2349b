//! Demo cohort: three sample patients and a lab history for the first.

use chrono::NaiveDate;

use crate::adapters::StorageError;
use crate::domain::{ClinicalField, Gender, LabResult, PatientMeasurement};
use crate::ports::{RiskModel, Storage};

use super::RecordService;

/// Identifier of the demo patient that carries a lab history.
pub const DEMO_TRENDS_PATIENT: &str = "P001";

fn patient(
    id: &str,
    name: &str,
    gender: Gender,
    values: [f64; crate::domain::FEATURE_COUNT],
) -> PatientMeasurement {
    ClinicalField::ALL.iter().zip(values).fold(
        PatientMeasurement::new()
            .with_id(id)
            .with_name(name)
            .with_gender(gender),
        |m, (&field, value)| m.with(field, value),
    )
}

/// The sample patients, complete on every model feature.
#[must_use]
pub fn demo_patients() -> Vec<PatientMeasurement> {
    // Canonical feature order (see `ClinicalField::ALL`).
    vec![
        patient(
            "P001",
            "John Smith",
            Gender::Male,
            [
                65.0, 145.0, 92.0, 1.015, 2.0, 1.0, 1.0, 0.0, 0.0, 110.0, 55.0, 1.8, 138.0, 4.2,
                11.5, 38.0, 7500.0, 4.2, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0,
            ],
        ),
        patient(
            "P002",
            "Mary Johnson",
            Gender::Female,
            [
                58.0, 130.0, 85.0, 1.020, 0.0, 0.0, 1.0, 0.0, 0.0, 95.0, 25.0, 0.9, 142.0, 4.0,
                13.2, 42.0, 6800.0, 4.8, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            ],
        ),
        patient(
            "P003",
            "Robert Davis",
            Gender::Male,
            [
                72.0, 160.0, 95.0, 1.010, 4.0, 3.0, 1.0, 2.0, 1.0, 180.0, 95.0, 3.2, 135.0, 5.1,
                9.8, 32.0, 12000.0, 3.5, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
            ],
        ),
    ]
}

/// Three monthly lab results for [`DEMO_TRENDS_PATIENT`], newest first.
#[must_use]
pub fn demo_lab_history() -> Vec<LabResult> {
    let lab = |(y, m, d): (i32, u32, u32),
               creatinine: f64,
               urea: f64,
               egfr: f64,
               hemoglobin: f64,
               systolic: f64,
               diastolic: f64| LabResult {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN),
        serum_creatinine: creatinine,
        blood_urea: urea,
        egfr: Some(egfr),
        hemoglobin,
        bp_systolic: systolic,
        bp_diastolic: diastolic,
    };
    vec![
        lab((2025, 10, 1), 1.5, 45.0, 58.0, 11.2, 145.0, 92.0),
        lab((2025, 9, 1), 1.3, 42.0, 62.0, 11.8, 142.0, 90.0),
        lab((2025, 8, 1), 1.2, 40.0, 68.0, 12.1, 138.0, 88.0),
    ]
}

/// Register the demo cohort and import the lab history of
/// [`DEMO_TRENDS_PATIENT`]. Imported history does not use up lab uploads.
///
/// # Errors
/// Returns error if storage operation fails.
pub fn seed_demo<S, M>(records: &RecordService<S, M>) -> crate::Result<()>
where
    S: Storage,
    S::Error: Into<StorageError>,
    M: RiskModel + ?Sized,
{
    records.register_batch(demo_patients())?;
    records.import_lab_history(DEMO_TRENDS_PATIENT, demo_lab_history())?;
    tracing::info!("Demo cohort loaded");
    Ok(())
}

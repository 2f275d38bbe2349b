//! Strict validation of patient measurements.
//!
//! Lenient scoring absorbs missing and non-physiological inputs. This module
//! backs the opt-in strict mode, which rejects such records instead.

use std::fmt;

use super::measurement::{ClinicalField, PatientMeasurement};

/// Accepted range (inclusive) per model feature.
///
/// Wide enough for pathological values; narrow enough to catch unit mix-ups
/// and data-entry errors.
const PHYSIOLOGICAL_RANGES: [(ClinicalField, f64, f64); 18] = [
    (ClinicalField::Age, 1.0, 120.0),
    (ClinicalField::BpSystolic, 50.0, 260.0),
    (ClinicalField::BpDiastolic, 30.0, 160.0),
    (ClinicalField::SpecificGravity, 1.000, 1.040),
    (ClinicalField::Albumin, 0.0, 5.0),
    (ClinicalField::Sugar, 0.0, 5.0),
    (ClinicalField::RedBloodCells, 0.0, 5.0),
    (ClinicalField::PusCell, 0.0, 5.0),
    (ClinicalField::Bacteria, 0.0, 5.0),
    (ClinicalField::BloodGlucose, 20.0, 800.0),
    (ClinicalField::BloodUrea, 1.0, 400.0),
    (ClinicalField::SerumCreatinine, 0.1, 25.0),
    (ClinicalField::Sodium, 100.0, 180.0),
    (ClinicalField::Potassium, 1.5, 10.0),
    (ClinicalField::Hemoglobin, 3.0, 20.0),
    (ClinicalField::PackedCellVolume, 9.0, 60.0),
    (ClinicalField::WhiteBloodCellCount, 1_000.0, 50_000.0),
    (ClinicalField::RedBloodCellCount, 1.5, 8.0),
];

/// A single reason a measurement failed strict validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingField(ClinicalField),
    MissingGender,
    /// The source record had a value that could not be read
    Unreadable(String),
    NotFinite(ClinicalField),
    OutOfRange {
        field: ClinicalField,
        value: f64,
        min: f64,
        max: f64,
    },
    NotBinary {
        field: ClinicalField,
        value: f64,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is missing"),
            Self::MissingGender => write!(f, "gender is missing"),
            Self::Unreadable(key) => write!(f, "{key} has an unreadable value"),
            Self::NotFinite(field) => write!(f, "{field} is not a finite number"),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} {value} out of range [{min}, {max}]"),
            Self::NotBinary { field, value } => write!(f, "{field} {value} must be 0 or 1"),
        }
    }
}

/// Strict validation failure listing every issue found.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} validation issue(s): {}", .issues.len(), join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check that a measurement is complete and physiologically plausible.
///
/// # Errors
/// Returns every issue found, not just the first.
pub fn validate_measurement(measurement: &PatientMeasurement) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    for key in measurement.unreadable_fields() {
        issues.push(ValidationIssue::Unreadable(key.clone()));
    }

    if measurement.gender.is_none() && !measurement.unreadable_fields().contains("gender") {
        issues.push(ValidationIssue::MissingGender);
    }

    for field in ClinicalField::ALL {
        let Some(value) = measurement.get(field) else {
            issues.push(ValidationIssue::MissingField(field));
            continue;
        };

        if !value.is_finite() {
            issues.push(ValidationIssue::NotFinite(field));
            continue;
        }

        if field.is_binary_flag() {
            if value != 0.0 && value != 1.0 {
                issues.push(ValidationIssue::NotBinary { field, value });
            }
            continue;
        }

        if let Some(&(_, min, max)) = PHYSIOLOGICAL_RANGES.iter().find(|(f, _, _)| *f == field) {
            if !(min..=max).contains(&value) {
                issues.push(ValidationIssue::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;

    fn complete_measurement() -> PatientMeasurement {
        let values = [
            58.0, 130.0, 85.0, 1.020, 0.0, 0.0, 1.0, 0.0, 0.0, 95.0, 25.0, 0.9, 142.0, 4.0, 13.2,
            42.0, 6800.0, 4.8, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
        ];
        let mut m = PatientMeasurement::new().with_gender(Gender::Female);
        for (field, value) in ClinicalField::ALL.iter().zip(values) {
            m.set(*field, value);
        }
        m
    }

    #[test]
    fn test_complete_record_passes() {
        assert!(validate_measurement(&complete_measurement()).is_ok());
    }

    #[test]
    fn test_reports_every_issue() {
        let mut m = complete_measurement();
        m.gender = None;
        m.set(ClinicalField::Age, -4.0);
        m.set(ClinicalField::Hypertension, 2.0);
        m.set(ClinicalField::SerumCreatinine, 0.0);

        let err = validate_measurement(&m).expect_err("Should reject");
        assert_eq!(err.issues.len(), 4);
        assert!(err.issues.contains(&ValidationIssue::MissingGender));
        assert!(err.issues.contains(&ValidationIssue::NotBinary {
            field: ClinicalField::Hypertension,
            value: 2.0,
        }));
        assert!(err.to_string().starts_with("4 validation issue(s)"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let m = PatientMeasurement::new()
            .with_gender(Gender::Male)
            .with(ClinicalField::Age, 40.0);
        let err = validate_measurement(&m).expect_err("Should reject");
        assert_eq!(err.issues.len(), 23);
        assert!(err
            .issues
            .contains(&ValidationIssue::MissingField(ClinicalField::SerumCreatinine)));
    }
}

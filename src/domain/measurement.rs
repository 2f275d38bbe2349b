//! Patient measurement types for CKD risk scoring.
//!
//! Field set follows the UCI chronic kidney disease dataset: 24 numeric
//! features plus gender, which only feeds the eGFR estimate.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of model features.
pub const FEATURE_COUNT: usize = 24;

/// Clinical fields consumed by the probability model, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalField {
    /// Age in years
    Age,
    /// Systolic blood pressure (mmHg)
    BpSystolic,
    /// Diastolic blood pressure (mmHg)
    BpDiastolic,
    /// Urine specific gravity (1.005-1.025)
    SpecificGravity,
    /// Urine albumin grade (0-5)
    Albumin,
    /// Urine sugar grade (0-5)
    Sugar,
    RedBloodCells,
    PusCell,
    Bacteria,
    /// Random blood glucose (mg/dL)
    BloodGlucose,
    /// Blood urea (mg/dL)
    BloodUrea,
    /// Serum creatinine (mg/dL)
    SerumCreatinine,
    /// Sodium (mEq/L)
    Sodium,
    /// Potassium (mEq/L)
    Potassium,
    /// Hemoglobin (g/dL)
    Hemoglobin,
    PackedCellVolume,
    /// White blood cell count (cells/cumm)
    WhiteBloodCellCount,
    /// Red blood cell count (millions/cmm)
    RedBloodCellCount,
    Hypertension,
    DiabetesMellitus,
    CoronaryArteryDisease,
    Appetite,
    PedalEdema,
    Anemia,
}

impl ClinicalField {
    /// All model features in canonical (training) order.
    pub const ALL: [ClinicalField; FEATURE_COUNT] = [
        Self::Age,
        Self::BpSystolic,
        Self::BpDiastolic,
        Self::SpecificGravity,
        Self::Albumin,
        Self::Sugar,
        Self::RedBloodCells,
        Self::PusCell,
        Self::Bacteria,
        Self::BloodGlucose,
        Self::BloodUrea,
        Self::SerumCreatinine,
        Self::Sodium,
        Self::Potassium,
        Self::Hemoglobin,
        Self::PackedCellVolume,
        Self::WhiteBloodCellCount,
        Self::RedBloodCellCount,
        Self::Hypertension,
        Self::DiabetesMellitus,
        Self::CoronaryArteryDisease,
        Self::Appetite,
        Self::PedalEdema,
        Self::Anemia,
    ];

    /// Position of this field in a [`FeatureVector`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name (snake_case), as used in JSON records.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::BpSystolic => "bp_systolic",
            Self::BpDiastolic => "bp_diastolic",
            Self::SpecificGravity => "specific_gravity",
            Self::Albumin => "albumin",
            Self::Sugar => "sugar",
            Self::RedBloodCells => "red_blood_cells",
            Self::PusCell => "pus_cell",
            Self::Bacteria => "bacteria",
            Self::BloodGlucose => "blood_glucose",
            Self::BloodUrea => "blood_urea",
            Self::SerumCreatinine => "serum_creatinine",
            Self::Sodium => "sodium",
            Self::Potassium => "potassium",
            Self::Hemoglobin => "hemoglobin",
            Self::PackedCellVolume => "packed_cell_volume",
            Self::WhiteBloodCellCount => "white_blood_cell_count",
            Self::RedBloodCellCount => "red_blood_cell_count",
            Self::Hypertension => "hypertension",
            Self::DiabetesMellitus => "diabetes_mellitus",
            Self::CoronaryArteryDisease => "coronary_artery_disease",
            Self::Appetite => "appetite",
            Self::PedalEdema => "pedal_edema",
            Self::Anemia => "anemia",
        }
    }

    /// Look up a field by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Human-readable label: "serum_creatinine" becomes "Serum Creatinine".
    #[must_use]
    pub fn label(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the field is a 0/1 comorbidity or symptom flag.
    #[must_use]
    pub fn is_binary_flag(self) -> bool {
        matches!(
            self,
            Self::Hypertension
                | Self::DiabetesMellitus
                | Self::CoronaryArteryDisease
                | Self::Appetite
                | Self::PedalEdema
                | Self::Anemia
        )
    }
}

impl fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Patient gender, used only for the eGFR adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    /// Case-insensitive; the single letters "m" and "f" are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("Unrecognized gender: {other:?}")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-order numeric feature vector fed to the probability model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, field: ClinicalField) -> f64 {
        self.0[field.index()]
    }

    pub fn set(&mut self, field: ClinicalField, value: f64) {
        self.0[field.index()] = value;
    }
}

/// One patient's clinical measurements.
///
/// Any subset of fields may be present. Absent model features are read as
/// 0.0 by [`prepare_features`]; this is a compatibility policy and NOT a
/// validation safeguard. Use strict scoring to reject incomplete records.
///
/// Serializes to and from the flat record shape
/// `{"patient_id": "P001", "age": 65, "gender": "male", ...}`. Unknown keys
/// are ignored; numeric strings and booleans are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMeasurement", into = "RawMeasurement")]
pub struct PatientMeasurement {
    /// Patient identifier, if supplied by the caller
    pub patient_id: Option<String>,

    /// Display name, if supplied by the caller
    pub patient_name: Option<String>,

    pub gender: Option<Gender>,

    values: BTreeMap<ClinicalField, f64>,

    /// Known keys whose values could not be read as numbers (or gender).
    unreadable: BTreeSet<String>,
}

impl PatientMeasurement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.patient_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.patient_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, field: ClinicalField, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: ClinicalField, value: f64) {
        self.values.insert(field, value);
    }

    #[must_use]
    pub fn get(&self, field: ClinicalField) -> Option<f64> {
        self.values.get(&field).copied()
    }

    /// Iterate over the fields that are present.
    pub fn values(&self) -> impl Iterator<Item = (ClinicalField, f64)> + '_ {
        self.values.iter().map(|(f, v)| (*f, *v))
    }

    /// Keys that were present in the source record but unreadable.
    #[must_use]
    pub fn unreadable_fields(&self) -> &BTreeSet<String> {
        &self.unreadable
    }
}

/// Assemble the model feature vector in canonical order.
///
/// Absent fields yield 0.0 at their position. Never fails.
#[must_use]
pub fn prepare_features(measurement: &PatientMeasurement) -> FeatureVector {
    let mut features = FeatureVector::zeros();
    for (field, value) in measurement.values() {
        features.set(field, value);
    }
    features
}

/// Model features absent from the measurement (zero-filled by [`prepare_features`]).
#[must_use]
pub fn missing_features(measurement: &PatientMeasurement) -> BTreeSet<ClinicalField> {
    ClinicalField::ALL
        .iter()
        .copied()
        .filter(|f| measurement.get(*f).is_none())
        .collect()
}

/// Parse a JSON document holding either one measurement or an array of them.
///
/// # Errors
/// Returns error if the document is not an object or an array of objects.
pub fn parse_measurements(json: &str) -> Result<Vec<PatientMeasurement>, serde_json::Error> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

/// Flat wire representation of a measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
struct RawMeasurement(serde_json::Map<String, Value>);

/// Numeric reading of a wire value; NaN and infinities count as unreadable.
fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<RawMeasurement> for PatientMeasurement {
    fn from(raw: RawMeasurement) -> Self {
        let mut out = Self::default();

        for (key, value) in raw.0 {
            match key.as_str() {
                "patient_id" => out.patient_id = value_as_label(&value),
                "patient_name" => out.patient_name = value_as_label(&value),
                "gender" => match &value {
                    Value::Null => {}
                    Value::String(s) => match s.parse::<Gender>() {
                        Ok(g) => out.gender = Some(g),
                        Err(_) => {
                            tracing::warn!("Unrecognized gender value, treating as other");
                            out.gender = Some(Gender::Other);
                            out.unreadable.insert(key);
                        }
                    },
                    _ => {
                        out.unreadable.insert(key);
                    }
                },
                name => {
                    let Some(field) = ClinicalField::from_name(name) else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    match value_as_f64(&value) {
                        Some(v) => {
                            out.values.insert(field, v);
                        }
                        None => {
                            tracing::warn!("Unreadable value for {field}, treating as absent");
                            out.unreadable.insert(key);
                        }
                    }
                }
            }
        }

        out
    }
}

impl From<PatientMeasurement> for RawMeasurement {
    fn from(m: PatientMeasurement) -> Self {
        let mut map = serde_json::Map::new();
        if let Some(id) = m.patient_id {
            map.insert("patient_id".into(), Value::String(id));
        }
        if let Some(name) = m.patient_name {
            map.insert("patient_name".into(), Value::String(name));
        }
        if let Some(gender) = m.gender {
            map.insert("gender".into(), Value::String(gender.as_str().into()));
        }
        for (field, value) in m.values {
            if let Some(n) = serde_json::Number::from_f64(value) {
                map.insert(field.name().into(), Value::Number(n));
            }
        }
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_indices() {
        for (i, field) in ClinicalField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert_eq!(ClinicalField::SerumCreatinine.index(), 11);
        assert_eq!(ClinicalField::Hemoglobin.index(), 14);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ClinicalField::SerumCreatinine.label(), "Serum Creatinine");
        assert_eq!(ClinicalField::Age.label(), "Age");
        assert_eq!(
            ClinicalField::WhiteBloodCellCount.label(),
            "White Blood Cell Count"
        );
    }

    #[test]
    fn test_prepare_features_zero_fills() {
        let m = PatientMeasurement::new()
            .with(ClinicalField::Age, 61.0)
            .with(ClinicalField::SerumCreatinine, 2.4);

        let v = prepare_features(&m);
        assert!((v.get(ClinicalField::Age) - 61.0).abs() < f64::EPSILON);
        assert!((v.get(ClinicalField::SerumCreatinine) - 2.4).abs() < f64::EPSILON);
        assert_eq!(v.get(ClinicalField::Hemoglobin), 0.0);

        let missing = missing_features(&m);
        assert_eq!(missing.len(), FEATURE_COUNT - 2);
        assert!(!missing.contains(&ClinicalField::Age));
    }

    #[test]
    fn test_parse_flat_record() {
        let json = r#"{
            "patient_id": "P010",
            "patient_name": "Ada",
            "gender": "Female",
            "age": 48,
            "serum_creatinine": "1.3",
            "hypertension": true,
            "notes": "ignored",
            "sodium": "n/a"
        }"#;
        let parsed = parse_measurements(json).expect("Should parse");
        assert_eq!(parsed.len(), 1);

        let m = &parsed[0];
        assert_eq!(m.patient_id.as_deref(), Some("P010"));
        assert_eq!(m.gender, Some(Gender::Female));
        assert_eq!(m.get(ClinicalField::Age), Some(48.0));
        assert_eq!(m.get(ClinicalField::SerumCreatinine), Some(1.3));
        assert_eq!(m.get(ClinicalField::Hypertension), Some(1.0));
        assert_eq!(m.get(ClinicalField::Sodium), None);
        assert!(m.unreadable_fields().contains("sodium"));
    }

    #[test]
    fn test_parse_array_and_numeric_id() {
        let json = r#"[{"patient_id": 7, "age": 30}, {"age": 40}]"#;
        let parsed = parse_measurements(json).expect("Should parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].patient_id.as_deref(), Some("7"));
        assert!(parsed[1].patient_id.is_none());
    }

    #[test]
    fn test_serialize_is_flat() {
        let m = PatientMeasurement::new()
            .with_id("P1")
            .with_gender(Gender::Male)
            .with(ClinicalField::BloodUrea, 42.0);
        let json = serde_json::to_value(&m).expect("Should serialize");
        assert_eq!(json["patient_id"], "P1");
        assert_eq!(json["gender"], "male");
        assert_eq!(json["blood_urea"], 42.0);
    }

    #[test]
    fn test_unknown_gender_is_other_and_flagged() {
        let parsed = parse_measurements(r#"{"gender": "unspecified"}"#).expect("Should parse");
        assert_eq!(parsed[0].gender, Some(Gender::Other));
        assert!(parsed[0].unreadable_fields().contains("gender"));
    }

    #[test]
    fn test_non_finite_strings_are_unreadable() {
        let parsed = parse_measurements(
            r#"{"age": 60, "serum_creatinine": "NaN", "hemoglobin": "inf", "sodium": "-Infinity"}"#,
        )
        .expect("Should parse");
        let m = &parsed[0];

        assert_eq!(m.get(ClinicalField::Age), Some(60.0));
        assert_eq!(m.get(ClinicalField::SerumCreatinine), None);
        assert_eq!(m.get(ClinicalField::Hemoglobin), None);
        assert_eq!(m.get(ClinicalField::Sodium), None);
        for key in ["serum_creatinine", "hemoglobin", "sodium"] {
            assert!(m.unreadable_fields().contains(key), "{key} not flagged");
        }
        assert!(missing_features(m).contains(&ClinicalField::SerumCreatinine));
    }

    #[test]
    fn test_gender_letters_and_case() {
        assert_eq!("F".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" m ".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("FEMALE".parse::<Gender>(), Ok(Gender::Female));
        assert!("fem".parse::<Gender>().is_err());
    }
}

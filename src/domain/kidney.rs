//! Kidney function: eGFR estimate and five-band CKD staging.
//!
//! The estimate is `186 * Scr^-1.154 * age^-0.203 * (0.742 if female)`. It is
//! neither the CKD-EPI nor the MDRD equation and its output is not medically
//! validated.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::measurement::{ClinicalField, Gender, PatientMeasurement};

/// Age used when the record has none, or a non-positive one.
pub const DEFAULT_AGE: f64 = 50.0;

/// Serum creatinine used when the record has none, or a non-positive one.
pub const DEFAULT_CREATININE: f64 = 1.0;

/// Gender used when the record has none.
pub const DEFAULT_GENDER: Gender = Gender::Male;

const FEMALE_FACTOR: f64 = 0.742;

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Estimate glomerular filtration rate (mL/min/1.73m²), rounded to 2 decimals.
///
/// Creatinine <= 0 is replaced by 1.0 and age <= 0 by [`DEFAULT_AGE`] before
/// exponentiation, which yields a neutral reading instead of an error.
/// Non-physiological inputs are otherwise accepted as-is.
#[must_use]
pub fn estimate_egfr(age: f64, serum_creatinine: f64, gender: Gender) -> f64 {
    let creatinine = if serum_creatinine > 0.0 && serum_creatinine.is_finite() {
        serum_creatinine
    } else {
        DEFAULT_CREATININE
    };
    let age = if age > 0.0 && age.is_finite() {
        age
    } else {
        DEFAULT_AGE
    };

    let mut egfr = 186.0 * creatinine.powf(-1.154) * age.powf(-0.203);
    if gender == Gender::Female {
        egfr *= FEMALE_FACTOR;
    }
    round_to(egfr, 2)
}

/// CKD severity band derived from eGFR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CkdStage {
    /// eGFR >= 90
    Stage1 = 1,
    /// 60 <= eGFR < 90
    Stage2 = 2,
    /// 30 <= eGFR < 60
    Stage3 = 3,
    /// 15 <= eGFR < 30
    Stage4 = 4,
    /// eGFR < 15 (kidney failure)
    Stage5 = 5,
}

impl CkdStage {
    #[must_use]
    pub fn from_egfr(egfr: f64) -> Self {
        if egfr >= 90.0 {
            Self::Stage1
        } else if egfr >= 60.0 {
            Self::Stage2
        } else if egfr >= 30.0 {
            Self::Stage3
        } else if egfr >= 15.0 {
            Self::Stage4
        } else {
            Self::Stage5
        }
    }

    #[must_use]
    pub fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Stage1 => "Normal or high kidney function",
            Self::Stage2 => "Mildly decreased kidney function",
            Self::Stage3 => "Moderately decreased kidney function",
            Self::Stage4 => "Severely decreased kidney function",
            Self::Stage5 => "Kidney failure",
        }
    }
}

impl From<CkdStage> for u8 {
    fn from(stage: CkdStage) -> Self {
        stage.number()
    }
}

impl TryFrom<u8> for CkdStage {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Self::Stage1),
            2 => Ok(Self::Stage2),
            3 => Ok(Self::Stage3),
            4 => Ok(Self::Stage4),
            5 => Ok(Self::Stage5),
            other => Err(format!("CKD stage must be 1-5, got {other}")),
        }
    }
}

impl fmt::Display for CkdStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage {}", self.number())
    }
}

/// eGFR inputs that were defaulted or substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KidneyInput {
    Age,
    SerumCreatinine,
    Gender,
}

/// eGFR and stage for one measurement, with the defaults that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KidneyFunction {
    pub egfr: f64,
    pub stage: CkdStage,
    pub defaulted: BTreeSet<KidneyInput>,
}

/// Resolve eGFR and stage from a measurement.
///
/// Missing age, creatinine and gender fall back to [`DEFAULT_AGE`],
/// [`DEFAULT_CREATININE`] and [`DEFAULT_GENDER`]. Non-positive age or
/// creatinine are substituted the same way. Every fallback is recorded in
/// [`KidneyFunction::defaulted`].
#[must_use]
pub fn assess_kidney_function(measurement: &PatientMeasurement) -> KidneyFunction {
    let mut defaulted = BTreeSet::new();

    let age = match measurement.get(ClinicalField::Age) {
        Some(a) if a > 0.0 && a.is_finite() => a,
        _ => {
            defaulted.insert(KidneyInput::Age);
            DEFAULT_AGE
        }
    };
    let creatinine = match measurement.get(ClinicalField::SerumCreatinine) {
        Some(c) if c > 0.0 && c.is_finite() => c,
        _ => {
            defaulted.insert(KidneyInput::SerumCreatinine);
            DEFAULT_CREATININE
        }
    };
    let gender = measurement.gender.unwrap_or_else(|| {
        defaulted.insert(KidneyInput::Gender);
        DEFAULT_GENDER
    });

    let egfr = estimate_egfr(age, creatinine, gender);
    KidneyFunction {
        egfr,
        stage: CkdStage::from_egfr(egfr),
        defaulted,
    }
}

/// CKD stage (1-5) for a measurement.
#[must_use]
pub fn classify_stage(measurement: &PatientMeasurement) -> CkdStage {
    assess_kidney_function(measurement).stage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_egfr_reference_value() {
        // 186 * 1^-1.154 * 50^-0.203
        let expected = round_to(186.0 * 50f64.powf(-0.203), 2);
        assert_eq!(estimate_egfr(50.0, 1.0, Gender::Male), expected);
        assert!((expected - 84.07).abs() < 0.05);
    }

    #[test]
    fn test_egfr_matches_documented_formula() {
        // Unit age and creatinine leave only the leading constant and the
        // female factor.
        assert_eq!(estimate_egfr(1.0, 1.0, Gender::Male), 186.0);
        assert_eq!(estimate_egfr(1.0, 1.0, Gender::Female), 138.01);
        assert_eq!(estimate_egfr(1.0, 1.0, Gender::Other), 186.0);
    }

    #[test]
    fn test_egfr_decreasing_in_age_and_creatinine() {
        let mut last = f64::INFINITY;
        for age in [20.0, 30.0, 45.0, 60.0, 75.0, 90.0] {
            let egfr = estimate_egfr(age, 1.2, Gender::Male);
            assert!(egfr < last, "eGFR should fall with age");
            last = egfr;
        }

        let mut last = f64::INFINITY;
        for creatinine in [0.5, 0.8, 1.2, 2.0, 4.0, 8.0] {
            let egfr = estimate_egfr(60.0, creatinine, Gender::Female);
            assert!(egfr < last, "eGFR should fall with creatinine");
            last = egfr;
        }
    }

    #[test]
    fn test_female_adjustment() {
        for (age, creatinine) in [(30.0, 0.7), (55.0, 1.4), (80.0, 3.0)] {
            let male = estimate_egfr(age, creatinine, Gender::Male);
            let female = estimate_egfr(age, creatinine, Gender::Female);
            assert!((female - male * 0.742).abs() <= 0.01);
        }
        // Only female is adjusted.
        assert_eq!(
            estimate_egfr(40.0, 1.1, Gender::Other),
            estimate_egfr(40.0, 1.1, Gender::Male)
        );
    }

    #[test]
    fn test_non_positive_creatinine_substituted() {
        let neutral = estimate_egfr(50.0, 1.0, Gender::Male);
        assert_eq!(estimate_egfr(50.0, 0.0, Gender::Male), neutral);
        assert_eq!(estimate_egfr(50.0, -2.0, Gender::Male), neutral);
        assert!(estimate_egfr(-5.0, 1.0, Gender::Male).is_finite());
    }

    #[test]
    fn test_stage_boundaries() {
        let cases = [
            (90.0, 1),
            (89.99, 2),
            (60.0, 2),
            (59.99, 3),
            (30.0, 3),
            (29.99, 4),
            (15.0, 4),
            (14.99, 5),
        ];
        for (egfr, stage) in cases {
            assert_eq!(CkdStage::from_egfr(egfr).number(), stage, "eGFR {egfr}");
        }
    }

    #[test]
    fn test_missing_inputs_use_defaults() {
        let kf = assess_kidney_function(&PatientMeasurement::new());
        assert_eq!(kf.egfr, estimate_egfr(DEFAULT_AGE, DEFAULT_CREATININE, Gender::Male));
        assert_eq!(kf.stage, CkdStage::Stage2);
        assert_eq!(kf.defaulted.len(), 3);

        let m = PatientMeasurement::new()
            .with_gender(Gender::Female)
            .with(ClinicalField::Age, 72.0)
            .with(ClinicalField::SerumCreatinine, 8.0);
        let kf = assess_kidney_function(&m);
        assert!(kf.defaulted.is_empty());
        assert_eq!(kf.stage, CkdStage::Stage5);
    }

    #[test]
    fn test_stage_serializes_as_number() {
        let json = serde_json::to_string(&CkdStage::Stage3).expect("Should serialize");
        assert_eq!(json, "3");
        let back: CkdStage = serde_json::from_str("4").expect("Should parse");
        assert_eq!(back, CkdStage::Stage4);
        assert!(serde_json::from_str::<CkdStage>("6").is_err());
    }
}

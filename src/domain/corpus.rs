//! Labelled training corpus and the synthetic cohort generator.
//!
//! No real patient data is used for training. The generator draws every
//! feature from N(0, 1) and then overwrites six clinically salient features
//! with class-specific uniform ranges, so the classes are separable on
//! those six and noise elsewhere.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use statrs::distribution::Normal;

use super::measurement::{ClinicalField, FeatureVector};

/// Default synthetic corpus size (half healthy, half CKD).
pub const DEFAULT_TRAINING_SAMPLES: usize = 1000;

/// Default seed for corpus generation and forest training.
pub const DEFAULT_SEED: u64 = 42;

/// Class-specific uniform range `[low, high)` for one salient feature.
#[derive(Debug, Clone, Copy)]
struct SalientRange {
    field: ClinicalField,
    healthy: (f64, f64),
    ckd: (f64, f64),
}

const SALIENT_RANGES: [SalientRange; 6] = [
    SalientRange {
        field: ClinicalField::Age,
        healthy: (20.0, 60.0),
        ckd: (45.0, 80.0),
    },
    SalientRange {
        field: ClinicalField::BpSystolic,
        healthy: (110.0, 130.0),
        ckd: (140.0, 180.0),
    },
    SalientRange {
        field: ClinicalField::BpDiastolic,
        healthy: (70.0, 85.0),
        ckd: (90.0, 120.0),
    },
    SalientRange {
        field: ClinicalField::SerumCreatinine,
        healthy: (0.5, 1.2),
        ckd: (1.5, 8.0),
    },
    SalientRange {
        field: ClinicalField::BloodUrea,
        healthy: (10.0, 40.0),
        ckd: (50.0, 150.0),
    },
    SalientRange {
        field: ClinicalField::Hemoglobin,
        healthy: (12.0, 17.0),
        ckd: (6.0, 12.0),
    },
];

/// Errors raised while generating the synthetic cohort.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CorpusError {
    #[error("Invalid noise distribution: {0}")]
    Noise(String),
}

/// Feature rows with binary labels (`true` = CKD).
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<bool>,
}

impl TrainingCorpus {
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of samples labelled CKD.
    #[must_use]
    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&y| y).count()
    }

    pub fn push(&mut self, features: FeatureVector, ckd: bool) {
        self.features.push(features);
        self.labels.push(ckd);
    }
}

/// Generator for the balanced synthetic training cohort.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticCohort {
    /// Total samples; split evenly between the classes
    pub samples: usize,
    pub seed: u64,
}

impl Default for SyntheticCohort {
    fn default() -> Self {
        Self {
            samples: DEFAULT_TRAINING_SAMPLES,
            seed: DEFAULT_SEED,
        }
    }
}

impl SyntheticCohort {
    #[must_use]
    pub fn new(samples: usize, seed: u64) -> Self {
        Self { samples, seed }
    }

    /// Generate the corpus: all healthy rows first, then all CKD rows.
    ///
    /// The same seed always yields the same corpus.
    ///
    /// # Errors
    /// Returns `CorpusError` if the noise distribution cannot be built.
    pub fn generate(&self) -> Result<TrainingCorpus, CorpusError> {
        let noise = Normal::new(0.0, 1.0).map_err(|e| CorpusError::Noise(e.to_string()))?;
        let per_class = self.samples / 2;
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        let mut corpus = TrainingCorpus {
            features: Vec::with_capacity(per_class * 2),
            labels: Vec::with_capacity(per_class * 2),
        };

        for ckd in [false, true] {
            for _ in 0..per_class {
                let mut row = FeatureVector::zeros();
                for value in &mut row.0 {
                    *value = rng.sample(noise);
                }
                for range in &SALIENT_RANGES {
                    let (low, high) = if ckd { range.ckd } else { range.healthy };
                    row.set(range.field, rng.gen_range(low..high));
                }
                corpus.push(row, ckd);
            }
        }

        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_and_sized() {
        let corpus = SyntheticCohort::default().generate().expect("Should generate");
        assert_eq!(corpus.len(), 1000);
        assert_eq!(corpus.positive_count(), 500);
        assert!(!corpus.labels[0]);
        assert!(corpus.labels[999]);
    }

    #[test]
    fn test_salient_ranges_respected() {
        let corpus = SyntheticCohort::new(200, 7).generate().expect("Should generate");
        for (row, &ckd) in corpus.features.iter().zip(&corpus.labels) {
            let creatinine = row.get(ClinicalField::SerumCreatinine);
            let hemoglobin = row.get(ClinicalField::Hemoglobin);
            if ckd {
                assert!((1.5..8.0).contains(&creatinine));
                assert!((6.0..12.0).contains(&hemoglobin));
            } else {
                assert!((0.5..1.2).contains(&creatinine));
                assert!((12.0..17.0).contains(&hemoglobin));
            }
        }
    }

    #[test]
    fn test_seed_reproducible() {
        let a = SyntheticCohort::new(50, 3).generate().expect("Should generate");
        let b = SyntheticCohort::new(50, 3).generate().expect("Should generate");
        let c = SyntheticCohort::new(50, 4).generate().expect("Should generate");
        assert_eq!(a.features, b.features);
        assert_ne!(a.features, c.features);
    }

    #[test]
    fn test_noise_features_roughly_standard() {
        let corpus = SyntheticCohort::default().generate().expect("Should generate");
        let sodium: Vec<f64> = corpus
            .features
            .iter()
            .map(|r| r.get(ClinicalField::Sodium))
            .collect();
        let mean = sodium.iter().sum::<f64>() / sodium.len() as f64;
        let var = sodium.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / sodium.len() as f64;
        assert!(mean.abs() < 0.15);
        assert!((var - 1.0).abs() < 0.2);
    }

    #[test]
    fn test_noise_has_normal_spread() {
        let corpus = SyntheticCohort::default().generate().expect("Should generate");
        let potassium: Vec<f64> = corpus
            .features
            .iter()
            .map(|r| r.get(ClinicalField::Potassium))
            .collect();
        let within_one = potassium.iter().filter(|x| x.abs() < 1.0).count() as f64;
        let share = within_one / potassium.len() as f64;
        assert!((0.62..0.74).contains(&share), "share within one sd {share}");
        assert!(potassium.iter().any(|x| x.abs() > 2.5));
    }
}

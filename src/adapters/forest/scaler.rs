//! Per-feature standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, FEATURE_COUNT};

/// Standard scaler fitted on a training corpus.
///
/// Uses the population standard deviation. Constant columns keep a scale of
/// 1.0 so they pass through centred but unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Fit on the given rows. Returns `None` for an empty slice.
    #[must_use]
    pub fn fit(rows: &[FeatureVector]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;

        let mut mean = [0.0; FEATURE_COUNT];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row.as_slice()) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = [0.0; FEATURE_COUNT];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row.as_slice()).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }

        let mut scale = [1.0; FEATURE_COUNT];
        for (s, v) in scale.iter_mut().zip(&var) {
            let std = (v / n).sqrt();
            if std > f64::EPSILON {
                *s = std;
            }
        }

        Some(Self { mean, scale })
    }

    #[must_use]
    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = FeatureVector::zeros();
        for i in 0..FEATURE_COUNT {
            out.0[i] = (row.0[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

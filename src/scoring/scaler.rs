//! Zero-mean, unit-variance feature scaling.

use serde::{Deserialize, Serialize};

use super::FeatureVector;

/// Per-feature standardization parameters fitted on a training set.
///
/// A feature with zero variance is left unscaled (its scale is pinned to 1)
/// so that transforming never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature means.
    means: Vec<f64>,
    /// Per-feature standard deviations (population), zero pinned to 1.
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit scaler parameters on a training set.
    #[must_use]
    pub fn fit(samples: &[FeatureVector]) -> Self {
        let n_features = samples.first().map_or(0, |row| row.len());
        let mut means = vec![0.0; n_features];
        let mut scales = vec![1.0; n_features];

        if samples.is_empty() {
            return Self { means, scales };
        }

        let count = samples.len() as f64;
        for row in samples {
            for (j, value) in row.iter().enumerate() {
                means[j] += value;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }

        for (j, scale) in scales.iter_mut().enumerate() {
            let variance = samples
                .iter()
                .map(|row| {
                    let d = row[j] - means[j];
                    d * d
                })
                .sum::<f64>()
                / count;
            let std = variance.sqrt();
            *scale = if std > 0.0 { std } else { 1.0 };
        }

        Self { means, scales }
    }

    /// Standardize one feature vector. Features beyond the fitted width are
    /// passed through unchanged.
    #[must_use]
    pub fn transform(&self, features: FeatureVector) -> FeatureVector {
        let mut scaled = features;
        for ((value, mean), scale) in scaled.iter_mut().zip(&self.means).zip(&self.scales) {
            *value = (*value - mean) / scale;
        }
        scaled
    }

    /// Fitted per-feature means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted per-feature scales.
    #[must_use]
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

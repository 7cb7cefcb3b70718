//! Synthetic training data for the delay classifier.
//!
//! No labeled observational data exists at first run, so the model is
//! bootstrapped from procedurally generated feature/label pairs. The label
//! rule marks slow or low flights as delayed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};

use super::{FeatureVector, FEATURE_COUNT};

/// Seed used for the initial training run.
pub const TRAINING_SEED: u64 = 42;

/// Number of synthetic samples generated.
pub const SAMPLE_COUNT: usize = 1_000;

/// A generated training set.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    /// Feature rows in the fixed feature order.
    pub features: Vec<FeatureVector>,
    /// Binary delay labels, one per row.
    pub labels: Vec<u8>,
}

/// Generate the synthetic training set for a given seed.
///
/// Distributions: `velocity ~ Normal(250, 50)`, `altitude ~ Normal(10000,
/// 2000)`, `distance_to_dest ~ Uniform(0, 1000)`, `hour_of_day ~
/// UniformInt[0, 24)`. Label rule: delayed when `velocity < 200` or
/// `altitude < 8000`. Deterministic for a fixed seed.
///
/// # Errors
///
/// Returns an error if a sampling distribution cannot be constructed.
pub fn training_set(seed: u64) -> Result<TrainingSet> {
    let mut rng = StdRng::seed_from_u64(seed);

    let velocity_dist =
        Normal::new(250.0, 50.0).map_err(|e| Error::model_train(format!("velocity: {e}")))?;
    let altitude_dist =
        Normal::new(10_000.0, 2_000.0).map_err(|e| Error::model_train(format!("altitude: {e}")))?;

    // Columns are drawn one at a time so the stream of random draws per
    // feature is stable regardless of sample count changes elsewhere.
    let velocities: Vec<f64> = (0..SAMPLE_COUNT)
        .map(|_| velocity_dist.sample(&mut rng))
        .collect();
    let altitudes: Vec<f64> = (0..SAMPLE_COUNT)
        .map(|_| altitude_dist.sample(&mut rng))
        .collect();
    let distances: Vec<f64> = (0..SAMPLE_COUNT)
        .map(|_| rng.gen_range(0.0..1_000.0))
        .collect();
    let hours: Vec<f64> = (0..SAMPLE_COUNT)
        .map(|_| f64::from(rng.gen_range(0..24_u32)))
        .collect();

    let mut features = Vec::with_capacity(SAMPLE_COUNT);
    let mut labels = Vec::with_capacity(SAMPLE_COUNT);
    for i in 0..SAMPLE_COUNT {
        let row: FeatureVector = [velocities[i], altitudes[i], distances[i], hours[i]];
        debug_assert_eq!(row.len(), FEATURE_COUNT);
        labels.push(u8::from(row[0] < 200.0 || row[1] < 8_000.0));
        features.push(row);
    }

    Ok(TrainingSet { features, labels })
}

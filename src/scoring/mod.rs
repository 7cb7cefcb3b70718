//! Delay-risk scoring for flight records.
//!
//! The scorer holds a decision-tree ensemble and a feature scaler. On first
//! use, when no persisted model exists, it trains one from synthetic data and
//! persists the parameters; otherwise it loads them from disk. After
//! initialization scoring is a pure function of the input record.

pub mod forest;
pub mod scaler;
pub mod synthetic;

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone, Timelike};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::flight::FlightRecord;

use forest::{ForestParams, RandomForest};
use scaler::StandardScaler;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 4;

/// Ordered names of the model input features.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["velocity", "altitude", "distance_to_dest", "hour_of_day"];

/// One row of model input, in [`FEATURE_NAMES`] order.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Placeholder for the unimplemented distance-to-destination feature.
///
/// The model trains with this feature varying but scores with it pinned to
/// zero until a destination source exists.
const DISTANCE_TO_DEST_PLACEHOLDER: f64 = 0.0;

/// Outcome of attempting to load persisted model parameters.
#[derive(Debug)]
enum LoadOutcome {
    /// Both files were present and parsed.
    Loaded {
        forest: RandomForest,
        scaler: StandardScaler,
    },
    /// One or both files do not exist.
    NotFound,
    /// Files exist but could not be read or parsed.
    Corrupt(String),
}

/// Scores flight records with a persisted or freshly trained model.
///
/// Effectively stateless after construction: `score` is a pure function of
/// the input record, and no learning occurs from scored traffic.
#[derive(Debug)]
pub struct RiskScorer {
    forest: RandomForest,
    scaler: StandardScaler,
    model_path: PathBuf,
    scaler_path: PathBuf,
}

impl RiskScorer {
    /// Load the persisted model, or train a fresh one when none exists or
    /// the persisted copy is unusable.
    ///
    /// # Errors
    ///
    /// Returns an error only when training fails; the scorer cannot operate
    /// without a model. A failure to *persist* a freshly trained model is
    /// logged and ignored.
    pub fn open(config: &Config) -> Result<Self> {
        let model_path = config.model_path();
        let scaler_path = config.scaler_path();

        match load_persisted(&model_path, &scaler_path) {
            LoadOutcome::Loaded { forest, scaler } => {
                info!("loaded model and scaler from {}", model_path.display());
                Ok(Self {
                    forest,
                    scaler,
                    model_path,
                    scaler_path,
                })
            }
            LoadOutcome::NotFound => {
                info!("no persisted model found; training a new one");
                Self::train_fresh(model_path, scaler_path)
            }
            LoadOutcome::Corrupt(message) => {
                warn!("persisted model unusable ({message}); training a new one");
                Self::train_fresh(model_path, scaler_path)
            }
        }
    }

    /// Train a fresh model unconditionally, ignoring any persisted copy.
    ///
    /// # Errors
    ///
    /// Returns an error if training fails.
    pub fn train_new(config: &Config) -> Result<Self> {
        Self::train_fresh(config.model_path(), config.scaler_path())
    }

    /// Train a fresh model, replacing the in-memory one, and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if training fails.
    pub fn retrain(&mut self) -> Result<()> {
        let (forest, scaler) = train(synthetic::TRAINING_SEED)?;
        self.forest = forest;
        self.scaler = scaler;
        if let Err(err) = self.persist() {
            warn!("failed to persist model: {err}; continuing with the in-memory model");
        }
        Ok(())
    }

    /// Delay probability for one record, in [0, 1].
    ///
    /// Returns 0.0 and logs when feature construction or inference fails;
    /// a bad record never aborts the batch.
    #[must_use]
    pub fn score(&self, record: &FlightRecord) -> f64 {
        match self.try_score(record) {
            Ok(probability) => probability,
            Err(reason) => {
                warn!(
                    "scoring failed for {} ({reason}); returning neutral probability",
                    record.icao24
                );
                0.0
            }
        }
    }

    /// Path the classifier parameters are persisted at.
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Path the scaler parameters are persisted at.
    #[must_use]
    pub fn scaler_path(&self) -> &Path {
        &self.scaler_path
    }

    fn train_fresh(model_path: PathBuf, scaler_path: PathBuf) -> Result<Self> {
        let (forest, scaler) = train(synthetic::TRAINING_SEED)?;
        let scorer = Self {
            forest,
            scaler,
            model_path,
            scaler_path,
        };
        if let Err(err) = scorer.persist() {
            warn!("failed to persist model: {err}; continuing with the in-memory model");
        }
        Ok(scorer)
    }

    /// Serialize the model and scaler to their sibling files.
    fn persist(&self) -> Result<()> {
        for path in [&self.model_path, &self.scaler_path] {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
            }
        }

        debug!("saving model to {}", self.model_path.display());
        std::fs::write(&self.model_path, serde_json::to_vec(&self.forest)?)?;
        debug!("saving scaler to {}", self.scaler_path.display());
        std::fs::write(&self.scaler_path, serde_json::to_vec(&self.scaler)?)?;
        info!("model and scaler saved");
        Ok(())
    }

    fn try_score(&self, record: &FlightRecord) -> std::result::Result<f64, String> {
        let features = features_for(record)?;
        let scaled = self.scaler.transform(features);
        Ok(self.forest.predict_probability(&scaled))
    }
}

/// Build the model input for one record.
///
/// `distance_to_dest` is always the placeholder constant; `hour_of_day` is
/// the record's timestamp converted to the local hour.
fn features_for(record: &FlightRecord) -> std::result::Result<FeatureVector, String> {
    if !record.velocity.is_finite() || !record.altitude.is_finite() {
        return Err("non-finite velocity or altitude".to_string());
    }
    let hour = Local
        .timestamp_opt(record.timestamp, 0)
        .single()
        .ok_or_else(|| format!("timestamp {} out of range", record.timestamp))?
        .hour();

    Ok([
        record.velocity,
        record.altitude,
        DISTANCE_TO_DEST_PLACEHOLDER,
        f64::from(hour),
    ])
}

/// Fit the scaler and forest on the synthetic training set.
fn train(seed: u64) -> Result<(RandomForest, StandardScaler)> {
    let set = synthetic::training_set(seed)?;
    if set.features.is_empty() {
        return Err(Error::model_train("empty training set"));
    }

    info!(
        "training delay model on {} synthetic samples",
        set.features.len()
    );
    let scaler = StandardScaler::fit(&set.features);
    let scaled: Vec<FeatureVector> = set
        .features
        .iter()
        .map(|&row| scaler.transform(row))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let forest = RandomForest::fit(&scaled, &set.labels, ForestParams::default(), &mut rng);
    info!("training completed ({} trees)", forest.tree_count());
    Ok((forest, scaler))
}

fn load_persisted(model_path: &Path, scaler_path: &Path) -> LoadOutcome {
    if !model_path.exists() || !scaler_path.exists() {
        return LoadOutcome::NotFound;
    }

    let forest = match read_json::<RandomForest>(model_path) {
        Ok(forest) => forest,
        Err(message) => return LoadOutcome::Corrupt(message),
    };
    let scaler = match read_json::<StandardScaler>(scaler_path) {
        Ok(scaler) => scaler,
        Err(message) => return LoadOutcome::Corrupt(message),
    };
    LoadOutcome::Loaded { forest, scaler }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> std::result::Result<T, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("{}: {e}", path.display()))
}

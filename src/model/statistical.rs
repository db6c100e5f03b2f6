//! Trained classifier over the feature triple.
//!
//! Lifecycle:
//!
//! - [`StatisticalClassifier::open`] loads persisted state, or bootstraps from
//!   synthetic data when the store is empty
//! - [`StatisticalClassifier::classify`] scales the features, asks the forest
//!   for a tier, then applies the same fine adjustment as the rules
//! - [`StatisticalClassifier::update`] refits the forest on labelled samples and
//!   re-persists
//!
//! Readers clone an `Arc` of the published state and never block on training.
//! Training holds `writer` and the store's exclusive transaction across
//! reload → transform → fit → persist, and swaps the published state only after
//! the store accepted it. The transaction makes this hold across processes
//! sharing one model directory, not just across threads.

use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{FeatureVector, LabeledSample, RiskResult, RiskTier};
use crate::error::{QuoteError, QuoteResult};
use crate::math::{N_FEATURES, StandardScaler};
use crate::model::bootstrap::{DEFAULT_SAMPLES_PER_TIER, generate_bootstrap};
use crate::model::forest::{ForestParams, RandomForest};
use crate::model::store::{ModelArtifact, ModelStore, ModelTxn, ScalerArtifact};
use crate::risk::{ADJUSTMENT_CUTOFF, adjusted_multiplier};

/// Score above which a dimension is described as a medium factor.
const MEDIUM_BAND: f64 = 0.3;

/// What `update` trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingHistory {
    /// Refit on the new batch only.
    Discard,
    /// Refit on every sample seen so far, bootstrap set included.
    Accumulate,
}

impl FromStr for TrainingHistory {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(TrainingHistory::Discard),
            "accumulate" => Ok(TrainingHistory::Accumulate),
            other => Err(QuoteError::Config(format!(
                "unknown training history policy '{other}' (expected discard or accumulate)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalSettings {
    pub bootstrap_seed: u64,
    pub samples_per_tier: usize,
    pub trees: usize,
    pub history: TrainingHistory,
}

impl Default for StatisticalSettings {
    fn default() -> Self {
        Self {
            bootstrap_seed: 42,
            samples_per_tier: DEFAULT_SAMPLES_PER_TIER,
            trees: 100,
            history: TrainingHistory::Accumulate,
        }
    }
}

/// Published, immutable trained state.
#[derive(Debug)]
struct TrainedState {
    generation: u64,
    trained_at: DateTime<Utc>,
    scaler: StandardScaler,
    forest: RandomForest,
    history: Vec<LabeledSample>,
}

impl TrainedState {
    fn from_artifacts(scaler: ScalerArtifact, model: ModelArtifact) -> Self {
        Self {
            generation: model.generation,
            trained_at: model.trained_at,
            scaler: scaler.scaler,
            forest: model.forest,
            history: model.history,
        }
    }

    fn to_artifacts(&self) -> (ScalerArtifact, ModelArtifact) {
        (
            ScalerArtifact {
                generation: self.generation,
                trained_at: self.trained_at,
                scaler: self.scaler.clone(),
            },
            ModelArtifact {
                generation: self.generation,
                trained_at: self.trained_at,
                forest: self.forest.clone(),
                history: self.history.clone(),
            },
        )
    }

    fn predict_index(&self, features: &FeatureVector) -> usize {
        self.forest.predict(&self.scaler.transform(&features.as_array()))
    }
}

pub struct StatisticalClassifier {
    store: Box<dyn ModelStore>,
    settings: StatisticalSettings,
    state: RwLock<Option<Arc<TrainedState>>>,
    writer: Mutex<()>,
}

impl std::fmt::Debug for StatisticalClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticalClassifier")
            .field("store", &self.store.describe())
            .field("settings", &self.settings)
            .field("generation", &self.generation())
            .finish()
    }
}

impl StatisticalClassifier {
    /// Load trained state from `store`, bootstrapping it if the store is empty.
    ///
    /// Corrupt or partial artifacts are an error; they are never silently
    /// replaced by a fresh bootstrap.
    pub fn open(store: Box<dyn ModelStore>, settings: StatisticalSettings) -> QuoteResult<Self> {
        let classifier = Self::untrained(store, settings);
        match classifier.store.load()? {
            Some((scaler, model)) => {
                info!(
                    store = %classifier.store.describe(),
                    generation = model.generation,
                    trained_at = %model.trained_at,
                    "loaded risk model"
                );
                classifier.publish(TrainedState::from_artifacts(scaler, model));
            }
            None => {
                // Another process may bootstrap the same store first; adopt its result.
                let _guard = classifier.writer.lock().unwrap_or_else(|e| e.into_inner());
                classifier.store.transaction(&mut |txn| {
                    classifier.refresh(txn)?;
                    if !classifier.is_trained() {
                        classifier.bootstrap_with(txn)?;
                    }
                    Ok(())
                })?;
            }
        }
        Ok(classifier)
    }

    /// A classifier with no trained state; `classify` returns `None` until trained.
    pub fn untrained(store: Box<dyn ModelStore>, settings: StatisticalSettings) -> Self {
        Self {
            store,
            settings,
            state: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &StatisticalSettings {
        &self.settings
    }

    pub fn is_trained(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn generation(&self) -> Option<u64> {
        self.snapshot().map(|s| s.generation)
    }

    /// Number of samples the current forest was fit on.
    pub fn history_len(&self) -> usize {
        self.snapshot().map_or(0, |s| s.history.len())
    }

    /// Train from the synthetic bootstrap set and persist.
    pub fn bootstrap(&self) -> QuoteResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.store.transaction(&mut |txn| {
            self.refresh(txn)?;
            self.bootstrap_with(txn)
        })
    }

    /// Adopt whatever the store holds if it differs from the published state.
    /// Runs under the store lock, so the result stays current until it is released.
    fn refresh(&self, txn: &mut dyn ModelTxn) -> QuoteResult<()> {
        let Some((scaler, model)) = txn.load()? else {
            return Ok(());
        };
        if self.generation() != Some(model.generation) {
            info!(
                store = %self.store.describe(),
                generation = model.generation,
                previous = ?self.generation(),
                "picked up risk model written by another process"
            );
            self.publish(TrainedState::from_artifacts(scaler, model));
        }
        Ok(())
    }

    fn bootstrap_with(&self, txn: &mut dyn ModelTxn) -> QuoteResult<()> {
        if self.settings.samples_per_tier == 0 {
            return Err(QuoteError::Config(
                "bootstrap needs at least one sample per tier".to_string(),
            ));
        }
        let samples = generate_bootstrap(self.settings.samples_per_tier, self.settings.bootstrap_seed);
        let rows: Vec<[f64; N_FEATURES]> = samples.iter().map(|s| s.features.as_array()).collect();
        let scaler = StandardScaler::fit(&rows)
            .ok_or_else(|| QuoteError::Training("bootstrap set produced no rows to scale".to_string()))?;

        let generation = self.generation().map_or(1, |g| g + 1);
        let forest = self.fit_forest(&scaler, &samples, generation)?;
        let state = TrainedState {
            generation,
            trained_at: Utc::now(),
            scaler,
            forest,
            history: samples,
        };
        self.persist_and_publish(txn, state)?;
        info!(
            store = %self.store.describe(),
            generation,
            samples = self.history_len(),
            trees = self.settings.trees,
            "bootstrap-trained risk model"
        );
        Ok(())
    }

    /// Refit the forest with labelled samples and persist.
    ///
    /// Features are transformed with the existing scaler; the scaler itself is
    /// not refit. Under [`TrainingHistory::Accumulate`] the forest is fit on all
    /// retained samples plus `batch`, under `Discard` on `batch` alone.
    ///
    /// The store is re-read under its lock first, so an update written by
    /// another process in the meantime is built upon rather than overwritten.
    pub fn update(&self, batch: &[LabeledSample]) -> QuoteResult<bool> {
        if batch.is_empty() {
            return Err(QuoteError::EmptyBatch);
        }
        validate_batch(batch)?;

        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut updated = false;
        self.store.transaction(&mut |txn| {
            self.refresh(txn)?;
            if !self.is_trained() {
                self.bootstrap_with(txn)?;
            }
            let Some(current) = self.snapshot() else {
                return Ok(());
            };

            let history: Vec<LabeledSample> = match self.settings.history {
                TrainingHistory::Discard => batch.to_vec(),
                TrainingHistory::Accumulate => current.history.iter().chain(batch).copied().collect(),
            };

            let generation = current.generation + 1;
            let forest = self.fit_forest(&current.scaler, &history, generation)?;
            let state = TrainedState {
                generation,
                trained_at: Utc::now(),
                scaler: current.scaler.clone(),
                forest,
                history,
            };
            self.persist_and_publish(txn, state)?;
            updated = true;
            Ok(())
        })?;

        if updated {
            info!(
                generation = ?self.generation(),
                batch = batch.len(),
                retained = self.history_len(),
                policy = ?self.settings.history,
                "updated risk model"
            );
        }
        Ok(updated)
    }

    /// Tier predicted by the forest alone.
    pub fn predict_tier(&self, features: &FeatureVector) -> Option<RiskTier> {
        let state = self.snapshot()?;
        RiskTier::from_index(state.predict_index(features))
    }

    pub fn classify(&self, features: &FeatureVector) -> Option<RiskResult> {
        let tier = self.predict_tier(features)?;
        let result = RiskResult {
            tier,
            multiplier: adjusted_multiplier(tier, features),
            justification: justification(tier, features),
        };
        debug!(tier = tier.display_name(), multiplier = result.multiplier, "statistical classification");
        Some(result)
    }

    fn fit_forest(
        &self,
        scaler: &StandardScaler,
        samples: &[LabeledSample],
        generation: u64,
    ) -> QuoteResult<RandomForest> {
        let rows: Vec<[f64; N_FEATURES]> = samples
            .iter()
            .map(|s| scaler.transform(&s.features.as_array()))
            .collect();
        let labels: Vec<usize> = samples.iter().map(|s| s.tier).collect();
        let params = ForestParams {
            n_trees: self.settings.trees.max(1),
            seed: self.settings.bootstrap_seed.wrapping_add(generation - 1),
            ..ForestParams::default()
        };
        RandomForest::fit(&rows, &labels, params).ok_or_else(|| {
            QuoteError::Training(format!("cannot fit forest on {} samples for generation {generation}", rows.len()))
        })
    }

    fn persist_and_publish(&self, txn: &mut dyn ModelTxn, state: TrainedState) -> QuoteResult<()> {
        let (scaler, model) = state.to_artifacts();
        txn.save(&scaler, &model)?;
        self.publish(state);
        Ok(())
    }

    fn publish(&self, state: TrainedState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(state));
    }

    fn snapshot(&self) -> Option<Arc<TrainedState>> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn validate_batch(batch: &[LabeledSample]) -> QuoteResult<()> {
    for (position, sample) in batch.iter().enumerate() {
        sample
            .check()
            .map_err(|reason| QuoteError::InvalidSample { position, reason })?;
    }
    Ok(())
}

/// Tier clause plus banded commentary on complexity and environment.
fn justification(tier: RiskTier, features: &FeatureVector) -> String {
    let mut text = tier.height_clause().to_string();

    if features.complexity_score > ADJUSTMENT_CUTOFF {
        text.push_str(" High complexity increases the risk.");
    } else if features.complexity_score > MEDIUM_BAND {
        text.push_str(" Medium complexity considered in the assessment.");
    }

    if features.environment_score > ADJUSTMENT_CUTOFF {
        text.push_str(" Adverse environmental conditions increase the risk.");
    } else if features.environment_score > MEDIUM_BAND {
        text.push_str(" Outdoor environment considered in the assessment.");
    }

    text
}

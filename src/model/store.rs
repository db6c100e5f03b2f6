//! Persistence of the trained scaler + forest pair.
//!
//! The file store keeps two JSON artifacts in one directory:
//!
//! - `risk_scaler.json`: the fitted [`StandardScaler`]
//! - `risk_model.json`: the [`RandomForest`] plus its retained training samples
//!
//! Both carry the same `generation` and `trained_at`. Each file is written to a
//! temporary sibling and renamed into place, so a reader never opens a
//! half-written artifact.
//!
//! Writers hold an exclusive advisory lock on `.risk_model.lock` for the whole
//! read → fit → write cycle (see [`ModelStore::transaction`]); readers hold a
//! shared lock while reading the pair. Processes sharing a directory therefore
//! never interleave updates and never observe one new artifact next to one old
//! one. A writer that died between the two renames leaves its second artifact
//! as a temporary file; the next locked load completes that publish.
//!
//! On load:
//!
//! - neither file present → `Ok(None)` (caller bootstraps)
//! - both present, parseable, same generation, structurally sound → `Ok(Some(..))`
//! - anything else → [`QuoteError::ModelLoad`]

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::LabeledSample;
use crate::error::{QuoteError, QuoteResult};
use crate::math::StandardScaler;
use crate::model::forest::RandomForest;

pub const SCALER_FILE: &str = "risk_scaler.json";
pub const MODEL_FILE: &str = "risk_model.json";
pub const LOCK_FILE: &str = ".risk_model.lock";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub generation: u64,
    pub trained_at: DateTime<Utc>,
    pub scaler: StandardScaler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub generation: u64,
    pub trained_at: DateTime<Utc>,
    pub forest: RandomForest,
    /// Samples the forest was fit on (kept for the accumulate policy).
    #[serde(default)]
    pub history: Vec<LabeledSample>,
}

pub type ArtifactPair = (ScalerArtifact, ModelArtifact);

/// Where trained classifier state lives between process runs.
pub trait ModelStore: Send + Sync {
    /// Read the current pair. Never observes a concurrent writer's partial publish.
    fn load(&self) -> QuoteResult<Option<ArtifactPair>>;

    /// Run `body` while holding the store's exclusive write lock.
    ///
    /// Everything `body` reads through the [`ModelTxn`] stays current until it
    /// returns: no other classifier, in this process or another, can save in
    /// between.
    fn transaction(&self, body: &mut dyn FnMut(&mut dyn ModelTxn) -> QuoteResult<()>) -> QuoteResult<()>;

    /// Save a pair in its own transaction.
    fn save(&self, scaler: &ScalerArtifact, model: &ModelArtifact) -> QuoteResult<()> {
        self.transaction(&mut |txn| txn.save(scaler, model))
    }

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Store access while the exclusive lock is held.
pub trait ModelTxn {
    fn load(&mut self) -> QuoteResult<Option<ArtifactPair>>;

    fn save(&mut self, scaler: &ScalerArtifact, model: &ModelArtifact) -> QuoteResult<()>;
}

/// JSON artifacts in a directory.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn lock_file(&self) -> QuoteResult<fd_lock::RwLock<File>> {
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| QuoteError::io(format!("Failed to open model lock '{}'", path.display()), e))?;
        Ok(fd_lock::RwLock::new(file))
    }

    /// Both artifacts as found on disk, without cross-checking them.
    fn read_pair(&self) -> QuoteResult<Option<ArtifactPair>> {
        let scaler_path = self.scaler_path();
        let model_path = self.model_path();

        match (scaler_path.exists(), model_path.exists()) {
            (false, false) => Ok(None),
            (true, false) => Err(QuoteError::ModelLoad {
                path: model_path,
                reason: "scaler artifact present but model artifact missing".to_string(),
            }),
            (false, true) => Err(QuoteError::ModelLoad {
                path: scaler_path,
                reason: "model artifact present but scaler artifact missing".to_string(),
            }),
            (true, true) => Ok(Some((read_json(&scaler_path)?, read_json(&model_path)?))),
        }
    }

    fn has_pending(&self) -> bool {
        temp_path(&self.scaler_path()).exists() || temp_path(&self.model_path()).exists()
    }

    /// Finish or discard a publish interrupted between its two renames.
    /// Caller holds the exclusive lock.
    fn recover(&self) -> QuoteResult<()> {
        let scaler_path = self.scaler_path();
        let model_path = self.model_path();
        let scaler_gen = peek_generation(&scaler_path);
        let model_gen = peek_generation(&model_path);

        for (target, own, other) in [(scaler_path, scaler_gen, model_gen), (model_path, model_gen, scaler_gen)] {
            let tmp = temp_path(&target);
            if !tmp.exists() {
                continue;
            }
            let pending = peek_generation(&tmp);
            if pending.is_some() && pending == other && own != other {
                warn!(path = %target.display(), generation = ?pending, "completing interrupted model publish");
                publish(&tmp, &target)?;
            } else {
                debug!(path = %tmp.display(), "discarding stale temporary artifact");
                fs::remove_file(&tmp).map_err(|e| QuoteError::ModelSave {
                    path: tmp.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }

    fn write_pair(&self, scaler: &ScalerArtifact, model: &ModelArtifact) -> QuoteResult<()> {
        let scaler_tmp = write_temp(&self.scaler_path(), scaler)?;
        let model_tmp = write_temp(&self.model_path(), model)?;
        publish(&scaler_tmp, &self.scaler_path())?;
        publish(&model_tmp, &self.model_path())?;
        Ok(())
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> QuoteResult<Option<ArtifactPair>> {
        if !self.dir.exists() {
            return Ok(None);
        }

        let read = {
            let lock = self.lock_file()?;
            let _shared = lock
                .read()
                .map_err(|e| QuoteError::io(format!("Failed to lock model store '{}'", self.dir.display()), e))?;
            self.read_pair().and_then(|pair| checked(pair, &self.dir))
        };

        match read {
            Err(QuoteError::ModelLoad { .. }) if self.has_pending() => {
                let mut out = None;
                self.transaction(&mut |txn| {
                    out = txn.load()?;
                    Ok(())
                })?;
                Ok(out)
            }
            other => other,
        }
    }

    fn transaction(&self, body: &mut dyn FnMut(&mut dyn ModelTxn) -> QuoteResult<()>) -> QuoteResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| QuoteError::ModelSave {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        let mut lock = self.lock_file()?;
        let _exclusive = lock
            .write()
            .map_err(|e| QuoteError::io(format!("Failed to lock model store '{}'", self.dir.display()), e))?;
        body(&mut FileTxn { store: self })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

struct FileTxn<'a> {
    store: &'a FileModelStore,
}

impl ModelTxn for FileTxn<'_> {
    fn load(&mut self) -> QuoteResult<Option<ArtifactPair>> {
        self.store.recover()?;
        let pair = self.store.read_pair()?;
        checked(pair, &self.store.dir)
    }

    fn save(&mut self, scaler: &ScalerArtifact, model: &ModelArtifact) -> QuoteResult<()> {
        self.store.write_pair(scaler, model)
    }
}

/// Serialized artifacts held in memory; round-trips through JSON like the file store.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    slot: Mutex<Option<(String, String)>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw JSON, e.g. to simulate corrupt artifacts.
    pub fn with_raw(scaler_json: impl Into<String>, model_json: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some((scaler_json.into(), model_json.into()))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self) -> QuoteResult<Option<ArtifactPair>> {
        decode(&self.slot.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn transaction(&self, body: &mut dyn FnMut(&mut dyn ModelTxn) -> QuoteResult<()>) -> QuoteResult<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        body(&mut MemoryTxn { slot: &mut *slot })
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

struct MemoryTxn<'a> {
    slot: &'a mut Option<(String, String)>,
}

impl ModelTxn for MemoryTxn<'_> {
    fn load(&mut self) -> QuoteResult<Option<ArtifactPair>> {
        decode(&*self.slot)
    }

    fn save(&mut self, scaler: &ScalerArtifact, model: &ModelArtifact) -> QuoteResult<()> {
        *self.slot = Some((to_json(scaler, SCALER_FILE)?, to_json(model, MODEL_FILE)?));
        Ok(())
    }
}

fn decode(slot: &Option<(String, String)>) -> QuoteResult<Option<ArtifactPair>> {
    let Some((scaler_json, model_json)) = slot else {
        return Ok(None);
    };
    let here = PathBuf::from("memory");
    let scaler: ScalerArtifact = serde_json::from_str(scaler_json).map_err(|e| QuoteError::ModelLoad {
        path: here.join(SCALER_FILE),
        reason: e.to_string(),
    })?;
    let model: ModelArtifact = serde_json::from_str(model_json).map_err(|e| QuoteError::ModelLoad {
        path: here.join(MODEL_FILE),
        reason: e.to_string(),
    })?;
    checked(Some((scaler, model)), &here)
}

fn to_json<T: Serialize>(value: &T, file: &str) -> QuoteResult<String> {
    serde_json::to_string(value).map_err(|e| QuoteError::ModelSave {
        path: PathBuf::from("memory").join(file),
        reason: e.to_string(),
    })
}

/// Artifacts that parse can still be unusable; reject them here rather than
/// at classification time.
fn checked(pair: Option<ArtifactPair>, dir: &Path) -> QuoteResult<Option<ArtifactPair>> {
    let Some((scaler, model)) = pair else {
        return Ok(None);
    };
    let load_err = |file: &str, reason: String| QuoteError::ModelLoad {
        path: dir.join(file),
        reason,
    };

    if scaler.generation != model.generation {
        return Err(QuoteError::ModelLoad {
            path: dir.to_path_buf(),
            reason: format!(
                "scaler generation {} does not match model generation {}",
                scaler.generation, model.generation
            ),
        });
    }
    scaler.scaler.validate().map_err(|r| load_err(SCALER_FILE, r))?;
    model.forest.validate().map_err(|r| load_err(MODEL_FILE, r))?;
    for (k, sample) in model.history.iter().enumerate() {
        sample
            .check()
            .map_err(|r| load_err(MODEL_FILE, format!("history sample {k}: {r}")))?;
    }
    Ok(Some((scaler, model)))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> QuoteResult<T> {
    let file = File::open(path).map_err(|e| QuoteError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| QuoteError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
struct GenerationTag {
    generation: u64,
}

/// Generation recorded in an artifact, or `None` if it is missing or unreadable.
fn peek_generation(path: &Path) -> Option<u64> {
    let file = File::open(path).ok()?;
    serde_json::from_reader::<_, GenerationTag>(BufReader::new(file))
        .ok()
        .map(|tag| tag.generation)
}

fn temp_path(target: &Path) -> PathBuf {
    target.with_extension("json.tmp")
}

fn write_temp<T: Serialize>(target: &Path, value: &T) -> QuoteResult<PathBuf> {
    let tmp = temp_path(target);
    let save_err = |reason: String| QuoteError::ModelSave {
        path: tmp.clone(),
        reason,
    };

    let file = File::create(&tmp).map_err(|e| save_err(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|e| save_err(e.to_string()))?;
    writer.flush().map_err(|e| save_err(e.to_string()))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| save_err(e.to_string()))?;
    Ok(tmp)
}

fn publish(tmp: &Path, target: &Path) -> QuoteResult<()> {
    fs::rename(tmp, target).map_err(|e| QuoteError::ModelSave {
        path: target.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureVector, RiskTier};
    use crate::model::forest::ForestParams;
    use serde_json::{Value, json};

    fn artifacts(generation: u64) -> (ScalerArtifact, ModelArtifact) {
        let rows = [[0.0, 0.0, 0.0], [5.0, 1.0, 1.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        let forest = RandomForest::fit(
            &scaler.transform_all(&rows),
            &[0, 3],
            ForestParams {
                n_trees: 3,
                ..ForestParams::default()
            },
        )
        .unwrap();
        let now = Utc::now();
        let history = vec![
            LabeledSample::new(FeatureVector::new(0.0, 0.0, 0.0), RiskTier::Low),
            LabeledSample::new(FeatureVector::new(5.0, 1.0, 1.0), RiskTier::VeryHigh),
        ];
        (
            ScalerArtifact {
                generation,
                trained_at: now,
                scaler,
            },
            ModelArtifact {
                generation,
                trained_at: now,
                forest,
                history,
            },
        )
    }

    #[test]
    fn file_store_round_trips_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("models"));
        assert!(store.load().unwrap().is_none());

        let (scaler, model) = artifacts(1);
        store.save(&scaler, &model).unwrap();

        let (s, m) = store.load().unwrap().unwrap();
        assert_eq!(s, scaler);
        assert_eq!(m, model);

        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupt_artifact_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let (scaler, model) = artifacts(1);
        store.save(&scaler, &model).unwrap();

        fs::write(store.model_path(), b"{ not json").unwrap();
        assert!(matches!(store.load(), Err(QuoteError::ModelLoad { .. })));
    }

    #[test]
    fn half_a_pair_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let (scaler, model) = artifacts(1);
        store.save(&scaler, &model).unwrap();

        fs::remove_file(store.scaler_path()).unwrap();
        assert!(matches!(store.load(), Err(QuoteError::ModelLoad { .. })));
    }

    #[test]
    fn mismatched_generations_are_rejected() {
        let store = MemoryModelStore::new();
        let (scaler, _) = artifacts(1);
        let (_, model) = artifacts(2);
        store.save(&scaler, &model).unwrap();
        assert!(matches!(store.load(), Err(QuoteError::ModelLoad { .. })));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryModelStore::new();
        assert!(store.is_empty());
        let (scaler, model) = artifacts(4);
        store.save(&scaler, &model).unwrap();
        let (s, m) = store.load().unwrap().unwrap();
        assert_eq!(s.generation, 4);
        assert_eq!(m, model);
    }

    #[test]
    fn torn_pair_without_pending_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let (scaler, model) = artifacts(1);
        store.save(&scaler, &model).unwrap();

        let (newer, _) = artifacts(2);
        fs::write(store.scaler_path(), serde_json::to_vec(&newer).unwrap()).unwrap();
        assert!(matches!(store.load(), Err(QuoteError::ModelLoad { .. })));
    }

    #[test]
    fn publish_interrupted_between_renames_is_completed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let (scaler, model) = artifacts(1);
        store.save(&scaler, &model).unwrap();

        // Writer stopped after moving the new scaler into place.
        let (scaler2, model2) = artifacts(2);
        let scaler_tmp = write_temp(&store.scaler_path(), &scaler2).unwrap();
        let model_tmp = write_temp(&store.model_path(), &model2).unwrap();
        publish(&scaler_tmp, &store.scaler_path()).unwrap();

        let (s, m) = store.load().unwrap().unwrap();
        assert_eq!(s, scaler2);
        assert_eq!(m, model2);
        assert!(!model_tmp.exists());
    }

    #[test]
    fn publish_interrupted_before_renames_keeps_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let (scaler, model) = artifacts(1);
        store.save(&scaler, &model).unwrap();

        let (scaler2, model2) = artifacts(2);
        let scaler_tmp = write_temp(&store.scaler_path(), &scaler2).unwrap();
        let model_tmp = write_temp(&store.model_path(), &model2).unwrap();

        let mut seen = None;
        store
            .transaction(&mut |txn| {
                seen = txn.load()?.map(|(s, _)| s.generation);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, Some(1));
        assert!(!scaler_tmp.exists());
        assert!(!model_tmp.exists());
    }

    #[test]
    fn transaction_sees_the_previous_transactions_save() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileModelStore::new(dir.path());
        let second = FileModelStore::new(dir.path());
        let (scaler, model) = artifacts(3);
        first.save(&scaler, &model).unwrap();

        let mut seen = None;
        second
            .transaction(&mut |txn| {
                seen = txn.load()?.map(|(_, m)| m.generation);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, Some(3));
        assert!(first.lock_path().exists());
    }

    fn raw(generation: u64) -> (Value, Value) {
        let (scaler, model) = artifacts(generation);
        (serde_json::to_value(&scaler).unwrap(), serde_json::to_value(&model).unwrap())
    }

    fn load_raw(scaler: &Value, model: &Value) -> QuoteResult<Option<ArtifactPair>> {
        MemoryModelStore::with_raw(scaler.to_string(), model.to_string()).load()
    }

    #[test]
    fn structurally_broken_forests_fail_to_load() {
        let (scaler, model) = raw(1);
        assert!(load_raw(&scaler, &model).unwrap().is_some());

        let leaf = json!({"kind": "leaf", "distribution": [1.0, 0.0, 0.0, 0.0]});
        let split = |feature: usize, left: usize, right: usize| {
            json!({"kind": "split", "feature": feature, "threshold": 0.0, "left": left, "right": right})
        };
        let broken_trees = [
            json!([{"nodes": []}]),
            json!([]),
            json!([{"nodes": [split(0, 1, 5), leaf.clone(), leaf.clone()]}]),
            json!([{"nodes": [split(0, 0, 1), leaf.clone()]}]),
            json!([{"nodes": [split(3, 1, 2), leaf.clone(), leaf.clone()]}]),
        ];
        for trees in broken_trees {
            let mut model = model.clone();
            model["forest"]["trees"] = trees.clone();
            let err = load_raw(&scaler, &model).unwrap_err();
            assert!(matches!(err, QuoteError::ModelLoad { .. }), "{trees}: {err}");
        }
    }

    #[test]
    fn out_of_range_history_tier_fails_to_load() {
        let (scaler, mut model) = raw(1);
        model["history"][0]["tier"] = json!(7);
        let err = load_raw(&scaler, &model).unwrap_err();
        assert!(matches!(&err, QuoteError::ModelLoad { reason, .. } if reason.contains("history sample 0")), "{err}");
    }

    #[test]
    fn zero_scale_fails_to_load() {
        let (mut scaler, model) = raw(1);
        scaler["scaler"]["scale"][1] = json!(0.0);
        let err = load_raw(&scaler, &model).unwrap_err();
        assert!(matches!(&err, QuoteError::ModelLoad { path, .. } if path.ends_with(SCALER_FILE)), "{err}");
    }
}

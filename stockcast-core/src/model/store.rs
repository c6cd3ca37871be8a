//! Model artifact storage and bundle loading.
//!
//! A bundle for model `{id}` is three JSON files:
//! `{id}_model.json`, `{id}_scaler_x.json`, `{id}_scaler_y.json`.
//! Loading is all or nothing: every missing file is reported together, and a
//! bundle is only returned once all three parse and agree.

use super::bundle::ModelBundle;
use super::regressor::RegressorArtifact;
use super::scaler::Scaler;
use crate::cache::TtlCache;
use crate::domain::ModelChoice;
use crate::error::ForecastError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read artifact '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Somewhere model artifacts can be read from by file name.
pub trait ArtifactStore: Send + Sync {
    /// Human-readable location, for logs and CLI output.
    fn describe(&self) -> String;

    /// Bytes of `name`, or `None` when it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Artifacts stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for FsArtifactStore {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Artifacts held in memory. Used by tests and embedders that ship models
/// inside their own binaries.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), bytes.into());
    }

    /// Serialize `value` as JSON under `name`.
    pub fn insert_json<T: serde::Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.insert(name, bytes);
        Ok(())
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn describe(&self) -> String {
        format!("memory ({} files)", self.files.len())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.files.get(name).cloned())
    }
}

/// File names of the three artifacts for `choice`: model, input scaler,
/// target scaler.
pub fn artifact_names(choice: ModelChoice) -> [String; 3] {
    let id = choice.id();
    [
        format!("{id}_model.json"),
        format!("{id}_scaler_x.json"),
        format!("{id}_scaler_y.json"),
    ]
}

/// Loads model bundles from an artifact store, optionally caching them.
pub struct ModelStore {
    store: Box<dyn ArtifactStore>,
    cache: TtlCache<ModelChoice, Arc<ModelBundle>>,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("store", &self.store.describe())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl ModelStore {
    /// A store with caching disabled.
    pub fn new(store: impl ArtifactStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cache: TtlCache::disabled(),
        }
    }

    pub fn with_cache(mut self, cache: TtlCache<ModelChoice, Arc<ModelBundle>>) -> Self {
        debug!(capacity = cache.capacity(), ttl = ?cache.ttl(), "model cache configured");
        self.cache = cache;
        self
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// The bundle for `choice`, from cache or freshly loaded.
    pub fn load(&self, choice: ModelChoice) -> Result<Arc<ModelBundle>, ForecastError> {
        if let Some(bundle) = self.cache.get(&choice) {
            debug!(model = %choice, "model bundle cache hit");
            return Ok(bundle);
        }
        let bundle = Arc::new(self.load_uncached(choice)?);
        self.cache.insert(choice, bundle.clone());
        Ok(bundle)
    }

    fn load_uncached(&self, choice: ModelChoice) -> Result<ModelBundle, ForecastError> {
        let model = choice.id();
        let names = artifact_names(choice);

        let mut files = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in &names {
            match self.store.read(name) {
                Ok(Some(bytes)) => files.push(bytes),
                Ok(None) => missing.push(name.clone()),
                // Present but unreadable counts as missing; keep the I/O cause.
                Err(StoreError::Io { source, .. }) => {
                    warn!(model, artifact = %name, error = %source, "model artifact unreadable");
                    missing.push(format!("{name} ({source})"));
                }
            }
        }
        if !missing.is_empty() {
            return Err(ForecastError::MissingArtifact {
                model: model.to_string(),
                missing,
            });
        }

        let mut hasher = blake3::Hasher::new();
        for bytes in &files {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        let fingerprint = hasher.finalize().to_hex().to_string();

        let regressor: RegressorArtifact = parse(model, &names[0], &files[0])?;
        let input_scaler: Scaler = parse(model, &names[1], &files[1])?;
        let target_scaler: Scaler = parse(model, &names[2], &files[2])?;

        let bundle = ModelBundle::from_artifacts(
            choice,
            names[0].clone(),
            fingerprint,
            regressor,
            input_scaler,
            target_scaler,
        )?;
        info!(
            model,
            lookback = bundle.lookback,
            fingerprint = &bundle.fingerprint[..12],
            source = %self.store.describe(),
            "loaded model bundle"
        );
        Ok(bundle)
    }

    /// Load every known model, reporting each outcome. Bypasses the cache.
    pub fn verify_all(&self) -> Vec<(ModelChoice, Result<ModelBundle, ForecastError>)> {
        ModelChoice::ALL
            .iter()
            .map(|&choice| (choice, self.load_uncached(choice)))
            .collect()
    }
}

fn parse<T: DeserializeOwned>(model: &str, name: &str, bytes: &[u8]) -> Result<T, ForecastError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ForecastError::incompatible(model, format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{constant_trees, identity_input_scaler, identity_target_scaler};
    use std::time::Duration;

    fn xgb_store() -> MemoryArtifactStore {
        let mut store = MemoryArtifactStore::new();
        store
            .insert_json("xgb_model.json", &constant_trees(5, 3.0))
            .unwrap();
        store
            .insert_json("xgb_scaler_x.json", &identity_input_scaler())
            .unwrap();
        store
            .insert_json("xgb_scaler_y.json", &identity_target_scaler())
            .unwrap();
        store
    }

    #[test]
    fn artifact_names_follow_model_id() {
        assert_eq!(
            artifact_names(ModelChoice::Lstm),
            [
                "lstm_model.json".to_string(),
                "lstm_scaler_x.json".to_string(),
                "lstm_scaler_y.json".to_string()
            ]
        );
    }

    #[test]
    fn loads_complete_bundle() {
        let models = ModelStore::new(xgb_store());
        let bundle = models.load(ModelChoice::Xgb).unwrap();
        assert_eq!(bundle.lookback, 5);
        assert_eq!(bundle.artifact_name, "xgb_model.json");
        assert_eq!(bundle.fingerprint.len(), 64);
    }

    #[test]
    fn every_missing_file_is_reported() {
        let mut store = MemoryArtifactStore::new();
        store
            .insert_json("lstm_scaler_x.json", &identity_input_scaler())
            .unwrap();
        let err = ModelStore::new(store).load(ModelChoice::Lstm).unwrap_err();
        match err {
            ForecastError::MissingArtifact { model, missing } => {
                assert_eq!(model, "lstm");
                assert_eq!(missing, vec!["lstm_model.json", "lstm_scaler_y.json"]);
            }
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }

    #[test]
    fn garbage_file_is_incompatible() {
        let mut store = xgb_store();
        store.insert("xgb_scaler_y.json", b"not json".to_vec());
        let err = ModelStore::new(store).load(ModelChoice::Xgb).unwrap_err();
        assert!(matches!(err, ForecastError::IncompatibleModel { .. }));
        assert!(err.to_string().contains("xgb_scaler_y.json"));
    }

    #[test]
    fn fingerprint_tracks_file_contents() {
        let a = ModelStore::new(xgb_store()).load(ModelChoice::Xgb).unwrap();
        let mut changed = xgb_store();
        changed
            .insert_json("xgb_model.json", &constant_trees(5, 4.0))
            .unwrap();
        let b = ModelStore::new(changed).load(ModelChoice::Xgb).unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn cached_store_returns_same_arc() {
        let models = ModelStore::new(xgb_store())
            .with_cache(TtlCache::new(2, Duration::from_secs(60)));
        let a = models.load(ModelChoice::Xgb).unwrap();
        let b = models.load(ModelChoice::Xgb).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn filesystem_store_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mem = xgb_store();
        for name in artifact_names(ModelChoice::Xgb) {
            let bytes = mem.read(&name).unwrap().unwrap();
            fs::write(dir.path().join(&name), bytes).unwrap();
        }
        let models = ModelStore::new(FsArtifactStore::new(dir.path()));
        assert!(models.load(ModelChoice::Xgb).is_ok());

        let report = models.verify_all();
        assert_eq!(report.len(), 2);
        for (choice, outcome) in report {
            match choice {
                ModelChoice::Xgb => assert!(outcome.is_ok()),
                ModelChoice::Lstm => assert!(matches!(
                    outcome,
                    Err(ForecastError::MissingArtifact { .. })
                )),
            }
        }
    }

    #[test]
    fn unreadable_file_is_missing_with_cause() {
        let dir = tempfile::tempdir().unwrap();
        let mem = xgb_store();
        let [model, x, y] = artifact_names(ModelChoice::Xgb);
        for name in [&model, &y] {
            fs::write(dir.path().join(name), mem.read(name).unwrap().unwrap()).unwrap();
        }
        // A directory where the input scaler should be.
        fs::create_dir(dir.path().join(&x)).unwrap();

        let err = ModelStore::new(FsArtifactStore::new(dir.path()))
            .load(ModelChoice::Xgb)
            .unwrap_err();
        match err {
            ForecastError::MissingArtifact { model, missing } => {
                assert_eq!(model, "xgb");
                assert_eq!(missing.len(), 1);
                assert!(missing[0].starts_with(&format!("{x} (")), "{missing:?}");
            }
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }
}

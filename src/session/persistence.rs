//! Loading and saving the session store under a fixed storage key

use serde_json::Value;
use tracing::{debug, info, warn};

use super::database::KeyValueStorage;
use super::errors::StorageResult;
use super::sanitize::sanitize_snapshot;
use super::store::SessionStore;

/// Key the serialized store lives under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "convo.sessions";

/// A loaded store plus notes about anything that had to be discarded
#[derive(Debug)]
pub struct LoadOutcome {
    pub store: SessionStore,
    pub warnings: Vec<String>,
}

/// Reads and writes `{sessions, activeSessionId}` through a storage backend
pub struct SessionPersistence<S: KeyValueStorage> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> SessionPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the persisted store.
    ///
    /// Unreadable storage, invalid JSON and schema mismatches all degrade to
    /// the empty store; the reasons are returned as warnings.
    pub fn load(&self) -> LoadOutcome {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored sessions under {}", self.key);
                return LoadOutcome {
                    store: SessionStore::new(),
                    warnings: Vec::new(),
                };
            }
            Err(e) => {
                return Self::degraded(format!("failed to read stored sessions: {}", e));
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                return Self::degraded(format!("stored sessions are not valid JSON: {}", e));
            }
        };

        let sanitized = sanitize_snapshot(&value);
        for warning in &sanitized.warnings {
            warn!("Loading sessions: {}", warning);
        }

        let store = SessionStore::resume_sanitized(sanitized.sessions, sanitized.active_session_id);
        info!("Loaded {} session(s) from {}", store.len(), self.key);

        LoadOutcome {
            store,
            warnings: sanitized.warnings,
        }
    }

    /// Persist the store, replacing whatever was stored before
    pub fn save(&mut self, store: &SessionStore) -> StorageResult<()> {
        let serialized = serde_json::to_string(&store.snapshot())?;
        self.storage.set(&self.key, &serialized)?;
        debug!("Saved {} session(s) to {}", store.len(), self.key);
        Ok(())
    }

    /// Forget the persisted store
    pub fn clear(&mut self) -> StorageResult<()> {
        self.storage.remove(&self.key)
    }

    fn degraded(warning: String) -> LoadOutcome {
        warn!("Loading sessions: {}", warning);
        LoadOutcome {
            store: SessionStore::new(),
            warnings: vec![warning],
        }
    }
}

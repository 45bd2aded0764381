//! Best-effort snapshots of in-progress form sessions.
//!
//! A snapshot holds the working data, active step and step states so an
//! interrupted session can be resumed. Stores are injected through
//! [`KeyValueStore`]; the adapter never surfaces store failures to the form.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::form::{FormData, StepState};

/// Current snapshot schema version; snapshots with another version are ignored
pub const SNAPSHOT_VERSION: u32 = 1;

/// Default prefix for snapshot keys
pub const DEFAULT_KEY_PREFIX: &str = "multistep-form-";

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Persisted session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub form_data: FormData,
    pub active_step: usize,
    pub step_states: Vec<StepState>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(form_data: FormData, active_step: usize, step_states: Vec<StepState>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            form_data,
            active_step,
            step_states,
            timestamp: Utc::now(),
        }
    }

    /// Whether this snapshot fits a form with `step_count` steps
    pub fn fits(&self, step_count: usize) -> bool {
        self.version == SNAPSHOT_VERSION
            && self.active_step < step_count
            && self.step_states.len() == step_count
    }
}

/// Reads and writes snapshots for one form session
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistenceAdapter {
    /// Adapter for `persist_key`, or `None` when persistence is off or the
    /// key is blank.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        enabled: bool,
        key_prefix: &str,
        persist_key: Option<&str>,
    ) -> Option<Self> {
        let persist_key = persist_key.map(str::trim).filter(|k| !k.is_empty())?;
        if !enabled {
            return None;
        }
        Some(Self {
            store,
            key: format!("{key_prefix}{persist_key}"),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write `snapshot`; failures are logged and swallowed
    pub fn save(&self, snapshot: &Snapshot) -> bool {
        let result = serde_json::to_string(snapshot)
            .map_err(StoreError::from)
            .and_then(|json| self.store.set(&self.key, &json));

        match result {
            Ok(()) => {
                tracing::trace!(key = %self.key, "Form snapshot saved");
                true
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to save form snapshot");
                false
            }
        }
    }

    /// Read the snapshot if one exists and parses; failures are logged
    pub fn load(&self) -> Option<Snapshot> {
        let json = match self.store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read form snapshot");
                return None;
            }
        };

        match serde_json::from_str::<Snapshot>(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Ignoring unreadable form snapshot");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Failed to clear form snapshot");
        }
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

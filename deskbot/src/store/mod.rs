//! Local durable key-value state.
//!
//! Holds the active session id and the last session list fetched from the
//! server, in a single JSON file. Reads that fail degrade to an empty state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::Session;

/// Errors raised while reading or writing the state file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed state file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no home directory found; set DESKBOT_HOME")]
    NoHome,
}

/// On-disk layout of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub active_session_id: Option<String>,
    #[serde(default)]
    pub sessions_cache: Vec<Session>,
}

/// File-backed store. Every write goes to disk immediately.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    state: LocalState,
}

impl LocalStore {
    /// Open the store at `path`. A missing file yields an empty state; an
    /// unreadable one is logged and also yields an empty state.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match read_state(&path) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable local state");
                LocalState::default()
            }
        };
        Self { path, state }
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.state.active_session_id.as_deref()
    }

    pub fn set_active_session_id(&mut self, session_id: &str) -> Result<(), StoreError> {
        if self.active_session_id() == Some(session_id) {
            return Ok(());
        }
        self.state.active_session_id = Some(session_id.to_string());
        self.flush()
    }

    pub fn cached_sessions(&self) -> &[Session] {
        &self.state.sessions_cache
    }

    pub fn cache_sessions(&mut self, sessions: &[Session]) -> Result<(), StoreError> {
        self.state.sessions_cache = sessions.to_vec();
        self.flush()
    }

    /// Write the state atomically (temp file, then rename).
    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(&self.state).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

fn read_state(path: &Path) -> Result<LocalState, StoreError> {
    if !path.exists() {
        return Ok(LocalState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(LocalState::default());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("state.json"));
        assert!(store.active_session_id().is_none());
        assert!(store.cached_sessions().is_empty());
    }

    #[test]
    fn active_session_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = LocalStore::open(&path);
        store.set_active_session_id("session_1").unwrap();
        store.cache_sessions(&[Session::new("session_1")]).unwrap();

        let reopened = LocalStore::open(&path);
        assert_eq!(reopened.active_session_id(), Some("session_1"));
        assert_eq!(reopened.cached_sessions(), &[Session::new("session_1")]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_degrades_to_empty_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut store = LocalStore::open(&path);
        assert!(store.active_session_id().is_none());

        store.set_active_session_id("fresh").unwrap();
        assert_eq!(LocalStore::open(&path).active_session_id(), Some("fresh"));
    }
}

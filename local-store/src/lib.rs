//! File-backed persistence for the sync agent. Each document lives in its
//! own JSON file under the store root, one per key, last-writer-wins.

pub mod diagnostics;

pub use diagnostics::{DiagnosticLog, LogEntry};

use auraxsync_core::{LastSyncRecord, StoreError, SyncSettings};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SETTINGS_KEY: &str = "sync-settings";
const LAST_SYNC_KEY: &str = "last-sync";
const SESSION_KEY: &str = "session";
pub(crate) const DIAGNOSTIC_LOG_KEY: &str = "diagnostic-log";

/// Authenticated session persisted after a successful login or
/// registration. The user object is kept opaque; the agent never inspects
/// it beyond forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: serde_json::Value,
}

#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
    // Serializes writers within this process; cross-process access stays
    // last-writer-wins, as the original storage was.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|_| StoreError::DirectoryUnavailable {
            path: root.display().to_string(),
        })?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub fn read_document<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.document_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Read {
                    key: key.to_string(),
                    source: e,
                })
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            source: e,
        })?;
        Ok(Some(value))
    }

    pub fn write_document<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            source: e,
        })?;

        fs::write(self.document_path(key), bytes).map_err(|e| StoreError::Write {
            key: key.to_string(),
            source: e,
        })
    }

    pub fn remove_document(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        match fs::remove_file(self.document_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Write {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    pub fn sync_settings(&self) -> Result<Option<SyncSettings>, StoreError> {
        self.read_document(SETTINGS_KEY)
    }

    pub fn save_sync_settings(&self, settings: &SyncSettings) -> Result<(), StoreError> {
        self.write_document(SETTINGS_KEY, settings)
    }

    pub fn last_sync(&self) -> Result<Option<LastSyncRecord>, StoreError> {
        self.read_document(LAST_SYNC_KEY)
    }

    pub fn save_last_sync(&self, record: &LastSyncRecord) -> Result<(), StoreError> {
        self.write_document(LAST_SYNC_KEY, record)
    }

    pub fn session(&self) -> Result<Option<Session>, StoreError> {
        self.read_document(SESSION_KEY)
    }

    pub fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        self.write_document(SESSION_KEY, session)
    }

    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.remove_document(SESSION_KEY)
    }

    /// Bearer token of the current session, if any. Read on every request
    /// so a re-login picks up the fresh token without restarting the agent.
    pub fn token(&self) -> Option<String> {
        match self.session() {
            Ok(session) => session.map(|s| s.token),
            Err(e) => {
                tracing::warn!("Failed to read session: {}", e);
                None
            }
        }
    }
}

//! Structured diagnostic event journal. Every remote call and every
//! scheduler transition is appended here, mirrored to `tracing`, and a
//! capped copy is persisted so the most recent events survive a restart.

use crate::{LocalStore, DIAGNOSTIC_LOG_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Oldest entries are trimmed past this point on every append.
const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub action: String,
    pub details: serde_json::Value,
}

#[derive(Debug)]
pub struct DiagnosticLog {
    store: Arc<LocalStore>,
    environment: String,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl DiagnosticLog {
    pub fn new(store: Arc<LocalStore>, environment: impl Into<String>) -> Self {
        let persisted: VecDeque<LogEntry> = store
            .read_document::<Vec<LogEntry>>(DIAGNOSTIC_LOG_KEY)
            .unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable diagnostic log: {}", e);
                None
            })
            .unwrap_or_default()
            .into();

        Self {
            store,
            environment: environment.into(),
            entries: Mutex::new(persisted),
        }
    }

    /// Appends an event, trims to the cap, mirrors it to `tracing` and
    /// persists the journal. Persistence failures are logged, never
    /// surfaced; diagnostics must not break the operation being recorded.
    pub fn record(&self, action: &str, details: serde_json::Value) -> LogEntry {
        let entry = LogEntry {
            timestamp: Utc::now(),
            environment: self.environment.clone(),
            action: action.to_string(),
            details,
        };

        tracing::info!(
            environment = %entry.environment,
            action = %entry.action,
            details = %entry.details,
            "diagnostic event"
        );

        let snapshot: Vec<LogEntry> = {
            let mut entries = self.entries.lock().unwrap();
            entries.push_back(entry.clone());
            while entries.len() > MAX_ENTRIES {
                entries.pop_front();
            }
            entries.iter().cloned().collect()
        };

        if let Err(e) = self.store.write_document(DIAGNOSTIC_LOG_KEY, &snapshot) {
            tracing::warn!("Failed to persist diagnostic log: {}", e);
        }

        entry
    }

    /// Records an API call with the auth header redacted down to a
    /// presence flag.
    pub fn record_api_call(
        &self,
        method: &str,
        path: &str,
        status: Option<u16>,
        success: bool,
        request_id: &str,
        authenticated: bool,
    ) -> LogEntry {
        self.record(
            "API_CALL",
            serde_json::json!({
                "method": method,
                "path": path,
                "status": status,
                "success": success,
                "request_id": request_id,
                "authorization": if authenticated { "Bearer <redacted>" } else { "none" },
            }),
        )
    }

    /// All retained entries, optionally filtered by a case-insensitive
    /// match on the action name or the serialized details.
    pub fn entries(&self, filter: Option<&str>) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        match filter {
            None => entries.iter().cloned().collect(),
            Some(needle) => {
                let needle = needle.to_lowercase();
                entries
                    .iter()
                    .filter(|entry| {
                        entry.action.to_lowercase().contains(&needle)
                            || entry.details.to_string().to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            }
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        if let Err(e) = self.store.remove_document(DIAGNOSTIC_LOG_KEY) {
            tracing::warn!("Failed to clear persisted diagnostic log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log() -> (TempDir, DiagnosticLog) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        (dir, DiagnosticLog::new(store, "copy"))
    }

    #[test]
    fn records_and_filters_entries() {
        let (_dir, log) = log();
        log.record("SCHEDULER_STARTED", serde_json::json!({ "time": "09:00" }));
        log.record_api_call("GET", "/instagram/profile", Some(200), true, "req-1", true);

        assert_eq!(log.entries(None).len(), 2);
        let api_only = log.entries(Some("api_call"));
        assert_eq!(api_only.len(), 1);
        assert_eq!(api_only[0].action, "API_CALL");
        // The raw token must never appear in the journal.
        assert_eq!(
            api_only[0].details["authorization"],
            serde_json::json!("Bearer <redacted>")
        );
    }

    #[test]
    fn caps_at_one_hundred_entries() {
        let (_dir, log) = log();
        for i in 0..130 {
            log.record("EVENT", serde_json::json!({ "seq": i }));
        }

        let entries = log.entries(None);
        assert_eq!(entries.len(), 100);
        // Oldest trimmed first.
        assert_eq!(entries[0].details["seq"], serde_json::json!(30));
        assert_eq!(entries[99].details["seq"], serde_json::json!(129));
    }

    #[test]
    fn journal_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = Arc::new(LocalStore::open(dir.path()).unwrap());
            let log = DiagnosticLog::new(store, "copy");
            log.record("BEFORE_RESTART", serde_json::json!({}));
        }

        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        let log = DiagnosticLog::new(store, "copy");
        let entries = log.entries(Some("before_restart"));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn clear_removes_entries_and_document() {
        let (_dir, log) = log();
        log.record("EVENT", serde_json::json!({}));
        log.clear();
        assert!(log.entries(None).is_empty());
    }
}

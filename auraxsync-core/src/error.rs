use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures surfaced by the remote client. The client never retries; every
/// failure propagates synchronously to the caller.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The request never reached the server or no response was received.
    #[error("Network error: {details}")]
    Network { details: String },

    /// The server responded with a non-2xx status. `message` comes from the
    /// response body's `message` field when one is present.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The per-request deadline elapsed before a response arrived.
    #[error("Request timed out")]
    Timeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("No access token available for {operation}")]
    MissingToken { operation: String },
}

impl RemoteError {
    pub fn status(&self) -> u16 {
        match self {
            RemoteError::Http { status, .. } => *status,
            _ => 0,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if let Some(status) = err.status() {
            RemoteError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RemoteError::Network {
                details: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store directory unavailable: {path}")]
    DirectoryUnavailable { path: String },

    #[error("Failed to read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt document for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SyncError {
    /// A sync is already in flight; manual syncs are rejected rather than
    /// allowed to race the automated one.
    #[error("A sync is already in progress")]
    SyncInProgress,

    #[error("Sync action failed: {message}")]
    ActionFailed { message: String },
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid time of day '{value}': expected HH:MM in 24-hour format")]
    InvalidTimeOfDay { value: String },
}

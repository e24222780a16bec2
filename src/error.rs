// ⚠️ Error taxonomy for the sync daemon
//
// ConfigError  -> fatal at startup (see config.rs)
// Remote       -> any failed call against the record store, retried per pass
// RetryExhausted -> a pass gave up for this tick; the daemon keeps running

use crate::config::ConfigError;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A query, retrieve or update against the record store failed
    #[error("{operation} failed{}: {message}", http_suffix(.status))]
    Remote {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// A pass failed on every allowed attempt
    #[error("{pass} pass gave up after {attempts} attempt(s): {last_error}")]
    RetryExhausted {
        pass: String,
        attempts: u32,
        last_error: Box<SyncError>,
    },
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl SyncError {
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        SyncError::Remote {
            operation,
            status: None,
            message: message.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Remote { .. })
    }

    /// HTTP status of a remote failure, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Remote { status, .. } => *status,
            SyncError::RetryExhausted { last_error, .. } => last_error.status(),
            SyncError::Config(_) => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        let operation = if err.is_decode() {
            "decode response"
        } else if err.is_timeout() {
            "request timed out"
        } else {
            "http request"
        };

        SyncError::Remote {
            operation,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

//! Error types for roster-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Invocation-level failures. Row-level problems are
/// [`SkipReason`](crate::reconcile::SkipReason)s, never errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote snapshot could not be fetched (non-2xx or connection failure).
    #[error("transport failure (status {}): {body}", fmt_status(.status))]
    Transport { status: Option<u16>, body: String },

    /// The request body was not a JSON array of row objects.
    #[error("{message}")]
    MalformedPayload { message: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (directory or audit log).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A store refused a write.
    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        SyncError::MalformedPayload {
            message: message.into(),
        }
    }

    /// HTTP-style status code reported to callers for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::MalformedPayload { .. } => 422,
            SyncError::Transport { .. } => 502,
            SyncError::Io { .. } | SyncError::Json(_) | SyncError::Store(_) => 500,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(SyncError::malformed("x").status_code(), 422);
        assert_eq!(
            SyncError::Transport {
                status: Some(404),
                body: String::new()
            }
            .status_code(),
            502
        );
        assert_eq!(SyncError::Store("disk full".into()).status_code(), 500);
    }

    #[test]
    fn transport_message_includes_status() {
        let err = SyncError::Transport {
            status: None,
            body: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "transport failure (status none): connection refused"
        );
    }
}

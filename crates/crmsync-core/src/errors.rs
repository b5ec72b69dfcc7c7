/// Core error type for the sync shim.
///
/// Adapter crates should map their specific errors into this type so the reconciler
/// can tell "nothing was created" failures apart from remote-sync failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("remote sync failed ({action}): {reason}")]
    RemoteSync { action: String, reason: String },

    #[error("failed to sync message {mid}: {source}")]
    MessageSync {
        mid: String,
        #[source]
        source: Box<Error>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unique key conflict: {0}")]
    Conflict(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn remote(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::RemoteSync {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure happened before anything was written locally.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

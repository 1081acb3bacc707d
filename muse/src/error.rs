//! Error types for Muse operations

use thiserror::Error;

/// Muse error types
#[derive(Debug, Error)]
pub enum MuseError {
    /// Configuration value out of range or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Content key that does not compile as a date pattern
    #[error("Invalid date pattern {key:?}: {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    /// Remote content could not be fetched
    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    /// Remote content server answered with a non-success status
    #[error("Remote content returned status {0}")]
    RemoteStatus(u16),

    /// Remote content document has the wrong shape
    #[error("Remote content is malformed: {0}")]
    RemoteParse(String),

    /// Persistence store failure
    #[error("Store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Muse operations
pub type Result<T> = std::result::Result<T, MuseError>;

impl MuseError {
    /// Errors caused by the caller's configuration rather than the runtime
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::InvalidPattern { .. } | Self::RemoteParse(_)
        )
    }
}

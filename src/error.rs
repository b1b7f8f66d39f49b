use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while checking, installing or launching.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("network error fetching {location}: {message}")]
    Network { location: String, message: String },

    #[error("malformed version text {text:?}: expected major.minor.patch")]
    MalformedVersion { text: String },

    #[error("corrupt install state at {}: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("unable to persist version marker {}: {source}", path.display())]
    StateWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("an update is already in progress")]
    FlowInProgress,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to start {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LauncherError {
    pub(crate) fn network(location: &str, message: impl ToString) -> Self {
        Self::Network {
            location: location.to_owned(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

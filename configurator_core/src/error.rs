// Typed errors with thiserror. Messages are surfaced verbatim to JS.

use thiserror::Error;

use crate::catalog::Namespace;

/// Result alias carrying [`ConfiguratorError`].
pub type Result<T> = std::result::Result<T, ConfiguratorError>;

/// Configurator error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfiguratorError {
    #[error("Cable index {index} out of range for {len} cables")]
    CableIndexOutOfRange { index: usize, len: usize },

    #[error("Design '{design}' not found in {namespace} catalog")]
    DesignNotFound { namespace: Namespace, design: String },

    #[error("Unknown system type: {0}")]
    UnknownSystemType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Replay log version {found} is newer than supported version {supported}")]
    UnsupportedLogVersion { found: u32, supported: u32 },

    #[error("A replay is already in progress")]
    ReplayInProgress,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ConfiguratorError {
    fn from(err: serde_json::Error) -> Self {
        ConfiguratorError::Serialization(err.to_string())
    }
}

//! Errors raised while listing or loading contracts

/// Errors that can occur when listing or loading contracts
///
/// Backend errors are deterministic configuration or input problems. They
/// travel up through the spec store unchanged and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Contract name does not end in `.json` (or is not a bare file name)
    #[error("Invalid contract name: {0}")]
    InvalidName(String),

    /// Role tag is neither `provider` nor `consumer`
    #[error("Invalid kind: {0}")]
    InvalidRole(String),

    /// No backing file or object exists
    #[error("Contract not found: {0}")]
    NotFound(String),

    /// Content is not valid JSON
    #[error("Failed to parse contract {name}: {message}")]
    Parse { name: String, message: String },

    /// Required backend configuration is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote source requested but not configured
    #[error("S3 is not enabled.")]
    SourceDisabled,

    /// Unrecognized source tag
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Remote object was fetched with no content
    #[error("Empty S3 body for {0}")]
    EmptyBody(String),

    /// Filesystem failure other than "absent"
    #[error("IO error: {0}")]
    Io(String),

    /// Object store request failed
    #[error("Object store error: {0}")]
    ObjectStore(String),
}

impl StoreError {
    /// Build a parse error for a named contract
    pub fn parse(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

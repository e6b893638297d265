//! Error types for the custom reply engine.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Access list error: {0}")]
    Access(#[from] AccessError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Document store read/write failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Store backend failed: {0}")]
    Backend(String),
}

/// Rejected command arguments. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("{left} and {right} must have the same length ({left_len} vs {right_len})")]
    LengthMismatch {
        left: String,
        right: String,
        left_len: usize,
        right_len: usize,
    },

    #[error("{field} is not a valid integer: {value}")]
    NotAnInteger { field: String, value: String },

    #[error("{0} must not be empty")]
    EmptyField(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("Could not split arguments: {0}")]
    Tokenize(String),
}

/// Credential pool lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Token index {index} out of range (pool has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No API token configured")]
    NoCredential,
}

/// Action registry failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Keyword not found: {keyword}")]
    NotFound { keyword: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Access gate failures.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Sender not in allow-list: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// HTTP executor setup failures. Call-time failures are folded into `CallOutcome`.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Host channel failures.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

use markdeck_api::ApiError;
use thiserror::Error;

/// All the ways a Markdeck operation can fail
#[derive(Error, Debug)]
pub enum Error {
    /// An operation needed a session and there is none
    #[error("Not signed in")]
    Unauthenticated,

    /// Network or HTTP failure; the message comes from the server when it sent one
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Transport succeeded but the server reported a non-success status
    #[error("Operation rejected by server: {0}")]
    OperationRejected(String),

    #[error("Sign-in failed: {0}")]
    AuthError(String),

    #[error("Invalid bookmark: {0}")]
    InvalidItem(String),

    #[error("Could not open browser: {0}")]
    BrowserError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] markdeck_storage::StorageError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::AuthRequired => Error::Unauthenticated,
            ApiError::Rejected(message) => Error::OperationRejected(message),
            ApiError::RequestFailed { message, .. } => Error::RequestFailed(message),
            ApiError::NetworkError(e) => Error::RequestFailed(e.to_string()),
            ApiError::ParseError(e) => Error::RequestFailed(format!("invalid response: {}", e)),
        }
    }
}

//! Error taxonomy shared by the ingestion pipeline, the discovery engine,
//! and the repository implementations.
//!
//! Every failure is surfaced to the caller as a typed variant; nothing is
//! retried or silently recovered. The ownership check in particular is a
//! plain `Result` value rather than a panic or control-flow exception, so
//! callers are forced to handle it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The upload's declared media type is not an image. Rejected before any
    /// bytes are persisted.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Bytes claiming to be an image failed to decode, or the declared
    /// subtype names a format the codec cannot handle.
    #[error("could not decode image: {0}")]
    Decode(String),

    /// The media store write (or re-encode) failed. Fatal for the enclosing
    /// request; no record is created or updated when this occurs.
    #[error("could not write media asset {path}: {message}")]
    Write { path: String, message: String },

    /// The acting identity does not match the record's author.
    #[error("acting identity does not own this store")]
    OwnershipViolation,

    /// A persisted-entity constraint was violated; `field` names the
    /// offending field.
    #[error("validation failed on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    /// Malformed or missing text query, rejected before any repository call.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Coordinates that fail to parse as finite numbers, rejected before any
    /// repository call.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Wrapped backend failure from the persistence store.
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Repository(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Repository(err.to_string())
    }
}

//! Error types for the order store.

use thiserror::Error;

use crate::documents::RemoteError;
use crate::model::ValidationError;
use crate::storage::StorageError;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The draft or id was refused before any medium was touched.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backing medium could not take the mutation; the collection is unchanged.
    #[error("Backing medium unavailable: {0}")]
    MediumUnavailable(String),

    /// The store has been shut down.
    #[error("Order store is closed")]
    Closed,

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for StoreError {
    fn from(msg: String) -> Self {
        StoreError::ActorCommunicationError(msg)
    }
}

impl From<RemoteError> for StoreError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::InvalidId(raw) => StoreError::Validation(ValidationError::InvalidId(raw)),
            other => StoreError::MediumUnavailable(other.to_string()),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::MediumUnavailable(e.to_string())
    }
}

//! Durability hook run by the actor before a mutation becomes visible.

use async_trait::async_trait;

/// Error returned by a [`Journal`]. Boxed so each medium keeps its own error type.
pub type JournalError = Box<dyn std::error::Error + Send + Sync>;

/// Where the full collection must be written before a mutation is accepted.
///
/// The actor calls [`commit`](Journal::commit) with the *tentative* collection (the current
/// one plus the created item, or minus the deleted one). Only when it returns `Ok` does the
/// actor swap its snapshot and notify subscribers. An `Err` leaves the collection exactly as it
/// was and is reported to the caller as [`FrameworkError::CommitFailed`](crate::FrameworkError::CommitFailed).
///
/// [`load`](Journal::load) reads back what the medium currently holds, including writes made by
/// other handles on it. The actor calls it between two requests, so a reload can never
/// interleave with one of its own commits.
#[async_trait]
pub trait Journal<T: Send + Sync>: Send + Sync + 'static {
    async fn commit(&self, items: &[T]) -> Result<(), JournalError>;

    /// The durable collection, or `None` when the medium keeps nothing to reload.
    async fn load(&self) -> Result<Option<Vec<T>>, JournalError> {
        Ok(None)
    }
}

/// A journal that accepts every commit. The collection lives only as long as the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJournal;

#[async_trait]
impl<T: Send + Sync> Journal<T> for NoJournal {
    async fn commit(&self, _items: &[T]) -> Result<(), JournalError> {
        Ok(())
    }
}

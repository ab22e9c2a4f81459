//! Error types for the collection actor.

/// Errors that can occur within the actor itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Could not generate an unused id")]
    IdExhausted,
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
    #[error("Commit failed: {0}")]
    CommitFailed(Box<dyn std::error::Error + Send + Sync>),
    #[error("Reload failed: {0}")]
    ReloadFailed(Box<dyn std::error::Error + Send + Sync>),
}

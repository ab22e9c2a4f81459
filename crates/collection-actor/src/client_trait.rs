use crate::{ActorEntity, CollectionClient, FrameworkError, Snapshot, Subscription};
use async_trait::async_trait;

/// Trait for domain clients to inherit the read and remove operations.
///
/// A domain client wraps a [`CollectionClient`] and exposes its own error type. Implementing
/// `inner` and `map_error` is enough to get `get`, `delete`, `snapshot` and `subscribe`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct TicketClient {
///     inner: CollectionClient<Ticket>,
/// }
///
/// #[async_trait]
/// impl ActorClient<Ticket> for TicketClient {
///     type Error = TicketError;
///
///     fn inner(&self) -> &CollectionClient<Ticket> {
///         &self.inner
///     }
///
///     fn map_error(e: FrameworkError) -> Self::Error {
///         TicketError::Actor(e.to_string())
///     }
/// }
///
/// // get(), delete(), snapshot() and subscribe() are provided automatically
/// let removed = client.delete(ticket_id).await?;
/// ```
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The domain-specific error type.
    type Error: From<String> + Send + Sync;

    /// Access the inner generic client.
    fn inner(&self) -> &CollectionClient<T>;

    /// Map framework errors to the domain error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch an entity by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Delete an entity by ID. `Ok(false)` means it was not live.
    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: T::Id) -> Result<bool, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete(id).await.map_err(Self::map_error)
    }

    /// The whole collection as it is now.
    async fn snapshot(&self) -> Result<Snapshot<T>, Self::Error> {
        self.inner().snapshot().await.map_err(Self::map_error)
    }

    /// Register for every future snapshot, starting from the current one.
    #[tracing::instrument(skip(self))]
    async fn subscribe(&self) -> Result<Subscription<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().subscribe().await.map_err(Self::map_error)
    }
}

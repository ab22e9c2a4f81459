//! Client half of the actor.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::CollectionRequest;
use crate::subscription::{Snapshot, Subscription};
use tokio::sync::{mpsc, oneshot};

/// A type-safe client for interacting with a [`CollectionActor`](crate::CollectionActor).
///
/// Holds only a sender, so cloning is inexpensive and clones can be handed to every view,
/// listener and background task that needs to talk to the same collection.
pub struct CollectionClient<T: ActorEntity> {
    sender: mpsc::Sender<CollectionRequest<T>>,
}

impl<T: ActorEntity> Clone for CollectionClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: ActorEntity> CollectionClient<T> {
    pub fn new(sender: mpsc::Sender<CollectionRequest<T>>) -> Self {
        Self { sender }
    }

    pub async fn create(&self, params: T::Create) -> Result<T::Id, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Create { params, respond_to })
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Get { id, respond_to })
            .await
    }

    /// Returns `true` when the item was live and has been removed.
    pub async fn delete(&self, id: T::Id) -> Result<bool, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Delete { id, respond_to })
            .await
    }

    pub async fn snapshot(&self) -> Result<Snapshot<T>, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Snapshot { respond_to })
            .await
    }

    pub async fn replace(&self, items: Vec<T>) -> Result<(), FrameworkError> {
        self.request(|respond_to| CollectionRequest::Replace { items, respond_to })
            .await
    }

    /// Re-reads the journal and replaces the collection with what it holds.
    pub async fn reload(&self) -> Result<(), FrameworkError> {
        self.request(|respond_to| CollectionRequest::Reload { respond_to })
            .await
    }

    pub async fn subscribe(&self) -> Result<Subscription<T>, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Subscribe { respond_to })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.request(|respond_to| CollectionRequest::Shutdown { respond_to })
            .await
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R, FrameworkError>>) -> CollectionRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}

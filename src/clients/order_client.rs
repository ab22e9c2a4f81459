use async_trait::async_trait;
use collection_actor::{ActorClient, CollectionClient, FrameworkError};
use tracing::{debug, instrument};

use crate::model::{Order, OrderDraft, OrderId, ValidationError};
use crate::order_actor::StoreError;

/// Client for interacting with the order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: CollectionClient<Order>,
}

impl OrderClient {
    pub fn new(inner: CollectionClient<Order>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, draft), fields(customer = %draft.customer()))]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<OrderId, StoreError> {
        debug!(?draft, "create_order called");
        self.inner.create(draft).await.map_err(Self::map_error)
    }

    /// Hands the actor a collection that is already durable in the backing medium.
    #[instrument(skip(self, orders), fields(size = orders.len()))]
    pub async fn replace_orders(&self, orders: Vec<Order>) -> Result<(), StoreError> {
        debug!("Sending request");
        self.inner.replace(orders).await.map_err(Self::map_error)
    }

    /// Asks the actor to re-read its journal and take whatever the medium holds now.
    pub async fn reload_orders(&self) -> Result<(), StoreError> {
        debug!("Sending request");
        self.inner.reload().await.map_err(Self::map_error)
    }

    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.inner.shutdown().await.map_err(Self::map_error)
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = StoreError;

    fn inner(&self) -> &CollectionClient<Order> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::EntityError(source) => match source.downcast::<ValidationError>() {
                Ok(validation) => StoreError::Validation(*validation),
                Err(other) => StoreError::ActorCommunicationError(other.to_string()),
            },
            FrameworkError::CommitFailed(source) | FrameworkError::ReloadFailed(source) => {
                StoreError::MediumUnavailable(source.to_string())
            }
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => StoreError::Closed,
            exhausted @ FrameworkError::IdExhausted => {
                StoreError::ActorCommunicationError(exhausted.to_string())
            }
        }
    }
}

//! Entity trait implementation for the Order domain type.
//!
//! This module contains the [`ActorEntity`] implementation that lets [`Order`] be held by the
//! generic [`CollectionActor`](collection_actor::CollectionActor).
//!
//! See the trait implementation on [`Order`] for method documentation.

use async_trait::async_trait;
use chrono::Utc;
use collection_actor::ActorEntity;

use crate::model::{Order, OrderDraft, OrderId, ValidationError};

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Create = OrderDraft;
    type Context = ();
    type Error = ValidationError;

    fn id(&self) -> &OrderId {
        &self.id
    }

    /// Stamps the draft with its id and the local creation time.
    fn from_create_params(id: OrderId, params: OrderDraft) -> Result<Self, ValidationError> {
        if params.items().is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(Order::from_draft(id, params, Utc::now()))
    }
}

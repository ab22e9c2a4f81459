//! The [`ActorEntity`] trait: what the actor needs to know about the items it holds.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any item must implement to be held by a [`CollectionActor`](crate::CollectionActor).
///
/// # Architecture Note
/// The actor owns ordering, identity checks and fan-out. The entity only describes how it is
/// built from a draft and how it is identified, so the same loop serves any item type.
///
/// Items are never updated in place: they enter the collection through `Create` (or a
/// wholesale `Replace`) and leave it through `Delete`. That is why there is no update hook.
///
/// # Async & Context
/// The hooks are `#[async_trait]` so they may call other services. The `Context` type is
/// injected by [`CollectionActor::run`](crate::CollectionActor::run) ("Late Binding").
#[async_trait]
pub trait ActorEntity: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// The unique identifier for this entity.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The data required to create a new instance (DTO - Data Transfer Object).
    type Create: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this entity.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The identifier of this instance.
    fn id(&self) -> &Self::Id;

    /// Construct the full entity from a fresh ID and the draft.
    /// This is called synchronously before `on_create`.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks (Async) ---

    /// Called after the entity is built and before it is committed.
    /// Returning an error aborts the create; the collection is left as it was.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called before the entity is removed. Returning an error keeps it in the collection.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }
}

//! The actor loop that owns the collection.

use crate::client::CollectionClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::journal::{Journal, NoJournal};
use crate::message::CollectionRequest;
use crate::subscription::{Snapshot, Subscription};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How many times `Create` asks the id generator for an id that is not already live.
const ID_ATTEMPTS: usize = 8;

/// The actor that owns an ordered collection of entities.
///
/// # Architecture Note
/// This struct is the "Server" half. It owns the canonical snapshot, the subscriber queues and
/// the receiver end of the request channel. Requests are processed *sequentially*, so the
/// snapshot needs no `Mutex`: the task has exclusive ownership of it.
///
/// # Usage Pattern
///
/// 1.  **Create**: Call `CollectionActor::new()` to get the `actor` (server) and `client` (interface).
/// 2.  **Configure**: Optionally attach a [`Journal`] and seed items loaded from storage.
/// 3.  **Run**: Spawn `actor.run(context)` in a background task.
///
/// # Implementation Details
///
/// * **Create**: fresh id, `from_create_params`, `on_create`, journal commit of the tentative
///   collection, swap, publish, respond.
/// * **Delete**: absent id responds `Ok(false)` without publishing. Otherwise `on_delete`,
///   journal commit, swap, publish, respond `Ok(true)`.
/// * **Replace**: drops duplicate ids (first one wins), swaps and publishes unless nothing changed.
/// * **Reload**: same as `Replace` with the collection the journal loads. A failed load keeps
///   the current collection.
/// * **Subscribe**: the new subscriber receives the snapshot that was current when this
///   message was handled, then every later publish.
pub struct CollectionActor<T: ActorEntity> {
    receiver: mpsc::Receiver<CollectionRequest<T>>,
    current: Snapshot<T>,
    subscribers: Vec<mpsc::UnboundedSender<Snapshot<T>>>,
    next_id: Box<dyn Fn() -> T::Id + Send + Sync>,
    journal: Box<dyn Journal<T>>,
}

impl<T: ActorEntity> CollectionActor<T> {
    /// Creates a new `CollectionActor` and its associated `CollectionClient`.
    ///
    /// # Arguments
    ///
    /// * `buffer_size` - The capacity of the request channel. If the channel is full,
    ///   calls to the client will wait until there is space.
    /// * `next_id` - Generator for the ids of created items.
    pub fn new(
        buffer_size: usize,
        next_id: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, CollectionClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            current: Arc::new(Vec::new()),
            subscribers: Vec::new(),
            next_id: Box::new(next_id),
            journal: Box::new(NoJournal),
        };
        let client = CollectionClient::new(sender);
        (actor, client)
    }

    /// Every accepted mutation is committed to `journal` before it becomes visible.
    pub fn with_journal(mut self, journal: impl Journal<T>) -> Self {
        self.journal = Box::new(journal);
        self
    }

    /// Starts from `items` instead of an empty collection (duplicate ids are dropped).
    pub fn with_items(mut self, items: Vec<T>) -> Self {
        self.current = Arc::new(dedupe(items));
        self
    }

    /// Runs the actor's event loop until the channel closes or a `Shutdown` arrives.
    ///
    /// # Context Injection
    /// The `context` argument is passed to every entity hook.
    pub async fn run(mut self, context: T::Context) {
        // Extract just the type name (e.g., "Order" instead of "order_queue::model::order::Order")
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, size = self.current.len(), "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CollectionRequest::Create { params, respond_to } => {
                    debug!(entity_type, ?params, "Create");
                    let Some(id) = self.fresh_id() else {
                        warn!(entity_type, "Id generator kept returning live ids");
                        let _ = respond_to.send(Err(FrameworkError::IdExhausted));
                        continue;
                    };

                    let mut item = match T::from_create_params(id.clone(), params) {
                        Ok(item) => item,
                        Err(e) => {
                            warn!(entity_type, error = %e, "Create failed");
                            let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                            continue;
                        }
                    };
                    if let Err(e) = item.on_create(&context).await {
                        warn!(entity_type, error = %e, "on_create failed");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        continue;
                    }

                    let mut next = Vec::with_capacity(self.current.len() + 1);
                    next.extend(self.current.iter().cloned());
                    next.push(item);
                    if let Err(e) = self.journal.commit(&next).await {
                        warn!(entity_type, %id, error = %e, "Commit failed, create discarded");
                        let _ = respond_to.send(Err(FrameworkError::CommitFailed(e)));
                        continue;
                    }
                    self.swap(next);
                    info!(entity_type, %id, size = self.current.len(), "Created");
                    let _ = respond_to.send(Ok(id));
                }
                CollectionRequest::Get { id, respond_to } => {
                    let item = self.current.iter().find(|item| item.id() == &id).cloned();
                    let found = item.is_some();
                    debug!(entity_type, %id, found, "Get");
                    let _ = respond_to.send(Ok(item));
                }
                CollectionRequest::Delete { id, respond_to } => {
                    debug!(entity_type, %id, "Delete");
                    let Some(index) = self.current.iter().position(|item| item.id() == &id) else {
                        debug!(entity_type, %id, "Not live, nothing to delete");
                        let _ = respond_to.send(Ok(false));
                        continue;
                    };
                    if let Err(e) = self.current[index].on_delete(&context).await {
                        warn!(entity_type, %id, error = %e, "on_delete failed");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        continue;
                    }

                    let mut next: Vec<T> = self.current.as_ref().clone();
                    next.remove(index);
                    if let Err(e) = self.journal.commit(&next).await {
                        warn!(entity_type, %id, error = %e, "Commit failed, delete discarded");
                        let _ = respond_to.send(Err(FrameworkError::CommitFailed(e)));
                        continue;
                    }
                    self.swap(next);
                    info!(entity_type, %id, size = self.current.len(), "Deleted");
                    let _ = respond_to.send(Ok(true));
                }
                CollectionRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(Ok(self.current.clone()));
                }
                CollectionRequest::Replace { items, respond_to } => {
                    self.replace(entity_type, items);
                    let _ = respond_to.send(Ok(()));
                }
                CollectionRequest::Reload { respond_to } => match self.journal.load().await {
                    Ok(Some(items)) => {
                        self.replace(entity_type, items);
                        let _ = respond_to.send(Ok(()));
                    }
                    Ok(None) => {
                        debug!(entity_type, "Journal keeps nothing to reload");
                        let _ = respond_to.send(Ok(()));
                    }
                    Err(e) => {
                        warn!(entity_type, error = %e, "Reload failed, keeping current collection");
                        let _ = respond_to.send(Err(FrameworkError::ReloadFailed(e)));
                    }
                },
                CollectionRequest::Subscribe { respond_to } => {
                    let (sender, receiver) = mpsc::unbounded_channel();
                    let subscription = Subscription::new(self.current.clone(), receiver);
                    if respond_to.send(Ok(subscription)).is_ok() {
                        self.subscribers.push(sender);
                        debug!(entity_type, subscribers = self.subscribers.len(), "Subscribed");
                    }
                }
                CollectionRequest::Shutdown { respond_to } => {
                    info!(entity_type, "Shutdown requested");
                    let _ = respond_to.send(Ok(()));
                    break;
                }
            }
        }

        // Dropping the senders ends every open subscription.
        self.subscribers.clear();
        info!(entity_type, size = self.current.len(), "Shutdown");
    }

    fn fresh_id(&self) -> Option<T::Id> {
        (0..ID_ATTEMPTS)
            .map(|_| (self.next_id)())
            .find(|candidate| self.current.iter().all(|item| item.id() != candidate))
    }

    fn replace(&mut self, entity_type: &str, items: Vec<T>) {
        let items = dedupe(items);
        if items == *self.current {
            debug!(entity_type, size = items.len(), "Replace with identical collection");
        } else {
            self.swap(items);
            info!(entity_type, size = self.current.len(), "Replaced");
        }
    }

    fn swap(&mut self, items: Vec<T>) {
        self.current = Arc::new(items);
        let snapshot = &self.current;
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}

fn dedupe<T: ActorEntity>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();
    let unique: Vec<T> = items
        .into_iter()
        .filter(|item| seen.insert(item.id().clone()))
        .collect();
    if unique.len() != before {
        warn!(dropped = before - unique.len(), "Duplicate ids dropped");
    }
    unique
}

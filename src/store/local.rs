use async_trait::async_trait;
use collection_actor::{Journal, JournalError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{remove_through, shut_down, Backend, OrderStore, OrderSubscription};
use crate::clients::{ActorClient, OrderClient};
use crate::lifecycle::{TaskKind, TaskSet};
use crate::model::{Order, OrderDraft, OrderId};
use crate::order_actor::{self, StoreError};
use crate::storage::{LocalStorage, StorageEvents, ORDERS_KEY};

/// Writes the whole collection into the `"orders"` slot.
struct SlotJournal {
    storage: Arc<dyn LocalStorage>,
}

#[async_trait]
impl Journal<Order> for SlotJournal {
    async fn commit(&self, items: &[Order]) -> Result<(), JournalError> {
        let raw = serde_json::to_string(items)?;
        self.storage.set_item(ORDERS_KEY, &raw).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Vec<Order>>, JournalError> {
        let orders = match self.storage.get_item(ORDERS_KEY).await? {
            Some(raw) => decode_orders(&raw)?,
            None => Vec::new(),
        };
        Ok(Some(orders))
    }
}

/// Orders persisted in a local slot and shared with every other handle on the same slots.
///
/// Each mutation is committed to the slot before subscribers see it. A listener task follows
/// the slot's change events and has the actor re-read the slot, so the collection always ends
/// up equal to what the slot holds after the last write. Concurrent writers are last writer wins.
pub struct LocalStore {
    client: OrderClient,
    tasks: TaskSet,
}

impl LocalStore {
    /// Loads the slot and starts the actor and the listener.
    ///
    /// A slot that does not hold a valid collection is logged and treated as empty. A storage
    /// that cannot be read at all is an error.
    pub async fn open(storage: Arc<dyn LocalStorage>, buffer: usize) -> Result<Self, StoreError> {
        // Listen first so nothing written between the read and the listener start is missed.
        let events = storage.events();
        let initial = match storage.get_item(ORDERS_KEY).await? {
            Some(raw) => decode_orders(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Unreadable order slot, starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        info!(size = initial.len(), "Order slot loaded");

        let journal = SlotJournal { storage };
        let (actor, client) = order_actor::new(buffer, journal);
        let tasks = TaskSet::new();
        tasks.spawn("order-actor", TaskKind::Actor, actor.with_items(initial).run(()));
        tasks.spawn(
            "storage-listener",
            TaskKind::Listener,
            listen(events, client.clone(), tasks.token()),
        );
        Ok(Self { client, tasks })
    }
}

#[async_trait]
impl OrderStore for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    #[instrument(skip(self, draft), fields(backend = "local"))]
    async fn add(&self, draft: OrderDraft) -> Result<OrderId, StoreError> {
        self.client.create_order(draft).await
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn remove(&self, id: &OrderId) -> Result<(), StoreError> {
        remove_through(&self.client, id).await
    }

    async fn subscribe(&self) -> Result<OrderSubscription, StoreError> {
        self.client.subscribe().await
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        shut_down(&self.client, &self.tasks).await
    }
}

/// Applies changes made by other handles until cancelled.
///
/// The value an event carries may already be stale by the time it is handled, so every event
/// on the slot triggers a fresh read inside the actor instead.
async fn listen(
    mut events: StorageEvents,
    client: OrderClient,
    token: CancellationToken,
) {
    debug!("Storage listener started");
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            info!("Storage closed, listener stopping");
            break;
        };
        if !event.concerns(ORDERS_KEY) {
            continue;
        }

        debug!(key = ?event.key, "Order slot changed elsewhere");
        match client.reload_orders().await {
            Ok(()) => {}
            Err(StoreError::Closed) => {
                warn!("Order actor gone, listener stopping");
                break;
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable order slot"),
        }
    }
    debug!("Storage listener stopped");
}

/// Decodes the slot value. Orders without items are dropped.
fn decode_orders(raw: &str) -> Result<Vec<Order>, serde_json::Error> {
    let orders: Vec<Order> = serde_json::from_str(raw)?;
    let before = orders.len();
    let orders: Vec<Order> = orders.into_iter().filter(|order| !order.items.is_empty()).collect();
    if orders.len() != before {
        warn!(dropped = before - orders.len(), "Orders without items dropped");
    }
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MenuItem, OrderKind};
    use crate::storage::MemoryStorage;

    fn draft(customer: &str) -> OrderDraft {
        OrderDraft::new(
            customer,
            vec![MenuItem::new("Tokyo Tea", "🍵", "Signature")],
            "no ice",
            OrderKind::Drink,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_slot_holds_the_collection() {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalStore::open(storage.clone(), 8).await.unwrap();

        let id = store.add(draft("Sam")).await.unwrap();
        let raw = storage.get_item(ORDERS_KEY).await.unwrap().unwrap();
        let stored = decode_orders(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].notes.as_deref(), Some("no ice"));

        store.shutdown().await.unwrap();

        // A new store on the same slots starts from what was persisted
        let reopened = LocalStore::open(storage, 8).await.unwrap();
        let subscription = reopened.subscribe().await.unwrap();
        assert_eq!(subscription.current()[0].id, id);
        reopened.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_collection_unchanged() {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalStore::open(storage.clone(), 8).await.unwrap();
        let id = store.add(draft("Sam")).await.unwrap();

        storage.set_available(false);
        let result = store.add(draft("Ana")).await;
        assert!(matches!(result, Err(StoreError::MediumUnavailable(_))));
        let result = store.remove(&id).await;
        assert!(matches!(result, Err(StoreError::MediumUnavailable(_))));

        let subscription = store.subscribe().await.unwrap();
        assert_eq!(subscription.current().len(), 1);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_slot_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(ORDERS_KEY, "{not json").await.unwrap();

        let store = LocalStore::open(storage, 8).await.unwrap();
        let subscription = store.subscribe().await.unwrap();
        assert!(subscription.current().is_empty());
        store.shutdown().await.unwrap();
    }

    #[test]
    fn test_decode_drops_orders_without_items() {
        let raw = r#"[
            {"id": "1", "items": [], "createdAt": 1},
            {"id": "2", "items": [{"name": "Miso Salmon"}], "type": "food", "createdAt": 2}
        ]"#;
        let orders = decode_orders(raw).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].kind, OrderKind::Food);
    }
}

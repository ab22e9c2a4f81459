use async_trait::async_trait;
use chrono::DateTime;
use collection_actor::NoJournal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{shut_down, Backend, OrderStore, OrderSubscription};
use crate::clients::{ActorClient, OrderClient};
use crate::documents::{ChangeFeed, DocumentCollection, DocumentSnapshot, NewOrderDocument};
use crate::lifecycle::{TaskKind, TaskSet};
use crate::model::{Order, OrderDraft, OrderId};
use crate::order_actor::{self, StoreError};

/// Orders kept in a remote realtime collection.
///
/// `add` and `remove` go straight to the collection and return once the remote store answered.
/// The local actor only ever changes when the change feed delivers, so the caller sees its own
/// mutation with the same latency as every other device.
pub struct RemoteStore {
    client: OrderClient,
    documents: Arc<dyn DocumentCollection>,
    tasks: TaskSet,
}

impl RemoteStore {
    /// Opens the change feed and starts the actor and the feed pump.
    pub fn open(documents: Arc<dyn DocumentCollection>, buffer: usize) -> Self {
        let feed = documents.watch();
        let (actor, client) = order_actor::new(buffer, NoJournal);
        let tasks = TaskSet::new();
        tasks.spawn("order-actor", TaskKind::Actor, actor.run(()));
        tasks.spawn(
            "change-feed",
            TaskKind::Listener,
            pump(feed, client.clone(), tasks.token()),
        );
        Self {
            client,
            documents,
            tasks,
        }
    }
}

#[async_trait]
impl OrderStore for RemoteStore {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    #[instrument(skip(self, draft), fields(backend = "remote"))]
    async fn add(&self, draft: OrderDraft) -> Result<OrderId, StoreError> {
        let id = self.documents.push(NewOrderDocument::from(draft)).await?;
        info!(%id, "Order pushed");
        Ok(id)
    }

    #[instrument(skip(self), fields(backend = "remote"))]
    async fn remove(&self, id: &OrderId) -> Result<(), StoreError> {
        self.documents.delete(id).await?;
        info!(%id, "Order deleted");
        Ok(())
    }

    async fn subscribe(&self) -> Result<OrderSubscription, StoreError> {
        self.client.subscribe().await
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        shut_down(&self.client, &self.tasks).await
    }
}

/// Feeds every collection from the change feed into the actor until cancelled.
async fn pump(mut feed: ChangeFeed, client: OrderClient, token: CancellationToken) {
    debug!("Change feed pump started");
    loop {
        let snapshot = tokio::select! {
            _ = token.cancelled() => break,
            snapshot = feed.next() => snapshot,
        };
        let Some(snapshot) = snapshot else {
            warn!("Change feed closed, pump stopping");
            break;
        };
        let orders = orders_from_documents(&snapshot);
        if let Err(e) = client.replace_orders(orders).await {
            warn!(error = %e, "Order actor gone, pump stopping");
            break;
        }
    }
    debug!("Change feed pump stopped");
}

/// Converts a collection read into orders sorted by creation time, then id.
///
/// Documents whose key is not a valid id, that have no items, or that have no server timestamp
/// yet are skipped.
pub fn orders_from_documents(snapshot: &DocumentSnapshot) -> Vec<Order> {
    let mut orders: Vec<Order> = snapshot
        .iter()
        .filter_map(|(key, document)| {
            let Ok(id) = OrderId::parse(key) else {
                warn!(%key, "Skipping document with an unusable key");
                return None;
            };
            if document.items.is_empty() {
                warn!(%id, "Skipping document without items");
                return None;
            }
            let Some(created_at) = document.created_at.and_then(DateTime::from_timestamp_millis)
            else {
                debug!(%id, "Skipping document without a server timestamp");
                return None;
            };
            Some(Order {
                id,
                customer: document.customer.clone(),
                items: document.items.clone(),
                notes: document.notes.clone(),
                kind: document.kind,
                created_at,
            })
        })
        .collect();
    orders.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{MemoryDocuments, OrderDocument};
    use crate::model::{MenuItem, OrderKind};
    use std::time::Duration;

    fn document(customer: &str, created_at: Option<i64>) -> OrderDocument {
        OrderDocument {
            customer: customer.to_string(),
            items: vec![MenuItem::new("Moscow Mule", "🥃", "Classic")],
            notes: None,
            kind: OrderKind::Drink,
            created_at,
        }
    }

    #[test]
    fn test_orders_sorted_by_server_time() {
        let mut snapshot = DocumentSnapshot::new();
        snapshot.insert("-a".to_string(), document("late", Some(30)));
        snapshot.insert("-b".to_string(), document("early", Some(10)));
        snapshot.insert("-c".to_string(), document("tie", Some(10)));
        snapshot.insert("-d".to_string(), document("pending", None));
        snapshot.insert("bad.key".to_string(), document("bad", Some(1)));
        let mut empty = document("empty", Some(5));
        empty.items.clear();
        snapshot.insert("-e".to_string(), empty);

        let customers: Vec<String> = orders_from_documents(&snapshot)
            .into_iter()
            .map(|order| order.customer)
            .collect();
        assert_eq!(customers, vec!["early", "tie", "late"]);
    }

    #[tokio::test]
    async fn test_own_add_arrives_through_the_feed() {
        let documents = MemoryDocuments::new().with_feed_delay(Duration::from_millis(30));
        let store = RemoteStore::open(Arc::new(documents.clone()), 8);
        let mut subscription = store.subscribe().await.unwrap();

        let draft = OrderDraft::new(
            "Sam",
            vec![MenuItem::new("Moscow Mule", "🥃", "Classic")],
            "",
            OrderKind::Drink,
        )
        .unwrap();
        let id = store.add(draft).await.unwrap();

        // Stored remotely right away, but the local view waits for the feed
        assert!(documents.documents().contains_key(id.as_str()));
        assert!(subscription.current().is_empty());

        let snapshot = tokio::time::timeout(
            Duration::from_secs(2),
            subscription.wait_for(|orders| orders.iter().any(|order| order.id == id)),
        )
        .await
        .expect("feed never delivered")
        .unwrap();
        assert_eq!(snapshot.len(), 1);

        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_add_fails_without_change() {
        let documents = MemoryDocuments::new();
        let store = RemoteStore::open(Arc::new(documents.clone()), 8);
        documents.set_online(false);

        let draft = OrderDraft::new(
            "",
            vec![MenuItem::new("Miso Salmon", "🐟", "Entree")],
            "",
            OrderKind::Food,
        )
        .unwrap();
        let result = store.add(draft).await;
        assert!(matches!(result, Err(StoreError::MediumUnavailable(_))));
        assert!(documents.documents().is_empty());

        store.shutdown().await.unwrap();
    }
}

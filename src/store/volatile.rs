use async_trait::async_trait;
use collection_actor::NoJournal;
use tracing::instrument;

use super::{remove_through, shut_down, Backend, OrderStore, OrderSubscription};
use crate::clients::{ActorClient, OrderClient};
use crate::lifecycle::{TaskKind, TaskSet};
use crate::model::{OrderDraft, OrderId};
use crate::order_actor::{self, StoreError};

/// Orders live only as long as the process. Surfaces share them by sharing the store.
pub struct VolatileStore {
    client: OrderClient,
    tasks: TaskSet,
}

impl VolatileStore {
    /// Spawns the order actor. Must be called inside a Tokio runtime.
    pub fn start(buffer: usize) -> Self {
        let (actor, client) = order_actor::new(buffer, NoJournal);
        let tasks = TaskSet::new();
        tasks.spawn("order-actor", TaskKind::Actor, actor.run(()));
        Self { client, tasks }
    }

    /// Wraps a client whose actor is run by someone else (a mock in tests).
    pub fn with_client(client: OrderClient) -> Self {
        Self {
            client,
            tasks: TaskSet::new(),
        }
    }
}

#[async_trait]
impl OrderStore for VolatileStore {
    fn backend(&self) -> Backend {
        Backend::Volatile
    }

    #[instrument(skip(self, draft), fields(backend = "volatile"))]
    async fn add(&self, draft: OrderDraft) -> Result<OrderId, StoreError> {
        self.client.create_order(draft).await
    }

    #[instrument(skip(self), fields(backend = "volatile"))]
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MenuItem, OrderKind, FALLBACK_CUSTOMER};

    fn draft(customer: &str) -> OrderDraft {
        OrderDraft::new(
            customer,
            vec![MenuItem::new("Moscow Mule", "🥃", "Classic")],
            "",
            OrderKind::Drink,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_add_remove_and_subscribe() {
        let store = VolatileStore::start(8);
        let mut subscription = store.subscribe().await.unwrap();
        assert!(subscription.current().is_empty());

        let first = store.add(draft("")).await.unwrap();
        let second = store.add(draft("")).await.unwrap();
        assert_ne!(first, second);

        let snapshot = subscription.wait_for(|orders| orders.len() == 2).await.unwrap();
        assert!(snapshot.iter().all(|order| order.customer == FALLBACK_CUSTOMER));

        store.remove(&first).await.unwrap();
        store.remove(&first).await.unwrap();
        let snapshot = subscription.wait_for(|orders| orders.len() == 1).await.unwrap();
        assert_eq!(snapshot[0].id, second);

        store.shutdown().await.unwrap();
        store.shutdown().await.unwrap();
        assert!(matches!(store.add(draft("Sam")).await, Err(StoreError::Closed)));
    }
}

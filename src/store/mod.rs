//! # The Order Store
//!
//! One interface, three interchangeable backing media, picked once at startup by
//! [`open_store`]:
//!
//! | Store | Persists | Reaches other surfaces | Who assigns ids |
//! |-------|----------|------------------------|-----------------|
//! | [`VolatileStore`] | no | only through a shared store value | the store |
//! | [`LocalStore`] | local slot `"orders"` | other handles on the same slots | the store |
//! | [`RemoteStore`] | remote collection `"orders"` | every device on the collection | the remote store |
//!
//! In every variant the canonical collection lives in a
//! [`CollectionActor`](collection_actor::CollectionActor). Subscribers register with the actor
//! and get the current snapshot followed by every later one, exactly once each.
//!
//! ## Mutation Paths
//!
//! ```text
//! Volatile:  add ──▶ actor ──▶ subscribers
//! Local:     add ──▶ actor ──▶ slot written ──▶ subscribers
//!                                 └──▶ other handles ──▶ listener ──▶ replace
//! Remote:    add ──▶ remote push ··· change feed ──▶ pump ──▶ replace ──▶ subscribers
//! ```
//!
//! In the remote variant nothing is echoed locally: the caller's own view changes only when the
//! change feed delivers the new collection.
//!
//! ## Conflicts
//!
//! The local variant is last writer wins. Two handles that mutate at the same time each write
//! their own full collection; whichever write lands last is what every handle ends up with, and
//! the other mutation is lost without an error.

pub mod local;
pub mod remote;
pub mod volatile;

pub use local::LocalStore;
pub use remote::RemoteStore;
pub use volatile::VolatileStore;

use async_trait::async_trait;
use collection_actor::Subscription;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clients::{ActorClient, OrderClient};
use crate::config::{BackendConfig, Config};
use crate::documents::HttpDocuments;
use crate::lifecycle::TaskSet;
use crate::model::{Order, OrderDraft, OrderId};
use crate::order_actor::StoreError;
use crate::storage::FileStorage;

/// Registration for every future collection, starting from the current one.
pub type OrderSubscription = Subscription<Order>;

/// Which backing medium a store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Volatile,
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Volatile => write!(f, "volatile"),
            Backend::Local => write!(f, "local"),
            Backend::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volatile" | "memory" => Ok(Backend::Volatile),
            "local" => Ok(Backend::Local),
            "remote" => Ok(Backend::Remote),
            other => Err(format!("unknown backend {other:?}")),
        }
    }
}

/// The capability set every backing medium offers.
#[async_trait]
pub trait OrderStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// Appends an order built from `draft`. On error the collection is unchanged.
    async fn add(&self, draft: OrderDraft) -> Result<OrderId, StoreError>;

    /// Removes the order with `id`. Removing an order that is not live succeeds.
    async fn remove(&self, id: &OrderId) -> Result<(), StoreError>;

    async fn subscribe(&self) -> Result<OrderSubscription, StoreError>;

    /// Stops the actor and every background task. Calling it again is harmless.
    async fn shutdown(&self) -> Result<(), StoreError>;
}

/// Opens the store selected by `config`.
pub async fn open_store(config: &Config) -> Result<Arc<dyn OrderStore>, StoreError> {
    let capacity = config.channel_capacity;
    let store: Arc<dyn OrderStore> = match &config.backend {
        BackendConfig::Volatile => Arc::new(VolatileStore::start(capacity)),
        BackendConfig::Local {
            storage_dir,
            poll_interval,
        } => {
            let storage = FileStorage::open(storage_dir, *poll_interval).await?;
            Arc::new(LocalStore::open(Arc::new(storage), capacity).await?)
        }
        BackendConfig::Remote(remote) => {
            let mut documents = HttpDocuments::new(remote.url.clone(), remote.timeout)?
                .with_retry(remote.retry)
                .with_poll_interval(remote.poll_interval);
            if let Some(token) = &remote.auth {
                documents = documents.with_auth(token.clone());
            }
            Arc::new(RemoteStore::open(Arc::new(documents), capacity))
        }
    };
    info!(backend = %store.backend(), "Order store opened");
    Ok(store)
}

/// Removal through the actor, shared by the stores whose actor is the writer.
async fn remove_through(client: &OrderClient, id: &OrderId) -> Result<(), StoreError> {
    let removed = client.delete(id.clone()).await?;
    if !removed {
        debug!(%id, "Order was not live");
    }
    Ok(())
}

/// Stops the actor, then every task. An actor that is already gone counts as stopped.
async fn shut_down(client: &OrderClient, tasks: &TaskSet) -> Result<(), StoreError> {
    let result = match client.shutdown().await {
        Err(StoreError::Closed) => Ok(()),
        other => other,
    };
    tasks.shutdown().await;
    result
}

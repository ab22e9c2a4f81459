use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChangeFeed, DocumentCollection, DocumentSnapshot, NewOrderDocument, RemoteError};
use crate::model::OrderId;

struct Database {
    documents: DocumentSnapshot,
    /// Last server timestamp handed out, in epoch milliseconds.
    clock: i64,
}

struct Shared {
    database: Mutex<Database>,
    online: AtomicBool,
    feed: watch::Sender<Option<Arc<DocumentSnapshot>>>,
}

/// An in-process realtime collection.
///
/// Clones are separate connections to the same database, like two devices on one project.
/// Push ids sort by creation time and the server clock never goes backwards.
#[derive(Clone)]
pub struct MemoryDocuments {
    shared: Arc<Shared>,
    feed_delay: Duration,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Some(Arc::new(DocumentSnapshot::new())));
        Self {
            shared: Arc::new(Shared {
                database: Mutex::new(Database {
                    documents: DocumentSnapshot::new(),
                    clock: 0,
                }),
                online: AtomicBool::new(true),
                feed,
            }),
            feed_delay: Duration::ZERO,
        }
    }

    /// Feeds opened through this connection deliver each change after `delay`.
    pub fn with_feed_delay(mut self, delay: Duration) -> Self {
        self.feed_delay = delay;
        self
    }

    /// While offline, `push` and `delete` fail with [`RemoteError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        info!(online, "Document store connectivity changed");
        self.shared.online.store(online, Ordering::SeqCst);
    }

    /// The stored documents, as the server sees them.
    pub fn documents(&self) -> DocumentSnapshot {
        self.database().documents.clone()
    }

    fn database(&self) -> std::sync::MutexGuard<'_, Database> {
        self.shared
            .database
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.shared.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("offline".to_string()))
        }
    }

    fn publish(&self, documents: &DocumentSnapshot) {
        self.shared.feed.send_replace(Some(Arc::new(documents.clone())));
    }
}

impl Default for MemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentCollection for MemoryDocuments {
    async fn push(&self, document: NewOrderDocument) -> Result<OrderId, RemoteError> {
        self.ensure_online()?;
        let mut database = self.database();
        let created_at = Utc::now().timestamp_millis().max(database.clock + 1);
        database.clock = created_at;

        let suffix = Uuid::new_v4().simple().to_string();
        let key = format!("-{created_at:012x}{}", &suffix[..8]);
        let id = OrderId::parse(&key).map_err(|_| RemoteError::InvalidId(key.clone()))?;

        database.documents.insert(key, document.stored_at(created_at));
        debug!(%id, created_at, size = database.documents.len(), "Document pushed");
        self.publish(&database.documents);
        Ok(id)
    }

    async fn delete(&self, id: &OrderId) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let mut database = self.database();
        if database.documents.remove(id.as_str()).is_some() {
            debug!(%id, size = database.documents.len(), "Document deleted");
            self.publish(&database.documents);
        }
        Ok(())
    }

    fn watch(&self) -> ChangeFeed {
        ChangeFeed::new(self.shared.feed.subscribe(), self.feed_delay, None)
    }
}

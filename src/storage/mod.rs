//! # Local Persistent Slots
//!
//! A small key-value interface in the shape of a browser's local storage: string keys, string
//! values, and a change notification that reaches every *other* handle on the same slots.
//!
//! ## Handles and Origins
//!
//! Each handle gets an origin number. Writes are broadcast together with the origin of the
//! handle that made them, and [`StorageEvents`] drops the ones that came from its own handle,
//! the same way a tab never receives `storage` events for its own writes.
//!
//! | Implementation | Shared between | Notification |
//! |----------------|----------------|--------------|
//! | [`MemoryStorage`] | handles from [`MemoryStorage::tab`] | immediate broadcast |
//! | [`FileStorage`] | every handle on the same directory, any process | directory poller |

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use crate::lifecycle::AbortOnDrop;

/// Slot holding the full order collection as a JSON array.
pub const ORDERS_KEY: &str = "orders";

/// Capacity of the per-handle notification channel.
const EVENT_CAPACITY: usize = 64;

/// Origin used for changes detected by watching the medium itself.
const EXTERNAL_ORIGIN: u64 = 0;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(EXTERNAL_ORIGIN + 1);

fn next_origin() -> u64 {
    NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium refused the operation (quota exceeded, disabled, disk gone).
    #[error("Local storage unavailable")]
    Unavailable,

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A change made through another handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// `None` when the change is unknown and every slot should be re-read.
    pub key: Option<String>,
    /// `None` when the slot was removed (or the change is unknown).
    pub new_value: Option<String>,
}

impl StorageEvent {
    pub fn changed(key: &str, new_value: Option<String>) -> Self {
        Self {
            key: Some(key.to_string()),
            new_value,
        }
    }

    /// Something changed but the details were lost.
    pub fn unknown() -> Self {
        Self {
            key: None,
            new_value: None,
        }
    }

    /// Whether a listener interested in `key` has to react.
    pub fn concerns(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Notice {
    origin: u64,
    event: StorageEvent,
}

/// Receiver of [`StorageEvent`]s for one handle.
pub struct StorageEvents {
    receiver: broadcast::Receiver<Notice>,
    origin: u64,
    _watcher: Option<Arc<AbortOnDrop>>,
}

impl StorageEvents {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Notice>,
        origin: u64,
        watcher: Option<Arc<AbortOnDrop>>,
    ) -> Self {
        Self {
            receiver,
            origin,
            _watcher: watcher,
        }
    }

    /// Waits for the next foreign change. Returns `None` once the storage is gone.
    ///
    /// A receiver that fell behind gets a single [`StorageEvent::unknown`] instead of the
    /// events it missed.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(notice) if notice.origin == self.origin => continue,
                Ok(notice) => return Some(notice.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Storage listener lagged, re-reading");
                    return Some(StorageEvent::unknown());
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A string key-value medium with change notification.
#[async_trait]
pub trait LocalStorage: Send + Sync + 'static {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribes to changes made through other handles.
    fn events(&self) -> StorageEvents;
}

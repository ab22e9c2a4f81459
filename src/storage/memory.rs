use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

use super::{next_origin, LocalStorage, Notice, StorageError, StorageEvent, StorageEvents, EVENT_CAPACITY};

struct Shared {
    slots: Mutex<HashMap<String, String>>,
    available: AtomicBool,
    events: broadcast::Sender<Notice>,
}

/// In-process slots shared by every handle opened with [`tab`](MemoryStorage::tab).
pub struct MemoryStorage {
    shared: Arc<Shared>,
    origin: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                slots: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                events,
            }),
            origin: next_origin(),
        }
    }

    /// Another handle on the same slots, as a second tab would see them.
    pub fn tab(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            origin: next_origin(),
        }
    }

    /// While unavailable every operation fails with [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(self
            .shared
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn notify(&self, key: &str, new_value: Option<String>) {
        let notice = Notice {
            origin: self.origin,
            event: StorageEvent::changed(key, new_value),
        };
        // No receivers is fine: nobody is listening yet.
        let _ = self.shared.events.send(notice);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots()?.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots()?.insert(key.to_string(), value.to_string());
        debug!(key, origin = self.origin, bytes = value.len(), "Slot written");
        self.notify(key, Some(value.to_string()));
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.slots()?.remove(key).is_some();
        if removed {
            debug!(key, origin = self.origin, "Slot removed");
            self.notify(key, None);
        }
        Ok(())
    }

    fn events(&self) -> StorageEvents {
        StorageEvents::new(self.shared.events.subscribe(), self.origin, None)
    }
}

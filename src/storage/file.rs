use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{
    next_origin, LocalStorage, Notice, StorageError, StorageEvent, StorageEvents, EVENT_CAPACITY,
    EXTERNAL_ORIGIN,
};
use crate::lifecycle::AbortOnDrop;

const SLOT_EXTENSION: &str = "json";

struct Inner {
    dir: PathBuf,
    /// Last value of every slot this handle wrote or observed.
    known: tokio::sync::Mutex<HashMap<String, String>>,
    events: broadcast::Sender<Notice>,
}

/// Slots stored as one file per key in a directory.
///
/// Several processes can open the same directory. Writes replace the file atomically (temporary
/// file, then rename). Changes made by other handles are found by a poller that runs while at
/// least one [`StorageEvents`] of this handle is alive.
pub struct FileStorage {
    inner: Arc<Inner>,
    origin: u64,
    poll_interval: Duration,
    watcher: Mutex<Weak<AbortOnDrop>>,
}

impl FileStorage {
    /// Opens (and creates if needed) the directory holding the slots.
    pub async fn open(dir: impl AsRef<Path>, poll_interval: Duration) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;
        let known = scan(&dir).await?;
        info!(dir = %dir.display(), slots = known.len(), "File storage opened");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                known: tokio::sync::Mutex::new(known),
                events,
            }),
            origin: next_origin(),
            poll_interval,
            watcher: Mutex::new(Weak::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.inner.dir.join(format!("{key}.{SLOT_EXTENSION}")))
    }

    /// Returns the running poller or starts a new one.
    fn watcher(&self) -> Arc<AbortOnDrop> {
        let mut slot = self.watcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(watcher) = slot.upgrade() {
            return watcher;
        }
        let handle = tokio::spawn(poll(self.inner.clone(), self.poll_interval));
        let watcher = Arc::new(AbortOnDrop::new(handle));
        *slot = Arc::downgrade(&watcher);
        watcher
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(&path, source)),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let temp = self
            .inner
            .dir
            .join(format!(".{key}.{SLOT_EXTENSION}.{}.tmp", self.origin));

        // Held across the write so the poller never mistakes this write for a foreign one.
        let mut known = self.inner.known.lock().await;
        tokio::fs::write(&temp, value)
            .await
            .map_err(|source| io_error(&temp, source))?;
        if let Err(source) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(&path, source));
        }
        known.insert(key.to_string(), value.to_string());
        debug!(key, origin = self.origin, bytes = value.len(), "Slot written");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let mut known = self.inner.known.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(key, origin = self.origin, "Slot removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(&path, source)),
        }
        known.remove(key);
        Ok(())
    }

    fn events(&self) -> StorageEvents {
        let receiver = self.inner.events.subscribe();
        StorageEvents::new(receiver, self.origin, Some(self.watcher()))
    }
}

/// Compares the directory with the known slots on every tick and reports the differences.
async fn poll(inner: Arc<Inner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    debug!(dir = %inner.dir.display(), ?interval, "Slot poller started");

    loop {
        ticker.tick().await;
        // Locked before scanning so a write in progress is either fully seen or not at all.
        let mut known = inner.known.lock().await;
        let current = match scan(&inner.dir).await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Slot poll failed");
                continue;
            }
        };

        let mut changes = Vec::new();
        for (key, value) in &current {
            if known.get(key) != Some(value) {
                changes.push(StorageEvent::changed(key, Some(value.clone())));
            }
        }
        for key in known.keys() {
            if !current.contains_key(key) {
                changes.push(StorageEvent::changed(key, None));
            }
        }
        *known = current;
        drop(known);

        for event in changes {
            debug!(key = ?event.key, "Foreign slot change");
            let _ = inner.events.send(Notice {
                origin: EXTERNAL_ORIGIN,
                event,
            });
        }
    }
}

/// Reads every slot file in `dir`. Temporary files are skipped.
async fn scan(dir: &Path) -> Result<HashMap<String, String>, StorageError> {
    let mut slots = HashMap::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| io_error(dir, source))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| io_error(dir, source))?
    {
        let path = entry.path();
        let Some(key) = slot_key(&path) else {
            continue;
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => {
                slots.insert(key, value);
            }
            // Removed between listing and reading.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(&path, source)),
        }
    }
    Ok(slots)
}

fn slot_key(path: &Path) -> Option<String> {
    if path.extension()? != SLOT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    Some(stem.to_string())
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const POLL: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_slots_persist_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStorage::open(dir.path(), POLL).await.unwrap();
        first.set_item("orders", r#"[{"id":"a"}]"#).await.unwrap();
        drop(first);

        let second = FileStorage::open(dir.path(), POLL).await.unwrap();
        assert_eq!(
            second.get_item("orders").await.unwrap().as_deref(),
            Some(r#"[{"id":"a"}]"#)
        );
        second.remove_item("orders").await.unwrap();
        second.remove_item("orders").await.unwrap();
        assert_eq!(second.get_item("orders").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poller_reports_foreign_writes_only() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStorage::open(dir.path(), POLL).await.unwrap();
        let second = FileStorage::open(dir.path(), POLL).await.unwrap();
        let mut first_events = first.events();
        let mut second_events = second.events();

        first.set_item("orders", "[]").await.unwrap();

        let event = timeout(Duration::from_secs(2), second_events.recv())
            .await
            .expect("second handle was not notified")
            .unwrap();
        assert_eq!(event, StorageEvent::changed("orders", Some("[]".to_string())));

        let pending = timeout(POLL * 5, first_events.recv()).await;
        assert!(pending.is_err(), "own write must not be reported");
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path(), POLL).await.unwrap();
        for key in ["", "../orders", "a/b", "orders.json"] {
            assert!(matches!(
                storage.set_item(key, "[]").await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}

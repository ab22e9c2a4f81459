//! Ownership of the background tasks a store runs.
//!
//! Every store owns a [`TaskSet`]: the actor loop, the storage listener and the change-feed pump
//! are registered with it. [`TaskSet::shutdown`] cancels the shared token and awaits every task;
//! dropping the set without shutting down aborts whatever is still running, so no listener keeps
//! firing after its store is gone.
//!
//! Pollers are not registered. Each one sits in an [`AbortOnDrop`] inside the event stream or
//! change feed it fills, and that stream is owned by a listener or pump task, so the poller ends
//! when that task does.

use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// What a background task does. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// The collection actor loop.
    Actor,
    /// Follows change notifications from a backing medium.
    Listener,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Actor => write!(f, "Actor"),
            TaskKind::Listener => write!(f, "Listener"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// A named group of tasks sharing one cancellation token.
pub struct TaskSet {
    tasks: Mutex<Vec<RegisteredTask>>,
    token: CancellationToken,
}

impl TaskSet {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            token: CancellationToken::new(),
        }
    }

    /// Token that tasks select on to learn about shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns `future` and registers its handle. Must be called inside a Tokio runtime.
    pub fn spawn<F>(&self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        debug!(task = name, %kind, "Registered background task");
        self.lock().push(RegisteredTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cancels the token and waits for every registered task. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let tasks = std::mem::take(&mut *self.lock());
        if tasks.is_empty() {
            return;
        }
        info!(count = tasks.len(), "Stopping background tasks");

        for task in tasks {
            match task.handle.await {
                Ok(()) => debug!(task = task.name, kind = %task.kind, "Task stopped"),
                Err(e) if e.is_cancelled() => debug!(task = task.name, "Task cancelled"),
                Err(e) => error!(task = task.name, error = ?e, "Task panicked"),
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RegisteredTask>> {
        // A poisoned list is still a valid list of handles.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.token.cancel();
        let tasks = std::mem::take(&mut *self.lock());
        for task in tasks {
            if !task.handle.is_finished() {
                debug!(task = task.name, "Aborting background task");
                task.handle.abort();
            }
        }
    }
}

/// Aborts the wrapped task when dropped. Used for helpers owned by a single value, such as the
/// poller behind a change feed.
#[derive(Debug)]
pub struct AbortOnDrop(JoinHandle<()>);

impl AbortOnDrop {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_cancels_and_awaits() {
        let tasks = TaskSet::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let token = tasks.token();
        let flag = stopped.clone();
        tasks.spawn("listener", TaskKind::Listener, async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(tasks.len(), 1);

        tasks.shutdown().await;
        assert!(stopped.load(Ordering::SeqCst));
        assert!(tasks.is_empty());

        // Second call is a no-op
        tasks.shutdown().await;
    }

    #[tokio::test]
    async fn test_drop_aborts_running_tasks() {
        let (sender, mut receiver) = tokio::sync::mpsc::channel::<()>(1);
        {
            let tasks = TaskSet::new();
            tasks.spawn("listener", TaskKind::Listener, async move {
                let _sender = sender;
                std::future::pending::<()>().await;
            });
        }
        // The aborted task drops its sender, which closes the channel
        let closed = tokio::time::timeout(Duration::from_secs(1), receiver.recv()).await;
        assert_eq!(closed, Ok(None));
    }
}

//! Subscriber side of the snapshot fan-out.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An immutable, cheaply cloneable view of the whole collection.
pub type Snapshot<T> = Arc<Vec<T>>;

/// A registration with a [`CollectionActor`](crate::CollectionActor).
///
/// Starts from the snapshot that was current when the actor accepted the registration and then
/// yields every later snapshot exactly once, in the order the actor produced them. Dropping the
/// subscription (or calling [`unsubscribe`](Self::unsubscribe)) deregisters it; the actor prunes
/// it on its next publish.
///
/// The queue behind it is unbounded so a slow reader never stalls the actor. The cost is that
/// every snapshot published while nobody calls [`next`](Self::next) stays queued: a subscriber
/// that stops reading should be dropped.
pub struct Subscription<T> {
    current: Snapshot<T>,
    receiver: mpsc::UnboundedReceiver<Snapshot<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(current: Snapshot<T>, receiver: mpsc::UnboundedReceiver<Snapshot<T>>) -> Self {
        Self { current, receiver }
    }

    /// The latest snapshot this subscriber has seen.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// Waits for the next snapshot. Returns `None` once the actor has shut down.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        let snapshot = self.receiver.recv().await?;
        self.current = snapshot.clone();
        Some(snapshot)
    }

    /// Returns the first snapshot (starting with the current one) that satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Option<Snapshot<T>>
    where
        F: Fn(&[T]) -> bool,
    {
        if predicate(&self.current) {
            return Some(self.current.clone());
        }
        while let Some(snapshot) = self.next().await {
            if predicate(&snapshot) {
                return Some(snapshot);
            }
        }
        None
    }

    /// Deregisters from the actor.
    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("len", &self.current.len())
            .finish()
    }
}

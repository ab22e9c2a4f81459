use chrono::{DateTime, FixedOffset, Local, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::model::{Order, OrderId, OrderKind};
use crate::order_actor::StoreError;
use crate::store::{OrderStore, OrderSubscription};

/// Minutes after which an order stops being fresh.
const WAITING_AFTER_MINUTES: i64 = 5;
/// Minutes after which an order is overdue.
const OVERDUE_AFTER_MINUTES: i64 = 10;

/// How long an order has been waiting, bucketed for color coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Fresh,
    Waiting,
    Overdue,
}

impl Urgency {
    pub fn from_elapsed_minutes(minutes: i64) -> Self {
        if minutes >= OVERDUE_AFTER_MINUTES {
            Urgency::Overdue
        } else if minutes >= WAITING_AFTER_MINUTES {
            Urgency::Waiting
        } else {
            Urgency::Fresh
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Fresh => write!(f, "fresh"),
            Urgency::Waiting => write!(f, "waiting"),
            Urgency::Overdue => write!(f, "overdue"),
        }
    }
}

/// "Just now", "1 min ago", "7 mins ago".
pub fn elapsed_label(minutes: i64) -> String {
    match minutes {
        m if m < 1 => "Just now".to_string(),
        1 => "1 min ago".to_string(),
        m => format!("{m} mins ago"),
    }
}

/// One rendered row of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: OrderId,
    /// Customer name, or `Order #n` by position when there is none.
    pub title: String,
    /// Upper-cased first letter of the customer, or `#`.
    pub initial: String,
    pub items: Vec<String>,
    pub notes: Option<String>,
    pub kind: OrderKind,
    /// Wall-clock time the order was placed, like "9:05 PM".
    pub placed_at: String,
    pub elapsed: String,
    pub urgency: Urgency,
}

/// Live view of the queue for staff.
///
/// Renders whatever the store delivers, in the store's order. The kind filter only narrows what
/// this view shows; the store and other subscribers are unaffected.
///
/// Snapshots pile up in the underlying subscription until [`refresh`](Self::refresh) or
/// [`wait_until`](Self::wait_until) drains them. Keep calling one of them, or drop the view.
pub struct QueueView {
    store: Arc<dyn OrderStore>,
    subscription: OrderSubscription,
    filter: Option<OrderKind>,
    offset: FixedOffset,
}

impl QueueView {
    pub async fn open(store: Arc<dyn OrderStore>) -> Result<Self, StoreError> {
        let subscription = store.subscribe().await?;
        debug!(size = subscription.current().len(), "Queue view opened");
        Ok(Self {
            store,
            subscription,
            filter: None,
            offset: *Local::now().offset(),
        })
    }

    /// Formats placement times in `offset` instead of the local zone.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn set_filter(&mut self, filter: Option<OrderKind>) {
        self.filter = filter;
    }

    pub fn filter(&self) -> Option<OrderKind> {
        self.filter
    }

    /// The visible orders of the latest snapshot.
    pub fn orders(&self) -> Vec<&Order> {
        self.subscription
            .current()
            .iter()
            .filter(|order| self.filter.map_or(true, |kind| order.kind == kind))
            .collect()
    }

    /// Waits for the next snapshot. Returns `false` once the store has shut down.
    pub async fn refresh(&mut self) -> bool {
        self.subscription.next().await.is_some()
    }

    /// Waits until the visible orders satisfy `predicate`. Returns `false` if the store shut
    /// down first.
    pub async fn wait_until<F>(&mut self, predicate: F) -> bool
    where
        F: Fn(&[&Order]) -> bool,
    {
        let filter = self.filter;
        self.subscription
            .wait_for(|orders| {
                let visible: Vec<&Order> = orders
                    .iter()
                    .filter(|order| filter.map_or(true, |kind| order.kind == kind))
                    .collect();
                predicate(&visible)
            })
            .await
            .is_some()
    }

    /// "No pending orders", "1 order in queue", "3 orders in queue".
    pub fn header(&self) -> String {
        match self.orders().len() {
            0 => "No pending orders".to_string(),
            1 => "1 order in queue".to_string(),
            n => format!("{n} orders in queue"),
        }
    }

    /// Display rows for the visible orders, timed against `now`.
    pub fn entries(&self, now: DateTime<Utc>) -> Vec<QueueEntry> {
        self.orders()
            .into_iter()
            .enumerate()
            .map(|(index, order)| {
                let minutes = (now - order.created_at).num_minutes().max(0);
                let customer = order.customer.trim();
                let (title, initial) = match customer.chars().next() {
                    Some(first) => (customer.to_string(), first.to_uppercase().to_string()),
                    None => (format!("Order #{}", index + 1), "#".to_string()),
                };
                QueueEntry {
                    id: order.id.clone(),
                    title,
                    initial,
                    items: order.items.iter().map(|item| item.name.clone()).collect(),
                    notes: order.notes.clone(),
                    kind: order.kind,
                    placed_at: order
                        .created_at
                        .with_timezone(&self.offset)
                        .format("%-I:%M %p")
                        .to_string(),
                    elapsed: elapsed_label(minutes),
                    urgency: Urgency::from_elapsed_minutes(minutes),
                }
            })
            .collect()
    }

    /// Marks the order done. `raw_id` comes from the outer surface and is checked before the
    /// store is involved.
    #[instrument(skip(self))]
    pub async fn complete(&self, raw_id: &str) -> Result<(), StoreError> {
        let id = OrderId::parse(raw_id)?;
        self.store.remove(&id).await?;
        info!(%id, "Order completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_and_urgency_buckets() {
        assert_eq!(elapsed_label(0), "Just now");
        assert_eq!(elapsed_label(1), "1 min ago");
        assert_eq!(elapsed_label(12), "12 mins ago");

        assert_eq!(Urgency::from_elapsed_minutes(4), Urgency::Fresh);
        assert_eq!(Urgency::from_elapsed_minutes(5), Urgency::Waiting);
        assert_eq!(Urgency::from_elapsed_minutes(9), Urgency::Waiting);
        assert_eq!(Urgency::from_elapsed_minutes(10), Urgency::Overdue);
    }

    #[tokio::test]
    async fn test_entries_and_filter() {
        use crate::model::{MenuItem, OrderDraft};
        use crate::store::VolatileStore;

        let store: Arc<dyn OrderStore> = Arc::new(VolatileStore::start(8));
        let mut view = QueueView::open(store.clone())
            .await
            .unwrap()
            .with_utc_offset(FixedOffset::east_opt(0).unwrap());
        assert_eq!(view.header(), "No pending orders");

        let mule = MenuItem::new("Moscow Mule", "🥃", "Classic");
        let salmon = MenuItem::new("Miso Salmon", "🐟", "Entree");
        store
            .add(OrderDraft::new("sam", vec![mule], "", OrderKind::Drink).unwrap())
            .await
            .unwrap();
        store
            .add(OrderDraft::new("", vec![salmon], "no rice", OrderKind::Food).unwrap())
            .await
            .unwrap();
        assert!(view.wait_until(|orders| orders.len() == 2).await);
        assert_eq!(view.header(), "2 orders in queue");

        let placed = view.orders()[0].created_at;
        let entries = view.entries(placed + Duration::minutes(6));
        assert_eq!(entries[0].title, "sam");
        assert_eq!(entries[0].initial, "S");
        assert_eq!(entries[0].elapsed, "6 mins ago");
        assert_eq!(entries[0].urgency, Urgency::Waiting);
        assert_eq!(entries[0].placed_at, placed.format("%-I:%M %p").to_string());
        // The fallback customer still counts as a name
        assert_eq!(entries[1].title, "Anonymous");

        view.set_filter(Some(OrderKind::Food));
        assert_eq!(view.header(), "1 order in queue");
        assert_eq!(view.entries(placed)[0].items, vec!["Miso Salmon"]);

        // Invalid ids never reach the store
        assert!(matches!(
            view.complete("a/b").await,
            Err(StoreError::Validation(_))
        ));
        let id = view.orders()[0].id.to_string();
        view.complete(&id).await.unwrap();
        assert!(view.wait_until(|orders| orders.is_empty()).await);

        view.set_filter(None);
        assert_eq!(view.header(), "1 order in queue");
        store.shutdown().await.unwrap();
    }
}

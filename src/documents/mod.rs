//! # Remote Document Collections
//!
//! A realtime document store seen as one collection named [`ORDERS_COLLECTION`]: one document per
//! order, keyed by an identifier the store assigns on insertion, plus a change feed that delivers
//! the whole collection every time it changes.
//!
//! Documents never carry their own id. A [`NewOrderDocument`] is built from an
//! [`OrderDraft`], which has no id field, and the key of a stored [`OrderDocument`] is attached
//! as the order id only when the feed is read back. The creation time is assigned by the store.

pub mod http;
pub mod memory;

pub use http::{HttpDocuments, RetryPolicy};
pub use memory::MemoryDocuments;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::lifecycle::AbortOnDrop;
use crate::model::{MenuItem, OrderDraft, OrderId, OrderKind, FALLBACK_CUSTOMER};

/// Name of the collection holding the live orders.
pub const ORDERS_COLLECTION: &str = "orders";

/// Every document of the collection, keyed by document id.
pub type DocumentSnapshot = BTreeMap<String, OrderDocument>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    /// Transport failure, timeout or server error after the retries ran out.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with a client error; retrying would not help.
    #[error("Remote store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed response from remote store: {0}")]
    Decode(String),

    #[error("Invalid document id: {0:?}")]
    InvalidId(String),
}

/// A stored order, as the collection holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    #[serde(default = "fallback_customer")]
    pub customer: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: OrderKind,
    /// Server-assigned creation time in epoch milliseconds.
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<i64>,
}

/// The write shape of a document. The creation time is left to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrderDocument {
    pub customer: String,
    pub items: Vec<MenuItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "type")]
    pub kind: OrderKind,
}

impl From<OrderDraft> for NewOrderDocument {
    fn from(draft: OrderDraft) -> Self {
        let (customer, items, notes, kind) = draft.into_parts();
        Self {
            customer,
            items,
            notes,
            kind,
        }
    }
}

impl NewOrderDocument {
    /// The stored form once the server has stamped it.
    pub fn stored_at(self, created_at: i64) -> OrderDocument {
        OrderDocument {
            customer: self.customer,
            items: self.items,
            notes: self.notes,
            kind: self.kind,
            created_at: Some(created_at),
        }
    }
}

fn fallback_customer() -> String {
    FALLBACK_CUSTOMER.to_string()
}

/// Realtime change feed over a whole collection.
///
/// The first [`next`](Self::next) yields the collection as it is when the feed is first read
/// (waiting for the first fetch if there is none yet); later calls yield each changed
/// collection. Intermediate states that nobody read in time are skipped, the latest one is
/// always delivered. Dropping the feed stops any helper task behind it.
pub struct ChangeFeed {
    receiver: watch::Receiver<Option<Arc<DocumentSnapshot>>>,
    delay: Duration,
    started: bool,
    _poller: Option<AbortOnDrop>,
}

impl ChangeFeed {
    pub(crate) fn new(
        receiver: watch::Receiver<Option<Arc<DocumentSnapshot>>>,
        delay: Duration,
        poller: Option<AbortOnDrop>,
    ) -> Self {
        Self {
            receiver,
            delay,
            started: false,
            _poller: poller,
        }
    }

    /// Waits for the next collection. Returns `None` once the collection is gone.
    pub async fn next(&mut self) -> Option<Arc<DocumentSnapshot>> {
        if !self.started {
            self.started = true;
            let current = self.receiver.borrow_and_update().clone();
            if let Some(snapshot) = current {
                return Some(self.deliver(snapshot).await);
            }
        }
        loop {
            self.receiver.changed().await.ok()?;
            let current = self.receiver.borrow_and_update().clone();
            if let Some(snapshot) = current {
                return Some(self.deliver(snapshot).await);
            }
        }
    }

    async fn deliver(&self, snapshot: Arc<DocumentSnapshot>) -> Arc<DocumentSnapshot> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        snapshot
    }
}

/// A remote collection of order documents.
#[async_trait]
pub trait DocumentCollection: Send + Sync + 'static {
    /// Inserts a document and returns the id the store assigned to it.
    async fn push(&self, document: NewOrderDocument) -> Result<OrderId, RemoteError>;

    /// Deletes a document. Deleting an absent document succeeds.
    async fn delete(&self, id: &OrderId) -> Result<(), RemoteError>;

    /// Opens a change feed over the whole collection.
    fn watch(&self) -> ChangeFeed;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_no_id_or_time() {
        let draft = OrderDraft::new(
            "",
            vec![MenuItem::new("Tokyo Tea", "🍵", "Signature")],
            "",
            OrderKind::Drink,
        )
        .unwrap();
        let value = serde_json::to_value(NewOrderDocument::from(draft)).unwrap();

        assert_eq!(value["customer"], FALLBACK_CUSTOMER);
        assert_eq!(value["type"], "drink");
        assert!(value.get("id").is_none());
        assert!(value.get("createdAt").is_none());
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_stored_document_tolerates_missing_fields() {
        let doc: OrderDocument = serde_json::from_str(r#"{"items": [], "timestamp": 5}"#).unwrap();
        assert_eq!(doc.customer, FALLBACK_CUSTOMER);
        assert_eq!(doc.created_at, Some(5));

        let doc: OrderDocument = serde_json::from_str(r#"{"customer": "Sam"}"#).unwrap();
        assert_eq!(doc.created_at, None);
        assert!(doc.items.is_empty());
    }
}

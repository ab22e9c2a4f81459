//! Represents a guest's order in the queue.
//!
//! # Collection Actor
//! [`Order`] implements the [`ActorEntity`](collection_actor::ActorEntity) trait, so the
//! canonical queue is held by a [`CollectionActor`](collection_actor::CollectionActor).
//! Orders are created from an [`OrderDraft`] and never updated in place.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

use super::MenuItem;

/// Label used when a guest leaves the name blank.
pub const FALLBACK_CUSTOMER: &str = "Anonymous";

/// Characters a document key cannot contain.
const FORBIDDEN_ID_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Whether the order goes to the bar or to the kitchen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    #[default]
    Drink,
    Food,
}

impl Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Drink => write!(f, "drink"),
            OrderKind::Food => write!(f, "food"),
        }
    }
}

/// Type-safe identifier for orders.
///
/// Only obtainable through [`OrderId::parse`], [`OrderId::generate`] or deserialization, so a
/// value of this type is always a usable key for every backing medium.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Validates a raw identifier coming from an outer surface.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = raw.is_empty()
            || raw
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_ID_CHARS.contains(&c));
        if invalid {
            return Err(ValidationError::InvalidId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// A locally generated id: creation time in epoch milliseconds plus a random suffix, so
    /// two surfaces generating ids in the same millisecond do not collide.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Errors raised before the store is involved at all.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// An order must contain at least one item.
    #[error("An order needs at least one item")]
    EmptySelection,

    /// The item is not on the menu being ordered from.
    #[error("Unknown menu item: {0}")]
    UnknownItem(String),

    /// The identifier cannot name an order.
    #[error("Invalid order id: {0:?}")]
    InvalidId(String),
}

/// Payload for creating a new order. Has no id: the store or its medium assigns one.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    customer: String,
    items: Vec<MenuItem>,
    notes: Option<String>,
    kind: OrderKind,
}

impl OrderDraft {
    /// Builds a draft, refusing an empty item list.
    ///
    /// A blank `customer` becomes [`FALLBACK_CUSTOMER`]; blank `notes` become `None`.
    pub fn new(
        customer: &str,
        items: Vec<MenuItem>,
        notes: &str,
        kind: OrderKind,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        let customer = match customer.trim() {
            "" => FALLBACK_CUSTOMER.to_string(),
            name => name.to_string(),
        };
        let notes = match notes.trim() {
            "" => None,
            text => Some(text.to_string()),
        };
        Ok(Self {
            customer,
            items,
            notes,
            kind,
        })
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    /// Splits the draft into its parts: customer, items, notes, kind.
    pub fn into_parts(self) -> (String, Vec<MenuItem>, Option<String>, OrderKind) {
        (self.customer, self.items, self.notes, self.kind)
    }
}

/// A live order, as stored in every medium and rendered by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default = "fallback_customer")]
    pub customer: String,
    pub items: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: OrderKind,
    #[serde(alias = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order from a draft. The creation time is taken from the local clock.
    pub fn from_draft(id: OrderId, draft: OrderDraft, created_at: DateTime<Utc>) -> Self {
        let (customer, items, notes, kind) = draft.into_parts();
        Self {
            id,
            customer,
            items,
            notes,
            kind,
            created_at,
        }
    }
}

fn fallback_customer() -> String {
    FALLBACK_CUSTOMER.to_string()
}

//! The order collection actor and its entity implementation.

pub mod entity;
pub mod error;

pub use error::*;

use collection_actor::{CollectionActor, Journal};

use crate::clients::OrderClient;
use crate::model::{Order, OrderId};

/// Creates a new order actor and its client.
///
/// Ids are generated locally (epoch milliseconds plus a random suffix); `journal` decides where
/// each mutation must land before it becomes visible.
pub fn new(buffer: usize, journal: impl Journal<Order>) -> (CollectionActor<Order>, OrderClient) {
    let (actor, generic_client) = CollectionActor::new(buffer, OrderId::generate);
    (actor.with_journal(journal), OrderClient::new(generic_client))
}

//! Pure data structures: menu items, drafts and orders.
//!
//! [`Order`] implements [`ActorEntity`](collection_actor::ActorEntity) in
//! [`order_actor::entity`](crate::order_actor::entity).

pub mod menu;
pub mod order;

pub use menu::*;
pub use order::*;

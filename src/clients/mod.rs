//! Type-safe wrappers around [`CollectionClient`](collection_actor::CollectionClient).

pub mod order_client;

pub use collection_actor::ActorClient;
pub use order_client::*;

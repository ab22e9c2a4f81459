//! Messages exchanged between [`CollectionClient`](crate::CollectionClient) and
//! [`CollectionActor`](crate::CollectionActor).

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::subscription::{Snapshot, Subscription};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the actor.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Internal message type sent to the actor to request operations.
///
/// # The Collection Pattern
/// The variants cover the whole life of an item in an append/remove-only collection:
///
/// - **Create**: Lifecycle start. Uses [`ActorEntity::Create`] to build and append an item.
/// - **Get**: Fetches a single item by ID.
/// - **Delete**: Lifecycle end. Responds `false` when the ID is not live (a no-op, not an error).
/// - **Snapshot**: The whole collection as it is right now.
/// - **Replace**: Wholesale swap with a collection that is already durable elsewhere.
/// - **Reload**: Wholesale swap with whatever the journal holds right now.
/// - **Subscribe**: Registers a subscriber and hands it the current snapshot atomically.
/// - **Shutdown**: Stops the loop even while clients are still alive.
#[derive(Debug)]
pub enum CollectionRequest<T: ActorEntity> {
    Create {
        params: T::Create,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<bool>,
    },
    Snapshot {
        respond_to: Response<Snapshot<T>>,
    },
    Replace {
        items: Vec<T>,
        respond_to: Response<()>,
    },
    Reload {
        respond_to: Response<()>,
    },
    Subscribe {
        respond_to: Response<Subscription<T>>,
    },
    Shutdown {
        respond_to: Response<()>,
    },
}

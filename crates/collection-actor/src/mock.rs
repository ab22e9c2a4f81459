//! # Mock Client & Testing Guide
//!
//! `MockClient<T>` answers the same requests as a real [`CollectionActor`](crate::CollectionActor)
//! but from a queue of expectations. Use it to test code that *wraps* a
//! [`CollectionClient`](crate::CollectionClient) (error mapping, draft conversion, view logic)
//! without running the real loop.
//!
//! ## When to use Mocks vs the Real Actor
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant | Fast (but involves tokio spawn) |
//! | **State** | None (expectations) | Real collection and subscribers |
//! | **Use Case** | Logic *around* the client | The actor itself or the full store |
//! | **Error Injection** | Easy (`return_err`) | Hard (needs a failing journal) |
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut mock = MockClient::<Ticket>::new();
//! mock.expect_create().return_err(FrameworkError::ActorClosed);
//! mock.expect_delete(ticket_id).return_ok(false);
//!
//! let client = TicketClient::new(mock.client());
//! assert!(client.create_ticket(draft).await.is_err());
//! assert!(!client.delete(ticket_id).await?);
//!
//! mock.verify(); // Ensures all expectations were met
//! ```
//!
//! Subscriptions handed out by the mock stay open until the mock is dropped; push snapshots to
//! them with [`MockClient::publish`].
//!
//! `Shutdown` requests need no expectation: the mock acknowledges them and stops.

use crate::client::CollectionClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::CollectionRequest;
use crate::subscription::{Snapshot, Subscription};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected request and the response it gets.
enum Expectation<T: ActorEntity> {
    Create {
        response: Result<T::Id, FrameworkError>,
    },
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    Delete {
        id: T::Id,
        response: Result<bool, FrameworkError>,
    },
    Snapshot {
        response: Result<Vec<T>, FrameworkError>,
    },
    Replace {
        response: Result<(), FrameworkError>,
    },
    Reload {
        response: Result<(), FrameworkError>,
    },
    Subscribe {
        response: Result<Vec<T>, FrameworkError>,
    },
}

impl<T: ActorEntity> Expectation<T> {
    fn name(&self) -> &'static str {
        match self {
            Expectation::Create { .. } => "create",
            Expectation::Get { .. } => "get",
            Expectation::Delete { .. } => "delete",
            Expectation::Snapshot { .. } => "snapshot",
            Expectation::Replace { .. } => "replace",
            Expectation::Reload { .. } => "reload",
            Expectation::Subscribe { .. } => "subscribe",
        }
    }
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;
type Feeds<T> = Arc<Mutex<Vec<mpsc::UnboundedSender<Snapshot<T>>>>>;

/// A mock client with expectation tracking for fluent testing.
pub struct MockClient<T: ActorEntity> {
    client: CollectionClient<T>,
    expectations: Expectations<T>,
    feeds: Feeds<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<CollectionRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let feeds: Feeds<T> = Arc::new(Mutex::new(Vec::new()));
        let task_expectations = expectations.clone();
        let task_feeds = feeds.clone();

        // Spawn background task to answer requests
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                if let CollectionRequest::Shutdown { respond_to } = request {
                    let _ = respond_to.send(Ok(()));
                    break;
                }
                let expectation = task_expectations.lock().unwrap().pop_front();

                match (request, expectation) {
                    (
                        CollectionRequest::Create { respond_to, .. },
                        Some(Expectation::Create { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        CollectionRequest::Get { id, respond_to },
                        Some(Expectation::Get {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "get called with an unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        CollectionRequest::Delete { id, respond_to },
                        Some(Expectation::Delete {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "delete called with an unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        CollectionRequest::Snapshot { respond_to },
                        Some(Expectation::Snapshot { response }),
                    ) => {
                        let _ = respond_to.send(response.map(Arc::new));
                    }
                    (
                        CollectionRequest::Replace { respond_to, .. },
                        Some(Expectation::Replace { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        CollectionRequest::Reload { respond_to },
                        Some(Expectation::Reload { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        CollectionRequest::Subscribe { respond_to },
                        Some(Expectation::Subscribe { response }),
                    ) => {
                        let response = response.map(|items| {
                            let (sender, receiver) = mpsc::unbounded_channel();
                            task_feeds.lock().unwrap().push(sender);
                            Subscription::new(Arc::new(items), receiver)
                        });
                        let _ = respond_to.send(response);
                    }
                    (request, expectation) => {
                        panic!(
                            "Unexpected request {:?}, expected {}",
                            request,
                            expectation.as_ref().map_or("nothing", Expectation::name)
                        );
                    }
                }
            }
        });

        Self {
            client: CollectionClient::new(sender),
            expectations,
            feeds,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> CollectionClient<T> {
        self.client.clone()
    }

    pub fn expect_create(&mut self) -> ExpectationBuilder<T, T::Id> {
        self.builder(|response| Expectation::Create { response })
    }

    pub fn expect_get(&mut self, id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        self.builder(move |response| Expectation::Get { id, response })
    }

    pub fn expect_delete(&mut self, id: T::Id) -> ExpectationBuilder<T, bool> {
        self.builder(move |response| Expectation::Delete { id, response })
    }

    pub fn expect_snapshot(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        self.builder(|response| Expectation::Snapshot { response })
    }

    pub fn expect_replace(&mut self) -> ExpectationBuilder<T, ()> {
        self.builder(|response| Expectation::Replace { response })
    }

    pub fn expect_reload(&mut self) -> ExpectationBuilder<T, ()> {
        self.builder(|response| Expectation::Reload { response })
    }

    /// The subscription starts from the returned items; later snapshots come from [`publish`](Self::publish).
    pub fn expect_subscribe(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        self.builder(|response| Expectation::Subscribe { response })
    }

    /// Sends `items` as the next snapshot to every subscription handed out so far.
    pub fn publish(&self, items: Vec<T>) {
        let snapshot = Arc::new(items);
        self.feeds
            .lock()
            .unwrap()
            .retain(|feed| feed.send(snapshot.clone()).is_ok());
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn builder<R>(
        &mut self,
        make: impl FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send + 'static,
    ) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            make: Box::new(make),
            expectations: self.expectations.clone(),
        }
    }
}

/// Builder that records what an expected request should return.
pub struct ExpectationBuilder<T: ActorEntity, R> {
    make: Box<dyn FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send>,
    expectations: Expectations<T>,
}

impl<T: ActorEntity, R> ExpectationBuilder<T, R> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: R) {
        let expectation = (self.make)(Ok(value));
        self.expectations.lock().unwrap().push_back(expectation);
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        let expectation = (self.make)(Err(error));
        self.expectations.lock().unwrap().push_back(expectation);
    }
}

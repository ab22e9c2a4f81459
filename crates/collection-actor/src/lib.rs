//! # Collection Actor
//!
//! This crate provides a single-writer actor that owns an **ordered collection** of entities
//! and keeps every observer of that collection in lockstep. It is the state core behind the
//! order queue: one task holds the canonical list, every mutation is a message, and every
//! change is pushed to subscribers as a full snapshot.
//!
//! ## Why an Actor?
//!
//! - Isolated state (no shared memory, no locks)
//! - Message-passing concurrency
//! - Sequential processing within the actor, so two mutations never interleave
//!
//! Multiple writers (a guest submitting, two bartenders completing the same order) only ever
//! talk to the actor through its channel. The actor applies their requests one at a time, so
//! the question "which version of the list does a subscriber see" always has one answer.
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model)
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into four layers:
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - How an item is built from a draft and identified
//! 2. **Runtime Layer** ([`CollectionActor`]) - Message processing, ordering and fan-out
//! 3. **Durability Layer** ([`Journal`]) - Where a mutation must land before it becomes visible
//! 4. **Interface Layer** ([`CollectionClient`], [`Subscription`]) - Type-safe communication
//!
//! ## Lifecycle of a Mutation
//!
//! ```text
//! client.create(draft)
//!        │
//!        ▼
//!  CollectionActor ── next_id() ── from_create_params ── on_create
//!        │
//!        ▼
//!  journal.commit(&tentative) ──✗──▶ Err(CommitFailed), collection untouched
//!        │ ✓
//!        ▼
//!  swap snapshot ──▶ publish to every Subscription ──▶ respond Ok(id)
//! ```
//!
//! `Reload` asks the journal for what the medium holds now and swaps it in between two
//! requests, so it never races one of the actor's own commits.
//!
//! `Replace` skips the journal: it is how a backing medium (another tab, a remote change feed)
//! hands the actor a collection that is already durable somewhere else.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (actor, client) = CollectionActor::<Ticket>::new(32, next_ticket_id);
//! tokio::spawn(actor.with_journal(MyJournal::new()).run(()));
//!
//! let mut subscription = client.subscribe().await?;
//! let id = client.create(TicketDraft::new("espresso")).await?;
//! let snapshot = subscription.next().await.expect("actor running");
//! assert!(snapshot.iter().any(|t| t.id() == &id));
//!
//! client.shutdown().await?;
//! ```
//!
//! ## Concurrency Model
//!
//! - The actor runs in its own Tokio task
//! - Messages are processed **sequentially**
//! - Subscribers each own an unbounded queue, so a slow reader never blocks the actor and
//!   never misses a snapshot
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`MockClient`](mock::MockClient) that answers the same
//! requests as a real actor from a queue of expectations.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod journal;
pub mod message;
pub mod mock;
pub mod subscription;

// Re-export core types for convenience
pub use actor::CollectionActor;
pub use client::CollectionClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use journal::{Journal, JournalError, NoJournal};
pub use message::{CollectionRequest, Response};
pub use subscription::{Snapshot, Subscription};

#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Order Queue
//!
//! > **A live order queue for a small bar and kitchen.**
//!
//! Guests pick drinks or dishes from a menu and submit an order; staff watch a live queue and
//! mark orders complete. Every surface sees the same queue, whether it shares the process, runs
//! in another process on the same machine, or sits on another device.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### One Writer, Many Readers
//!
//! The canonical collection of live orders is owned by a single
//! [`CollectionActor`](collection_actor::CollectionActor). Every mutation is a message, applied
//! one at a time, and every change is pushed to each subscriber as a full snapshot. A subscriber
//! receives the snapshot that was current when it registered and then every later one, once.
//!
//! ### Interchangeable Backing Media
//!
//! The [`OrderStore`](store::OrderStore) trait is the whole capability set: add, remove,
//! subscribe. Three implementations sit behind it and are picked once at startup:
//!
//! - **Volatile** - orders live as long as the process
//! - **Local** - orders persist in a local slot and are shared with other handles on it
//! - **Remote** - orders live in a realtime document collection shared by every device
//!
//! Surfaces never branch on the medium.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Each layer has its own `thiserror` enum ([`ValidationError`](model::ValidationError),
//! [`StoreError`](order_actor::StoreError), [`StorageError`](storage::StorageError),
//! [`RemoteError`](documents::RemoteError), [`ConfigError`](config::ConfigError)).
//! Validation failures are reported before any medium is touched, and a failed mutation leaves
//! the collection unchanged.
//!
//! ### 2. Explicitly Owned State
//! There is no global: the [`OrderSystem`](lifecycle::OrderSystem) owns the store and passes
//! it to every view. Shutting the system down releases every listener and poller the store
//! started.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured logging.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Model ([`model`])
//! Menu items, drafts, orders and their identifiers.
//!
//! ### 2. The Actor ([`order_actor`], [`clients`])
//! [`Order`](model::Order) as an [`ActorEntity`](collection_actor::ActorEntity) and the
//! [`OrderClient`](clients::OrderClient) that wraps the generic client.
//!
//! ### 3. The Store ([`store`])
//! [`VolatileStore`](store::VolatileStore), [`LocalStore`](store::LocalStore),
//! [`RemoteStore`](store::RemoteStore) and [`open_store`](store::open_store).
//!
//! ### 4. The Media ([`storage`], [`documents`])
//! Local key-value slots with change events, and remote document collections with change feeds.
//!
//! ### 5. The Views ([`views`])
//! [`OrderForm`](views::OrderForm) for guests and [`QueueView`](views::QueueView) for staff.
//!
//! ### 6. The Orchestrator ([`lifecycle`], [`config`])
//! Configuration from the environment, the application root and background task ownership.
//!
//! ## 🚀 Quick Start
//!
//! ### Running the Demo
//!
//! ```bash
//! # Volatile store, info logs
//! RUST_LOG=info cargo run
//!
//! # Persist to ./.order-queue and share with other processes
//! ORDER_QUEUE_BACKEND=local RUST_LOG=info cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test --workspace
//! ```

pub mod clients;
pub mod config;
pub mod documents;
pub mod lifecycle;
pub mod model;
pub mod order_actor;
pub mod storage;
pub mod store;
pub mod views;

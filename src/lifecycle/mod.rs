//! # System Lifecycle & Orchestration
//!
//! This module owns everything that starts and stops: the application root, the background
//! tasks of each store, and the tracing setup.
//!
//! ## The OrderSystem Pattern
//!
//! [`OrderSystem`] is created once at the application root and passed by reference to the
//! surfaces. It opens exactly one store for the configured backing medium; every form and queue
//! view it hands out shares that store.
//!
//! ## Background Tasks
//!
//! A store runs its actor loop plus, depending on the medium, a storage listener or a change
//! feed pump. All of them are registered in the store's [`TaskSet`]:
//!
//! 1. **Shutdown** - the actor gets an explicit `Shutdown` request, then the task set cancels its
//!    token and awaits every task
//! 2. **Drop** - a task set dropped without shutdown aborts what is still running
//!
//! Helpers owned by a single value (the poller behind a change feed or a slot directory) are
//! wrapped in [`AbortOnDrop`] and die with their owner.
//!
//! ## Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging for the entire system.
//!
//! **Usage:**
//! ```bash
//! RUST_LOG=info cargo run      # Compact logs
//! RUST_LOG=debug cargo run     # Full payloads
//! ```

pub mod order_system;
pub mod tasks;
pub mod tracing;

pub use order_system::*;
pub use tasks::*;
pub use self::tracing::*;

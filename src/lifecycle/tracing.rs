//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! The module path is hidden (`with_target(false)`); log lines carry structured fields instead,
//! such as `entity_type`, `id`, `size` and `backend`.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Compact logs
//! RUST_LOG=info cargo run
//!
//! # Full drafts and every request sent to the actor
//! RUST_LOG=debug cargo run
//!
//! # Only the store and its media
//! RUST_LOG=order_queue::store=debug,order_queue::storage=debug cargo run
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`** and the local backend:
//!
//! ```text
//! INFO Order slot loaded size=0
//! INFO Actor started entity_type="Order" size=0
//! INFO Order store opened backend=local
//! INFO guest_order:submit: Created entity_type="Order" id=1718000000000-3f2a9c1b size=1
//! INFO guest_order:submit: Order submitted id=1718000000000-3f2a9c1b items=1
//! INFO bar_queue:complete: Deleted entity_type="Order" id=1718000000000-3f2a9c1b size=0
//! ```
//!
//! **With `RUST_LOG=debug`** the draft is logged once where it enters the actor:
//!
//! ```text
//! DEBUG create_order called draft=OrderDraft { customer: "Sam", items: [...], notes: None, kind: Drink }
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Fields such as entity_type carry the context instead
        .compact() // Spans inline, e.g. "guest_order:submit"
        .init();
}

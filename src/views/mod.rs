//! View models for the two kinds of surface: guests submitting orders and staff working the
//! queue. They hold no presentation, only the state and text a surface renders.

pub mod queue;
pub mod submission;

pub use queue::{elapsed_label, QueueEntry, QueueView, Urgency};
pub use submission::OrderForm;

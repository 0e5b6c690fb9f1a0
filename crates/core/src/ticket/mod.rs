//! Ticket record model and lifecycle rules.

pub mod lifecycle;
mod types;

pub use lifecycle::{DenyReason, Transition, TransitionError};
pub use types::*;

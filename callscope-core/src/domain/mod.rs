//! Domain types for callscope.

pub mod detail;
pub mod message;
pub mod order;

pub use detail::OrderDetail;
pub use message::{Event, EventKind, RawMessage};
pub use order::{Direction, Order};

/// Message identifier as carried by the chat export (e.g. `"message12345"`).
pub type MessageId = String;

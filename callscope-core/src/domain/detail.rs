//! OrderDetail — the aggregated, derived view of one correlation group.

use super::message::Event;
use super::order::Order;
use super::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated performance record for one trade call.
///
/// Built from a correlation group by the aggregator and mutated in place by
/// stop-loss propagation. `pnl_pct` is an approximation: the mean leveraged
/// price distance from entry across reached targets (or to the configured
/// stop loss on a stop-out), not a position-sized P/L model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    /// Id of the root order message.
    pub order_id: MessageId,
    /// When the call was posted. Used by the stop-loss propagation window.
    pub opened_at: DateTime<Utc>,
    pub order: Order,

    pub entry_events: Vec<Event>,
    pub target_events: Vec<Event>,
    pub stop_loss_events: Vec<Event>,
    pub other_events: Vec<Event>,

    /// Mean observed fill price; 0.0 when no fill was ever reported.
    pub avg_entry_price: f64,
    /// Highest reached entry index (1-based), 0 when none.
    pub max_reached_entry: u32,
    /// Highest reached target index (1-based), 0 when none.
    pub max_reached_target: u32,
    pub pnl_pct: f64,
    pub closed: bool,
    pub leverage: f64,
}

impl OrderDetail {
    /// True once at least one stop-loss event is attached.
    pub fn stopped_out(&self) -> bool {
        !self.stop_loss_events.is_empty()
    }

    /// True when every configured target was reached.
    pub fn all_targets_reached(&self) -> bool {
        !self.order.targets.is_empty() && self.max_reached_target as usize >= self.order.targets.len()
    }
}

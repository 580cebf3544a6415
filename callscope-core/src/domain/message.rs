//! Raw messages from the export layer and their classified counterparts.

use super::order::Order;
use super::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message as delivered by the export/ingestion layer.
///
/// `related_to` is at most one parent reference (reply-to), never a list, so
/// correlation always yields a forest of depth-1 groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub related_to: Option<MessageId>,
    pub text: String,
}

/// Classification result for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Root trade call.
    Order(Order),
    /// One entry level of the ladder was filled. `entry_index` is 1-based.
    EntryFilled { entry_index: u32, price: f64 },
    /// Every configured entry level was filled.
    AllEntriesFilled { avg_price: f64 },
    /// One take-profit target was reached. `target_index` is 1-based.
    TargetHit {
        target_index: u32,
        pct: f64,
        elapsed: Option<String>,
    },
    /// Every configured target was reached.
    AllTargetsHit { pct: f64, elapsed: Option<String> },
    /// The configured stop loss was triggered.
    StopLossHit { pct: f64 },
    /// Stopped out after at least one target had been reached.
    SlAfterTp,
    /// Explicit close notice.
    Closed,
    /// Call cancelled before the entry zone was reached.
    Cancelled,
    /// Closed because an opposite-direction signal was posted.
    OppositeSignalClosed,
    /// Looked like an order (passed the prefilter) but no pattern produced a
    /// valid extraction. Kept verbatim for manual triage.
    ProbableOrder { text: String },
    /// Free-text update attached to a call.
    Info { text: String },
    /// Nothing matched.
    Unknown { text: String },
}

/// A classified message: the raw envelope plus its typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub related_to: Option<MessageId>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn is_order(&self) -> bool {
        matches!(self.kind, EventKind::Order(_))
    }

    /// The order payload, if this event is a root call.
    pub fn order(&self) -> Option<&Order> {
        match &self.kind {
            EventKind::Order(order) => Some(order),
            _ => None,
        }
    }
}

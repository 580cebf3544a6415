//! Correlation and aggregation — classified events → per-call records.
//!
//! Correlation is driven purely by reply references: every event opens its
//! own group, and events carrying a `related_to` are appended to the group
//! they point at. Groups rooted at an order event are then folded into one
//! [`OrderDetail`] each; groups rooted at anything else are left alone.

pub mod propagate;

pub use propagate::{propagate, propagate_all};

use std::collections::{BTreeMap, HashSet};

use crate::domain::{Event, EventKind, MessageId, Order, OrderDetail};

/// Correlation groups, keyed by root message id. Each group starts with the
/// root's own event, followed by its follow-ups in batch order.
pub type Groups = BTreeMap<MessageId, Vec<Event>>;

/// Build the correlation groups for a classified batch.
///
/// A follow-up whose reference points at an id absent from the batch is kept
/// only in its own group; the dangling reference is logged and ignored.
pub fn build_groups(events: &[Event]) -> Groups {
    let mut groups: Groups = BTreeMap::new();

    for event in events {
        groups.insert(event.id.clone(), vec![event.clone()]);
    }

    for event in events {
        let Some(parent) = &event.related_to else {
            continue;
        };
        if parent == &event.id {
            continue;
        }
        match groups.get_mut(parent) {
            Some(group) => group.push(event.clone()),
            None => {
                tracing::debug!(event_id = %event.id, parent = %parent, "dangling reply reference");
            }
        }
    }

    groups
}

// ─── Aggregation ─────────────────────────────────────────────────────

fn is_terminal(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Closed
            | EventKind::Cancelled
            | EventKind::OppositeSignalClosed
            | EventKind::SlAfterTp
    )
}

/// Price the pnl approximation measures distance from: the mean observed
/// fill when one was reported, otherwise the first configured entry.
fn reference_price(avg_entry_price: f64, order: &Order) -> f64 {
    if avg_entry_price > 0.0 {
        avg_entry_price
    } else {
        order.entries.first().copied().unwrap_or(0.0)
    }
}

/// Leveraged percentage distance between the reference price and `level`.
fn leveraged_distance_pct(reference: f64, level: f64, leverage: f64) -> f64 {
    if reference <= 0.0 {
        return 0.0;
    }
    (level - reference).abs() / reference * leverage * 100.0
}

/// Fold one order-rooted group into its aggregated record.
///
/// Returns `None` when the group's root event is not an order.
pub fn aggregate(root_id: &str, group: &[Event]) -> Option<OrderDetail> {
    let root = group.first().filter(|e| e.id == root_id)?;
    let order = root.order()?.clone();

    let mut entry_events = Vec::new();
    let mut target_events = Vec::new();
    let mut stop_loss_events = Vec::new();
    let mut other_events = Vec::new();

    let mut fill_prices = Vec::new();
    let mut all_entries_avg = None;
    let mut max_reached_entry: u32 = 0;
    let mut max_reached_target: u32 = 0;
    let mut terminal_seen = false;

    for event in group.iter().skip(1) {
        match &event.kind {
            EventKind::EntryFilled { entry_index, price } => {
                fill_prices.push(*price);
                max_reached_entry = max_reached_entry.max(*entry_index);
                entry_events.push(event.clone());
            }
            EventKind::AllEntriesFilled { avg_price } => {
                all_entries_avg = Some(*avg_price);
                max_reached_entry = max_reached_entry.max(order.entries.len() as u32);
                entry_events.push(event.clone());
            }
            EventKind::TargetHit { target_index, .. } => {
                max_reached_target = max_reached_target.max(*target_index);
                target_events.push(event.clone());
            }
            EventKind::AllTargetsHit { .. } => {
                max_reached_target = max_reached_target.max(order.targets.len() as u32);
                target_events.push(event.clone());
            }
            EventKind::StopLossHit { .. } => {
                stop_loss_events.push(event.clone());
            }
            kind => {
                terminal_seen = terminal_seen || is_terminal(kind);
                other_events.push(event.clone());
            }
        }
    }

    let avg_entry_price = if fill_prices.is_empty() {
        all_entries_avg.unwrap_or(0.0)
    } else {
        fill_prices.iter().sum::<f64>() / fill_prices.len() as f64
    };

    let leverage = order.effective_leverage();
    let reference = reference_price(avg_entry_price, &order);
    let reached = (max_reached_target as usize).min(order.targets.len());

    let pnl_pct = if reached == 0 {
        if stop_loss_events.is_empty() {
            0.0
        } else {
            // Stopped out before any target: loss from reference down to the
            // configured stop loss. No configured stop loss means the notice
            // carries no price we can measure against.
            match order.stop_loss {
                Some(sl) => -leveraged_distance_pct(reference, sl, leverage),
                None => 0.0,
            }
        }
    } else {
        let sum: f64 = order.targets[..reached]
            .iter()
            .map(|t| leveraged_distance_pct(reference, *t, leverage))
            .sum();
        sum / reached as f64
    };

    let all_targets = !order.targets.is_empty() && reached == order.targets.len();
    let closed = all_targets || !stop_loss_events.is_empty() || terminal_seen;

    Some(OrderDetail {
        order_id: root.id.clone(),
        opened_at: root.timestamp,
        order,
        entry_events,
        target_events,
        stop_loss_events,
        other_events,
        avg_entry_price,
        max_reached_entry,
        max_reached_target,
        pnl_pct,
        closed,
        leverage,
    })
}

// ─── Aggregation context ─────────────────────────────────────────────

/// Correlation groups plus their aggregated records, carried together so
/// stop-loss propagation can mutate both consistently.
#[derive(Debug, Clone, Default)]
pub struct AggregationContext {
    pub groups: Groups,
    pub details: Vec<OrderDetail>,
    /// (stop-loss event id, order id) pairs already attributed; makes
    /// propagation idempotent across repeated runs over the same context.
    pub(crate) attributed: HashSet<(MessageId, MessageId)>,
    /// Ids of synthesized stop-loss events. These never propagate further.
    pub(crate) synthetic: HashSet<MessageId>,
}

impl AggregationContext {
    /// Correlate and aggregate a classified batch. Groups not rooted at an
    /// order contribute no record.
    pub fn build(events: &[Event]) -> Self {
        let groups = build_groups(events);

        let details: Vec<OrderDetail> = groups
            .iter()
            .filter_map(|(root_id, group)| aggregate(root_id, group))
            .collect();

        tracing::debug!(
            groups = groups.len(),
            orders = details.len(),
            "aggregated batch"
        );

        AggregationContext {
            groups,
            details,
            attributed: HashSet::new(),
            synthetic: HashSet::new(),
        }
    }

    pub fn detail(&self, order_id: &str) -> Option<&OrderDetail> {
        self.details.iter().find(|d| d.order_id == order_id)
    }
}

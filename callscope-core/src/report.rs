//! Reporting-key grouping and configured-ladder potentials.
//!
//! Reply references only connect an explicit thread. Channels that repost
//! the same call as standalone messages produce several records for one
//! position; the reporting key folds those together for summaries without
//! touching the underlying records.

use std::collections::BTreeMap;

use crate::domain::{Order, OrderDetail};

/// Identity of a position for reporting purposes: coin, resolved direction
/// and configured stop loss. Calls without a stop loss key as `none` and
/// therefore only fold with other stop-loss-less calls of the same coin.
pub fn order_key(order: &Order) -> String {
    match order.stop_loss {
        Some(sl) => format!("{}:{}:{}", order.coin, order.resolved_direction(), sl),
        None => format!("{}:{}:none", order.coin, order.resolved_direction()),
    }
}

/// Group aggregated records by reporting key, sorted by key.
pub fn group_by_key(details: &[OrderDetail]) -> BTreeMap<String, Vec<OrderDetail>> {
    let mut grouped: BTreeMap<String, Vec<OrderDetail>> = BTreeMap::new();
    for detail in details {
        grouped
            .entry(order_key(&detail.order))
            .or_default()
            .push(detail.clone());
    }
    grouped
}

/// Leveraged percentage move from the first configured entry to each target,
/// in ladder order. What the call advertises, not what happened.
pub fn potential_target_profits(order: &Order) -> Vec<f64> {
    let Some(entry) = order.entries.first().copied().filter(|e| *e > 0.0) else {
        return Vec::new();
    };
    let leverage = order.effective_leverage();
    order
        .targets
        .iter()
        .map(|t| (t - entry).abs() / entry * leverage * 100.0)
        .collect()
}

/// Leveraged percentage move from the first configured entry to the stop
/// loss, negated. `None` when the call has no stop loss.
pub fn potential_loss(order: &Order) -> Option<f64> {
    let entry = order.entries.first().copied().filter(|e| *e > 0.0)?;
    let sl = order.stop_loss?;
    Some(-((sl - entry).abs() / entry * order.effective_leverage() * 100.0))
}

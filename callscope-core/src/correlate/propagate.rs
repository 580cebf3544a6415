//! Stop-loss propagation across near-duplicate calls.
//!
//! Channels frequently repost the same call (bot restarts, edits, mirrors).
//! A stop-out notice replies to only one of the copies, leaving the siblings
//! dangling open forever. This heuristic finds them: any other call for the
//! same coin with the same configured stop loss, posted within two minutes of
//! the stopped-out one, is assumed to describe the same position and receives
//! a synthesized stop-loss event of its own.

use crate::domain::{Event, EventKind};

use super::AggregationContext;

/// Maximum separation, in seconds, between two calls for them to count as
/// duplicates. The window is symmetric around the stopped-out call.
const DUPLICATE_WINDOW_SECS: i64 = 120;

/// Propagate one stop-loss event to the near-duplicates of its call.
///
/// Synthesized events get ids of the form `{event id}-{n}` (1-based) and a
/// reply reference to the order they were attributed to, and are inserted
/// into both the context's groups and the target record. Each affected
/// record is recomputed under the assumption that every configured entry
/// had been filled. Already-attributed pairs and events this function
/// itself synthesized are skipped, so repeated runs are no-ops.
pub fn propagate(ctx: &mut AggregationContext, sl_event: &Event) {
    let EventKind::StopLossHit { pct } = sl_event.kind else {
        return;
    };
    if ctx.synthetic.contains(&sl_event.id) {
        return;
    }

    let Some(root_id) = sl_event.related_to.clone() else {
        tracing::warn!(event_id = %sl_event.id, "stop-loss event without a reply reference, not propagated");
        return;
    };
    let Some(root) = ctx.detail(&root_id) else {
        tracing::warn!(event_id = %sl_event.id, root = %root_id, "stop-loss event does not resolve to a call, not propagated");
        return;
    };

    let coin = root.order.coin.clone();
    let Some(stop_loss) = root.order.stop_loss else {
        return;
    };
    let opened_at = root.opened_at;

    let matches: Vec<usize> = ctx
        .details
        .iter()
        .enumerate()
        .filter(|(_, d)| {
            d.order_id != root_id
                && d.order.coin == coin
                && d.order.stop_loss == Some(stop_loss)
                && (d.opened_at - opened_at).num_seconds().abs() <= DUPLICATE_WINDOW_SECS
        })
        .map(|(i, _)| i)
        .collect();

    let mut n = 0usize;
    for index in matches {
        let order_id = ctx.details[index].order_id.clone();
        if !ctx
            .attributed
            .insert((sl_event.id.clone(), order_id.clone()))
        {
            continue;
        }
        n += 1;

        let synth = Event {
            id: format!("{}-{}", sl_event.id, n),
            timestamp: sl_event.timestamp,
            related_to: Some(order_id.clone()),
            kind: EventKind::StopLossHit { pct },
        };
        ctx.synthetic.insert(synth.id.clone());

        ctx.groups.insert(synth.id.clone(), vec![synth.clone()]);
        if let Some(group) = ctx.groups.get_mut(&order_id) {
            group.push(synth.clone());
        }

        tracing::info!(
            from = %sl_event.id,
            to = %order_id,
            coin = %coin,
            "propagated stop loss to duplicate call"
        );

        let detail = &mut ctx.details[index];
        detail.stop_loss_events.push(synth);

        // Assume the full entry ladder was filled; without that assumption a
        // never-filled duplicate would report a stop-out with zero loss.
        if !detail.order.entries.is_empty() {
            let avg = detail.order.entries.iter().sum::<f64>()
                / detail.order.entries.len() as f64;
            detail.avg_entry_price = avg;
            detail.max_reached_entry = detail.order.entries.len() as u32;
            if detail.max_reached_target == 0 && avg > 0.0 {
                detail.pnl_pct = -((stop_loss - avg).abs() / avg * detail.leverage * 100.0);
            }
        }
        detail.closed = true;
    }
}

/// Run propagation for every stop-loss event currently attributed to a call.
pub fn propagate_all(ctx: &mut AggregationContext) {
    let sl_events: Vec<Event> = ctx
        .details
        .iter()
        .flat_map(|d| d.stop_loss_events.iter().cloned())
        .collect();
    for event in &sl_events {
        propagate(ctx, event);
    }
}

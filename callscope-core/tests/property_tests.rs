//! Property tests for extraction and validation invariants.
//!
//! Uses proptest to verify:
//! 1. Direction consistency — well-formed ladders always validate, broken
//!    ladders never do
//! 2. Entry ordering — sorting is idempotent and direction-appropriate
//! 3. Numeric parsing — never panics, never emits non-finite values
//! 4. Aggregation signs — stop-outs are non-positive, target runs non-negative

use proptest::prelude::*;

use callscope_core::correlate::AggregationContext;
use callscope_core::domain::{Direction, Event, EventKind, Order};
use callscope_core::extract::{parse_price_list, validate};
use chrono::{TimeZone, Utc};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.001..10_000.0_f64).prop_map(|p| (p * 1e4).round() / 1e4)
}

fn arb_leverage() -> impl Strategy<Value = f64> {
    (1.0..50.0_f64).prop_map(|l| l.round())
}

/// A sorted, strictly ascending price ladder of 1..=5 levels.
fn arb_ladder() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..=5).prop_map(|mut v| {
        v.sort_by(|a, b| a.total_cmp(b));
        v.dedup();
        v
    })
}

/// A validator-approved long order: entries below targets, entries reported
/// top-down, targets bottom-up.
fn arb_long_order() -> impl Strategy<Value = Order> {
    (arb_ladder(), arb_ladder(), arb_leverage()).prop_map(|(entries, targets, leverage)| {
        let mut entries: Vec<f64> = entries.into_iter().map(|p| p * 0.5).collect();
        entries.reverse();
        let targets: Vec<f64> = targets.into_iter().map(|p| p + 10_000.0).collect();
        let stop_loss = entries.last().map(|e| e * 0.9);
        Order {
            coin: "BTCUSDT".into(),
            direction: Some(Direction::Long),
            exchange: None,
            leverage,
            entries,
            targets,
            stop_loss,
        }
    })
}

fn arb_short_order() -> impl Strategy<Value = Order> {
    (arb_ladder(), arb_ladder(), arb_leverage()).prop_map(|(entries, targets, leverage)| {
        let entries: Vec<f64> = entries.into_iter().map(|p| p + 10_000.0).collect();
        let mut targets: Vec<f64> = targets.into_iter().map(|p| p * 0.5).collect();
        targets.reverse();
        let stop_loss = entries.last().map(|e| e * 1.1);
        Order {
            coin: "BTCUSDT".into(),
            direction: Some(Direction::Short),
            exchange: None,
            leverage,
            entries,
            targets,
            stop_loss,
        }
    })
}

// ── 1. Direction consistency ─────────────────────────────────────────

proptest! {
    /// Well-formed ladders validate for both directions.
    #[test]
    fn well_formed_orders_validate(long in arb_long_order(), short in arb_short_order()) {
        prop_assert!(validate(&long));
        prop_assert!(validate(&short));
    }

    /// Swapping the ladders (targets where entries belong) always fails:
    /// for a long that puts the first target below the first entry.
    #[test]
    fn swapped_ladders_never_validate(order in arb_long_order()) {
        let swapped = Order {
            entries: order.targets.clone(),
            targets: order.entries.clone(),
            ..order
        };
        prop_assert!(!validate(&swapped));
    }

    /// Appending an out-of-order target breaks a valid long order.
    #[test]
    fn regressing_target_invalidates(order in arb_long_order()) {
        prop_assume!(order.targets.len() >= 2);
        let mut broken = order;
        let first = broken.targets[0];
        broken.targets.push(first - 1.0);
        prop_assert!(!validate(&broken));
    }
}

// ── 2. Entry ordering ────────────────────────────────────────────────

proptest! {
    /// `sort_entries` is idempotent and orients the ladder in fill order:
    /// descending for longs, ascending for shorts.
    #[test]
    fn entry_sort_is_idempotent_and_directional(
        mut long in arb_long_order(),
        mut short in arb_short_order(),
    ) {
        long.entries.reverse(); // worst case: fully misordered
        long.sort_entries();
        prop_assert!(long.entries.windows(2).all(|w| w[0] >= w[1]));
        let once = long.entries.clone();
        long.sort_entries();
        prop_assert_eq!(once, long.entries);

        short.entries.reverse();
        short.sort_entries();
        prop_assert!(short.entries.windows(2).all(|w| w[0] <= w[1]));
    }
}

// ── 3. Numeric parsing ───────────────────────────────────────────────

proptest! {
    /// Arbitrary text never panics the list parser and never produces
    /// NaN or infinite prices.
    #[test]
    fn price_list_parsing_is_total(text in ".{0,200}") {
        for price in parse_price_list(&text) {
            prop_assert!(price.is_finite());
        }
    }

    /// A clean whitespace-separated list of prices survives parsing intact.
    #[test]
    fn clean_lists_round_trip(prices in prop::collection::vec(arb_price(), 1..=6)) {
        let rendered = prices
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(parse_price_list(&rendered), prices);
    }
}

// ── 4. Aggregation signs ─────────────────────────────────────────────

fn event(id: &str, related_to: Option<&str>, kind: EventKind) -> Event {
    Event {
        id: id.into(),
        timestamp: Utc.with_ymd_and_hms(2023, 5, 1, 9, 0, 0).unwrap(),
        related_to: related_to.map(Into::into),
        kind,
    }
}

proptest! {
    /// A stop-out with no reached target never reports a gain.
    #[test]
    fn stop_out_pnl_is_non_positive(order in arb_long_order()) {
        let events = vec![
            event("1", None, EventKind::Order(order)),
            event("2", Some("1"), EventKind::StopLossHit { pct: 50.0 }),
        ];
        let ctx = AggregationContext::build(&events);
        prop_assert_eq!(ctx.details.len(), 1);
        prop_assert!(ctx.details[0].pnl_pct <= 0.0);
        prop_assert!(ctx.details[0].closed);
    }

    /// A target run with no stop-out never reports a loss.
    #[test]
    fn target_run_pnl_is_non_negative(order in arb_long_order(), hit in 1u32..=5) {
        let reached = hit.min(order.targets.len() as u32);
        let events = vec![
            event("1", None, EventKind::Order(order)),
            event(
                "2",
                Some("1"),
                EventKind::TargetHit { target_index: reached, pct: 0.0, elapsed: None },
            ),
        ];
        let ctx = AggregationContext::build(&events);
        prop_assert_eq!(ctx.details.len(), 1);
        prop_assert!(ctx.details[0].pnl_pct >= 0.0);
    }
}

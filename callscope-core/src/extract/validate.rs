//! Numeric plausibility check for candidate orders.
//!
//! The validator is the mechanism that makes ambiguous or overly-greedy
//! patterns self-correcting: the engine discards any candidate that fails
//! here and advances to the next configured pattern.

use crate::domain::{Direction, Order};

fn non_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] >= w[1])
}

fn non_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

/// True when the candidate's ladders are consistent with its direction.
///
/// LONG: entries non-increasing, targets non-decreasing, first target above
/// first entry. SHORT is the mirror. Empty ladders are always invalid.
pub fn validate(order: &Order) -> bool {
    let (Some(first_entry), Some(first_target)) = (order.entries.first(), order.targets.first())
    else {
        return false;
    };

    match order.resolved_direction() {
        Direction::Long => {
            non_increasing(&order.entries)
                && non_decreasing(&order.targets)
                && first_target > first_entry
        }
        Direction::Short => {
            non_decreasing(&order.entries)
                && non_increasing(&order.targets)
                && first_target < first_entry
        }
    }
}

//! The root trade call: coin, direction, leverage, entry zone, target ladder, stop loss.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction. Channels write `LONG`/`SHORT` or `BUY`/`SELL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Interpret a captured direction token. `BUY` maps to long, `SELL` to short.
    /// Returns `None` for anything else (caller falls back to price inference).
    pub fn from_token(token: &str) -> Option<Direction> {
        let token = token.trim().to_ascii_lowercase();
        if token.contains("long") || token.contains("buy") {
            Some(Direction::Long)
        } else if token.contains("short") || token.contains("sell") {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// A structured trade call extracted from one channel message.
///
/// Entry prices are sorted toward the direction of fill progression: for a
/// long call the first entry is the highest price, for a short the lowest.
/// Targets keep the order the channel posted them in; the validator relies on
/// that ordering being monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub coin: String,
    /// Explicit direction if the message carried one; otherwise inferred lazily.
    pub direction: Option<Direction>,
    #[serde(default)]
    pub exchange: Option<String>,
    /// Leverage multiplier; 1.0 when the channel omits it (spot calls).
    pub leverage: f64,
    pub entries: Vec<f64>,
    pub targets: Vec<f64>,
    pub stop_loss: Option<f64>,
}

impl Order {
    /// Explicit direction, or inferred from whether the first target lies
    /// below the first entry (short) or above it (long).
    pub fn resolved_direction(&self) -> Direction {
        self.direction.unwrap_or_else(|| {
            match (self.targets.first(), self.entries.first()) {
                (Some(target), Some(entry)) if target < entry => Direction::Short,
                _ => Direction::Long,
            }
        })
    }

    /// Leverage with the spot default applied.
    pub fn effective_leverage(&self) -> f64 {
        if self.leverage > 0.0 {
            self.leverage
        } else {
            1.0
        }
    }

    /// Sort the entry ladder in fill-progression order for the resolved direction.
    pub fn sort_entries(&mut self) {
        match self.resolved_direction() {
            Direction::Long => self.entries.sort_by(|a, b| b.total_cmp(a)),
            Direction::Short => self.entries.sort_by(|a, b| a.total_cmp(b)),
        }
    }
}

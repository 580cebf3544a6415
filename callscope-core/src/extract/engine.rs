//! Order extraction: prefilter, preprocessing, pattern matching.
//!
//! `parse_order` is the engine's single entry point. It runs the cheap
//! boolean prefilter first, then tries the channel's configured order
//! patterns in order. A pattern win only counts if the candidate also passes
//! the numeric validator — a syntactically successful but nonsensical match
//! is silently discarded in favor of a later, stricter pattern. Exhaustion
//! yields a `Probable` echo carrying the raw text, never an error.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::config::{CompiledConfig, CompiledRule, Field};
use crate::domain::{Direction, Order};

use super::numeric::{numeric_token_count, parse_price_list, parse_scalar};
use super::validate::validate;

/// Outcome of order extraction on one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A structured, validator-approved order.
    Order(Order),
    /// The prefilter fired but no pattern produced a valid order; the raw
    /// text is echoed for manual triage.
    Probable(String),
}

fn entry_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)entry|leverage|lev").expect("static regex"))
}

fn stop_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)stoploss|stop|loss|sl").expect("static regex"))
}

/// Cheap boolean gate run before any order pattern is attempted.
///
/// Rejects text matching an ignore pattern, text with fewer than three
/// numeric tokens (entry, target, stop loss), and text missing either the
/// leverage/entry or the stop/loss vocabulary.
pub fn looks_like_order(text: &str, config: &CompiledConfig) -> bool {
    if config.ignore.iter().any(|re| re.is_match(text)) {
        return false;
    }
    if numeric_token_count(text) < 3 {
        return false;
    }
    entry_keyword().is_match(text) && stop_keyword().is_match(text)
}

/// Apply the channel's ordered substitution list.
pub fn preprocess(text: &str, config: &CompiledConfig) -> String {
    let mut processed = text.to_string();
    for sub in &config.preprocessing {
        processed = sub
            .regex
            .replace_all(&processed, sub.replacement.as_str())
            .into_owned();
    }
    processed
}

/// Extract an order from one message.
///
/// Returns `None` when the text does not even look like an order (the
/// pipeline then tries the other categories), `Extraction::Order` on the
/// first validator-approved pattern match, and `Extraction::Probable`
/// when every pattern was exhausted.
pub fn parse_order(text: &str, config: &CompiledConfig) -> Option<Extraction> {
    if !looks_like_order(text, config) {
        return None;
    }

    let processed = preprocess(text, config);

    for rule in &config.order_rules {
        let candidate = if rule.is_nested() {
            match_nested(&processed, rule)
        } else {
            match_simple(&processed, rule)
        };
        if let Some(mut order) = candidate {
            order.sort_entries();
            if validate(&order) {
                return Some(Extraction::Order(order));
            }
        }
    }

    Some(Extraction::Probable(text.to_string()))
}

// ─── Simple patterns ─────────────────────────────────────────────────

/// Captured field strings for one pattern match, before numeric coercion.
struct RawFields<'t> {
    coin: &'t str,
    direction: Option<&'t str>,
    exchange: Option<&'t str>,
    leverage: Option<&'t str>,
    entries: &'t str,
    targets: &'t str,
    sl: Option<&'t str>,
}

fn has_named_groups(regex: &Regex) -> bool {
    regex.capture_names().flatten().next().is_some()
}

fn match_simple(text: &str, rule: &CompiledRule) -> Option<Order> {
    let caps = rule.regex.captures(text)?;

    let raw = if has_named_groups(&rule.regex) {
        RawFields {
            coin: caps.name("coin")?.as_str(),
            direction: caps.name("direction").map(|m| m.as_str()),
            exchange: caps.name("exchange").map(|m| m.as_str()),
            leverage: caps.name("leverage").map(|m| m.as_str()),
            entries: caps.name("entries")?.as_str(),
            targets: caps.name("take_profits")?.as_str(),
            sl: caps.name("sl").map(|m| m.as_str()),
        }
    } else {
        // Positional convention: coin, direction, leverage, entries,
        // targets, stop loss — exactly six groups.
        if caps.len() != 7 {
            return None;
        }
        RawFields {
            coin: caps.get(1)?.as_str(),
            direction: caps.get(2).map(|m| m.as_str()),
            exchange: None,
            leverage: caps.get(3).map(|m| m.as_str()),
            entries: caps.get(4)?.as_str(),
            targets: caps.get(5)?.as_str(),
            sl: caps.get(6).map(|m| m.as_str()),
        }
    };

    let entries = parse_price_list(raw.entries);
    let targets = parse_price_list(raw.targets);
    build_order(raw, entries, targets)
}

// ─── Nested patterns ─────────────────────────────────────────────────

/// Re-scan a captured list block with its field sub-pattern in find-all mode.
/// Each sub-match contributes group 1 (or the whole match) as one item.
fn extract_list(block: &str, sub: &Regex) -> Vec<f64> {
    sub.captures_iter(block)
        .filter_map(|caps| {
            let m = caps.get(1).or_else(|| caps.get(0))?;
            parse_scalar(m.as_str())
        })
        .collect()
}

/// First sub-match of a scalar field within its captured block.
fn extract_scalar<'t>(block: &'t str, sub: &Regex) -> Option<&'t str> {
    let caps = sub.captures(block)?;
    Some(caps.get(1).or_else(|| caps.get(0))?.as_str())
}

fn field_block<'t>(caps: &Captures<'t>, field: Field) -> Option<&'t str> {
    let name = match field {
        Field::Coin => "coin",
        Field::Direction => "direction",
        Field::Exchange => "exchange",
        Field::Leverage => "leverage",
        Field::Entries => "entries",
        Field::TakeProfits => "take_profits",
        Field::Sl => "sl",
    };
    caps.name(name).map(|m| m.as_str())
}

fn match_nested(text: &str, rule: &CompiledRule) -> Option<Order> {
    let caps = rule.regex.captures(text)?;

    let scalar = |field: Field| -> Option<&str> {
        let block = field_block(&caps, field)?;
        match rule.fields.get(&field) {
            Some(sub) => extract_scalar(block, sub),
            None => Some(block),
        }
    };
    let list = |field: Field| -> Vec<f64> {
        match field_block(&caps, field) {
            Some(block) => match rule.fields.get(&field) {
                Some(sub) => extract_list(block, sub),
                None => parse_price_list(block),
            },
            None => Vec::new(),
        }
    };

    let raw = RawFields {
        coin: scalar(Field::Coin)?,
        direction: scalar(Field::Direction),
        exchange: scalar(Field::Exchange),
        leverage: scalar(Field::Leverage),
        entries: "",
        targets: "",
        sl: scalar(Field::Sl),
    };

    build_order(raw, list(Field::Entries), list(Field::TakeProfits))
}

// ─── Candidate assembly ──────────────────────────────────────────────

fn build_order(raw: RawFields<'_>, entries: Vec<f64>, targets: Vec<f64>) -> Option<Order> {
    // A structured result always has non-empty numeric ladders.
    if entries.is_empty() || targets.is_empty() {
        return None;
    }

    let coin = raw
        .coin
        .trim()
        .trim_start_matches(['#', '$'])
        .to_uppercase();
    if coin.is_empty() {
        return None;
    }

    Some(Order {
        coin,
        direction: raw.direction.and_then(Direction::from_token),
        exchange: raw
            .exchange
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
        leverage: raw.leverage.and_then(parse_scalar).unwrap_or(1.0),
        entries,
        targets,
        stop_loss: raw.sl.and_then(parse_scalar),
    })
}

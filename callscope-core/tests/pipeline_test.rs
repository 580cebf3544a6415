//! End-to-end classification tests: channel config in, typed events out.
//!
//! Covers the emoji-heavy and plain-text channel formats, the malformed-input
//! degradation path, and determinism of the whole pipeline.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use callscope_core::config::{ParserConfig, PatternSet, RegexSpec};
use callscope_core::domain::{Direction, EventKind, RawMessage};
use callscope_core::pipeline::{build_pipeline, classify, classify_all, Matcher};
use callscope_core::CompiledConfig;

// ── Helpers ──────────────────────────────────────────────────────────

fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 1, 9, minute, 0).unwrap()
}

fn message(id: &str, minute: u32, text: &str) -> RawMessage {
    RawMessage {
        id: id.into(),
        timestamp: ts(minute),
        related_to: None,
        text: text.into(),
    }
}

fn pipeline_for(patterns: Vec<RegexSpec>) -> Vec<Box<dyn Matcher>> {
    let config = ParserConfig {
        patterns: PatternSet {
            order: patterns,
            ..Default::default()
        },
        ..Default::default()
    };
    let compiled = Arc::new(CompiledConfig::compile(&config).unwrap());
    build_pipeline(&compiled).unwrap()
}

// ── Emoji channel format ─────────────────────────────────────────────

const EMOJI_ORDER_PATTERN: &str = r"(?P<coin>\S+) 📈 (?P<direction>BUY|SELL) 🛫Enter above: (?P<entries>[\d. -]+)💰(?P<take_profits>.+?)✖️SL (?P<sl>[\d.]+) 🔎Leverage (?P<leverage>[\d.]+)x";

#[test]
fn emoji_buy_call_extracts_in_fill_order() {
    let pipeline = pipeline_for(vec![RegexSpec::Plain(EMOJI_ORDER_PATTERN.into())]);
    let text = "RSR/USDT 📈 BUY 🛫Enter above: 0.005800- 0.005805 💰TP1 0.005823 💰TP2 0.005860 💰TP3 0.005990 ✖️SL 0.005495 🔎Leverage 10x";

    let event = classify(&message("1", 0, text), &pipeline);
    let EventKind::Order(order) = event.kind else {
        panic!("expected order, got {:?}", event.kind);
    };
    assert_eq!(order.coin, "RSR/USDT");
    assert_eq!(order.direction, Some(Direction::Long));
    assert_eq!(order.leverage, 10.0);
    // Long entries are reported top-down: first entry is the one filled first.
    assert_eq!(order.entries, vec![0.005805, 0.005800]);
    assert_eq!(order.targets, vec![0.005823, 0.005860, 0.005990]);
    assert_eq!(order.stop_loss, Some(0.005495));
}

// ── Plain-text channel format ────────────────────────────────────────

const PLAIN_ORDER_PATTERN: &str = r"(?P<coin>\S+) (?P<direction>LONG|SHORT) Entry: (?P<entries>[\d., -]+?) Target 1: (?P<take_profits>.+?) Stoploss: (?P<sl>[\d.,]+) Leverage: (?P<leverage>[\d.]+)x";

#[test]
fn plain_short_call_keeps_ascending_entries() {
    let pipeline = pipeline_for(vec![RegexSpec::Plain(PLAIN_ORDER_PATTERN.into())]);
    let text = "BTCUSDT SHORT Entry: 29970.00 - 31168.80 Target 1: 28771.20 Target 2: 27571.20 Stoploss: 31792.17 Leverage: 5x";

    let event = classify(&message("1", 0, text), &pipeline);
    let EventKind::Order(order) = event.kind else {
        panic!("expected order, got {:?}", event.kind);
    };
    assert_eq!(order.direction, Some(Direction::Short));
    // Short fills from the bottom up, so ascending order is preserved.
    assert_eq!(order.entries, vec![29970.0, 31168.8]);
    assert_eq!(order.targets, vec![28771.2, 27571.2]);
    assert!(order.stop_loss.unwrap() > order.entries[1]);
    assert_eq!(order.leverage, 5.0);
}

// ── Malformed input ──────────────────────────────────────────────────

#[test]
fn keyword_text_without_enough_numbers_is_unknown() {
    let pipeline = pipeline_for(vec![RegexSpec::Plain(PLAIN_ORDER_PATTERN.into())]);
    // Both keyword classes present, but only two numeric tokens.
    let text = "Setting leverage to 10x soon stoploss at 2";

    let event = classify(&message("1", 0, text), &pipeline);
    assert_eq!(event.kind, EventKind::Unknown { text: text.into() });
}

#[test]
fn order_like_text_no_pattern_matches_becomes_probable() {
    let pipeline = pipeline_for(vec![RegexSpec::Plain(PLAIN_ORDER_PATTERN.into())]);
    let text = "entry 100 and 95, target 110, stoploss 90 in a format nobody configured";

    let event = classify(&message("1", 0, text), &pipeline);
    assert_eq!(
        event.kind,
        EventKind::ProbableOrder { text: text.into() }
    );
}

// ── Batch behavior ───────────────────────────────────────────────────

#[test]
fn batch_preserves_input_order_and_ids() {
    let pipeline = pipeline_for(vec![RegexSpec::Plain(PLAIN_ORDER_PATTERN.into())]);
    let messages = vec![
        message("a", 0, "gm"),
        message(
            "b",
            1,
            "BTCUSDT SHORT Entry: 29970.00 - 31168.80 Target 1: 28771.20 Stoploss: 31792.17 Leverage: 5x",
        ),
        message("c", 2, "#BTCUSDT Stoploss ⛔\nLoss: 5.2%"),
    ];

    let events = classify_all(&messages, &pipeline);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].id, "a");
    assert!(matches!(events[0].kind, EventKind::Unknown { .. }));
    assert!(matches!(events[1].kind, EventKind::Order(_)));
    assert_eq!(events[2].kind, EventKind::StopLossHit { pct: 5.2 });
    assert_eq!(events[2].timestamp, ts(2));
}

#[test]
fn classification_is_deterministic_across_runs() {
    let messages = vec![
        message("1", 0, "RSR/USDT 📈 BUY 🛫Enter above: 0.005800- 0.005805 💰TP1 0.005823 💰TP2 0.005860 ✖️SL 0.005495 🔎Leverage 10x"),
        message("2", 1, "random chatter 🚀"),
        message("3", 2, "#RSRUSDT Take-Profit target 1 ✅\nProfit: 3.1% 📈\nPeriod: 12 minutes ⏰"),
    ];

    let run = || {
        let pipeline = pipeline_for(vec![RegexSpec::Plain(EMOJI_ORDER_PATTERN.into())]);
        classify_all(&messages, &pipeline)
    };
    assert_eq!(run(), run());
}

// ── Config loading ───────────────────────────────────────────────────

#[test]
fn channel_config_round_trips_through_toml() {
    let doc = r#"
        pipeline = ["order", "stop_loss", "take_profit", "info"]

        [[preprocessing]]
        pattern = '[\r\n]+'
        replacement = ' '

        [[patterns.order]]
        pattern = '(?P<coin>\S+) (?P<direction>LONG|SHORT) Entry: (?P<entries>[\d., -]+?) Stoploss: (?P<sl>[\d.,]+)'

        [[patterns_to_ignore]]
        pattern = '(?i)weekly results'
    "#;
    let config: ParserConfig = toml::from_str(doc).unwrap();
    assert_eq!(config.pipeline.len(), 4);
    assert_eq!(config.preprocessing.len(), 1);

    let compiled = Arc::new(CompiledConfig::compile(&config).unwrap());
    let pipeline = build_pipeline(&compiled).unwrap();
    assert_eq!(pipeline.len(), 4);
    assert_eq!(pipeline[0].name(), "order");
    assert_eq!(pipeline[3].name(), "info");
}

//! Numeric token and price-list parsing.
//!
//! Channels write price ladders in every imaginable shape: dash-separated
//! zones, comma lists, `1)`-numbered lists, en-dashes, currency suffixes,
//! thousands separators. Everything funnels through `parse_price_list`.

use regex::Regex;
use std::sync::OnceLock;

fn numeric_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d.,]+").expect("static regex"))
}

fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\s*\)\s*").expect("static regex"))
}

fn thousands() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d),(\d{3})").expect("static regex"))
}

/// Count numeric-ish tokens in a message. The prefilter requires at least
/// three (entry, target, stop loss) before any order pattern is attempted.
pub fn numeric_token_count(text: &str) -> usize {
    numeric_token().find_iter(text).count()
}

/// Parse a block of text into the numeric items it contains.
///
/// Strips `N)` numbered-list markers, collapses thousands separators, treats
/// dashes, en/em-dashes, remaining commas, currency and percent signs as item
/// separators, then parses whatever splits off. Unparseable fragments are
/// dropped, never an error.
pub fn parse_price_list(block: &str) -> Vec<f64> {
    let cleaned = list_marker().replace_all(block, " ");

    // Commas glued between a digit and exactly three digits are thousands
    // separators; replace until stable so "1,234,567" fully collapses.
    let mut cleaned = cleaned.into_owned();
    loop {
        let next = thousands().replace_all(&cleaned, "${1}${2}").into_owned();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }

    let cleaned: String = cleaned
        .chars()
        .map(|c| match c {
            '-' | '–' | '—' | ',' | '$' | '%' => ' ',
            other => other,
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter_map(|token| token.trim_matches('.').parse::<f64>().ok())
        .collect()
}

/// First numeric item in a block, if any. Used for stop loss and leverage.
///
/// Unlike `parse_price_list` this pulls numeric substrings out of surrounding
/// text, so suffixed tokens like `10x` or `(20x)` still yield their number.
pub fn parse_scalar(block: &str) -> Option<f64> {
    let mut cleaned = block.to_string();
    loop {
        let next = thousands().replace_all(&cleaned, "${1}${2}").into_owned();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }

    numeric_token()
        .find_iter(&cleaned)
        .filter_map(|m| {
            m.as_str()
                .trim_matches(|c| c == '.' || c == ',')
                .parse::<f64>()
                .ok()
        })
        .next()
}

/// Parse a percentage string like `"5.2%"`.
pub fn parse_pct(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('%').replace(',', "").parse().ok()
}

//! Per-channel parser configuration and its compiled form.
//!
//! A `ParserConfig` is a declarative description of how one channel's messages
//! map to structured fields: preprocessing substitutions, ordered order
//! patterns (plain or with per-field sub-patterns), ignore patterns, follow-up
//! patterns per event category, and the pipeline composition. The concrete
//! file encoding (TOML or JSON) is the caller's concern; the core consumes the
//! deserialized document and compiles it once into `CompiledConfig`.
//!
//! Follow-up categories default to the Cornix bot phrasing most channels
//! relay, so a channel config usually only describes its order format.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Declarative model ───────────────────────────────────────────────

/// Fields a nested order pattern can address with a sub-pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Coin,
    Direction,
    Exchange,
    Leverage,
    Entries,
    TakeProfits,
    Sl,
}

/// One order pattern: a plain regex, or a regex plus per-field sub-patterns.
///
/// Plain patterns either use the named groups `coin`, `direction`, `exchange`,
/// `leverage`, `entries`, `take_profits`, `sl`, or exactly six positional
/// groups in the fixed order coin, direction, leverage, entries, targets,
/// stop loss. Patterns with sub-patterns must use named groups; the named
/// block captured for a list field is re-scanned with its sub-pattern in
/// find-all mode, recovering one numeric item per sub-match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegexSpec {
    Plain(String),
    WithFields {
        pattern: String,
        #[serde(default)]
        fields: BTreeMap<Field, String>,
    },
}

impl RegexSpec {
    pub fn pattern(&self) -> &str {
        match self {
            RegexSpec::Plain(pattern) => pattern,
            RegexSpec::WithFields { pattern, .. } => pattern,
        }
    }

    pub fn fields(&self) -> Option<&BTreeMap<Field, String>> {
        match self {
            RegexSpec::Plain(_) => None,
            RegexSpec::WithFields { fields, .. } => Some(fields),
        }
    }
}

/// One preprocessing substitution, applied with `Regex::replace_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub pattern: String,
    pub replacement: String,
}

/// Patterns per event category. Empty categories fall back to the Cornix
/// defaults at compile time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSet {
    pub order: Vec<RegexSpec>,
    pub entry: Vec<RegexSpec>,
    pub entry_all: Vec<RegexSpec>,
    pub take_profit: Vec<RegexSpec>,
    pub take_profit_all: Vec<RegexSpec>,
    pub stop_loss: Vec<RegexSpec>,
    pub close: Vec<RegexSpec>,
    pub cancelled: Vec<RegexSpec>,
    pub opposite: Vec<RegexSpec>,
    pub sl_after_tp: Vec<RegexSpec>,
    pub info: Vec<RegexSpec>,
}

/// Declarative per-channel configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub preprocessing: Vec<Preprocessor>,
    pub patterns: PatternSet,
    pub patterns_to_ignore: Vec<RegexSpec>,
    /// Enabled categories in evaluation order. Channel phrasing differences
    /// are modeled purely through this list plus the patterns above.
    pub pipeline: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            preprocessing: Vec::new(),
            patterns: PatternSet::default(),
            patterns_to_ignore: Vec::new(),
            pipeline: default_pipeline(),
        }
    }
}

/// Category order matching the reference channels: the expensive order
/// extraction first, then the follow-up notices.
pub fn default_pipeline() -> Vec<String> {
    [
        "order",
        "entry",
        "entry_all",
        "close",
        "opposite",
        "sl_after_tp",
        "stop_loss",
        "take_profit",
        "take_profit_all",
        "cancelled",
        "info",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// ─── Cornix follow-up defaults ───────────────────────────────────────

const DEFAULT_ENTRY: &str =
    r"#(?P<coin>\S+) Entry (?:target )?(?P<index>\d+)[^\n]*\s*Average Entry Price: (?P<price>[\d.,]+)";
const DEFAULT_ENTRY_ALL: &str =
    r"#(?P<coin>\S+) All entry targets achieved\s*Average Entry Price: (?P<price>[\d.,]+)";
const DEFAULT_TAKE_PROFIT: &str =
    r"#(?P<coin>\S+) Take-Profit target (?P<index>\d+) ✅\s*Profit: (?P<pct>[\d.,%]+)\s*📈\s*Period: (?P<elapsed>.+?) ⏰";
const DEFAULT_TAKE_PROFIT_ALL: &str =
    r"#(?P<coin>\S+) All take-profit targets achieved\s*Profit: (?P<pct>[\d.,%]+)\s*📈\s*Period: (?P<elapsed>.+?) ⏰";
const DEFAULT_STOP_LOSS: &str = r"#(?P<coin>\S+) Stoploss ⛔\s*Loss: (?P<pct>[\d.,%]+)";
const DEFAULT_CLOSE: &str = r"CLOSE (?P<coin>.+)";
const DEFAULT_CANCELLED: &str = r"#(?P<coin>\S+) Cancelled ❌";
const DEFAULT_OPPOSITE: &str = r"#(?P<coin>\S+) Closed due to opposite direction signal";
const DEFAULT_SL_AFTER_TP: &str =
    r"#(?P<coin>\S+) Closed at .*stoploss after reaching take profit";
const DEFAULT_INFO: &str = "⚡";

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors surfaced while compiling a `ParserConfig`.
///
/// These are the only fatal errors in the crate: a config that does not
/// compile is rejected before any message is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid regex `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

// ─── Compiled form ───────────────────────────────────────────────────

/// One compiled order rule: the outer regex plus compiled field sub-patterns.
#[derive(Debug)]
pub struct CompiledRule {
    pub regex: Regex,
    pub fields: BTreeMap<Field, Regex>,
}

impl CompiledRule {
    /// True when this rule carries field sub-patterns (nested extraction).
    pub fn is_nested(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// One compiled preprocessing substitution.
#[derive(Debug)]
pub struct Substitution {
    pub regex: Regex,
    pub replacement: String,
}

/// A `ParserConfig` with every pattern compiled, ready for the engine.
#[derive(Debug)]
pub struct CompiledConfig {
    pub preprocessing: Vec<Substitution>,
    pub order_rules: Vec<CompiledRule>,
    pub ignore: Vec<Regex>,
    pub entry: Vec<Regex>,
    pub entry_all: Vec<Regex>,
    pub take_profit: Vec<Regex>,
    pub take_profit_all: Vec<Regex>,
    pub stop_loss: Vec<Regex>,
    pub close: Vec<Regex>,
    pub cancelled: Vec<Regex>,
    pub opposite: Vec<Regex>,
    pub sl_after_tp: Vec<Regex>,
    pub info: Vec<Regex>,
    pub pipeline: Vec<String>,
}

/// Compile a category's pattern list, falling back to a built-in default
/// when the channel config leaves the category empty.
fn compile_category(specs: &[RegexSpec], default: &str) -> Result<Vec<Regex>, ConfigError> {
    if specs.is_empty() {
        return Ok(vec![compile(default)?]);
    }
    specs.iter().map(|spec| compile(spec.pattern())).collect()
}

impl CompiledConfig {
    pub fn compile(config: &ParserConfig) -> Result<CompiledConfig, ConfigError> {
        let preprocessing = config
            .preprocessing
            .iter()
            .map(|p| {
                Ok(Substitution {
                    regex: compile(&p.pattern)?,
                    replacement: p.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let order_rules = config
            .patterns
            .order
            .iter()
            .map(|spec| {
                let regex = compile(spec.pattern())?;
                let mut fields = BTreeMap::new();
                if let Some(sub) = spec.fields() {
                    for (field, pattern) in sub {
                        fields.insert(*field, compile(pattern)?);
                    }
                }
                Ok(CompiledRule { regex, fields })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let ignore = config
            .patterns_to_ignore
            .iter()
            .map(|spec| compile(spec.pattern()))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let patterns = &config.patterns;
        Ok(CompiledConfig {
            preprocessing,
            order_rules,
            ignore,
            entry: compile_category(&patterns.entry, DEFAULT_ENTRY)?,
            entry_all: compile_category(&patterns.entry_all, DEFAULT_ENTRY_ALL)?,
            take_profit: compile_category(&patterns.take_profit, DEFAULT_TAKE_PROFIT)?,
            take_profit_all: compile_category(&patterns.take_profit_all, DEFAULT_TAKE_PROFIT_ALL)?,
            stop_loss: compile_category(&patterns.stop_loss, DEFAULT_STOP_LOSS)?,
            close: compile_category(&patterns.close, DEFAULT_CLOSE)?,
            cancelled: compile_category(&patterns.cancelled, DEFAULT_CANCELLED)?,
            opposite: compile_category(&patterns.opposite, DEFAULT_OPPOSITE)?,
            sl_after_tp: compile_category(&patterns.sl_after_tp, DEFAULT_SL_AFTER_TP)?,
            info: compile_category(&patterns.info, DEFAULT_INFO)?,
            pipeline: if config.pipeline.is_empty() {
                default_pipeline()
            } else {
                config.pipeline.clone()
            },
        })
    }
}

//! Message classification pipeline — first-match-wins chain of matchers.
//!
//! Not a state machine: a single pass over one message through an ordered
//! list of independent matchers, one per event category. The composition
//! (which categories, in what order) comes from the channel config, so
//! channel phrasing never leaks into branching logic here.

use std::sync::Arc;

use regex::{Captures, Regex};

use crate::config::CompiledConfig;
use crate::domain::{Event, EventKind, RawMessage};
use crate::extract::engine::{parse_order, Extraction};
use crate::extract::numeric::{parse_pct, parse_scalar};

/// One classification capability. `try_extract` sees a single message and
/// returns its typed payload, or `None` when this category does not apply.
pub trait Matcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_extract(&self, message: &RawMessage) -> Option<EventKind>;
}

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Unknown pipeline category: {0}")]
    UnknownCategory(String),
}

// ─── Order matcher ───────────────────────────────────────────────────

/// Wraps the extraction engine as the (usually first) pipeline stage.
pub struct OrderMatcher {
    config: Arc<CompiledConfig>,
}

impl Matcher for OrderMatcher {
    fn name(&self) -> &'static str {
        "order"
    }

    fn try_extract(&self, message: &RawMessage) -> Option<EventKind> {
        match parse_order(&message.text, &self.config)? {
            Extraction::Order(order) => Some(EventKind::Order(order)),
            Extraction::Probable(text) => Some(EventKind::ProbableOrder { text }),
        }
    }
}

// ─── Follow-up matchers ──────────────────────────────────────────────

/// Follow-up event categories, each backed by a regex list in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Entry,
    EntryAll,
    TakeProfit,
    TakeProfitAll,
    StopLoss,
    Close,
    Cancelled,
    Opposite,
    SlAfterTp,
    Info,
}

impl Category {
    fn name(self) -> &'static str {
        match self {
            Category::Entry => "entry",
            Category::EntryAll => "entry_all",
            Category::TakeProfit => "take_profit",
            Category::TakeProfitAll => "take_profit_all",
            Category::StopLoss => "stop_loss",
            Category::Close => "close",
            Category::Cancelled => "cancelled",
            Category::Opposite => "opposite",
            Category::SlAfterTp => "sl_after_tp",
            Category::Info => "info",
        }
    }
}

/// Generic matcher for follow-up notices (fills, target hits, stop-outs...).
pub struct FollowUpMatcher {
    category: Category,
    config: Arc<CompiledConfig>,
}

impl FollowUpMatcher {
    fn patterns(&self) -> &[Regex] {
        match self.category {
            Category::Entry => &self.config.entry,
            Category::EntryAll => &self.config.entry_all,
            Category::TakeProfit => &self.config.take_profit,
            Category::TakeProfitAll => &self.config.take_profit_all,
            Category::StopLoss => &self.config.stop_loss,
            Category::Close => &self.config.close,
            Category::Cancelled => &self.config.cancelled,
            Category::Opposite => &self.config.opposite,
            Category::SlAfterTp => &self.config.sl_after_tp,
            Category::Info => &self.config.info,
        }
    }

    /// Build the typed payload from one successful regex match. Returns
    /// `None` when a required numeric group is missing or unparseable, in
    /// which case the next pattern in the category gets its turn.
    fn build(&self, caps: &Captures<'_>, message: &RawMessage) -> Option<EventKind> {
        let index = |name: &str| -> Option<u32> { caps.name(name)?.as_str().parse().ok() };
        let price = |name: &str| -> Option<f64> { parse_scalar(caps.name(name)?.as_str()) };
        let pct = |name: &str| -> Option<f64> { parse_pct(caps.name(name)?.as_str()) };
        let elapsed = caps.name("elapsed").map(|m| m.as_str().trim().to_string());

        match self.category {
            Category::Entry => Some(EventKind::EntryFilled {
                entry_index: index("index")?,
                price: price("price")?,
            }),
            Category::EntryAll => Some(EventKind::AllEntriesFilled {
                avg_price: price("price")?,
            }),
            Category::TakeProfit => Some(EventKind::TargetHit {
                target_index: index("index")?,
                pct: pct("pct").unwrap_or(0.0),
                elapsed,
            }),
            Category::TakeProfitAll => Some(EventKind::AllTargetsHit {
                pct: pct("pct").unwrap_or(0.0),
                elapsed,
            }),
            Category::StopLoss => Some(EventKind::StopLossHit {
                pct: pct("pct").unwrap_or(0.0),
            }),
            Category::Close => Some(EventKind::Closed),
            Category::Cancelled => Some(EventKind::Cancelled),
            Category::Opposite => Some(EventKind::OppositeSignalClosed),
            Category::SlAfterTp => Some(EventKind::SlAfterTp),
            Category::Info => Some(EventKind::Info {
                text: message.text.clone(),
            }),
        }
    }
}

impl Matcher for FollowUpMatcher {
    fn name(&self) -> &'static str {
        self.category.name()
    }

    fn try_extract(&self, message: &RawMessage) -> Option<EventKind> {
        for regex in self.patterns() {
            if let Some(caps) = regex.captures(&message.text) {
                if let Some(kind) = self.build(&caps, message) {
                    return Some(kind);
                }
            }
        }
        None
    }
}

// ─── Factory ─────────────────────────────────────────────────────────

/// Assemble the matcher chain declared by the config's `pipeline` list.
pub fn build_pipeline(
    config: &Arc<CompiledConfig>,
) -> Result<Vec<Box<dyn Matcher>>, PipelineError> {
    config
        .pipeline
        .iter()
        .map(|name| -> Result<Box<dyn Matcher>, PipelineError> {
            let category = match name.as_str() {
                "order" => {
                    return Ok(Box::new(OrderMatcher {
                        config: Arc::clone(config),
                    }))
                }
                "entry" => Category::Entry,
                "entry_all" => Category::EntryAll,
                "take_profit" => Category::TakeProfit,
                "take_profit_all" => Category::TakeProfitAll,
                "stop_loss" => Category::StopLoss,
                "close" => Category::Close,
                "cancelled" => Category::Cancelled,
                "opposite" => Category::Opposite,
                "sl_after_tp" => Category::SlAfterTp,
                "info" => Category::Info,
                other => return Err(PipelineError::UnknownCategory(other.to_string())),
            };
            Ok(Box::new(FollowUpMatcher {
                category,
                config: Arc::clone(config),
            }))
        })
        .collect()
}

// ─── Classification ──────────────────────────────────────────────────

/// Classify one message: first matcher to produce a payload wins, everything
/// else degrades to `Unknown`. Pure — identical input yields identical output.
pub fn classify(message: &RawMessage, pipeline: &[Box<dyn Matcher>]) -> Event {
    let kind = pipeline
        .iter()
        .find_map(|matcher| matcher.try_extract(message))
        .unwrap_or_else(|| EventKind::Unknown {
            text: message.text.clone(),
        });

    Event {
        id: message.id.clone(),
        timestamp: message.timestamp,
        related_to: message.related_to.clone(),
        kind,
    }
}

/// Classify a whole batch in input order.
pub fn classify_all(messages: &[RawMessage], pipeline: &[Box<dyn Matcher>]) -> Vec<Event> {
    messages.iter().map(|m| classify(m, pipeline)).collect()
}

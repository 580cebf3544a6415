//! Callscope Core — signal-channel message classification and call aggregation.
//!
//! This crate contains the heart of the batch analysis engine:
//! - Domain types (raw messages, classified events, orders, order details)
//! - Config-driven regex extraction engine with nested field sub-patterns
//! - Numeric plausibility validator for extracted orders
//! - First-match-wins classification pipeline assembled from per-channel config
//! - Reply-reference correlation graph and per-call aggregation
//! - Stop-loss propagation across near-duplicate calls
//! - Reporting-key grouping for duplicate standalone posts
//!
//! The engine is synchronous and batch-only: it consumes a fully loaded,
//! in-memory message list and never performs I/O. Malformed input degrades to
//! `Unknown` or `ProbableOrder` events; nothing aborts the batch.

pub mod config;
pub mod correlate;
pub mod domain;
pub mod extract;
pub mod pipeline;
pub mod report;

pub use config::{CompiledConfig, ConfigError, ParserConfig};
pub use correlate::{build_groups, AggregationContext};
pub use domain::{Direction, Event, EventKind, Order, OrderDetail, RawMessage};
pub use pipeline::{build_pipeline, classify, classify_all, Matcher, PipelineError};

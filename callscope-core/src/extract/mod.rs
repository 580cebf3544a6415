//! Regex extraction engine — raw text + pattern list → candidate order.

pub mod engine;
pub mod numeric;
pub mod validate;

pub use engine::{looks_like_order, parse_order, preprocess, Extraction};
pub use numeric::{numeric_token_count, parse_price_list, parse_scalar};
pub use validate::validate;

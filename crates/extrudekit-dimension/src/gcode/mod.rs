//! G-Code line handling
//!
//! This module provides:
//! - Line classification into keywords and parameter words
//! - Number formatting for emitted values

pub mod format;
pub mod line;

pub use format::{format_rounded, round_to_places, DEFAULT_DECIMAL_PLACES, MAX_DECIMAL_PLACES};
pub use line::{classify, classify_all, Keyword, Param, ParsedLine};

//! Feature engineering
//!
//! Replay parsing, the deck filter and the starting-hand feature table.

pub mod deck_filter;
pub mod encoding;
pub mod match_parser;

pub use deck_filter::{DeckFilter, DeckFilterConfig};
pub use encoding::{FeatureBuilder, FeatureSet, FeatureTable};
pub use match_parser::{parse_match, MatchIssue, ParsedMatch};

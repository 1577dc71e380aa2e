//! Core of a betting-exchange matching engine for markets whose outcomes
//! are mutually exclusive and exhaustive (`spec.md` §1).
//!
//! The crate is a pure in-process library: [`order_book::OrderBook`] and
//! its `match_or_put` entry point are the whole public surface that
//! matters to embedders. `cli`/`simulate` are a thin demo harness, not
//! part of the matching core.

pub mod cli;
pub mod errors;
pub mod order;
pub mod order_book;
pub mod order_match;
pub mod price;
pub mod price_level;
pub mod simulate;

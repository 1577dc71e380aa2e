use thiserror::Error;

/// Recoverable construction/configuration errors.
///
/// `spec.md` §7 classifies most failure modes (bad `outcome_index`, a
/// virtual order submitted with `cross_matching`, an invariant violated
/// mid-match) as programming bugs that must abort the process — those are
/// raised as `assert!`/`panic!` at the point of discovery, not as
/// `Result`s (see `order_book.rs`). `EngineError` exists for the one class
/// of failure that *is* a normal, recoverable input error: rejecting a
/// malformed `OrderBook` configuration or demo-CLI input before any
/// matching state is touched.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("order book must have at least 2 outcomes, got {0}")]
    InvalidOutcomeCount(usize),

    #[error("outcome index {index} out of range for a {outcomes}-outcome book")]
    OutcomeOutOfRange { index: usize, outcomes: usize },

    #[error("backer stake must be positive")]
    NonPositiveStake,

    #[error("invalid price: {0}")]
    InvalidPrice(String),
}

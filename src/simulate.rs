//! Bounded, in-process noisy order-flow generator.
//!
//! Adapted from the teacher's HTTP-driven `simulate.rs`: stripped of its
//! `reqwest` client and `tokio` event loop, since `spec.md` §1 puts any
//! network surface out of scope and the matching core itself is
//! synchronous (§5). What remains is the same idea — fire randomised
//! orders at the book and see what happens — run as a plain bounded loop.

use rand::Rng;
use rand_distr::{Distribution, Exp};
use tracing::info;

use crate::order::Order;
use crate::order_book::OrderBook;
use crate::price::Price;

/// Parameters for a single simulation run.
pub struct SimConfig {
    pub outcomes: usize,
    pub iterations: u64,
    pub cross_matching: bool,
    /// Mean backer stake (cents) of the exponential distribution orders are
    /// drawn from.
    pub mean_stake: f64,
}

/// Aggregate counters for a completed simulation run.
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct SimReport {
    pub orders_submitted: u64,
    pub matches_produced: u64,
    pub total_matched_stake: u64,
}

/// Runs `config.iterations` randomised orders against a fresh `OrderBook`
/// and returns both the resulting book and a summary report.
///
/// Odds are drawn uniformly from `[1.20, 10.00]` and stakes from an
/// exponential distribution with the configured mean, mirroring the
/// teacher's Poisson-arrival/exponential-size noise model minus the
/// wall-clock pacing (there is no caller to rate-limit against here).
pub fn run_simulation(config: SimConfig) -> (OrderBook, SimReport) {
    let mut order_book =
        OrderBook::new(config.outcomes).expect("simulate: caller-provided outcome count");
    let mut rng = rand::rng();
    let stake_dist =
        Exp::new(1.0 / config.mean_stake.max(1.0)).expect("mean_stake must be positive");
    let mut report = SimReport::default();

    for _ in 0..config.iterations {
        let outcome_index = rng.random_range(0..config.outcomes);
        let for_outcome = rng.random_bool(0.5);
        let odds = rng.random_range(1.20..10.00);
        let stake = (stake_dist.sample(&mut rng) as u64).max(1);

        let order = Order::new_real(
            stake,
            Price::from_f64_round(odds),
            outcome_index,
            for_outcome,
        );
        report.orders_submitted += 1;

        let matches = order_book.match_or_put(order, config.cross_matching);
        if !matches.is_empty() {
            info!(count = matches.len(), "simulated order produced matches");
        }
        report.matches_produced += matches.len() as u64;
        report.total_matched_stake += matches.iter().map(|m| m.matched_backer_stake).sum::<u64>();
    }

    (order_book, report)
}

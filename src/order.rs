//! The [`Order`] value object (`spec.md` §3).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::price::Price;

/// Index of an outcome within a market's fixed, mutually-exclusive-and-exhaustive
/// outcome set (`spec.md` §3: `outcome_index: integer in [0, outcomes)`).
pub type OutcomeIndex = usize;

/// Process-wide monotonic placement counter.
///
/// `spec.md` §3 assigns each order a `placed_time` used solely for
/// time-priority ordering, and §9's design notes flag that real timestamps
/// collide and recommend "a monotonic sequence number appended to the key."
/// We take that recommendation literally: `PlacedTime` has no relationship
/// to wall-clock time at all, it is just the order in which `Order`s (real
/// or virtual) were created, which is exactly what price-time priority
/// needs and nothing more.
static NEXT_PLACED_TIME: AtomicU64 = AtomicU64::new(0);

/// A strictly increasing placement sequence number (`spec.md`'s `placed_time`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct PlacedTime(u64);

impl PlacedTime {
    /// Issues the next placement sequence number.
    pub fn next() -> Self {
        Self(NEXT_PLACED_TIME.fetch_add(1, Ordering::Relaxed))
    }
}

/// An order resting on, or arriving at, an [`crate::order_book::OrderBook`].
///
/// Identity and price never change after construction; `unmatched_backer_stake`
/// is the only field mutated as the order is matched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Order {
    pub id: Uuid,
    pub placed_time: PlacedTime,
    /// Original backer liability, in cents. Positive.
    pub backer_stake: u64,
    pub price: Price,
    pub outcome_index: OutcomeIndex,
    /// `true` = back (buy the outcome), `false` = lay (sell the outcome).
    pub for_outcome: bool,
    /// Remaining backer stake to be matched, in `[0, backer_stake]`.
    pub unmatched_backer_stake: u64,
    /// Ephemeral synthesised order created during cross-matching (`spec.md` §4.4).
    pub is_virtual: bool,
}

impl Order {
    /// Constructs a brand-new real order with the full stake unmatched.
    pub fn new_real(
        backer_stake: u64,
        price: Price,
        outcome_index: OutcomeIndex,
        for_outcome: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            placed_time: PlacedTime::next(),
            backer_stake,
            price,
            outcome_index,
            for_outcome,
            unmatched_backer_stake: backer_stake,
            is_virtual: false,
        }
    }

    /// Constructs a fresh virtual order (`spec.md` §4.4 steps 8 and 9).
    pub fn new_virtual(
        backer_stake: u64,
        price: Price,
        outcome_index: OutcomeIndex,
        for_outcome: bool,
    ) -> Self {
        Self {
            is_virtual: true,
            ..Self::new_real(backer_stake, price, outcome_index, for_outcome)
        }
    }

    /// `spec.md` §3: `completely_matched ⇔ unmatched_backer_stake == 0`.
    pub fn completely_matched(&self) -> bool {
        self.unmatched_backer_stake == 0
    }

    /// Mirrors `pybetdex`'s `Order.partially_matched`: the order has taken
    /// at least one fill but still has residual stake. Used to assert
    /// invariant 6 (a virtual order is never found partially matched).
    pub fn partially_matched(&self) -> bool {
        self.unmatched_backer_stake != self.backer_stake
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} {} {}",
            self.unmatched_backer_stake,
            self.price,
            if self.for_outcome { "back" } else { "lay" },
            self.outcome_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placed_time_is_strictly_increasing() {
        let a = PlacedTime::next();
        let b = PlacedTime::next();
        assert!(a < b);
    }

    #[test]
    fn completely_matched_reflects_residual_stake() {
        let mut o = Order::new_real(100, Price::from_x100(200), 0, true);
        assert!(!o.completely_matched());
        assert!(!o.partially_matched());
        o.unmatched_backer_stake = 40;
        assert!(!o.completely_matched());
        assert!(o.partially_matched());
        o.unmatched_backer_stake = 0;
        assert!(o.completely_matched());
    }

    #[test]
    fn new_virtual_sets_flag() {
        let o = Order::new_virtual(10, Price::from_x100(600), 2, false);
        assert!(o.is_virtual);
        assert_eq!(o.unmatched_backer_stake, o.backer_stake);
    }
}

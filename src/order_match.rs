//! [`Match`]: an immutable record of a single fill (`spec.md` §3, §4.2).

use uuid::Uuid;

use crate::order::Order;
use crate::price::Price;

/// A record of a single fill between a taking order and a making order.
///
/// Constructed by [`Match::from_orders`] *before* the caller subtracts the
/// matched stake from either order, so the four stake snapshots capture
/// the state transition exactly (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Match {
    pub making_order_id: Uuid,
    pub taking_order_id: Uuid,
    /// Always the making order's price; price improvement accrues to the taker.
    pub matched_price: Price,
    pub matched_backer_stake: u64,
    pub unmatched_backer_stake_before_executing_making_order: u64,
    pub unmatched_backer_stake_before_executing_taking_order: u64,
    pub unmatched_backer_stake_after_executing_making_order: u64,
    pub unmatched_backer_stake_after_executing_taking_order: u64,
    pub making_order_is_virtual: bool,
    pub taking_order_is_virtual: bool,
}

impl Match {
    /// Pure constructor: computes the four stake snapshots from `taking`
    /// and `making` as they stand *before* `matched_backer_stake` is
    /// subtracted from either. Callers must apply that subtraction to both
    /// orders themselves, after constructing the record.
    pub fn from_orders(taking: &Order, making: &Order, matched_backer_stake: u64) -> Self {
        Self {
            making_order_id: making.id,
            taking_order_id: taking.id,
            matched_price: making.price,
            matched_backer_stake,
            unmatched_backer_stake_before_executing_making_order: making.unmatched_backer_stake,
            unmatched_backer_stake_before_executing_taking_order: taking.unmatched_backer_stake,
            unmatched_backer_stake_after_executing_making_order: making
                .unmatched_backer_stake
                .saturating_sub(matched_backer_stake),
            unmatched_backer_stake_after_executing_taking_order: taking
                .unmatched_backer_stake
                .saturating_sub(matched_backer_stake),
            making_order_is_virtual: making.is_virtual,
            taking_order_is_virtual: taking.is_virtual,
        }
    }
}

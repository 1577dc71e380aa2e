//! [`OrderBook`]: the matching engine core (`spec.md` §3, §4.3, §4.4, §4.5).

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::errors::EngineError;
use crate::order::{Order, OutcomeIndex};
use crate::order_match::Match;
use crate::price::Price;
use crate::price_level::PriceLevelQueue;

/// Per-(outcome, price) resting liquidity on one side of the book.
type PriceLevels = BTreeMap<Price, PriceLevelQueue>;

/// An order book for a market whose outcomes are mutually exclusive and
/// exhaustive: exactly one of `outcomes` outcomes settles as winner.
///
/// `bids_by_outcome[i]` holds back orders (`for_outcome = true`) for
/// outcome `i`; `offers_by_outcome[i]` holds lay orders. Both are
/// pre-sized to `outcomes` entries at construction, so there is no lazy
/// per-outcome creation to get wrong — only the inner `BTreeMap<Price, _>`
/// grows lazily, one entry per price level actually touched.
pub struct OrderBook {
    outcomes: usize,
    bids_by_outcome: Vec<PriceLevels>,
    offers_by_outcome: Vec<PriceLevels>,
}

impl OrderBook {
    /// Creates an empty book for a market with the given number of
    /// mutually exclusive outcomes. `spec.md` §3: `outcomes ≥ 2`.
    pub fn new(outcomes: usize) -> Result<Self, EngineError> {
        if outcomes < 2 {
            return Err(EngineError::InvalidOutcomeCount(outcomes));
        }
        Ok(Self {
            outcomes,
            bids_by_outcome: (0..outcomes).map(|_| BTreeMap::new()).collect(),
            offers_by_outcome: (0..outcomes).map(|_| BTreeMap::new()).collect(),
        })
    }

    pub fn outcomes(&self) -> usize {
        self.outcomes
    }

    /// Back orders resting for outcome `i` (`spec.md` §4.5).
    pub fn bids(&self, outcome_index: OutcomeIndex) -> &PriceLevels {
        &self.bids_by_outcome[outcome_index]
    }

    /// Lay orders resting for outcome `i`.
    pub fn offers(&self, outcome_index: OutcomeIndex) -> &PriceLevels {
        &self.offers_by_outcome[outcome_index]
    }

    /// Dispatches to [`OrderBook::bids`] or [`OrderBook::offers`] depending
    /// on `for_outcome`.
    pub fn orders(&self, outcome_index: OutcomeIndex, for_outcome: bool) -> &PriceLevels {
        if for_outcome {
            self.bids(outcome_index)
        } else {
            self.offers(outcome_index)
        }
    }

    fn orders_mut(&mut self, outcome_index: OutcomeIndex, for_outcome: bool) -> &mut PriceLevels {
        if for_outcome {
            &mut self.bids_by_outcome[outcome_index]
        } else {
            &mut self.offers_by_outcome[outcome_index]
        }
    }

    /// Routes `order` to its (outcome, side, price) queue and enqueues it.
    pub fn put(&mut self, order: Order) {
        self.orders_mut(order.outcome_index, order.for_outcome)
            .entry(order.price)
            .or_insert_with(PriceLevelQueue::new)
            .put(order);
    }

    /// Main entry point (`spec.md` §4.3).
    ///
    /// Matches `order` against resting liquidity under price-time priority,
    /// optionally synthesising virtual liquidity across sibling outcomes
    /// (`cross_matching`), and rests whatever is left unmatched. Returns
    /// the [`Match`] records produced, in execution order.
    ///
    /// # Panics
    /// Panics (via `assert!`) if `order.outcome_index` is out of range, or
    /// if `cross_matching` is requested for a virtual order — both are
    /// caller bugs per `spec.md` §7, not recoverable conditions.
    pub fn match_or_put(&mut self, order: Order, cross_matching: bool) -> Vec<Match> {
        assert!(
            order.outcome_index < self.outcomes,
            "outcome_index {} out of range for a {}-outcome book",
            order.outcome_index,
            self.outcomes
        );
        assert!(
            !(cross_matching && order.is_virtual),
            "a virtual order must never be submitted with cross_matching enabled"
        );
        let clear_virtual_orders = !order.is_virtual;
        debug!(
            outcome_index = order.outcome_index,
            for_outcome = order.for_outcome,
            cross_matching,
            unmatched_backer_stake = order.unmatched_backer_stake,
            "match_or_put"
        );
        self.match_or_put_inner(order, cross_matching, clear_virtual_orders)
    }

    fn match_or_put_inner(
        &mut self,
        mut order: Order,
        cross_matching: bool,
        clear_virtual_orders: bool,
    ) -> Vec<Match> {
        let mut matches = Vec::new();

        while order.unmatched_backer_stake > 0 {
            if clear_virtual_orders {
                self.clear_virtual_orders();
            }
            if cross_matching {
                self.generate_virtual_orders(&order);
            }

            let other_side_for_outcome = !order.for_outcome;
            let Some(making) = self.pop_best_executable_making_order(
                order.outcome_index,
                other_side_for_outcome,
                Some(order.price),
                order.for_outcome,
            ) else {
                // Exit reason 1: no executable liquidity left. Rest the residual.
                assert!(!order.completely_matched());
                self.put(order);
                if clear_virtual_orders {
                    self.clear_virtual_orders();
                }
                break;
            };

            matches.extend(self.match_against(&mut order, making));

            if order.completely_matched() {
                break;
            }
            // otherwise: order is only partially matched, loop again for the next level
        }

        if clear_virtual_orders {
            self.clear_virtual_orders();
        }
        matches
    }

    /// Executes a single match between `order` (taker) and `making`
    /// (resting order just popped from the book), returning every [`Match`]
    /// this produces including any recursive virtual-dual-order matches.
    ///
    /// Returns without looping back into the outer `while`: the caller
    /// decides whether to continue based on `order.completely_matched()`.
    fn match_against(&mut self, order: &mut Order, mut making: Order) -> Vec<Match> {
        assert!(
            !(order.is_virtual && making.is_virtual),
            "a virtual order must never match another virtual order"
        );
        if order.is_virtual {
            assert!(
                !order.partially_matched(),
                "a virtual order must never rest partially matched"
            );
        }
        if making.is_virtual {
            assert!(
                !making.partially_matched(),
                "a virtual order must never rest partially matched"
            );
        }

        let mut matches = Vec::new();

        if making.unmatched_backer_stake <= order.unmatched_backer_stake {
            // making is fully consumed; order may or may not be.
            let matched_backer_stake = making.unmatched_backer_stake;
            let m = Match::from_orders(order, &making, matched_backer_stake);
            trace!(?m, "match");
            making.unmatched_backer_stake = 0;
            order.unmatched_backer_stake -= matched_backer_stake;
            matches.push(m);

            if making.is_virtual {
                let vdos = self.take_virtual_dual_orders(order.outcome_index, order.for_outcome);
                for (_, vdo) in vdos {
                    matches.extend(self.match_or_put(vdo, false));
                }
            }
        } else {
            // order is fully consumed; making rests with leftover stake.
            let matched_backer_stake = order.unmatched_backer_stake;
            let m = Match::from_orders(order, &making, matched_backer_stake);
            trace!(?m, "match");
            making.unmatched_backer_stake -= matched_backer_stake;
            order.unmatched_backer_stake = 0;
            matches.push(m);

            if making.is_virtual {
                // §4.4 "partial": rescale each VDO to the liability the VMO
                // would have offset, then drive them to completion.
                let stake_times_price =
                    (making.backer_stake as f64 * making.price.as_f64()).floor();
                let vdos = self.take_virtual_dual_orders(order.outcome_index, order.for_outcome);
                for (_, mut vdo) in vdos {
                    let adjusted = (stake_times_price / vdo.price.as_f64()).floor() as u64;
                    vdo.unmatched_backer_stake = adjusted;
                    vdo.backer_stake = adjusted;
                    matches.extend(self.match_or_put(vdo, false));
                }
            } else {
                self.put(making);
            }
        }

        matches
    }

    /// Finds and removes the best executable making order on the given
    /// (outcome, side) for a taker at `taking_price` (`spec.md` §4.3 step 3–5).
    fn pop_best_executable_making_order(
        &mut self,
        outcome_index: OutcomeIndex,
        for_outcome: bool,
        taking_price: Option<Price>,
        taking_is_backing: bool,
    ) -> Option<Order> {
        let levels = self.orders_mut(outcome_index, for_outcome);
        let price = Self::find_best_executable_price(levels, taking_price, taking_is_backing)?;
        let queue = levels.get_mut(&price).expect("price came from this map");
        let order = queue.pop();
        if queue.empty() {
            levels.remove(&price);
        }
        order
    }

    /// `spec.md` §4.3 step 3: the best executable making price, or `None`
    /// if no non-empty, executable level exists.
    fn find_best_executable_price(
        levels: &PriceLevels,
        taking_price: Option<Price>,
        taking_is_backing: bool,
    ) -> Option<Price> {
        let is_executable = |price: Price| match taking_price {
            Some(tp) if taking_is_backing => price >= tp,
            Some(tp) => price <= tp,
            None => true,
        };
        let candidates = levels
            .iter()
            .filter(|(price, queue)| !queue.empty() && is_executable(**price))
            .map(|(price, _)| *price);
        if taking_is_backing {
            candidates.max()
        } else {
            candidates.min()
        }
    }

    /// Removes all virtual orders across the entire book (`spec.md` §4.3
    /// step 1, invariants 3 and 7). `spec.md` §9 notes this is O(book size)
    /// and that production implementations should track virtual orders
    /// separately instead; this engine keeps the straightforward sweep
    /// since correctness, not throughput, is the budget here.
    fn clear_virtual_orders(&mut self) {
        for side in [&mut self.bids_by_outcome, &mut self.offers_by_outcome] {
            for levels in side.iter_mut() {
                levels.retain(|_, queue| {
                    queue.clear_virtual_orders();
                    !queue.empty()
                });
            }
        }
    }

    /// Synthesises a virtual matching order and its virtual dual orders for
    /// `taking_order`, if sibling liquidity supports it (`spec.md` §4.4).
    fn generate_virtual_orders(&mut self, taking_order: &Order) {
        let i = taking_order.outcome_index;
        let s = taking_order.for_outcome;
        let vmo_for_outcome = !s;
        let real_side_for_outcome = s;

        let mut siblings: Vec<(OutcomeIndex, Price, u64)> = Vec::with_capacity(self.outcomes - 1);
        for j in 0..self.outcomes {
            if j == i {
                continue;
            }
            let levels = self.orders(j, real_side_for_outcome);
            let Some(price) =
                Self::find_best_executable_price(levels, None, vmo_for_outcome)
            else {
                debug!(outcome = j, "crossmatch synthesis aborted: no sibling liquidity");
                return;
            };
            let stake = levels
                .get(&price)
                .and_then(|q| q.peek())
                .expect("price came from this map")
                .unmatched_backer_stake;
            siblings.push((j, price, stake));
        }

        let implied_probabilities: Vec<f64> =
            siblings.iter().map(|(_, price, _)| price.implied_probability()).collect();
        let book_total: f64 = implied_probabilities.iter().sum();
        if book_total > 0.99 {
            debug!(book_total, "crossmatch synthesis aborted: book already >= 100%");
            return;
        }

        let vmo_price = Price::from_f64_round(1.0 / (1.0 - book_total));
        let vmo_stake_cap = siblings
            .iter()
            .map(|(_, price, stake)| price.as_f64() * (*stake as f64))
            .fold(f64::INFINITY, f64::min);
        let vmo_stake = (vmo_stake_cap / vmo_price.as_f64()).floor() as u64;
        if vmo_stake == 0 {
            debug!("crossmatch synthesis aborted: computed zero VMO stake");
            return;
        }

        self.put(Order::new_virtual(vmo_stake, vmo_price, i, vmo_for_outcome));
        for (j, price, _) in &siblings {
            let vdo_stake =
                ((vmo_stake as f64) * vmo_price.as_f64() / price.as_f64()).floor() as u64;
            self.put(Order::new_virtual(vdo_stake, *price, *j, vmo_for_outcome));
        }
    }

    /// Removes and returns the single virtual dual order resting on each
    /// sibling outcome `j ≠ taker_outcome_index`, on the side opposite the
    /// taker (`spec.md` §4.4 "VDO discovery").
    ///
    /// # Panics
    /// Panics if more than one virtual order is found at a single sibling
    /// outcome (invariant 7) or if a sibling is missing its VDO — both
    /// indicate the book is corrupt.
    fn take_virtual_dual_orders(
        &mut self,
        taker_outcome_index: OutcomeIndex,
        taker_for_outcome: bool,
    ) -> Vec<(OutcomeIndex, Order)> {
        let target_for_outcome = !taker_for_outcome;
        let mut found = Vec::with_capacity(self.outcomes - 1);

        for j in 0..self.outcomes {
            if j == taker_outcome_index {
                continue;
            }
            let levels = self.orders_mut(j, target_for_outcome);
            let mut at_this_outcome: Option<Order> = None;
            let mut emptied = Vec::new();
            for (&price, queue) in levels.iter_mut() {
                if let Some(vdo) = queue.take_virtual() {
                    assert!(
                        at_this_outcome.is_none(),
                        "invariant 7 violated: more than one virtual order at outcome {j}"
                    );
                    at_this_outcome = Some(vdo);
                }
                if queue.empty() {
                    emptied.push(price);
                }
            }
            for price in emptied {
                levels.remove(&price);
            }

            let vdo = at_this_outcome
                .unwrap_or_else(|| panic!("missing virtual dual order at outcome {j}"));
            assert_eq!(vdo.for_outcome, target_for_outcome);
            found.push((j, vdo));
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::Price;

    fn back(ob: &mut OrderBook, stake: u64, price: f64, outcome: usize) -> Vec<Match> {
        let o = Order::new_real(stake, Price::from_f64_round(price), outcome, true);
        ob.match_or_put(o, false)
    }
    fn lay(ob: &mut OrderBook, stake: u64, price: f64, outcome: usize) -> Vec<Match> {
        let o = Order::new_real(stake, Price::from_f64_round(price), outcome, false);
        ob.match_or_put(o, false)
    }

    // S1 — single match.
    #[test]
    fn single_match() {
        let mut ob = OrderBook::new(2).unwrap();
        let matches = back(&mut ob, 100, 2.0, 0);
        assert_eq!(matches.len(), 0);
        let matches = lay(&mut ob, 100, 2.0, 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_price, Price::from_x100(200));
        assert_eq!(matches[0].matched_backer_stake, 100);
    }

    // S2 — price improvement.
    #[test]
    fn price_improvement() {
        let mut ob = OrderBook::new(2).unwrap();
        assert_eq!(lay(&mut ob, 100, 1.5, 0).len(), 0);
        assert_eq!(lay(&mut ob, 100, 1.8, 0).len(), 0);
        let matches = back(&mut ob, 100, 1.4, 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_price, Price::from_x100(180));
        assert_eq!(matches[0].matched_backer_stake, 100);
        assert!(ob.offers(0).contains_key(&Price::from_x100(150)));
    }

    // S3 — walk the book.
    #[test]
    fn walks_the_book() {
        let mut ob = OrderBook::new(2).unwrap();
        assert_eq!(lay(&mut ob, 58, 1.8, 0).len(), 0);
        assert_eq!(lay(&mut ob, 100, 1.5, 0).len(), 0);
        let matches = back(&mut ob, 100, 1.4, 0);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].matched_price, Price::from_x100(180));
        assert_eq!(matches[0].matched_backer_stake, 58);
        assert_eq!(matches[1].matched_price, Price::from_x100(150));
        assert_eq!(matches[1].matched_backer_stake, 42);
        let remaining = ob.offers(0).get(&Price::from_x100(150)).unwrap();
        assert_eq!(remaining.peek().unwrap().unmatched_backer_stake, 58);
    }

    // S4 — no liquidity, no synthesis.
    #[test]
    fn no_liquidity_no_synthesis() {
        let mut ob = OrderBook::new(2).unwrap();
        let o = Order::new_real(100, Price::from_f64_round(2.5), 0, true);
        let matches = ob.match_or_put(o, true);
        assert_eq!(matches.len(), 0);
        assert!(ob.bids(0).contains_key(&Price::from_x100(250)));
    }

    // S5 — two-outcome crossmatch from bare sides.
    #[test]
    fn two_outcome_crossmatch() {
        let mut ob = OrderBook::new(2).unwrap();
        let rest = Order::new_real(100, Price::from_f64_round(5.0), 0, false);
        assert_eq!(ob.match_or_put(rest, true).len(), 0);

        let taker = Order::new_real(100, Price::from_f64_round(1.25), 1, false);
        let matches = ob.match_or_put(taker, true);
        assert_eq!(matches.len(), 2);
        let virtual_making = matches.iter().filter(|m| m.making_order_is_virtual).count();
        let virtual_taking = matches.iter().filter(|m| m.taking_order_is_virtual).count();
        assert_eq!(virtual_making, 1);
        assert_eq!(virtual_taking, 1);

        // no virtual order should remain resting anywhere afterwards
        for outcome in 0..2 {
            assert!(ob.bids(outcome).values().all(|q| q.get_virtual_orders().is_empty()));
            assert!(ob.offers(outcome).values().all(|q| q.get_virtual_orders().is_empty()));
        }
    }

    // S6 — Betfair three-way example.
    #[test]
    fn betfair_three_way_example() {
        let mut ob = OrderBook::new(3).unwrap();
        let newcastle = 0;
        let chelsea = 1;
        let draw = 2;

        let mut add = |price: f64, stake: u64, outcome: usize, for_outcome: bool| {
            let o = Order::new_real(stake, Price::from_f64_round(price), outcome, for_outcome);
            let matches = ob.match_or_put(o, true);
            assert!(matches.is_empty(), "expected book setup to produce no matches");
        };

        add(1000.0, 200, newcastle, true);
        add(15.0, 7500, newcastle, true);
        add(4.0, 12000, newcastle, true);
        add(2.0, 30000, newcastle, false);
        add(1.5, 20000, newcastle, false);
        add(1.01, 99900, newcastle, false);

        add(1000.0, 200, chelsea, true);
        add(20.0, 1000, chelsea, true);
        add(5.0, 15000, chelsea, true);
        add(3.0, 15000, chelsea, false);
        add(2.4, 25000, chelsea, false);
        add(1.01, 99900, chelsea, false);

        add(1000.0, 200, draw, true);
        add(50.0, 5000, draw, true);
        add(10.0, 10000, draw, true);
        add(5.0, 15000, draw, false);
        add(3.0, 25000, draw, false);
        add(1.01, 99900, draw, false);

        let big_lay_draw = Order::new_real(1_000_000, Price::from_f64_round(1000.0), draw, false);
        let matches = ob.match_or_put(big_lay_draw, true);

        assert_eq!(matches.len(), 5);

        assert_eq!(matches[0].matched_price, Price::from_x100(600));
        assert_eq!(matches[0].matched_backer_stake, 7500);
        assert!(matches[0].making_order_is_virtual);

        assert_eq!(matches[1].matched_price, Price::from_x100(1000));
        assert_eq!(matches[1].matched_backer_stake, 10000);
        assert!(!matches[1].making_order_is_virtual);

        assert_eq!(matches[2].matched_price, Price::from_x100(1200));
        assert_eq!(matches[2].matched_backer_stake, 1250);
        assert!(matches[2].making_order_is_virtual);

        assert_eq!(matches[3].matched_price, Price::from_x100(5000));
        assert_eq!(matches[3].matched_backer_stake, 5000);
        assert!(!matches[3].making_order_is_virtual);

        assert_eq!(matches[4].matched_price, Price::from_x100(100000));
        assert_eq!(matches[4].matched_backer_stake, 200);
        assert!(!matches[4].making_order_is_virtual);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rejects_out_of_range_outcome() {
        let mut ob = OrderBook::new(2).unwrap();
        let o = Order::new_real(100, Price::from_x100(200), 5, true);
        ob.match_or_put(o, false);
    }

    #[test]
    #[should_panic(expected = "virtual order must never be submitted")]
    fn rejects_crossmatch_on_virtual_order() {
        let mut ob = OrderBook::new(2).unwrap();
        let o = Order::new_virtual(100, Price::from_x100(200), 0, true);
        ob.match_or_put(o, true);
    }

    #[test]
    fn rejects_too_few_outcomes() {
        assert!(matches!(
            OrderBook::new(1),
            Err(EngineError::InvalidOutcomeCount(1))
        ));
    }
}

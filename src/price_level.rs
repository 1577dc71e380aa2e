//! [`PriceLevelQueue`]: time-priority FIFO of orders at one (outcome, side,
//! price) — `spec.md` §4.1.

use std::collections::VecDeque;

use crate::order::Order;

/// All orders — real and virtual — resting at a single (outcome, side,
/// price) triple, ordered strictly by `placed_time` ascending (oldest
/// first).
#[derive(Debug, Default)]
pub struct PriceLevelQueue {
    orders: VecDeque<Order>,
}

impl PriceLevelQueue {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
        }
    }

    /// Returns the oldest order without removing it.
    pub fn peek(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Removes and returns the oldest order.
    pub fn pop(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Inserts `order`, preserving ascending `placed_time` ordering.
    ///
    /// This also covers re-queueing a partially matched maker
    /// (`spec.md` §4.3 step 8): the order keeps its original
    /// `placed_time`, so inserting it here puts it back at the head of the
    /// queue, exactly where it was before it was popped.
    pub fn put(&mut self, order: Order) {
        let position = self
            .orders
            .partition_point(|o| o.placed_time <= order.placed_time);
        self.orders.insert(position, order);
    }

    pub fn empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Every virtual order currently at this level (invariant 7: at most one).
    pub fn get_virtual_orders(&self) -> Vec<&Order> {
        self.orders.iter().filter(|o| o.is_virtual).collect()
    }

    /// Removes all virtual orders, leaving the rest in their existing order.
    pub fn clear_virtual_orders(&mut self) {
        self.orders.retain(|o| !o.is_virtual);
    }

    /// Removes and returns the virtual order at this level, if any.
    /// Invariant 7 guarantees there is at most one.
    pub fn take_virtual(&mut self) -> Option<Order> {
        let position = self.orders.iter().position(|o| o.is_virtual)?;
        self.orders.remove(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

//! Pending-order queue with per-tick rate limiting.

use super::Order;
use std::collections::VecDeque;
use tracing::debug;

/// FIFO queue of pending orders drained in rate-limited batches.
///
/// Each drain tick removes at most `rate_limit` orders from the head,
/// oldest first, which keeps dispatch fair across instruments. The usage
/// gauge reports how many orders the last tick dispatched and resets to
/// zero on a tick that finds an empty queue.
#[derive(Debug)]
pub struct OrderScheduler {
    queue: VecDeque<Order>,
    rate_limit: usize,
    usage: usize,
}

impl OrderScheduler {
    pub fn new(rate_limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            rate_limit,
            usage: 0,
        }
    }

    /// Append an order to the tail of the pending queue.
    pub fn enqueue(&mut self, order: Order) {
        debug!(
            order_id = order.id,
            instrument = %order.instrument_id,
            side = ?order.side,
            quantity = order.quantity,
            depth = self.queue.len() + 1,
            "Order queued"
        );
        self.queue.push_back(order);
    }

    /// Drain up to `rate_limit` orders for dispatch.
    ///
    /// Orders left behind stay pending for the next tick.
    pub fn drain_tick(&mut self) -> Vec<Order> {
        let count = self.queue.len().min(self.rate_limit);
        let batch: Vec<Order> = self.queue.drain(..count).collect();
        self.usage = batch.len();
        batch
    }

    /// Orders dispatched by the most recent tick.
    pub fn usage(&self) -> usize {
        self.usage
    }

    /// Orders still pending.
    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Order> {
        self.queue.iter()
    }

    /// Drop all pending orders without settling them (engine reset/stop).
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.usage = 0;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::OrderSide;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: u64) -> Order {
        Order {
            id,
            side: OrderSide::Buy,
            instrument_id: "A005930".into(),
            limit_price: dec!(75000),
            quantity: 1,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_drain_respects_rate_limit() {
        let mut scheduler = OrderScheduler::new(5);
        for id in 0..12 {
            scheduler.enqueue(order(id));
        }

        assert_eq!(scheduler.drain_tick().len(), 5);
        assert_eq!(scheduler.usage(), 5);
        assert_eq!(scheduler.depth(), 7);

        assert_eq!(scheduler.drain_tick().len(), 5);
        assert_eq!(scheduler.depth(), 2);

        assert_eq!(scheduler.drain_tick().len(), 2);
        assert_eq!(scheduler.usage(), 2);
        assert_eq!(scheduler.depth(), 0);
    }

    #[test]
    fn test_drain_preserves_fifo_order() {
        let mut scheduler = OrderScheduler::new(3);
        for id in 0..5 {
            scheduler.enqueue(order(id));
        }

        let first = scheduler.drain_tick();
        assert_eq!(first.iter().map(|o| o.id).collect::<Vec<_>>(), vec![0, 1, 2]);

        let second = scheduler.drain_tick();
        assert_eq!(second.iter().map(|o| o.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_usage_resets_on_empty_tick() {
        let mut scheduler = OrderScheduler::new(5);
        scheduler.enqueue(order(1));
        scheduler.drain_tick();
        assert_eq!(scheduler.usage(), 1);

        scheduler.drain_tick();
        assert_eq!(scheduler.usage(), 0);
    }

    #[test]
    fn test_clear_drops_pending_without_dispatch() {
        let mut scheduler = OrderScheduler::new(5);
        for id in 0..4 {
            scheduler.enqueue(order(id));
        }

        assert_eq!(scheduler.clear(), 4);
        assert_eq!(scheduler.depth(), 0);
        assert_eq!(scheduler.usage(), 0);
        assert!(scheduler.drain_tick().is_empty());
    }
}

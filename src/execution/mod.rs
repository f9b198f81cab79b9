//! Order types and the rate-limited submission queue.
//!
//! Orders are short-lived: created by the strategy, queued, dispatched in
//! rate-limited batches, then settled or rejected exactly once. The
//! scheduler is a pure FIFO queue; settlement latency lives in the engine.

mod order;
mod scheduler;

pub use order::{Order, OrderRequest, OrderSide};
pub use scheduler::OrderScheduler;

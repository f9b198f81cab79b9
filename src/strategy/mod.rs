//! Multi-strategy portfolio allocation.
//!
//! Three independent sleeves (macro regime-switching, quality/value,
//! breakout momentum) each select an eligibility pool and spread their
//! share of the blended weight evenly across it. The evaluator diffs the
//! blended targets against current holdings and emits orders where the gap
//! exceeds the rebalance threshold.

mod evaluator;
mod sleeves;

pub use evaluator::{evaluate, target_weights};
pub use sleeves::{breakout_pool, macro_pool, quality_pool};

//! Order data types.

use crate::market::InstrumentId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A submitted order. Never mutated in place; the scheduler removes it from
/// the queue when dispatching for settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: u64,
    pub side: OrderSide,
    pub instrument_id: InstrumentId,
    /// Price at submission time; settlement fills at this price (no re-quote).
    pub limit_price: Decimal,
    pub quantity: u64,
    pub submitted_at: DateTime<Utc>,
}

/// An order the strategy wants placed, before an id and timestamp are
/// assigned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub instrument_id: InstrumentId,
    pub side: OrderSide,
    pub limit_price: Decimal,
    pub quantity: u64,
}

impl OrderRequest {
    /// Promote the request into a queued order.
    pub fn into_order(self, id: u64) -> Order {
        Order {
            id,
            side: self.side,
            instrument_id: self.instrument_id,
            limit_price: self.limit_price,
            quantity: self.quantity,
            submitted_at: Utc::now(),
        }
    }
}

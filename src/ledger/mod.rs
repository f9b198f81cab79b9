//! Cash and holdings accounting.
//!
//! The ledger is the single source of truth for settled positions. Fills are
//! applied atomically: a rejected fill mutates nothing, and a successful fill
//! updates cash and the affected holding in one step. Two invariants hold for
//! every reachable state: cash never goes negative (margin check) and no
//! holding ever goes negative (no naked shorting).

use crate::execution::{Order, OrderSide};
use crate::market::InstrumentId;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// A settled position in one instrument. Exists only while `shares > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub shares: u64,
    pub avg_cost: Decimal,
}

/// Result of a successfully applied fill.
#[derive(Debug, Clone)]
pub struct Fill {
    pub order_id: u64,
    pub side: OrderSide,
    pub instrument_id: InstrumentId,
    pub quantity: u64,
    pub fill_price: Decimal,
    pub cash_after: Decimal,
}

/// Terminal rejection reasons. A rejected order is discarded, never retried;
/// the next evaluation cycle re-derives whether a gap still exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FillError {
    #[error("insufficient margin: required {required}, available {available}")]
    InsufficientMargin {
        required: Decimal,
        available: Decimal,
    },
    #[error("naked short blocked: tried to sell {requested} with {held} held")]
    NakedShortBlocked { requested: u64, held: u64 },
}

/// Cash balance plus per-instrument holdings.
#[derive(Debug, Clone)]
pub struct Ledger {
    cash: Decimal,
    holdings: HashMap<InstrumentId, Holding>,
}

impl Ledger {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            cash: initial_cash,
            holdings: HashMap::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn holdings(&self) -> &HashMap<InstrumentId, Holding> {
        &self.holdings
    }

    /// Settled share count for an instrument, zero if not held.
    pub fn position(&self, instrument_id: &str) -> u64 {
        self.holdings.get(instrument_id).map_or(0, |h| h.shares)
    }

    /// Apply an order fill at the given price.
    ///
    /// BUY deducts cash and folds the cost into the weighted-average cost of
    /// the holding; SELL credits cash and reduces the holding, removing the
    /// entry when shares reach exactly zero. Rejections leave the ledger
    /// untouched.
    pub fn apply_fill(&mut self, order: &Order, fill_price: Decimal) -> Result<Fill, FillError> {
        let quantity_dec = Decimal::from(order.quantity);

        match order.side {
            OrderSide::Buy => {
                let cost = fill_price * quantity_dec;
                if self.cash < cost {
                    return Err(FillError::InsufficientMargin {
                        required: cost,
                        available: self.cash,
                    });
                }

                self.cash -= cost;
                let holding = self
                    .holdings
                    .entry(order.instrument_id.clone())
                    .or_insert(Holding {
                        shares: 0,
                        avg_cost: Decimal::ZERO,
                    });
                let old_basis = Decimal::from(holding.shares) * holding.avg_cost;
                holding.shares += order.quantity;
                holding.avg_cost = (old_basis + cost) / Decimal::from(holding.shares);
            }
            OrderSide::Sell => {
                let held = self.position(&order.instrument_id);
                if held < order.quantity {
                    return Err(FillError::NakedShortBlocked {
                        requested: order.quantity,
                        held,
                    });
                }

                self.cash += fill_price * quantity_dec;
                let remaining = held - order.quantity;
                if remaining == 0 {
                    self.holdings.remove(&order.instrument_id);
                } else if let Some(holding) = self.holdings.get_mut(&order.instrument_id) {
                    holding.shares = remaining;
                }
            }
        }

        debug!(
            order_id = order.id,
            instrument = %order.instrument_id,
            side = ?order.side,
            quantity = order.quantity,
            price = %fill_price,
            cash = %self.cash,
            "Fill applied"
        );

        Ok(Fill {
            order_id: order.id,
            side: order.side,
            instrument_id: order.instrument_id.clone(),
            quantity: order.quantity,
            fill_price,
            cash_after: self.cash,
        })
    }

    /// Total asset value: cash plus the mark-to-market value of every
    /// holding. Instruments without a live price contribute zero.
    pub fn total_assets(&self, price_of: impl Fn(&str) -> Option<Decimal>) -> Decimal {
        self.cash
            + self
                .holdings
                .iter()
                .map(|(id, holding)| {
                    price_of(id).unwrap_or(Decimal::ZERO) * Decimal::from(holding.shares)
                })
                .sum::<Decimal>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn order(id: u64, side: OrderSide, instrument: &str, price: Decimal, quantity: u64) -> Order {
        Order {
            id,
            side,
            instrument_id: instrument.to_string(),
            limit_price: price,
            quantity,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_buy_deducts_cash_and_creates_holding() {
        let mut ledger = Ledger::new(dec!(1_000_000));
        let fill = ledger
            .apply_fill(&order(1, OrderSide::Buy, "A005930", dec!(75000), 10), dec!(75000))
            .unwrap();

        assert_eq!(fill.cash_after, dec!(250_000));
        assert_eq!(ledger.cash(), dec!(250_000));
        assert_eq!(ledger.position("A005930"), 10);
        assert_eq!(ledger.holdings()["A005930"].avg_cost, dec!(75000));
    }

    #[test]
    fn test_buy_weighted_average_cost() {
        let mut ledger = Ledger::new(dec!(10_000_000));
        ledger
            .apply_fill(&order(1, OrderSide::Buy, "X", dec!(100), 100), dec!(100))
            .unwrap();
        ledger
            .apply_fill(&order(2, OrderSide::Buy, "X", dec!(200), 100), dec!(200))
            .unwrap();

        // (100×100 + 100×200) / 200 = 150
        assert_eq!(ledger.holdings()["X"].avg_cost, dec!(150));
        assert_eq!(ledger.position("X"), 200);
    }

    #[test]
    fn test_insufficient_margin_leaves_ledger_unchanged() {
        let mut ledger = Ledger::new(dec!(1000));
        let err = ledger
            .apply_fill(&order(1, OrderSide::Buy, "X", dec!(500), 3), dec!(500))
            .unwrap_err();

        assert_eq!(
            err,
            FillError::InsufficientMargin {
                required: dec!(1500),
                available: dec!(1000),
            }
        );
        assert_eq!(ledger.cash(), dec!(1000));
        assert!(ledger.holdings().is_empty());
    }

    #[test]
    fn test_naked_short_blocked_leaves_ledger_unchanged() {
        let mut ledger = Ledger::new(dec!(10_000));
        ledger
            .apply_fill(&order(1, OrderSide::Buy, "X", dec!(100), 5), dec!(100))
            .unwrap();

        let err = ledger
            .apply_fill(&order(2, OrderSide::Sell, "X", dec!(100), 6), dec!(100))
            .unwrap_err();

        assert_eq!(
            err,
            FillError::NakedShortBlocked {
                requested: 6,
                held: 5,
            }
        );
        assert_eq!(ledger.cash(), dec!(9500));
        assert_eq!(ledger.position("X"), 5);
    }

    #[test]
    fn test_sell_to_zero_removes_holding() {
        let mut ledger = Ledger::new(dec!(10_000));
        ledger
            .apply_fill(&order(1, OrderSide::Buy, "X", dec!(100), 5), dec!(100))
            .unwrap();
        ledger
            .apply_fill(&order(2, OrderSide::Sell, "X", dec!(120), 5), dec!(120))
            .unwrap();

        assert!(!ledger.holdings().contains_key("X"));
        assert_eq!(ledger.cash(), dec!(10_100));
    }

    #[test]
    fn test_sell_never_touches_other_holdings() {
        let mut ledger = Ledger::new(dec!(100_000));
        ledger
            .apply_fill(&order(1, OrderSide::Buy, "X", dec!(100), 10), dec!(100))
            .unwrap();
        ledger
            .apply_fill(&order(2, OrderSide::Buy, "Y", dec!(200), 10), dec!(200))
            .unwrap();
        ledger
            .apply_fill(&order(3, OrderSide::Sell, "X", dec!(110), 4), dec!(110))
            .unwrap();

        assert_eq!(ledger.position("X"), 6);
        assert_eq!(ledger.position("Y"), 10);
        assert_eq!(ledger.holdings()["Y"].avg_cost, dec!(200));
    }

    #[test]
    fn test_total_assets_missing_price_contributes_zero() {
        let mut ledger = Ledger::new(dec!(10_000));
        ledger
            .apply_fill(&order(1, OrderSide::Buy, "X", dec!(100), 10), dec!(100))
            .unwrap();

        let total = ledger.total_assets(|_| None);
        assert_eq!(total, dec!(9000));

        let total = ledger.total_assets(|id| (id == "X").then_some(dec!(150)));
        assert_eq!(total, dec!(10_500));
    }

    proptest! {
        /// For any sequence of fills, cash and shares never go negative and
        /// rejected fills change nothing.
        #[test]
        fn prop_invariants_hold_over_random_fill_sequences(
            fills in prop::collection::vec(
                (prop::bool::ANY, 0..4usize, 1..500u64, 1..200u64),
                1..60,
            )
        ) {
            let instruments = ["A", "B", "C", "D"];
            let mut ledger = Ledger::new(dec!(100_000));

            for (i, (is_buy, idx, price, quantity)) in fills.into_iter().enumerate() {
                let side = if is_buy { OrderSide::Buy } else { OrderSide::Sell };
                let price = Decimal::from(price);
                let o = order(i as u64, side, instruments[idx], price, quantity);

                let cash_before = ledger.cash();
                let holdings_before = ledger.holdings().clone();

                match ledger.apply_fill(&o, price) {
                    Ok(_) => {}
                    Err(_) => {
                        prop_assert_eq!(ledger.cash(), cash_before);
                        prop_assert_eq!(ledger.holdings(), &holdings_before);
                    }
                }

                prop_assert!(ledger.cash() >= Decimal::ZERO);
                for holding in ledger.holdings().values() {
                    prop_assert!(holding.shares > 0);
                }
            }
        }
    }
}

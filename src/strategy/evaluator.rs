//! Blended target-weight evaluation and order emission.

use super::{breakout_pool, macro_pool, quality_pool};
use crate::config::AllocationConfig;
use crate::execution::{OrderRequest, OrderSide};
use crate::ledger::Ledger;
use crate::market::{Instrument, InstrumentId};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// Compute the blended target weight for every instrument in the universe.
///
/// Each sleeve distributes its normalized share (`weight / total_weight`)
/// evenly across its eligibility pool; contributions are additive per
/// instrument. Weights are not renormalized across the universe: when a
/// sleeve's pool is empty its share is simply absent from the blend. An
/// all-zero weight set yields an empty map (recognized no-op).
pub fn target_weights(
    universe: &[Instrument],
    vix: Decimal,
    vix_cutoff: Decimal,
    config: &AllocationConfig,
) -> HashMap<InstrumentId, Decimal> {
    let total_weight = config.total_weight();
    if total_weight == Decimal::ZERO {
        debug!("All sleeve weights zero, skipping evaluation");
        return HashMap::new();
    }

    let mut weights: HashMap<InstrumentId, Decimal> = universe
        .iter()
        .map(|i| (i.id.clone(), Decimal::ZERO))
        .collect();

    let sleeves: [(Decimal, Vec<&Instrument>); 3] = [
        (config.weight_macro, macro_pool(universe, vix, vix_cutoff)),
        (config.weight_quality, quality_pool(universe)),
        (config.weight_breakout, breakout_pool(universe)),
    ];

    for (weight, pool) in sleeves {
        if weight == Decimal::ZERO || pool.is_empty() {
            continue;
        }
        let per_instrument = weight / total_weight / Decimal::from(pool.len());
        for instrument in pool {
            if let Some(w) = weights.get_mut(&instrument.id) {
                *w += per_instrument;
            }
        }
    }

    weights
}

/// Diff blended targets against current holdings and emit rebalance orders.
///
/// `target_shares = floor(total_assets × weight / price)`. An order is
/// emitted when the monetary gap exceeds `threshold`, or unconditionally as
/// a full liquidation when the target drops to zero while shares are still
/// held. Deterministic for fixed inputs: emission follows universe order.
pub fn evaluate(
    universe: &[Instrument],
    vix: Decimal,
    vix_cutoff: Decimal,
    ledger: &Ledger,
    config: &AllocationConfig,
    threshold: Decimal,
) -> Vec<OrderRequest> {
    let weights = target_weights(universe, vix, vix_cutoff, config);
    if weights.is_empty() {
        return Vec::new();
    }

    let total_assets = ledger.total_assets(|id| {
        universe
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.price)
    });

    let mut requests = Vec::new();
    for instrument in universe {
        if instrument.price <= Decimal::ZERO {
            continue;
        }

        let weight = weights
            .get(&instrument.id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let target_value = total_assets * weight;
        let target_shares = (target_value / instrument.price)
            .floor()
            .to_i64()
            .unwrap_or(0)
            .max(0);
        let current_shares = ledger.position(&instrument.id) as i64;

        let gap_shares = target_shares - current_shares;
        let gap_value = Decimal::from(gap_shares.unsigned_abs()) * instrument.price;

        // Full liquidation overrides the minimum-gap filter: a position that
        // dropped out of every sleeve must be closed regardless of size.
        let force_liquidation = target_shares == 0 && current_shares > 0;
        if gap_value <= threshold && !force_liquidation {
            continue;
        }

        let (side, quantity) = match gap_shares {
            d if d > 0 => (OrderSide::Buy, d as u64),
            d if d < 0 => (OrderSide::Sell, d.unsigned_abs()),
            _ => continue,
        };

        debug!(
            instrument = %instrument.id,
            target_shares,
            current_shares,
            gap_value = %gap_value,
            side = ?side,
            "Rebalance gap"
        );

        requests.push(OrderRequest {
            instrument_id: instrument.id.clone(),
            side,
            limit_price: instrument.price,
            quantity,
        });
    }

    requests
}

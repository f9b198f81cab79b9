//! Sleeve eligibility pools.
//!
//! Each sleeve is a pure filter over the universe. An empty pool simply
//! contributes no weight; the sleeve's share is lost, not redistributed.

use crate::market::{AssetClass, Instrument, Sector};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Macro regime-switching sleeve.
///
/// Above the VIX cutoff the sleeve rotates into safe-haven sectors (bonds
/// and hedges); below it, into equities.
pub fn macro_pool(universe: &[Instrument], vix: Decimal, cutoff: Decimal) -> Vec<&Instrument> {
    if vix > cutoff {
        universe
            .iter()
            .filter(|i| i.sector == Sector::Bond || i.sector == Sector::Hedge)
            .collect()
    } else {
        universe
            .iter()
            .filter(|i| i.class == AssetClass::Equity)
            .collect()
    }
}

/// Quality/value sleeve: cheap equities by book and earnings multiples.
///
/// Instruments without applicable valuation ratios (per/pbr encoded as 0)
/// are excluded outright so funds can never pass the value filter.
pub fn quality_pool(universe: &[Instrument]) -> Vec<&Instrument> {
    universe
        .iter()
        .filter(|i| {
            i.class == AssetClass::Equity
                && i.has_valuation_ratios()
                && i.pbr < Decimal::ONE
                && i.per < dec!(10)
        })
        .collect()
}

/// Breakout momentum sleeve: aggressive, higher-risk instruments.
pub fn breakout_pool(universe: &[Instrument]) -> Vec<&Instrument> {
    universe
        .iter()
        .filter(|i| i.risk_grade <= 3 && i.sector != Sector::Bond)
        .collect()
}

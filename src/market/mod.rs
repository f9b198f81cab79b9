//! Market universe types and the tick feed interface.
//!
//! The engine treats the feed as an opaque source of periodic price/VIX
//! snapshots; `RandomWalkFeed` is the bundled simulation of one.

mod feed;

pub use feed::{MarketFeed, RandomWalkFeed};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exchange-style instrument identifier (e.g., "A005930").
pub type InstrumentId = String;

/// Industry sector used by the sleeve eligibility filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sector {
    It,
    Auto,
    Bond,
    Commodity,
    Hedge,
}

/// Asset class of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Fund,
}

/// A tradable instrument with its latest quoted price.
///
/// Identity is immutable; only `price` changes, and only via market ticks.
/// Valuation ratios of zero (or below) mean "not applicable" - funds carry
/// no PER/PBR and must not pass value filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub name: String,
    pub price: Decimal,
    pub per: Decimal,
    pub pbr: Decimal,
    /// Exchange risk classification, 1 (highest risk) to 5 (safest).
    pub risk_grade: u8,
    pub sector: Sector,
    pub class: AssetClass,
}

impl Instrument {
    /// Whether the valuation ratios are populated and usable for filtering.
    pub fn has_valuation_ratios(&self) -> bool {
        self.per > Decimal::ZERO && self.pbr > Decimal::ZERO
    }
}

/// A point-in-time view of the market: latest prices plus the macro
/// volatility indicator.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub prices: HashMap<InstrumentId, Decimal>,
    pub vix: Decimal,
}

/// The default five-instrument KRX universe used by the simulator.
pub fn default_krx_universe() -> Vec<Instrument> {
    use rust_decimal_macros::dec;

    vec![
        Instrument {
            id: "A005930".into(),
            name: "Samsung Electronics".into(),
            price: dec!(75000),
            per: dec!(14.5),
            pbr: dec!(1.3),
            risk_grade: 3,
            sector: Sector::It,
            class: AssetClass::Equity,
        },
        Instrument {
            id: "A005380".into(),
            name: "Hyundai Motor".into(),
            price: dec!(240000),
            per: dec!(5.2),
            pbr: dec!(0.6),
            risk_grade: 3,
            sector: Sector::Auto,
            class: AssetClass::Equity,
        },
        Instrument {
            id: "A148070".into(),
            name: "KTB 10Y Active".into(),
            price: dec!(105000),
            per: Decimal::ZERO,
            pbr: Decimal::ZERO,
            risk_grade: 5,
            sector: Sector::Bond,
            class: AssetClass::Fund,
        },
        Instrument {
            id: "A130680".into(),
            name: "WTI Crude Futures".into(),
            price: dec!(18000),
            per: Decimal::ZERO,
            pbr: Decimal::ZERO,
            risk_grade: 1,
            sector: Sector::Commodity,
            class: AssetClass::Fund,
        },
        Instrument {
            id: "A114800".into(),
            name: "KODEX Inverse".into(),
            price: dec!(4200),
            per: Decimal::ZERO,
            pbr: Decimal::ZERO,
            risk_grade: 2,
            sector: Sector::Hedge,
            class: AssetClass::Fund,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_universe_shape() {
        let universe = default_krx_universe();
        assert_eq!(universe.len(), 5);
        assert!(universe.iter().any(|i| i.sector == Sector::Bond));
        assert!(universe.iter().any(|i| i.sector == Sector::Hedge));
        assert_eq!(
            universe
                .iter()
                .filter(|i| i.class == AssetClass::Equity)
                .count(),
            2
        );
    }

    #[test]
    fn test_valuation_ratios_not_applicable_for_funds() {
        let universe = default_krx_universe();
        for instrument in &universe {
            match instrument.class {
                AssetClass::Equity => assert!(instrument.has_valuation_ratios()),
                AssetClass::Fund => assert!(!instrument.has_valuation_ratios()),
            }
        }
    }
}

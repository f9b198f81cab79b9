//! Configuration management for the trading engine.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sleeve weights for the multi-strategy blend
    #[serde(default)]
    pub allocation: AllocationConfig,
    /// Order queue and settlement parameters
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Market feed and evaluation-cycle parameters
    #[serde(default)]
    pub market: MarketConfig,
}

/// Weights for the three strategy sleeves.
///
/// Weights need not sum to 100; they are normalized by their own sum at
/// evaluation time. All-zero weights make every evaluation cycle a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Macro regime-switching sleeve (risk-off into bonds/hedges)
    #[serde(default = "default_weight_macro")]
    pub weight_macro: Decimal,
    /// Value sleeve (low PBR, low PER equities)
    #[serde(default = "default_weight_quality")]
    pub weight_quality: Decimal,
    /// Breakout momentum sleeve (aggressive, high-risk instruments)
    #[serde(default = "default_weight_breakout")]
    pub weight_breakout: Decimal,
}

impl AllocationConfig {
    pub fn total_weight(&self) -> Decimal {
        self.weight_macro + self.weight_quality + self.weight_breakout
    }

    /// Negative weights are malformed and must never reach the evaluator.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.weight_macro >= Decimal::ZERO
                && self.weight_quality >= Decimal::ZERO
                && self.weight_breakout >= Decimal::ZERO,
            "sleeve weights must be non-negative"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum orders dispatched per drain tick (broker API rate limit)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    /// Period of the queue-drain tick in milliseconds
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,
    /// Simulated settlement latency from dispatch, in milliseconds
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
    /// Minimum KRW gap between target and current position to trigger an
    /// order; avoids churn from tiny deviations
    #[serde(default = "default_rebalance_threshold")]
    pub rebalance_threshold: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Starting cash balance in KRW
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,
    /// Period of the market/strategy evaluation cycle in milliseconds
    #[serde(default = "default_eval_interval_ms")]
    pub eval_interval_ms: u64,
    /// VIX level above which the macro sleeve rotates into bonds/hedges
    #[serde(default = "default_vix_risk_cutoff")]
    pub vix_risk_cutoff: Decimal,
    /// Starting VIX level for the simulated feed
    #[serde(default = "default_initial_vix")]
    pub initial_vix: Decimal,
    /// Length of the rolling portfolio-value history
    #[serde(default = "default_history_length")]
    pub history_length: usize,
}

// Default value functions
fn default_weight_macro() -> Decimal {
    Decimal::new(40, 0)
}

fn default_weight_quality() -> Decimal {
    Decimal::new(30, 0)
}

fn default_weight_breakout() -> Decimal {
    Decimal::new(30, 0)
}

fn default_rate_limit() -> usize {
    5 // KRX broker APIs commonly cap at 5 calls per second
}

fn default_drain_interval_ms() -> u64 {
    1000
}

fn default_settlement_delay_ms() -> u64 {
    230 // mandated per-call wait observed on Kiwoom's API
}

fn default_rebalance_threshold() -> Decimal {
    Decimal::new(500_000, 0) // KRW 500k minimum gap
}

fn default_initial_cash() -> Decimal {
    Decimal::new(100_000_000, 0) // KRW 100M testbed account
}

fn default_eval_interval_ms() -> u64 {
    2000
}

fn default_vix_risk_cutoff() -> Decimal {
    Decimal::new(20, 0)
}

fn default_initial_vix() -> Decimal {
    Decimal::new(152, 1) // 15.2
}

fn default_history_length() -> usize {
    50
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("QUANT"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.allocation.validate()?;

        anyhow::ensure!(self.execution.rate_limit > 0, "rate_limit must be positive");

        anyhow::ensure!(
            self.execution.drain_interval_ms > 0 && self.market.eval_interval_ms > 0,
            "tick intervals must be positive"
        );

        anyhow::ensure!(
            self.execution.rebalance_threshold >= Decimal::ZERO,
            "rebalance_threshold must be non-negative"
        );

        anyhow::ensure!(
            self.market.initial_cash >= Decimal::ZERO,
            "initial_cash must be non-negative"
        );

        anyhow::ensure!(
            self.market.history_length > 0,
            "history_length must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allocation: AllocationConfig::default(),
            execution: ExecutionConfig::default(),
            market: MarketConfig::default(),
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            weight_macro: default_weight_macro(),
            weight_quality: default_weight_quality(),
            weight_breakout: default_weight_breakout(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            drain_interval_ms: default_drain_interval_ms(),
            settlement_delay_ms: default_settlement_delay_ms(),
            rebalance_threshold: default_rebalance_threshold(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            eval_interval_ms: default_eval_interval_ms(),
            vix_risk_cutoff: default_vix_risk_cutoff(),
            initial_vix: default_initial_vix(),
            history_length: default_history_length(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = Config::default();
        config.allocation.weight_quality = dec!(-10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_all_zero_weights_are_valid_config() {
        // All-zero weights are a recognized no-op, not a config error.
        let mut config = Config::default();
        config.allocation.weight_macro = Decimal::ZERO;
        config.allocation.weight_quality = Decimal::ZERO;
        config.allocation.weight_breakout = Decimal::ZERO;
        assert!(config.validate().is_ok());
        assert_eq!(config.allocation.total_weight(), Decimal::ZERO);
    }
}

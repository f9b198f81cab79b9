//! # Quant Core
//!
//! A simulated automated trading engine for KRX instruments: market ticks
//! feed a multi-strategy allocation model, allocation gaps become orders,
//! and orders settle through a rate-limited, latency-delayed execution
//! pipeline against a cash/holdings ledger.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `market`: Instrument universe, snapshots, and the simulated tick feed
//! - `ledger`: Cash/holdings accounting with margin and short-sale invariants
//! - `execution`: FIFO order queue with per-tick rate limiting
//! - `strategy`: Sleeve pools and blended target-weight evaluation
//! - `engine`: Single-owner actor wiring feed, strategy, queue, and ledger

pub mod config;
pub mod engine;
pub mod execution;
pub mod ledger;
pub mod market;
pub mod strategy;

pub use config::Config;

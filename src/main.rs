//! Quant Core - Main Entry Point
//!
//! Runs the simulated trading engine against the random-walk KRX feed and
//! mirrors engine events into the audit log.

use anyhow::Result;
use clap::Parser;
use quant_core::config::Config;
use quant_core::engine::{Engine, EngineEvent};
use quant_core::market::{default_krx_universe, RandomWalkFeed};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Quant Core CLI
#[derive(Parser)]
#[command(name = "quant-core")]
#[command(version, about = "Multi-strategy allocation and execution engine simulator")]
struct Cli {
    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(short, long)]
    duration_secs: Option<u64>,

    /// Seed for the random-walk market feed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Override the starting cash balance in KRW
    #[arg(short, long)]
    cash: Option<Decimal>,

    /// Print the final engine state as JSON on exit
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let mut config = Config::load()?;
    if let Some(cash) = cli.cash {
        config.market.initial_cash = cash;
    }
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        initial_cash = %config.market.initial_cash,
        weight_macro = %config.allocation.weight_macro,
        weight_quality = %config.allocation.weight_quality,
        weight_breakout = %config.allocation.weight_breakout,
        rate_limit = config.execution.rate_limit,
        "Starting quant-core simulator"
    );

    let universe = default_krx_universe();
    for instrument in &universe {
        info!(
            id = %instrument.id,
            name = %instrument.name,
            price = %instrument.price,
            sector = ?instrument.sector,
            risk_grade = instrument.risk_grade,
            "Universe member"
        );
    }

    let feed = RandomWalkFeed::new(&universe, config.market.initial_vix, cli.seed);
    let mut engine = Engine::new(config, universe);
    let mut events = engine.subscribe();

    // Mirror engine events into the audit log; the engine never blocks on us.
    let audit = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::OrderSubmitted { order }) => info!(
                    order_id = order.id,
                    instrument = %order.instrument_id,
                    side = ?order.side,
                    quantity = order.quantity,
                    "AUDIT order queued"
                ),
                Ok(EngineEvent::OrderSettled { fill }) => info!(
                    order_id = fill.order_id,
                    instrument = %fill.instrument_id,
                    side = ?fill.side,
                    quantity = fill.quantity,
                    price = %fill.fill_price,
                    cash = %fill.cash_after,
                    "AUDIT fill settled"
                ),
                Ok(EngineEvent::OrderRejected { order, reason }) => warn!(
                    order_id = order.id,
                    instrument = %order.instrument_id,
                    %reason,
                    "AUDIT order rejected"
                ),
                Ok(EngineEvent::TickUsage { dispatched, pending }) => {
                    if dispatched > 0 || pending > 0 {
                        info!(dispatched, pending, "AUDIT api usage");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Audit log lagged behind engine events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    engine
        .start(feed)
        .map_err(|e| anyhow::anyhow!("failed to start engine: {e}"))?;

    match cli.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "Run duration elapsed");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = engine.stop().await {
        error!(error = %e, "Engine stop failed");
    }
    audit.abort();

    let state = engine
        .state()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read final state: {e}"))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        info!(
            cash = %state.cash,
            total_assets = %state.total_assets,
            positions = state.holdings.len(),
            vix = %state.vix,
            "Final portfolio state"
        );
        for (id, holding) in &state.holdings {
            info!(
                instrument = %id,
                shares = holding.shares,
                avg_cost = %holding.avg_cost,
                "Final position"
            );
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

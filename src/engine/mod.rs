//! The trading engine actor.
//!
//! All shared mutable state (ledger, pending-order queue, live prices,
//! portfolio history) is owned by a single task. Two periodic drivers feed
//! it: the market/evaluation cycle pulls snapshots from the feed, and the
//! queue-drain cycle dispatches rate-limited order batches. Settlement
//! timers never touch state directly; they post `Settle` messages back into
//! the owner's mailbox, so concurrent fills serialize and can never lose an
//! update.

use crate::config::{AllocationConfig, Config};
use crate::execution::{Order, OrderScheduler};
use crate::ledger::{Fill, FillError, Holding, Ledger};
use crate::market::{Instrument, InstrumentId, MarketFeed, MarketSnapshot};
use crate::strategy;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One-way notifications for logging/presentation layers. The engine never
/// blocks on delivery; lagging subscribers lose events.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    OrderSubmitted { order: Order },
    OrderSettled { fill: Fill },
    OrderRejected { order: Order, reason: FillError },
    TickUsage { dispatched: usize, pending: usize },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already running")]
    AlreadyRunning,
    #[error("engine is not running")]
    NotRunning,
    #[error("allocation config cannot change while the engine is running")]
    AllocationLocked,
    #[error("invalid allocation config: {0}")]
    InvalidAllocation(String),
    #[error("engine task failed: {0}")]
    Task(String),
}

/// Snapshot of engine state for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct EngineState {
    pub cash: Decimal,
    pub holdings: HashMap<InstrumentId, Holding>,
    pub pending_orders: Vec<Order>,
    pub total_assets: Decimal,
    pub vix: Decimal,
    /// Rolling total-asset history, oldest first.
    pub history: Vec<Decimal>,
}

enum Command {
    Tick(MarketSnapshot),
    Drain,
    Settle(Order),
    State(oneshot::Sender<EngineState>),
    Stop,
}

/// State owned exclusively by the engine task.
struct EngineCore {
    universe: Vec<Instrument>,
    ledger: Ledger,
    scheduler: OrderScheduler,
    allocation: AllocationConfig,
    vix: Decimal,
    vix_cutoff: Decimal,
    rebalance_threshold: Decimal,
    settlement_delay: Duration,
    history: VecDeque<Decimal>,
    history_length: usize,
    next_order_id: u64,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineCore {
    fn price_of(&self, instrument_id: &str) -> Option<Decimal> {
        self.universe
            .iter()
            .find(|i| i.id == instrument_id)
            .map(|i| i.price)
    }

    fn state(&self) -> EngineState {
        let total_assets = self.ledger.total_assets(|id| self.price_of(id));
        EngineState {
            cash: self.ledger.cash(),
            holdings: self.ledger.holdings().clone(),
            pending_orders: self.scheduler.pending().cloned().collect(),
            total_assets,
            vix: self.vix,
            history: self.history.iter().copied().collect(),
        }
    }

    fn emit(&self, event: EngineEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Market tick: refresh prices, record history, re-evaluate targets and
    /// enqueue rebalance orders.
    fn on_tick(&mut self, snapshot: MarketSnapshot) {
        for instrument in self.universe.iter_mut() {
            if let Some(price) = snapshot.prices.get(&instrument.id) {
                instrument.price = *price;
            }
        }
        self.vix = snapshot.vix;

        let total_assets = self.ledger.total_assets(|id| self.price_of(id));
        self.history.push_back(total_assets);
        while self.history.len() > self.history_length {
            self.history.pop_front();
        }

        let requests = strategy::evaluate(
            &self.universe,
            self.vix,
            self.vix_cutoff,
            &self.ledger,
            &self.allocation,
            self.rebalance_threshold,
        );

        for request in requests {
            self.next_order_id += 1;
            let order = request.into_order(self.next_order_id);
            info!(
                order_id = order.id,
                instrument = %order.instrument_id,
                side = ?order.side,
                quantity = order.quantity,
                price = %order.limit_price,
                "Order submitted"
            );
            self.emit(EngineEvent::OrderSubmitted {
                order: order.clone(),
            });
            self.scheduler.enqueue(order);
        }
    }

    /// Drain tick: dispatch a rate-limited batch and arm a settlement timer
    /// per order. Timers run concurrently with subsequent ticks.
    fn on_drain(&mut self, cmd_tx: &mpsc::Sender<Command>) {
        let batch = self.scheduler.drain_tick();
        self.emit(EngineEvent::TickUsage {
            dispatched: batch.len(),
            pending: self.scheduler.depth(),
        });

        for order in batch {
            let tx = cmd_tx.clone();
            let delay = self.settlement_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Engine may have stopped in the meantime; the fill is then
                // abandoned whole, never partially applied.
                let _ = tx.send(Command::Settle(order)).await;
            });
        }
    }

    /// Settlement: apply the fill at the submission-time price. A ledger
    /// rejection is terminal for the order.
    fn on_settle(&mut self, order: Order) {
        match self.ledger.apply_fill(&order, order.limit_price) {
            Ok(fill) => {
                info!(
                    order_id = fill.order_id,
                    instrument = %fill.instrument_id,
                    side = ?fill.side,
                    quantity = fill.quantity,
                    price = %fill.fill_price,
                    cash = %fill.cash_after,
                    "Order settled"
                );
                self.emit(EngineEvent::OrderSettled { fill });
            }
            Err(reason) => {
                warn!(
                    order_id = order.id,
                    instrument = %order.instrument_id,
                    %reason,
                    "Order rejected"
                );
                self.emit(EngineEvent::OrderRejected { order, reason });
            }
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>, cmd_tx: mpsc::Sender<Command>) -> Self {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Tick(snapshot) => self.on_tick(snapshot),
                Command::Drain => self.on_drain(&cmd_tx),
                Command::Settle(order) => self.on_settle(order),
                Command::State(reply) => {
                    let _ = reply.send(self.state());
                }
                Command::Stop => {
                    let dropped = self.scheduler.clear();
                    if dropped > 0 {
                        info!(dropped, "Pending orders discarded on stop");
                    }
                    break;
                }
            }
        }
        self
    }
}

struct EngineRuntime {
    cmd_tx: mpsc::Sender<Command>,
    owner: JoinHandle<EngineCore>,
    drivers: Vec<JoinHandle<()>>,
}

/// Control surface over the engine actor.
///
/// Holds the core state while idle and hands it to the owner task while
/// running, so stop/start cycles preserve the ledger.
pub struct Engine {
    config: Config,
    events: broadcast::Sender<EngineEvent>,
    core: Option<EngineCore>,
    runtime: Option<EngineRuntime>,
}

impl Engine {
    pub fn new(config: Config, universe: Vec<Instrument>) -> Self {
        let (events, _) = broadcast::channel(256);
        let core = EngineCore {
            universe,
            ledger: Ledger::new(config.market.initial_cash),
            scheduler: OrderScheduler::new(config.execution.rate_limit),
            allocation: config.allocation.clone(),
            vix: config.market.initial_vix,
            vix_cutoff: config.market.vix_risk_cutoff,
            rebalance_threshold: config.execution.rebalance_threshold,
            settlement_delay: Duration::from_millis(config.execution.settlement_delay_ms),
            history: VecDeque::new(),
            history_length: config.market.history_length,
            next_order_id: 0,
            events: events.clone(),
        };

        Self {
            config,
            events,
            core: Some(core),
            runtime: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Subscribe to engine events. Safe to call before `start`.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Replace the sleeve weights. Rejected while running so an evaluation
    /// never sees a weight set changing mid-cycle.
    pub fn set_allocation(&mut self, allocation: AllocationConfig) -> Result<(), EngineError> {
        if self.runtime.is_some() {
            return Err(EngineError::AllocationLocked);
        }
        allocation
            .validate()
            .map_err(|e| EngineError::InvalidAllocation(e.to_string()))?;

        if let Some(core) = self.core.as_mut() {
            core.allocation = allocation;
        }
        Ok(())
    }

    /// Spawn the owner task and both periodic drivers.
    pub fn start<F: MarketFeed>(&mut self, mut feed: F) -> Result<(), EngineError> {
        if self.runtime.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let core = self.core.take().ok_or(EngineError::AlreadyRunning)?;

        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let owner = tokio::spawn(core.run(cmd_rx, cmd_tx.clone()));

        let drain_tx = cmd_tx.clone();
        let drain_period = Duration::from_millis(self.config.execution.drain_interval_ms);
        let drain_driver = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(drain_period);
            loop {
                ticker.tick().await;
                if drain_tx.send(Command::Drain).await.is_err() {
                    break;
                }
            }
        });

        let market_tx = cmd_tx.clone();
        let eval_period = Duration::from_millis(self.config.market.eval_interval_ms);
        let market_driver = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(eval_period);
            loop {
                ticker.tick().await;
                let snapshot = feed.next_snapshot().await;
                if market_tx.send(Command::Tick(snapshot)).await.is_err() {
                    break;
                }
            }
        });

        info!(
            rate_limit = self.config.execution.rate_limit,
            drain_interval_ms = self.config.execution.drain_interval_ms,
            eval_interval_ms = self.config.market.eval_interval_ms,
            settlement_delay_ms = self.config.execution.settlement_delay_ms,
            "Engine started"
        );

        self.runtime = Some(EngineRuntime {
            cmd_tx,
            owner,
            drivers: vec![drain_driver, market_driver],
        });
        Ok(())
    }

    /// Stop both drivers and the owner task.
    ///
    /// Pending orders are dropped without settling; fills already applied
    /// stay applied, and in-flight settlement timers land in a closed
    /// mailbox and are abandoned whole.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        let runtime = self.runtime.take().ok_or(EngineError::NotRunning)?;

        for driver in runtime.drivers {
            driver.abort();
        }
        let _ = runtime.cmd_tx.send(Command::Stop).await;

        let core = runtime
            .owner
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;
        self.core = Some(core);

        info!("Engine stopped");
        Ok(())
    }

    /// Current engine state, queried from the owner task while running.
    pub async fn state(&self) -> Result<EngineState, EngineError> {
        match (&self.runtime, &self.core) {
            (Some(runtime), _) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                runtime
                    .cmd_tx
                    .send(Command::State(reply_tx))
                    .await
                    .map_err(|e| EngineError::Task(e.to_string()))?;
                reply_rx.await.map_err(|e| EngineError::Task(e.to_string()))
            }
            (None, Some(core)) => Ok(core.state()),
            (None, None) => Err(EngineError::NotRunning),
        }
    }
}

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use crate::core::engine::Engine;
use crate::core::report::BatchReport;
use crate::interfaces::balance_provider::BalanceProvider;
use crate::interfaces::coprocessor::Coprocessor;
use crate::observability::metrics::KEEPER_TICK_LATENCY;
use crate::observability::tracing::keeper_tick_span;
use crate::types::timestamp::Timestamp;

/// What one keeper tick did.
#[derive(Clone, Debug, Default)]
pub struct KeeperReport {
    pub tick: u64,
    pub rate_updated: bool,
    pub processed: BatchReport,
    pub finalized_checks: BatchReport,
    pub requested_checks: BatchReport,
    pub errors: Vec<String>,
}

/// Drives the engine: rate update, lifecycle processing, then liquidation
/// checks. Each step runs even if an earlier one failed.
pub struct KeeperTicker {
    interval: Duration,
    rate_update_interval_secs: u64,
    last_rate_update: Option<Timestamp>,
    ticks: u64,
}

impl KeeperTicker {
    pub fn new(interval: Duration, rate_update_interval_secs: u64) -> Self {
        KeeperTicker {
            interval,
            rate_update_interval_secs,
            last_rate_update: None,
            ticks: 0,
        }
    }

    pub fn run_once<C: Coprocessor, B: BalanceProvider>(&mut self, engine: &mut Engine<C, B>) -> KeeperReport {
        self.ticks += 1;
        let _span = keeper_tick_span(self.ticks).entered();
        let started = Instant::now();
        let mut report = KeeperReport {
            tick: self.ticks,
            ..KeeperReport::default()
        };

        let now = engine.now();
        let rate_due = self.last_rate_update
            .is_none_or(|last| now.seconds_since(last) >= self.rate_update_interval_secs);
        if rate_due {
            match engine.set_funding_rate_from_skew() {
                Ok(()) => {
                    self.last_rate_update = Some(now);
                    report.rate_updated = true;
                }
                Err(e) => report.errors.push(format!("funding rate update: {}", e)),
            }
        }

        let active = engine.active_position_ids();
        report.processed = engine.process(&active);

        let with_checks: Vec<_> = engine.open_positions()
            .iter()
            .filter(|p| p.liquidation_check.is_some())
            .map(|p| p.id)
            .collect();
        report.finalized_checks = engine.finalize_liquidation_checks(&with_checks);

        let unchecked: Vec<_> = engine.open_positions()
            .iter()
            .filter(|p| p.liquidation_check.is_none())
            .map(|p| p.id)
            .collect();
        if !unchecked.is_empty() {
            match engine.request_liquidation_checks(&unchecked) {
                Ok(requested) => report.requested_checks = requested,
                Err(e) => report.errors.push(format!("liquidation checks: {}", e)),
            }
        }

        KEEPER_TICK_LATENCY.observe(started.elapsed().as_secs_f64());
        for error in &report.errors {
            tracing::error!("Keeper tick {}: {}", self.ticks, error);
        }
        tracing::debug!(
            "Keeper tick {}: processed={}, pending={}, failed={}",
            self.ticks,
            report.processed.succeeded.len(),
            report.processed.pending.len(),
            report.processed.failed.len()
        );
        report
    }

    /// Ticks until `shutdown` flips to `true`.
    pub async fn run<C: Coprocessor, B: BalanceProvider>(
        mut self,
        engine: Arc<Mutex<Engine<C, B>>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Keeper started: interval={:?}", self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut engine = engine.lock().await;
                    self.run_once(&mut engine);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Keeper stopped after {} ticks", self.ticks);
    }
}

use std::sync::Mutex;

use crate::execution::ActionOutcome;
use crate::strategy::{AssetSignal, SkippedAsset, TradingMode};

/// Something worth telling the operator about
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    TickStarted {
        mode: TradingMode,
        just_exited_liquidation: bool,
    },
    /// Data fetch failed; nothing was planned or sent
    TickAborted {
        error: String,
    },
    Signal(AssetSignal),
    Skipped(SkippedAsset),
    BuyingHalted {
        reason: String,
    },
    Order {
        market: String,
        reason: String,
        outcome: String,
        success: bool,
    },
    HealthCheck {
        market: String,
        outcome: String,
        success: bool,
    },
    TickCompleted {
        mode: TradingMode,
        actions: usize,
        failures: usize,
    },
}

impl ReportEvent {
    pub fn order(outcome: &ActionOutcome) -> Self {
        ReportEvent::Order {
            market: outcome.market.clone(),
            reason: outcome.reason.clone(),
            outcome: outcome.status.to_string(),
            success: outcome.is_success(),
        }
    }

    pub fn health_check(outcome: &ActionOutcome) -> Self {
        ReportEvent::HealthCheck {
            market: outcome.market.clone(),
            outcome: outcome.status.to_string(),
            success: outcome.is_success(),
        }
    }
}

/// Sink for engine events. Must not fail or block the tick.
pub trait Reporter {
    fn record(&self, event: &ReportEvent);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn record(&self, event: &ReportEvent) {
        (**self).record(event)
    }
}

/// Reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn record(&self, event: &ReportEvent) {
        match event {
            ReportEvent::TickStarted {
                mode,
                just_exited_liquidation,
            } => {
                tracing::debug!(%mode, just_exited_liquidation, "Tick started");
            }
            ReportEvent::TickAborted { error } => {
                tracing::warn!("⚠️  Tick aborted, no orders touched: {}", error);
            }
            ReportEvent::Signal(signal) => {
                tracing::debug!(
                    market = %signal.market,
                    price = signal.current_price,
                    threshold = signal.threshold,
                    k = signal.k,
                    score = ?signal.momentum_score,
                    breakout = signal.is_breakout(),
                    "Signal"
                );
            }
            ReportEvent::Skipped(skipped) => {
                tracing::debug!(market = %skipped.market, reason = %skipped.reason, "Skipped");
            }
            ReportEvent::BuyingHalted { reason } => {
                tracing::info!("Buying halted this tick: {}", reason);
            }
            ReportEvent::Order {
                market,
                reason,
                outcome,
                success,
            } => {
                if *success {
                    tracing::info!(market = %market, reason = %reason, "✅ {}", outcome);
                } else {
                    tracing::warn!(market = %market, reason = %reason, "❌ {}", outcome);
                }
            }
            ReportEvent::HealthCheck {
                market,
                outcome,
                success,
            } => {
                if *success {
                    tracing::debug!(market = %market, "Health check: {}", outcome);
                } else {
                    tracing::error!(market = %market, "Health check failed: {}", outcome);
                }
            }
            ReportEvent::TickCompleted {
                mode,
                actions,
                failures,
            } => {
                tracing::info!(%mode, actions, failures, "Tick completed");
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Reporter for MemoryReporter {
    fn record(&self, event: &ReportEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

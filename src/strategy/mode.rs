use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::config::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradingMode {
    /// Sell-only window: cancel bids, liquidate holdings
    Liquidation,
    /// Normal breakout buying
    Trading,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Liquidation => f.write_str("liquidation"),
            TradingMode::Trading => f.write_str("trading"),
        }
    }
}

/// Liquidation iff `now.hour == start_hour && now.minute <= window_minutes`
pub fn decide_mode(now: DateTime<Utc>, start_hour: u32, window_minutes: u32) -> TradingMode {
    if now.hour() == start_hour && now.minute() <= window_minutes {
        TradingMode::Liquidation
    } else {
        TradingMode::Trading
    }
}

/// Mode for the current tick plus the edge relative to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDecision {
    pub previous: TradingMode,
    pub mode: TradingMode,
    pub just_exited_liquidation: bool,
}

impl ModeDecision {
    pub fn is_transition(&self) -> bool {
        self.previous != self.mode
    }
}

/// Tracks the last committed mode across ticks
///
/// Starts in `Trading`, so a fresh process never fires the exit cleanup.
#[derive(Debug, Clone)]
pub struct ModeController {
    current: TradingMode,
    start_hour: u32,
    window_minutes: u32,
}

impl ModeController {
    pub fn new(start_hour: u32, window_minutes: u32) -> Self {
        Self {
            current: TradingMode::Trading,
            start_hour,
            window_minutes,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.start_hour, config.ask_period_minutes)
    }

    pub fn current(&self) -> TradingMode {
        self.current
    }

    /// Decide the mode for `now` without recording it
    pub fn observe(&self, now: DateTime<Utc>) -> ModeDecision {
        let mode = decide_mode(now, self.start_hour, self.window_minutes);

        ModeDecision {
            previous: self.current,
            mode,
            just_exited_liquidation: self.current == TradingMode::Liquidation
                && mode == TradingMode::Trading,
        }
    }

    /// Record the decision once the tick has committed to acting on it
    pub fn commit(&mut self, decision: &ModeDecision) {
        if decision.is_transition() {
            tracing::info!(
                from = %decision.previous,
                to = %decision.mode,
                "Mode transition"
            );
        }
        self.current = decision.mode;
    }
}

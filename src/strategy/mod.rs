// Trading strategy module
pub mod breakout;
pub mod mode;
pub mod planner;
pub mod sizing;

pub use breakout::{AssetSignal, FixedKStrategy, NoiseMomentumStrategy, SignalCalculator};
pub use mode::{decide_mode, ModeController, ModeDecision, TradingMode};
pub use planner::{OrderAction, OrderPlanner, Plan, PlannedAction, SkippedAsset, TickContext};
pub use sizing::PositionSizer;

use serde::Deserialize;

use crate::models::DailyBar;

/// Scoring half of the volatility breakout signal
///
/// Implementations decide the sensitivity coefficient used for the
/// breakout threshold and the conviction score used for sizing.
/// Bars are most-recent-first.
pub trait BreakoutStrategy: Send + Sync {
    /// Get strategy name
    fn name(&self) -> &str;

    /// Per-asset K; `None` falls back to the configured default
    fn k_value(&self, bars: &[DailyBar]) -> Option<f64>;

    /// Conviction in [0, 1]; `None` when it cannot be computed
    fn momentum_score(&self, bars: &[DailyBar]) -> Option<f64>;

    /// Minimum bars needed to compute a threshold at all
    fn min_bars_required(&self) -> usize {
        2
    }
}

/// Which scoring strategy the signal calculator uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalModel {
    /// Noise-averaged K and moving-average momentum sizing
    #[default]
    NoiseMomentum,
    /// Configured K and full nominal sizing
    FixedK,
}

impl SignalModel {
    pub fn build(self) -> Box<dyn BreakoutStrategy> {
        match self {
            SignalModel::NoiseMomentum => Box::new(NoiseMomentumStrategy),
            SignalModel::FixedK => Box::new(FixedKStrategy),
        }
    }
}

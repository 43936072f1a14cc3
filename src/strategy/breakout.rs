use std::collections::HashMap;

use super::{BreakoutStrategy, SignalModel};
use crate::indicators::{average_noise, sma_ladder};
use crate::models::DailyBar;

/// Shortest moving-average window used for momentum scoring
const MIN_MA_WINDOW: usize = 3;

/// Per-asset signal for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSignal {
    pub market: String,
    /// Price at or above which a buy fires
    pub threshold: f64,
    /// Sensitivity coefficient actually applied
    pub k: f64,
    pub momentum_score: Option<f64>,
    pub current_price: f64,
}

impl AssetSignal {
    pub fn is_breakout(&self) -> bool {
        self.current_price >= self.threshold
    }
}

/// `today.open + (yesterday.high - yesterday.low) * k`
pub fn breakout_threshold(bars: &[DailyBar], k: f64) -> Option<f64> {
    let (today, yesterday) = match bars {
        [today, yesterday, ..] => (today, yesterday),
        _ => return None,
    };

    Some(today.open_price + yesterday.range() * k)
}

/// Fraction of the 3-day..N-day moving averages (all ending today) that sit
/// strictly below the current price, rounded to 2 decimals
pub fn momentum_score(bars: &[DailyBar]) -> Option<f64> {
    if bars.len() < MIN_MA_WINDOW {
        return None;
    }

    let current_price = bars[0].trade_price;
    let closes: Vec<f64> = bars.iter().rev().map(|b| b.trade_price).collect();
    let averages = sma_ladder(&closes, MIN_MA_WINDOW);

    if averages.is_empty() {
        return None;
    }

    let above = averages.iter().filter(|&&ma| current_price > ma).count();
    let score = above as f64 / averages.len() as f64;

    Some((score * 100.0).round() / 100.0)
}

/// Noise-adjusted K with momentum-scaled sizing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseMomentumStrategy;

impl BreakoutStrategy for NoiseMomentumStrategy {
    fn name(&self) -> &str {
        "NoiseMomentum"
    }

    fn k_value(&self, bars: &[DailyBar]) -> Option<f64> {
        average_noise(bars)
    }

    fn momentum_score(&self, bars: &[DailyBar]) -> Option<f64> {
        momentum_score(bars)
    }
}

/// Plain breakout: configured K, every signal sized at the nominal amount
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedKStrategy;

impl BreakoutStrategy for FixedKStrategy {
    fn name(&self) -> &str {
        "FixedK"
    }

    fn k_value(&self, _bars: &[DailyBar]) -> Option<f64> {
        None
    }

    fn momentum_score(&self, _bars: &[DailyBar]) -> Option<f64> {
        Some(1.0)
    }
}

/// Derives breakout signals from daily bars
pub struct SignalCalculator {
    strategy: Box<dyn BreakoutStrategy>,
    default_k: f64,
}

impl SignalCalculator {
    pub fn new(strategy: Box<dyn BreakoutStrategy>, default_k: f64) -> Self {
        Self {
            strategy,
            default_k,
        }
    }

    pub fn from_model(model: SignalModel, default_k: f64) -> Self {
        Self::new(model.build(), default_k)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Signal for one asset, `None` when the history is too short
    pub fn compute(&self, market: &str, bars: &[DailyBar]) -> Option<AssetSignal> {
        if bars.len() < self.strategy.min_bars_required().max(2) {
            return None;
        }

        let k = self.strategy.k_value(bars).unwrap_or(self.default_k);
        let threshold = breakout_threshold(bars, k)?;
        let momentum_score = self
            .strategy
            .momentum_score(bars)
            .map(|s| s.clamp(0.0, 1.0));

        Some(AssetSignal {
            market: market.to_string(),
            threshold,
            k,
            momentum_score,
            current_price: bars[0].trade_price,
        })
    }

    /// Signals for every target that has enough history
    pub fn compute_all(
        &self,
        targets: &[String],
        bars: &HashMap<String, Vec<DailyBar>>,
    ) -> HashMap<String, AssetSignal> {
        targets
            .iter()
            .filter_map(|market| {
                let history = bars.get(market)?;
                let signal = self.compute(market, history);
                if signal.is_none() {
                    tracing::debug!(
                        market = %market,
                        bars = history.len(),
                        "Skipping signal, insufficient bar history"
                    );
                }
                signal.map(|s| (market.clone(), s))
            })
            .collect()
    }
}

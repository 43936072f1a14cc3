use chrono::{DateTime, Utc};

use crate::api::Exchange;
use crate::config::{HealthCheckSettings, Settings, StrategyConfig};
use crate::error::EngineError;
use crate::execution::{ActionOutcome, Executor, HealthProbe, MarketFeed};
use crate::reporting::{ReportEvent, Reporter};
use crate::strategy::{
    ModeController, ModeDecision, OrderPlanner, Plan, SignalCalculator, TickContext,
};

/// What happened during one completed tick
#[derive(Debug)]
pub struct TickReport {
    pub mode: ModeDecision,
    pub plan: Plan,
    pub outcomes: Vec<ActionOutcome>,
    pub health_check: Option<ActionOutcome>,
}

impl TickReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Owns the strategy state and runs one plan-and-execute pass per tick
///
/// The only state carried between ticks is the committed trading mode.
pub struct Engine<E, R> {
    exchange: E,
    reporter: R,
    config: StrategyConfig,
    mode: ModeController,
    feed: MarketFeed,
    calculator: SignalCalculator,
    planner: OrderPlanner,
    executor: Executor,
    health_probe: Option<HealthProbe>,
}

impl<E: Exchange, R: Reporter> Engine<E, R> {
    pub fn new(exchange: E, reporter: R, config: StrategyConfig) -> Self {
        Self {
            mode: ModeController::from_config(&config),
            feed: MarketFeed::new(config.targets.clone(), config.bar_history_days),
            calculator: SignalCalculator::from_model(config.signal_model, config.k_value),
            planner: OrderPlanner::new(config.clone()),
            executor: Executor::default(),
            health_probe: None,
            exchange,
            reporter,
            config,
        }
    }

    pub fn from_settings(exchange: E, reporter: R, settings: &Settings) -> Self {
        let engine = Self::new(exchange, reporter, settings.strategy.clone());
        match &settings.health_check {
            Some(probe) => engine.with_health_check(probe),
            None => engine,
        }
    }

    /// Toggle a probe bid every tick; the probe market is kept out of the
    /// liquidation-window bid cleanup
    pub fn with_health_check(mut self, settings: &HealthCheckSettings) -> Self {
        let probe = HealthProbe::new(settings);
        self.planner = self.planner.with_reserved_market(probe.market());
        self.health_probe = Some(probe);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.executor = Executor::new(dry_run);
        self
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn mode(&self) -> &ModeController {
        &self.mode
    }

    pub fn strategy_name(&self) -> &str {
        self.calculator.strategy_name()
    }

    /// Run one tick at `now`
    ///
    /// Returns `Err` only when the data fetch failed, in which case nothing
    /// was sent and the mode edge is left for the next tick.
    pub async fn run_tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, EngineError> {
        let decision = self.mode.observe(now);
        self.reporter.record(&ReportEvent::TickStarted {
            mode: decision.mode,
            just_exited_liquidation: decision.just_exited_liquidation,
        });

        let snapshot = match self.feed.fetch_snapshot(&self.exchange).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.reporter.record(&ReportEvent::TickAborted {
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        self.mode.commit(&decision);

        let health_check = match &self.health_probe {
            Some(probe) => {
                let action = probe.plan(&snapshot);
                let outcome = self
                    .executor
                    .execute(&self.exchange, std::slice::from_ref(&action))
                    .await
                    .pop();
                if let Some(outcome) = &outcome {
                    self.reporter.record(&ReportEvent::health_check(outcome));
                }
                outcome
            }
            None => None,
        };

        let signals = self
            .calculator
            .compute_all(&self.config.targets, &snapshot.bars);
        for target in &self.config.targets {
            if let Some(signal) = signals.get(target) {
                self.reporter.record(&ReportEvent::Signal(signal.clone()));
            }
        }

        let plan = self.planner.plan(&TickContext {
            now,
            mode: decision,
            snapshot: &snapshot,
            signals: &signals,
        });

        for skipped in &plan.skipped {
            self.reporter.record(&ReportEvent::Skipped(skipped.clone()));
        }
        if let Some(reason) = &plan.halted {
            self.reporter.record(&ReportEvent::BuyingHalted {
                reason: reason.clone(),
            });
        }

        let outcomes = self.executor.execute(&self.exchange, &plan.actions).await;
        for outcome in &outcomes {
            self.reporter.record(&ReportEvent::order(outcome));
        }

        let report = TickReport {
            mode: decision,
            plan,
            outcomes,
            health_check,
        };

        self.reporter.record(&ReportEvent::TickCompleted {
            mode: decision.mode,
            actions: report.outcomes.len(),
            failures: report.failures(),
        });

        Ok(report)
    }
}

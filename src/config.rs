use std::path::Path;

use serde::Deserialize;

use crate::api::upbit::{MAX_CANDLES, UPBIT_API_BASE};
use crate::error::ConfigError;
use crate::strategy::SignalModel;

const ENV_PREFIX: &str = "VOLBREAK";

/// Top-level settings, loaded from an optional TOML file and `VOLBREAK__*`
/// environment variables (e.g. `VOLBREAK__ACCOUNT__ACCESS_KEY`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub account: AccountSettings,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default)]
    pub health_check: Option<HealthCheckSettings>,
}

#[derive(Clone, Deserialize, Default)]
pub struct AccountSettings {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

// Keep keys out of logs
impl std::fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSettings")
            .field("access_key", &mask(&self.access_key))
            .field("secret_key", &"***")
            .finish()
    }
}

fn mask(key: &str) -> String {
    match key.get(..4) {
        Some(prefix) => format!("{}***", prefix),
        None => "***".to_string(),
    }
}

/// Strategy parameters, read-only for the lifetime of a tick
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Markets the engine may trade, e.g. "KRW-BTC"
    pub targets: Vec<String>,
    pub fiat_currency: String,
    /// Default breakout sensitivity when no noise coefficient is available
    pub k_value: f64,
    pub signal_model: SignalModel,
    /// Daily bars fetched per asset (noise/momentum lookback)
    pub bar_history_days: usize,
    /// UTC hour at which the liquidation window opens
    pub start_hour: u32,
    /// Liquidation window length in minutes
    pub ask_period_minutes: u32,
    /// Age in seconds after which a liquidation ask is re-priced
    pub ask_order_gap_secs: i64,
    /// Loss threshold in percent (e.g. -5.0)
    pub stop_loss: f64,
    pub stop_loss_enabled: bool,
    /// Nominal fiat amount committed per buy
    pub order_amount: f64,
    /// Maximum number of concurrently held assets
    pub max_coin: usize,
    /// Fixed offset added to the trade price for liquidation-window asks
    pub ask_markup: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            fiat_currency: "KRW".to_string(),
            k_value: 0.5,
            signal_model: SignalModel::NoiseMomentum,
            bar_history_days: 20,
            start_hour: 0, // 09:00 KST
            ask_period_minutes: 5,
            ask_order_gap_secs: 600,
            stop_loss: -5.0,
            stop_loss_enabled: false,
            order_amount: 10_000.0,
            max_coin: 3,
            ask_markup: 0.0,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::invalid(
                "strategy.targets",
                "at least one target market is required",
            ));
        }
        if let Some(bad) = self.targets.iter().find(|t| !t.contains('-')) {
            return Err(ConfigError::invalid(
                "strategy.targets",
                format!("'{}' is not a market symbol like KRW-BTC", bad),
            ));
        }
        if self.start_hour >= 24 {
            return Err(ConfigError::invalid("strategy.start_hour", "must be < 24"));
        }
        if self.ask_period_minutes >= 60 {
            return Err(ConfigError::invalid(
                "strategy.ask_period_minutes",
                "must be < 60",
            ));
        }
        if self.bar_history_days < 2 {
            return Err(ConfigError::invalid(
                "strategy.bar_history_days",
                "need at least 2 days of history",
            ));
        }
        if self.bar_history_days > MAX_CANDLES {
            return Err(ConfigError::invalid(
                "strategy.bar_history_days",
                format!("at most {} daily bars can be fetched", MAX_CANDLES),
            ));
        }
        if !(self.k_value.is_finite() && self.k_value >= 0.0) {
            return Err(ConfigError::invalid(
                "strategy.k_value",
                "must be a non-negative number",
            ));
        }
        if !(self.order_amount.is_finite() && self.order_amount > 0.0) {
            return Err(ConfigError::invalid(
                "strategy.order_amount",
                "must be positive",
            ));
        }
        if self.ask_order_gap_secs < 0 {
            return Err(ConfigError::invalid(
                "strategy.ask_order_gap_secs",
                "must not be negative",
            ));
        }
        if !self.ask_markup.is_finite() {
            return Err(ConfigError::invalid("strategy.ask_markup", "must be finite"));
        }
        Ok(())
    }

    pub fn is_target(&self, market: &str) -> bool {
        self.targets.iter().any(|t| t.eq_ignore_ascii_case(market))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Sleep between the end of one tick and the start of the next
    pub poll_interval_secs: u64,
    pub api_base_url: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            api_base_url: UPBIT_API_BASE.to_string(),
        }
    }
}

/// Liveness probe: toggles a far-from-market bid each tick
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckSettings {
    pub market: String,
    #[serde(default = "default_probe_price")]
    pub price: f64,
    #[serde(default = "default_probe_volume")]
    pub volume: f64,
}

fn default_probe_price() -> f64 {
    100.0
}

fn default_probe_volume() -> f64 {
    100.0
}

impl Settings {
    /// Load settings from `path` (optional) overlaid with environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("strategy.targets"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from an in-memory TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;

        if self.runner.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "runner.poll_interval_secs",
                "must be at least 1 second",
            ));
        }

        if let Some(probe) = &self.health_check {
            if self.strategy.is_target(&probe.market) {
                return Err(ConfigError::invalid(
                    "health_check.market",
                    "probe market must not be a strategy target",
                ));
            }
            if probe.price <= 0.0 || probe.volume <= 0.0 {
                return Err(ConfigError::invalid(
                    "health_check",
                    "price and volume must be positive",
                ));
            }
        }

        Ok(())
    }
}

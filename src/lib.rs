// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod reporting;
pub mod strategy;

// Re-export commonly used types
pub use api::{Exchange, UpbitClient};
pub use config::{Settings, StrategyConfig};
pub use engine::{Engine, TickReport};
pub use error::{ConfigError, EngineError, ExchangeError};
pub use models::*;
pub use reporting::{MemoryReporter, ReportEvent, Reporter, TracingReporter};

// Order execution and data collection module
pub mod executor;
pub mod health;
pub mod market_feed;
pub mod quantize;

pub use executor::{ActionOutcome, Executor, OutcomeStatus};
pub use health::HealthProbe;
pub use market_feed::MarketFeed;
pub use quantize::{format_price, format_volume, quantize_price};

use thiserror::Error;

/// Failures surfaced by an exchange adapter
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange rejected request ({status}): {name}: {message}")]
    Api {
        status: u16,
        name: String,
        message: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ExchangeError {
    /// Transport failures, throttling and server errors are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::Http(_) => true,
            ExchangeError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Decode(err.to_string())
    }
}

/// Per-tick engine failures
///
/// `DataFetch` aborts the tick. Placement and cancellation failures are
/// reported and the pass continues.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to fetch {what}: {source}")]
    DataFetch {
        what: String,
        #[source]
        source: ExchangeError,
    },

    #[error("order placement failed for {market}: {source}")]
    OrderPlacement {
        market: String,
        #[source]
        source: ExchangeError,
    },

    #[error("order cancellation failed for {order_id}: {source}")]
    OrderCancellation {
        order_id: String,
        #[source]
        source: ExchangeError,
    },
}

impl EngineError {
    pub fn data_fetch(what: impl Into<String>, source: ExchangeError) -> Self {
        EngineError::DataFetch {
            what: what.into(),
            source,
        }
    }
}

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid config value {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

use std::collections::HashMap;

use crate::api::Exchange;
use crate::error::EngineError;
use crate::models::MarketSnapshot;

/// Collects balances, open orders and daily bars for one tick
///
/// All-or-nothing: any failed call fails the whole snapshot.
pub struct MarketFeed {
    targets: Vec<String>,
    bar_count: usize,
}

impl MarketFeed {
    pub fn new(targets: Vec<String>, bar_count: usize) -> Self {
        Self { targets, bar_count }
    }

    pub async fn fetch_snapshot<E: Exchange>(
        &self,
        exchange: &E,
    ) -> Result<MarketSnapshot, EngineError> {
        let balances = exchange
            .fetch_balances()
            .await
            .map_err(|e| EngineError::data_fetch("balances", e))?;

        let orders = exchange
            .fetch_open_orders(None)
            .await
            .map_err(|e| EngineError::data_fetch("open orders", e))?;

        let mut bars = HashMap::with_capacity(self.targets.len());
        for market in &self.targets {
            let history = exchange
                .fetch_daily_bars(market, self.bar_count)
                .await
                .map_err(|e| EngineError::data_fetch(format!("daily bars for {}", market), e))?;
            bars.insert(market.clone(), history);
        }

        tracing::debug!(
            balances = balances.len(),
            bids = orders.bids.len(),
            asks = orders.asks.len(),
            markets = bars.len(),
            "Fetched market snapshot"
        );

        Ok(MarketSnapshot {
            balances,
            orders,
            bars,
        })
    }
}

//! In-memory exchange for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::Exchange;
use crate::error::ExchangeError;
use crate::models::{
    Balance, DailyBar, OpenOrder, OpenOrders, OrderReceipt, OrderRequest, OrderSide,
};

#[derive(Default)]
pub(crate) struct MockExchange {
    pub balances: Vec<Balance>,
    pub orders: Vec<OpenOrder>,
    pub bars: HashMap<String, Vec<DailyBar>>,
    pub fail_balances: bool,
    pub fail_bars: HashSet<String>,
    pub fail_place: HashSet<String>,
    pub fail_cancel: HashSet<String>,
    /// Every mutating call in order, e.g. "cancel:id" or "place:KRW-BTC:bid"
    pub calls: Mutex<Vec<String>>,
}

fn rejected(name: &str) -> ExchangeError {
    ExchangeError::Api {
        status: 400,
        name: name.to_string(),
        message: "rejected by mock".to_string(),
    }
}

impl MockExchange {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Exchange for MockExchange {
    async fn fetch_balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        if self.fail_balances {
            return Err(rejected("balances_unavailable"));
        }
        Ok(self.balances.clone())
    }

    async fn fetch_open_orders(&self, side: Option<OrderSide>) -> Result<OpenOrders, ExchangeError> {
        Ok(OpenOrders::from_orders(
            self.orders
                .iter()
                .filter(|o| side.map_or(true, |s| s == o.side))
                .cloned(),
        ))
    }

    async fn fetch_daily_bars(
        &self,
        market: &str,
        count: usize,
    ) -> Result<Vec<DailyBar>, ExchangeError> {
        if self.fail_bars.contains(market) {
            return Err(rejected("candles_unavailable"));
        }
        Ok(self
            .bars
            .get(market)
            .map(|bars| bars.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ExchangeError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("place:{}:{}", request.market, request.side));
        if self.fail_place.contains(&request.market) {
            return Err(rejected("insufficient_funds"));
        }
        Ok(OrderReceipt {
            id: format!("new-{}", request.market),
            market: request.market.clone(),
            side: request.side,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<OrderReceipt, ExchangeError> {
        self.calls.lock().unwrap().push(format!("cancel:{}", order_id));
        if self.fail_cancel.contains(order_id) {
            return Err(rejected("order_not_found"));
        }
        let order = self
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .ok_or_else(|| rejected("order_not_found"))?;
        Ok(OrderReceipt {
            id: order.id.clone(),
            market: order.market.clone(),
            side: order.side,
        })
    }
}

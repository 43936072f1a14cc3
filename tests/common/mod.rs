#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use volbreak::*;

/// In-memory exchange with a mutable order book and failure injection
///
/// Placed orders rest on the book, cancelled orders leave it, so consecutive
/// ticks see the effects of earlier ones.
#[derive(Default)]
pub struct MemoryExchange {
    pub balances: RefCell<Vec<Balance>>,
    pub orders: RefCell<Vec<OpenOrder>>,
    pub bars: RefCell<HashMap<String, Vec<DailyBar>>>,
    pub fail_balances: RefCell<bool>,
    pub fail_orders: RefCell<bool>,
    pub fail_cancel: RefCell<HashSet<String>>,
    pub fail_place: RefCell<HashSet<String>>,
    pub log: RefCell<Vec<String>>,
    pub clock: RefCell<Option<DateTime<Utc>>>,
    next_id: RefCell<u32>,
}

impl MemoryExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fiat(self, amount: f64) -> Self {
        self.balances.borrow_mut().push(balance("KRW", amount, 0.0, 0.0));
        self
    }

    pub fn with_balance(self, currency: &str, free: f64, locked: f64, avg: f64) -> Self {
        self.balances
            .borrow_mut()
            .push(balance(currency, free, locked, avg));
        self
    }

    pub fn with_bars(self, market: &str, bars: Vec<DailyBar>) -> Self {
        self.bars.borrow_mut().insert(market.to_string(), bars);
        self
    }

    pub fn with_order(self, order: OpenOrder) -> Self {
        self.orders.borrow_mut().push(order);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn open_orders(&self) -> Vec<OpenOrder> {
        self.orders.borrow().clone()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.borrow().unwrap_or_else(Utc::now)
    }
}

fn rejected(name: &str) -> ExchangeError {
    ExchangeError::Api {
        status: 400,
        name: name.to_string(),
        message: "rejected".to_string(),
    }
}

impl Exchange for MemoryExchange {
    async fn fetch_balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        if *self.fail_balances.borrow() {
            return Err(rejected("server_error"));
        }
        Ok(self.balances.borrow().clone())
    }

    async fn fetch_open_orders(
        &self,
        side: Option<OrderSide>,
    ) -> Result<OpenOrders, ExchangeError> {
        if *self.fail_orders.borrow() {
            return Err(rejected("server_error"));
        }
        let orders: Vec<OpenOrder> = self
            .orders
            .borrow()
            .iter()
            .filter(|o| side.map_or(true, |s| s == o.side))
            .cloned()
            .collect();
        Ok(OpenOrders::from_orders(orders))
    }

    async fn fetch_daily_bars(
        &self,
        market: &str,
        count: usize,
    ) -> Result<Vec<DailyBar>, ExchangeError> {
        Ok(self
            .bars
            .borrow()
            .get(market)
            .map(|bars| bars.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ExchangeError> {
        self.log
            .borrow_mut()
            .push(format!("place {} {} {:?}", request.market, request.side, request.order_type));

        if self.fail_place.borrow().contains(&request.market) {
            return Err(rejected("insufficient_funds"));
        }

        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            format!("order-{}", next)
        };

        // Market orders fill immediately; limit orders rest on the book
        if request.order_type == OrderType::Limit {
            self.orders.borrow_mut().push(OpenOrder {
                id: id.clone(),
                market: request.market.clone(),
                side: request.side,
                order_type: request.order_type,
                price: Some(request.price),
                volume: request.volume,
                remaining_volume: request.volume,
                created_at: self.now(),
            });
        }

        Ok(OrderReceipt {
            id,
            market: request.market.clone(),
            side: request.side,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<OrderReceipt, ExchangeError> {
        self.log.borrow_mut().push(format!("cancel {}", order_id));

        if self.fail_cancel.borrow().contains(order_id) {
            return Err(rejected("order_not_found"));
        }

        let mut orders = self.orders.borrow_mut();
        let index = orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or_else(|| rejected("order_not_found"))?;
        let order = orders.remove(index);

        Ok(OrderReceipt {
            id: order.id,
            market: order.market,
            side: order.side,
        })
    }
}

pub fn balance(currency: &str, free: f64, locked: f64, avg: f64) -> Balance {
    Balance {
        currency: currency.to_string(),
        balance: free,
        locked,
        avg_buy_price: avg,
        unit_currency: "KRW".to_string(),
    }
}

pub fn bar(open: f64, high: f64, low: f64, close: f64) -> DailyBar {
    DailyBar {
        open_price: open,
        high_price: high,
        low_price: low,
        trade_price: close,
        timestamp: at(12, 0),
    }
}

/// Today's bar closing at `close` on top of a 105/85 previous day
pub fn breakout_bars(close: f64) -> Vec<DailyBar> {
    vec![bar(100.0, 115.0, 90.0, close), bar(95.0, 105.0, 85.0, 100.0)]
}

pub fn order(id: &str, market: &str, side: OrderSide, created_at: DateTime<Utc>) -> OpenOrder {
    OpenOrder {
        id: id.to_string(),
        market: market.to_string(),
        side,
        order_type: OrderType::Limit,
        price: Some(100.0),
        volume: 1.0,
        remaining_volume: 1.0,
        created_at,
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

pub fn secs_before(time: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    time - Duration::seconds(secs)
}

pub fn fixed_k_config(targets: &[&str]) -> StrategyConfig {
    StrategyConfig {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        k_value: 0.5,
        signal_model: volbreak::strategy::SignalModel::FixedK,
        order_amount: 10_000.0,
        max_coin: 3,
        ask_order_gap_secs: 600,
        start_hour: 0,
        ask_period_minutes: 5,
        ..Default::default()
    }
}

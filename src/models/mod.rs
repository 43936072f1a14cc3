use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One daily candle. Sequences are ordered most-recent-first:
/// index 0 is today's (still forming) bar, index 1 the previous full day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyBar {
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub trade_price: f64, // Last trade (close for finished days)
    pub timestamp: DateTime<Utc>,
}

impl DailyBar {
    /// High-low span of the bar
    pub fn range(&self) -> f64 {
        self.high_price - self.low_price
    }
}

/// Account balance for a single currency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub currency: String,
    pub balance: f64, // Free (orderable) quantity
    pub locked: f64,  // Tied up in open orders
    pub avg_buy_price: f64,
    pub unit_currency: String,
}

impl Balance {
    /// Market symbol this balance trades on, e.g. "BTC" -> "KRW-BTC"
    pub fn market(&self) -> String {
        market_from_currency(&self.currency, &self.unit_currency)
    }

    pub fn total(&self) -> f64 {
        self.balance + self.locked
    }

    pub fn is_fiat(&self, fiat_currency: &str) -> bool {
        self.currency == fiat_currency
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Bid => "bid",
            OrderSide::Ask => "ask",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
    /// Best-price order; seen on the book, never placed by the engine
    Best,
}

/// An order resting on the book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenOrder {
    pub id: String,
    pub market: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Option<f64>,
    pub volume: f64,
    pub remaining_volume: f64,
    pub created_at: DateTime<Utc>,
}

impl OpenOrder {
    /// Seconds since the order was created
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }
}

/// Open orders partitioned by side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenOrders {
    pub bids: Vec<OpenOrder>,
    pub asks: Vec<OpenOrder>,
}

impl OpenOrders {
    pub fn from_orders(orders: impl IntoIterator<Item = OpenOrder>) -> Self {
        let mut partitioned = Self::default();
        for order in orders {
            match order.side {
                OrderSide::Bid => partitioned.bids.push(order),
                OrderSide::Ask => partitioned.asks.push(order),
            }
        }
        partitioned
    }

    pub fn side(&self, side: OrderSide) -> &[OpenOrder] {
        match side {
            OrderSide::Bid => &self.bids,
            OrderSide::Ask => &self.asks,
        }
    }

    /// First open order for `market` on `side`
    pub fn find(&self, market: &str, side: OrderSide) -> Option<&OpenOrder> {
        self.side(side)
            .iter()
            .find(|o| o.market.eq_ignore_ascii_case(market))
    }

    pub fn has_order(&self, market: &str, side: OrderSide) -> bool {
        self.find(market, side).is_some()
    }

    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Order submission request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub market: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: f64, // Ignored for market asks
    pub volume: f64,
}

impl OrderRequest {
    pub fn limit(market: impl Into<String>, side: OrderSide, price: f64, volume: f64) -> Self {
        Self {
            market: market.into(),
            side,
            order_type: OrderType::Limit,
            price,
            volume,
        }
    }

    pub fn market_ask(market: impl Into<String>, volume: f64) -> Self {
        Self {
            market: market.into(),
            side: OrderSide::Ask,
            order_type: OrderType::Market,
            price: 0.0,
            volume,
        }
    }
}

/// Exchange acknowledgement of a placed or cancelled order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub id: String,
    pub market: String,
    pub side: OrderSide,
}

/// Everything fetched from the exchange for one tick
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub balances: Vec<Balance>,
    pub orders: OpenOrders,
    /// Daily bars per market, most-recent-first
    pub bars: HashMap<String, Vec<DailyBar>>,
}

impl MarketSnapshot {
    /// Free fiat balance available for new orders
    pub fn free_fiat(&self, fiat_currency: &str) -> f64 {
        self.balances
            .iter()
            .find(|b| b.is_fiat(fiat_currency))
            .map(|b| b.balance)
            .unwrap_or(0.0)
    }

    /// Non-fiat balances with a positive total quantity
    pub fn holdings<'a>(&'a self, fiat_currency: &'a str) -> impl Iterator<Item = &'a Balance> + 'a {
        self.balances
            .iter()
            .filter(move |b| !b.is_fiat(fiat_currency) && b.total() > 0.0)
    }

    pub fn is_held(&self, market: &str, fiat_currency: &str) -> bool {
        self.holdings(fiat_currency)
            .any(|b| b.market().eq_ignore_ascii_case(market))
    }

    /// Latest trade price from today's bar
    pub fn current_price(&self, market: &str) -> Option<f64> {
        self.bars
            .get(market)
            .and_then(|bars| bars.first())
            .map(|bar| bar.trade_price)
    }
}

/// "BTC" + "KRW" -> "KRW-BTC"
pub fn market_from_currency(currency: &str, unit_currency: &str) -> String {
    format!("{}-{}", unit_currency, currency)
}

// Exchange connectivity
pub mod auth;
pub mod upbit;

#[cfg(test)]
pub(crate) mod mock;

pub use auth::Credentials;
pub use upbit::UpbitClient;

use crate::error::ExchangeError;
use crate::models::{Balance, DailyBar, OpenOrders, OrderReceipt, OrderRequest, OrderSide};

/// Account and market capabilities the engine needs from an exchange
///
/// Calls are awaited one at a time inside a tick, so implementations do not
/// need to be `Sync` or spawn-safe.
#[allow(async_fn_in_trait)]
pub trait Exchange {
    async fn fetch_balances(&self) -> Result<Vec<Balance>, ExchangeError>;

    /// Open orders, optionally restricted to one side
    async fn fetch_open_orders(&self, side: Option<OrderSide>)
        -> Result<OpenOrders, ExchangeError>;

    /// Daily bars for `market`, most-recent-first
    async fn fetch_daily_bars(
        &self,
        market: &str,
        count: usize,
    ) -> Result<Vec<DailyBar>, ExchangeError>;

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ExchangeError>;

    async fn cancel_order(&self, order_id: &str) -> Result<OrderReceipt, ExchangeError>;
}

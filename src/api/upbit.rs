use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};

use super::auth::Credentials;
use super::Exchange;
use crate::error::ExchangeError;
use crate::execution::quantize::{format_price, format_volume};
use crate::models::{
    Balance, DailyBar, OpenOrder, OpenOrders, OrderReceipt, OrderRequest, OrderSide, OrderType,
};

pub const UPBIT_API_BASE: &str = "https://api.upbit.com";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 10;
/// Largest candle count a single request may ask for
pub const MAX_CANDLES: usize = 200;
const ORDERS_PER_PAGE: usize = 100;
const MAX_ORDER_PAGES: u32 = 10;

// Documented limits are 10 req/s for quotation and 8 req/s for exchange calls
const QUOTATION_RPS: NonZeroU32 = match NonZeroU32::new(10) {
    Some(n) => n,
    None => panic!("quotation rate must be non-zero"),
};
const EXCHANGE_RPS: NonZeroU32 = match NonZeroU32::new(8) {
    Some(n) => n,
    None => panic!("exchange rate must be non-zero"),
};

type UpbitRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Deserialize)]
struct AccountResponse {
    currency: String,
    balance: String,
    locked: String,
    avg_buy_price: String,
    unit_currency: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    uuid: String,
    side: OrderSide,
    ord_type: String,
    price: Option<String>,
    market: String,
    created_at: DateTime<FixedOffset>,
    volume: Option<String>,
    remaining_volume: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandleResponse {
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    timestamp: i64, // ms, last trade in the bar
}

#[derive(Debug, Deserialize)]
struct ReceiptResponse {
    uuid: String,
    market: String,
    side: OrderSide,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    market: &'a str,
    side: OrderSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<String>,
    ord_type: &'static str,
}

impl<'a> OrderBody<'a> {
    fn from_request(request: &'a OrderRequest) -> Result<Self, ExchangeError> {
        let volume = format_volume(request.volume).ok_or_else(|| {
            ExchangeError::InvalidRequest(format!("unusable volume {}", request.volume))
        })?;

        match (request.order_type, request.side) {
            (OrderType::Limit, side) => {
                let price = format_price(request.price).ok_or_else(|| {
                    ExchangeError::InvalidRequest(format!("unusable price {}", request.price))
                })?;
                Ok(Self {
                    market: &request.market,
                    side,
                    volume: Some(volume),
                    price: Some(price),
                    ord_type: "limit",
                })
            }
            (OrderType::Market, OrderSide::Ask) => Ok(Self {
                market: &request.market,
                side: OrderSide::Ask,
                volume: Some(volume),
                price: None,
                ord_type: "market",
            }),
            (OrderType::Market, OrderSide::Bid) => Err(ExchangeError::InvalidRequest(
                "market bids are not supported".into(),
            )),
            (OrderType::Best, _) => Err(ExchangeError::InvalidRequest(
                "best-price orders are not supported".into(),
            )),
        }
    }
}

/// Upbit REST client
///
/// Cloneable; clones share the HTTP pool and rate limiters.
#[derive(Clone)]
pub struct UpbitClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    quotation_limiter: Arc<UpbitRateLimiter>,
    exchange_limiter: Arc<UpbitRateLimiter>,
    max_retries: u32,
    initial_backoff: Duration,
}

impl UpbitClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            quotation_limiter: Arc::new(RateLimiter::direct(Quota::per_second(QUOTATION_RPS))),
            exchange_limiter: Arc::new(RateLimiter::direct(Quota::per_second(EXCHANGE_RPS))),
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Override how idempotent reads are retried
    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    /// GET with retry and exponential backoff on transient failures
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        private: bool,
    ) -> Result<T, ExchangeError> {
        let mut attempt = 1;

        loop {
            match self.get_once(path, params, private).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(path, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    let backoff = self.initial_backoff * 2_u32.pow(attempt - 1);
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                        attempt,
                        self.max_retries,
                        path,
                        err,
                        backoff.as_millis()
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        private: bool,
    ) -> Result<T, ExchangeError> {
        let query = encode_params(params)?;
        let mut url = format!("{}{}", self.base_url, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let response = if private {
            self.exchange_limiter.until_ready().await;
            self.client
                .get(&url)
                .header("Authorization", self.credentials.bearer_token(&query)?)
                .send()
                .await?
        } else {
            self.quotation_limiter.until_ready().await;
            self.client.get(&url).send().await?
        };

        read_json(response).await
    }

    /// Single private call without retry (order placement and cancellation)
    async fn send_private<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: Option<&OrderBody<'_>>,
    ) -> Result<T, ExchangeError> {
        let url = if body.is_none() && !query.is_empty() {
            format!("{}{}?{}", self.base_url, path, query)
        } else {
            format!("{}{}", self.base_url, path)
        };

        self.exchange_limiter.until_ready().await;

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", self.credentials.bearer_token(query)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        read_json(request.send().await?).await
    }
}

impl Exchange for UpbitClient {
    async fn fetch_balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        let accounts: Vec<AccountResponse> = self.get("/v1/accounts", &[], true).await?;

        accounts
            .into_iter()
            .map(|a| {
                Ok(Balance {
                    balance: parse_number(&a.balance, "balance")?,
                    locked: parse_number(&a.locked, "locked")?,
                    avg_buy_price: parse_number(&a.avg_buy_price, "avg_buy_price")?,
                    currency: a.currency,
                    unit_currency: a.unit_currency,
                })
            })
            .collect()
    }

    async fn fetch_open_orders(&self, side: Option<OrderSide>) -> Result<OpenOrders, ExchangeError> {
        let mut orders = Vec::new();

        for page in 1..=MAX_ORDER_PAGES {
            let params = [
                ("state", "wait".to_string()),
                ("page", page.to_string()),
                ("limit", ORDERS_PER_PAGE.to_string()),
                ("order_by", "desc".to_string()),
            ];
            let batch: Vec<OrderResponse> = self.get("/v1/orders", &params, true).await?;
            let last_page = batch.len() < ORDERS_PER_PAGE;

            for raw in batch {
                let order = convert_order(raw)?;
                if side.map_or(true, |s| s == order.side) {
                    orders.push(order);
                }
            }

            if last_page {
                break;
            }
        }

        Ok(OpenOrders::from_orders(orders))
    }

    async fn fetch_daily_bars(
        &self,
        market: &str,
        count: usize,
    ) -> Result<Vec<DailyBar>, ExchangeError> {
        if count == 0 || count > MAX_CANDLES {
            return Err(ExchangeError::InvalidRequest(format!(
                "candle count must be within 1..={}, got {}",
                MAX_CANDLES, count
            )));
        }

        let params = [("market", market.to_string()), ("count", count.to_string())];
        let candles: Vec<CandleResponse> = self.get("/v1/candles/days", &params, false).await?;

        candles
            .into_iter()
            .map(|c| {
                let timestamp = DateTime::<Utc>::from_timestamp_millis(c.timestamp).ok_or_else(
                    || ExchangeError::Decode(format!("bad candle timestamp {}", c.timestamp)),
                )?;
                Ok(DailyBar {
                    open_price: c.opening_price,
                    high_price: c.high_price,
                    low_price: c.low_price,
                    trade_price: c.trade_price,
                    timestamp,
                })
            })
            .collect()
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ExchangeError> {
        let body = OrderBody::from_request(request)?;
        let query = serde_urlencoded::to_string(&body)
            .map_err(|e| ExchangeError::InvalidRequest(e.to_string()))?;

        let receipt: ReceiptResponse = self
            .send_private(Method::POST, "/v1/orders", &query, Some(&body))
            .await?;
        Ok(receipt.into())
    }

    async fn cancel_order(&self, order_id: &str) -> Result<OrderReceipt, ExchangeError> {
        let query = encode_params(&[("uuid", order_id.to_string())])?;

        let receipt: ReceiptResponse = self
            .send_private(Method::DELETE, "/v1/order", &query, None)
            .await?;
        Ok(receipt.into())
    }
}

impl From<ReceiptResponse> for OrderReceipt {
    fn from(r: ReceiptResponse) -> Self {
        OrderReceipt {
            id: r.uuid,
            market: r.market,
            side: r.side,
        }
    }
}

fn encode_params(params: &[(&str, String)]) -> Result<String, ExchangeError> {
    serde_urlencoded::to_string(params).map_err(|e| ExchangeError::InvalidRequest(e.to_string()))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ExchangeError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }

    Ok(serde_json::from_str(&body)?)
}

fn api_error(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ExchangeError::Api {
            status,
            name: envelope.error.name,
            message: envelope.error.message,
        },
        Err(_) => ExchangeError::Api {
            status,
            name: "unknown".to_string(),
            message: body.to_string(),
        },
    }
}

fn parse_number(value: &str, field: &str) -> Result<f64, ExchangeError> {
    value
        .parse()
        .map_err(|_| ExchangeError::Decode(format!("{} is not a number: {:?}", field, value)))
}

fn parse_optional(value: Option<&str>, field: &str) -> Result<Option<f64>, ExchangeError> {
    value.map(|v| parse_number(v, field)).transpose()
}

fn convert_order(raw: OrderResponse) -> Result<OpenOrder, ExchangeError> {
    // "price" is a market bid sized in fiat, "market" a market ask
    let order_type = match raw.ord_type.as_str() {
        "limit" => OrderType::Limit,
        "market" | "price" => OrderType::Market,
        "best" => OrderType::Best,
        other => {
            return Err(ExchangeError::Decode(format!(
                "unknown ord_type {:?} on order {}",
                other, raw.uuid
            )))
        }
    };

    Ok(OpenOrder {
        price: parse_optional(raw.price.as_deref(), "price")?,
        volume: parse_optional(raw.volume.as_deref(), "volume")?.unwrap_or(0.0),
        remaining_volume: parse_optional(raw.remaining_volume.as_deref(), "remaining_volume")?
            .unwrap_or(0.0),
        created_at: raw.created_at.with_timezone(&Utc),
        id: raw.uuid,
        market: raw.market,
        side: raw.side,
        order_type,
    })
}

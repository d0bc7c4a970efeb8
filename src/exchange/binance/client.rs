//! Binance spot REST client.
//!
//! Implements both `MarketDataSource` (public klines) and `OrderExecutor`
//! (signed order and account endpoints). Signed requests use HMAC-SHA256 over
//! the full query string, as described in the Binance API documentation.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use governor::{clock::DefaultClock, state::direct::NotKeyed, state::InMemoryState, Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::Method;
use rust_decimal::Decimal;
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::{
    classify_api_error, parse_kline, to_exchange_symbol, AccountResponse, ExchangeInfoResponse,
    LotSize, OrderResponse,
};
use crate::exchange::{
    Candle, ExchangeCredentials, ExchangeError, Granularity, MarketDataSource, OrderAck,
    OrderExecutor, OrderSide,
};

/// Production spot endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RECV_WINDOW_MS: u64 = 5_000;
/// Well under the spot request-weight limit for a handful of calls per cycle.
const REQUESTS_PER_SECOND: u32 = 10;
/// Hard cap of the klines endpoint.
const MAX_KLINES: usize = 1_000;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Binance spot REST client.
pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<ExchangeCredentials>,
    rate_limiter: Arc<DirectRateLimiter>,
    /// LOT_SIZE per exchange symbol, loaded on first use
    lot_sizes: Mutex<HashMap<String, Option<LotSize>>>,
}

impl BinanceClient {
    /// Client against the production endpoint.
    ///
    /// Credentials are optional: market data is public, only order and account
    /// calls need them.
    ///
    /// # Errors
    /// Returns `ExchangeError::Configuration` if the HTTP client cannot be built.
    pub fn new(credentials: Option<ExchangeCredentials>) -> Result<Self, ExchangeError> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Client against a custom endpoint (testnet, local stub server).
    pub fn with_base_url(
        credentials: Option<ExchangeCredentials>,
        base_url: impl Into<String>,
    ) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Configuration(e.to_string()))?;

        let per_second = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            rate_limiter,
            lot_sizes: Mutex::new(HashMap::new()),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> Result<&ExchangeCredentials, ExchangeError> {
        self.credentials.as_ref().ok_or_else(|| {
            ExchangeError::Authentication(
                "BINANCE_API_KEY and BINANCE_API_SECRET are required for signed endpoints"
                    .to_string(),
            )
        })
    }

    /// LOT_SIZE filter of `symbol` from `exchangeInfo`, cached per symbol.
    async fn lot_size(&self, symbol: &str) -> Result<Option<LotSize>, ExchangeError> {
        let exchange_symbol = to_exchange_symbol(symbol);
        let mut cache = self.lot_sizes.lock().await;
        if let Some(cached) = cache.get(&exchange_symbol) {
            return Ok(*cached);
        }

        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let request = self
            .http
            .get(url)
            .query(&[("symbol", exchange_symbol.as_str())]);
        let body = self.send(request).await?;
        let info: ExchangeInfoResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Unexpected(format!("Malformed exchangeInfo: {}", e)))?;

        let lot_size = match info.symbols.iter().find(|s| s.symbol == exchange_symbol) {
            Some(entry) => entry.lot_size()?,
            None => None,
        };
        if lot_size.is_none() {
            warn!(symbol, "No LOT_SIZE filter listed; sell quantities are sent unrounded");
        }
        debug!(symbol, ?lot_size, "Loaded symbol filters");

        cache.insert(exchange_symbol, lot_size);
        Ok(lot_size)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ExchangeError> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_api_error(status.as_u16(), &body))
        }
    }

    async fn send_signed(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, ExchangeError> {
        let credentials = self.credentials()?;

        let mut pairs: Vec<(&str, String)> = params.to_vec();
        pairs.push(("recvWindow", RECV_WINDOW_MS.to_string()));
        pairs.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        let query = encode_query(&pairs);
        let signature = sign_query(&credentials.api_secret, &query)?;

        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);
        let request = self
            .http
            .request(method, url)
            .header("X-MBX-APIKEY", &credentials.api_key);

        self.send(request).await
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size_param: (&str, Decimal),
    ) -> Result<OrderAck, ExchangeError> {
        let (size_key, size) = size_param;
        let params = [
            ("symbol", to_exchange_symbol(symbol)),
            ("side", side.as_exchange_str().to_string()),
            ("type", "MARKET".to_string()),
            (size_key, size.normalize().to_string()),
        ];

        let body = self.send_signed(Method::POST, "/api/v3/order", &params).await?;
        let order: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Unexpected(format!("Malformed order response: {}", e)))?;

        info!(
            order_id = order.order_id,
            symbol,
            side = %side,
            status = %order.status,
            executed_qty = order.executed_qty.as_deref().unwrap_or("?"),
            quote_qty = order.cummulative_quote_qty.as_deref().unwrap_or("?"),
            "Market order accepted"
        );

        Ok(OrderAck {
            order_id: order.order_id.to_string(),
            status: order.status,
        })
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let query = [
            ("symbol", to_exchange_symbol(symbol)),
            ("interval", granularity.as_str().to_string()),
            ("limit", limit.clamp(1, MAX_KLINES).to_string()),
        ];

        let body = self.send(self.http.get(url).query(&query)).await?;
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Unexpected(format!("Malformed kline payload: {}", e)))?;

        let candles = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(last) = candles.last() {
            debug!(
                symbol,
                count = candles.len(),
                last_close = last.close,
                "Fetched candles"
            );
        }

        Ok(candles)
    }
}

#[async_trait]
impl OrderExecutor for BinanceClient {
    async fn market_buy(
        &self,
        symbol: &str,
        quote_notional: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        info!(symbol, spend = %quote_notional, "Attempting MARKET BUY");
        // quoteOrderQty: spend exactly this much quote currency
        self.place_market_order(symbol, OrderSide::Buy, ("quoteOrderQty", quote_notional))
            .await
    }

    async fn market_sell(&self, symbol: &str, quantity: Decimal) -> Result<OrderAck, ExchangeError> {
        let sellable = self.sellable_quantity(symbol, quantity).await?;
        if sellable <= Decimal::ZERO {
            return Err(ExchangeError::InvalidOrder(format!(
                "Quantity {} of {} is below the minimum lot size",
                quantity, symbol
            )));
        }
        info!(symbol, qty = %sellable, "Attempting MARKET SELL");
        self.place_market_order(symbol, OrderSide::Sell, ("quantity", sellable))
            .await
    }

    async fn free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        let body = self.send_signed(Method::GET, "/api/v3/account", &[]).await?;
        let account: AccountResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Unexpected(format!("Malformed account response: {}", e)))?;

        let free = match account
            .balances
            .iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
        {
            Some(entry) => Decimal::from_str(&entry.free).map_err(|e| {
                ExchangeError::Unexpected(format!("Invalid free balance '{}': {}", entry.free, e))
            })?,
            None => Decimal::ZERO,
        };

        debug!(asset, free = %free, "Balance query");
        Ok(free)
    }

    async fn sellable_quantity(
        &self,
        symbol: &str,
        balance: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        Ok(match self.lot_size(symbol).await? {
            Some(lot) => lot.floor(balance),
            None => balance,
        })
    }
}

/// `k1=v1&k2=v2` in the given order. Values here are symbols, enums and
/// decimal numbers, none of which need percent-encoding.
fn encode_query(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex-encoded HMAC-SHA256 of `query` keyed by the API secret.
pub(crate) fn sign_query(secret: &str, query: &str) -> Result<String, ExchangeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Configuration(format!("Invalid API secret: {}", e)))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn map_transport_error(e: reqwest::Error) -> ExchangeError {
    if e.is_builder() {
        ExchangeError::Configuration(e.to_string())
    } else if e.is_decode() {
        ExchangeError::Unexpected(e.to_string())
    } else {
        // timeouts, connection failures, interrupted bodies
        ExchangeError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        routing::{get, post},
        Router,
    };
    use std::collections::HashMap;

    #[test]
    fn test_sign_query_matches_documented_vector() {
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_query(secret, query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_encode_query_preserves_order() {
        let pairs = [("symbol", "BTCUSDT".to_string()), ("side", "BUY".to_string())];
        assert_eq!(encode_query(&pairs), "symbol=BTCUSDT&side=BUY");
    }

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_candles_from_stub_server() {
        let app = Router::new().route(
            "/api/v3/klines",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("symbol").map(String::as_str), Some("ETHUSDT"));
                assert_eq!(params.get("interval").map(String::as_str), Some("15m"));
                axum::Json(serde_json::json!([
                    [1_700_000_000_000i64, "2000.0", "2010.0", "1990.0", "2005.0", "10.0"],
                    [1_700_000_900_000i64, "2005.0", "2020.0", "2000.0", "2015.5", "11.0"]
                ]))
            }),
        );
        let base_url = spawn_stub(app).await;

        let client = BinanceClient::with_base_url(None, base_url).unwrap();
        let candles = client
            .fetch_candles("ETH/USDT", Granularity::FifteenMinute, 2)
            .await
            .unwrap();

        assert_eq!(candles.len(), 2);
        assert!((candles[1].close - 2015.5).abs() < 1e-9);
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[tokio::test]
    async fn test_exchange_error_body_is_classified() {
        let app = Router::new().route(
            "/api/v3/klines",
            get(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    r#"{"code":-1121,"msg":"Invalid symbol."}"#,
                )
            }),
        );
        let base_url = spawn_stub(app).await;

        let client = BinanceClient::with_base_url(None, base_url).unwrap();
        let err = client
            .fetch_candles("NOPE/USDT", Granularity::OneHour, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    }

    #[tokio::test]
    async fn test_signed_calls_require_credentials() {
        let client = BinanceClient::with_base_url(None, "http://127.0.0.1:9").unwrap();
        let err = client.free_balance("BTC").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_free_balance_reads_matching_asset() {
        let app = Router::new().route(
            "/api/v3/account",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert!(params.contains_key("signature"));
                assert!(params.contains_key("timestamp"));
                axum::Json(serde_json::json!({
                    "balances": [
                        {"asset": "BTC", "free": "0.00250000", "locked": "0.00000000"},
                        {"asset": "USDT", "free": "12.5", "locked": "0"}
                    ]
                }))
            }),
        );
        let base_url = spawn_stub(app).await;
        let credentials = ExchangeCredentials {
            api_key: "key".into(),
            api_secret: "secret".into(),
        };

        let client = BinanceClient::with_base_url(Some(credentials), base_url).unwrap();
        assert_eq!(
            client.free_balance("BTC").await.unwrap(),
            Decimal::from_str("0.0025").unwrap()
        );
        assert_eq!(client.free_balance("ETH").await.unwrap(), Decimal::ZERO);
    }

    fn lot_size_stub(seen: Arc<std::sync::Mutex<Vec<HashMap<String, String>>>>) -> Router {
        Router::new()
            .route(
                "/api/v3/exchangeInfo",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let symbol = params.get("symbol").cloned().unwrap_or_default();
                    axum::Json(serde_json::json!({
                        "symbols": [{
                            "symbol": symbol,
                            "filters": [
                                {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                                {"filterType": "LOT_SIZE", "minQty": "0.00001000",
                                 "maxQty": "9000.00000000", "stepSize": "0.00001000"}
                            ]
                        }]
                    }))
                }),
            )
            .route(
                "/api/v3/order",
                post(move |Query(params): Query<HashMap<String, String>>| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push(params);
                        axum::Json(serde_json::json!({
                            "orderId": 7,
                            "status": "FILLED",
                            "executedQty": "0.00233000"
                        }))
                    }
                }),
            )
    }

    fn test_credentials() -> Option<ExchangeCredentials> {
        ExchangeCredentials::new("key", "secret")
    }

    #[tokio::test]
    async fn test_market_sell_floors_quantity_to_step_size() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let base_url = spawn_stub(lot_size_stub(seen.clone())).await;
        let client = BinanceClient::with_base_url(test_credentials(), base_url).unwrap();

        let ack = client
            .market_sell("BTC/USDT", Decimal::from_str("0.00233766").unwrap())
            .await
            .unwrap();
        assert_eq!(ack.order_id, "7");

        let orders = seen.lock().unwrap().clone();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].get("symbol").map(String::as_str), Some("BTCUSDT"));
        assert_eq!(orders[0].get("side").map(String::as_str), Some("SELL"));
        assert_eq!(orders[0].get("quantity").map(String::as_str), Some("0.00233"));
    }

    #[tokio::test]
    async fn test_dust_is_not_sellable_and_never_reaches_the_order_endpoint() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let base_url = spawn_stub(lot_size_stub(seen.clone())).await;
        let client = BinanceClient::with_base_url(test_credentials(), base_url).unwrap();

        let dust = Decimal::from_str("0.000004").unwrap();
        assert_eq!(
            client.sellable_quantity("BTC/USDT", dust).await.unwrap(),
            Decimal::ZERO
        );
        let err = client.market_sell("BTC/USDT", dust).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidOrder(_)));
        assert!(seen.lock().unwrap().is_empty());
    }
}

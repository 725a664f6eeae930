//! REST client for the Bybit v5 spot API.
//!
//! Every response arrives in a `retCode`/`retMsg`/`result` envelope; a
//! non-zero `retCode` is surfaced as an API error even when the HTTP
//! status is 200.

use crate::auth;
use chrono::Utc;
use pair_trade_core::config::BybitCredentials;
use pair_trade_core::error::VenueError;
use pair_trade_core::types::OrderSide;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

// =============================================================================
// Constants
// =============================================================================

/// Bybit production API base URL.
pub const BYBIT_MAINNET_URL: &str = "https://api.bybit.com";

/// Bybit testnet API base URL.
pub const BYBIT_TESTNET_URL: &str = "https://api-testnet.bybit.com";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Bybit client.
#[derive(Debug, Clone)]
pub struct BybitClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout_secs: u64,
}

impl BybitClientConfig {
    /// Builds a configuration from resolved account credentials.
    #[must_use]
    pub fn from_credentials(credentials: &BybitCredentials) -> Self {
        let base_url = if credentials.testnet {
            BYBIT_TESTNET_URL
        } else {
            BYBIT_MAINNET_URL
        };
        Self {
            base_url: base_url.to_string(),
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
            timeout_secs: 30,
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

// =============================================================================
// Domain types
// =============================================================================

/// One spot execution (fill), most recent first as the venue returns
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Quote-currency notional of the fill.
    pub value: Decimal,
}

/// Lot-size constraints for one spot instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentInfo {
    pub symbol: String,
    /// Smallest base-quantity step.
    pub base_precision: Decimal,
    /// Smallest quote-amount step.
    pub quote_precision: Decimal,
}

/// Which currency a spot market order's quantity denominates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketUnit {
    BaseCoin,
    QuoteCoin,
}

impl MarketUnit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseCoin => "baseCoin",
            Self::QuoteCoin => "quoteCoin",
        }
    }
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg")]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RawWalletBalanceResult {
    list: Vec<RawWalletAccount>,
}

#[derive(Debug, Deserialize)]
struct RawWalletAccount {
    coin: Vec<RawWalletCoin>,
}

#[derive(Debug, Deserialize)]
struct RawWalletCoin {
    coin: String,
    #[serde(rename = "walletBalance")]
    wallet_balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawInstrumentsResult {
    list: Vec<RawInstrument>,
}

#[derive(Debug, Deserialize)]
struct RawInstrument {
    symbol: String,
    #[serde(rename = "lotSizeFilter")]
    lot_size_filter: RawLotSizeFilter,
}

#[derive(Debug, Deserialize)]
struct RawLotSizeFilter {
    #[serde(rename = "basePrecision")]
    base_precision: Option<Decimal>,
    #[serde(rename = "quotePrecision")]
    quote_precision: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawExecutionsResult {
    list: Vec<RawExecution>,
}

#[derive(Debug, Deserialize)]
struct RawExecution {
    symbol: String,
    side: String,
    #[serde(rename = "execQty")]
    exec_qty: Option<Decimal>,
    #[serde(rename = "execPrice")]
    exec_price: Option<Decimal>,
    #[serde(rename = "execValue")]
    exec_value: Option<Decimal>,
}

impl TryFrom<RawExecution> for Execution {
    type Error = VenueError;

    fn try_from(raw: RawExecution) -> Result<Self, VenueError> {
        let side = match raw.side.as_str() {
            "Buy" => OrderSide::Buy,
            "Sell" => OrderSide::Sell,
            other => {
                return Err(VenueError::Serialization(format!(
                    "unknown execution side: '{other}'"
                )))
            }
        };
        let quantity = raw.exec_qty.unwrap_or_default();
        let price = raw.exec_price.unwrap_or_default();
        Ok(Self {
            symbol: raw.symbol,
            side,
            quantity,
            price,
            value: raw.exec_value.unwrap_or(quantity * price),
        })
    }
}

/// Order acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

// =============================================================================
// BybitClient
// =============================================================================

/// Bybit v5 REST client bound to one account's key material.
#[derive(Clone)]
pub struct BybitClient {
    config: BybitClientConfig,
    http: Client,
}

impl std::fmt::Debug for BybitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl BybitClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: BybitClientConfig) -> Result<Self, VenueError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VenueError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Signed GET; `query` is the raw query string without the `?`.
    async fn get_signed<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<T, VenueError> {
        let headers = auth::sign(
            &self.config.api_key,
            &self.config.api_secret,
            Utc::now().timestamp_millis(),
            query,
        )?;
        let url = format!("{}{path}?{query}", self.config.base_url);
        tracing::debug!("GET {}", url);
        let mut request = self.http.get(&url);
        for (name, value) in headers.as_tuples() {
            request = request.header(name, value);
        }
        Self::handle_response(request.send().await?).await
    }

    async fn get_public<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<T, VenueError> {
        let url = format!("{}{path}?{query}", self.config.base_url);
        tracing::debug!("GET {}", url);
        Self::handle_response(self.http.get(&url).send().await?).await
    }

    async fn post_signed<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, VenueError> {
        let body_json = serde_json::to_string(body)?;
        let headers = auth::sign(
            &self.config.api_key,
            &self.config.api_secret,
            Utc::now().timestamp_millis(),
            &body_json,
        )?;
        let url = format!("{}{path}", self.config.base_url);
        tracing::debug!("POST {} body_len={}", url, body_json.len());
        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json");
        for (name, value) in headers.as_tuples() {
            request = request.header(name, value);
        }
        Self::handle_response(request.body(body_json).send().await?).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, VenueError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VenueError::api(status.as_u16(), message));
        }
        let envelope: Envelope<T> = serde_json::from_str(&response.text().await?)?;
        if envelope.ret_code != 0 {
            return Err(VenueError::api(
                status.as_u16(),
                format!("retCode {}: {}", envelope.ret_code, envelope.ret_msg),
            ));
        }
        envelope
            .result
            .ok_or_else(|| VenueError::Serialization("missing result payload".to_string()))
    }

    // ===== Account =====

    /// Unified-account wallet balance for one coin; zero when the coin
    /// is not held.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn wallet_balance(&self, coin: &str) -> Result<Decimal, VenueError> {
        let query = format!("accountType=UNIFIED&coin={coin}");
        let result: RawWalletBalanceResult =
            self.get_signed("/v5/account/wallet-balance", &query).await?;
        Ok(result
            .list
            .first()
            .and_then(|account| account.coin.iter().find(|c| c.coin == coin))
            .and_then(|c| c.wallet_balance)
            .unwrap_or_default())
    }

    // ===== Market data =====

    /// Lot-size constraints for one spot symbol.
    ///
    /// # Errors
    /// Returns [`VenueError::SymbolNotFound`] when the venue does not
    /// list the symbol.
    pub async fn instrument(&self, symbol: &str) -> Result<InstrumentInfo, VenueError> {
        let query = format!("category=spot&symbol={symbol}");
        let result: RawInstrumentsResult =
            self.get_public("/v5/market/instruments-info", &query).await?;
        let raw = result
            .list
            .into_iter()
            .next()
            .ok_or_else(|| VenueError::symbol_not_found(symbol))?;
        Ok(InstrumentInfo {
            symbol: raw.symbol,
            base_precision: raw.lot_size_filter.base_precision.unwrap_or_default(),
            quote_precision: raw.lot_size_filter.quote_precision.unwrap_or_default(),
        })
    }

    // ===== Executions =====

    /// Recent spot executions for one symbol, most recent first.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn executions(&self, symbol: &str, limit: u32) -> Result<Vec<Execution>, VenueError> {
        let query = format!("category=spot&symbol={symbol}&limit={limit}");
        let result: RawExecutionsResult = self.get_signed("/v5/execution/list", &query).await?;
        result.list.into_iter().map(TryInto::try_into).collect()
    }

    // ===== Orders =====

    /// Submits a spot market order. `market_unit` declares whether `qty`
    /// is a base quantity or a quote amount.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
        market_unit: MarketUnit,
    ) -> Result<OrderAck, VenueError> {
        let side = match side {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        };
        let body = json!({
            "category": "spot",
            "symbol": symbol,
            "side": side,
            "orderType": "Market",
            "qty": qty.to_string(),
            "marketUnit": market_unit.as_str(),
        });
        self.post_signed("/v5/order/create", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> BybitClient {
        BybitClient::new(BybitClientConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            api_secret: "test-secret".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn wallet_balance_finds_the_requested_coin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/account/wallet-balance"))
            .and(query_param("coin", "USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ { "coin": [
                    { "coin": "USDT", "walletBalance": "1500.25" },
                ] } ] },
            })))
            .mount(&server)
            .await;

        let balance = test_client(&server).wallet_balance("USDT").await.unwrap();
        assert_eq!(balance, dec!(1500.25));
    }

    #[tokio::test]
    async fn missing_coin_reads_as_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/account/wallet-balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ { "coin": [] } ] },
            })))
            .mount(&server)
            .await;

        let balance = test_client(&server).wallet_balance("BTC").await.unwrap();
        assert_eq!(balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn nonzero_ret_code_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 10003,
                "retMsg": "API key is invalid.",
                "result": null,
            })))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .executions("BTCUSDT", 10)
            .await
            .unwrap_err();
        match err {
            VenueError::Api { message, .. } => assert!(message.contains("10003")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn instrument_surfaces_lot_size_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/instruments-info"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ {
                    "symbol": "BTCUSDT",
                    "lotSizeFilter": {
                        "basePrecision": "0.000001",
                        "quotePrecision": "0.01",
                        "minOrderQty": "0.000048",
                        "minOrderAmt": "1",
                    },
                } ] },
            })))
            .mount(&server)
            .await;

        let info = test_client(&server).instrument("BTCUSDT").await.unwrap();
        assert_eq!(info.base_precision, dec!(0.000001));
        assert_eq!(info.quote_precision, dec!(0.01));
    }

    #[tokio::test]
    async fn market_order_declares_its_unit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .and(body_partial_json(serde_json::json!({
                "category": "spot",
                "symbol": "BTCUSDT",
                "side": "Buy",
                "orderType": "Market",
                "qty": "495.00",
                "marketUnit": "quoteCoin",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "orderId": "order-1" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = test_client(&server)
            .place_market_order("BTCUSDT", OrderSide::Buy, dec!(495.00), MarketUnit::QuoteCoin)
            .await
            .unwrap();
        assert_eq!(ack.order_id, "order-1");
    }

    #[tokio::test]
    async fn unknown_symbol_is_symbol_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/instruments-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [] },
            })))
            .mount(&server)
            .await;

        let err = test_client(&server).instrument("NOPEUSDT").await.unwrap_err();
        assert!(matches!(err, VenueError::SymbolNotFound { .. }));
    }
}

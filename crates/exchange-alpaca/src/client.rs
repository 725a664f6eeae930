//! REST client for the equities brokerage.
//!
//! Typed access to the trading and market-data endpoints the pair-trade
//! flow needs: account balance, positions, closed-order history, asset
//! metadata, quotes, and order submission. The venue reports monetary
//! fields as JSON strings; raw response types keep them as strings and
//! conversions parse into `Decimal`.

use crate::types::{AccountBalance, AssetMetadata, ClosedOrder, Position};
use chrono::{DateTime, Utc};
use pair_trade_core::config::AlpacaCredentials;
use pair_trade_core::error::VenueError;
use pair_trade_core::types::{OrderIntent, OrderSide, OrderSizing, Quote, TimeInForce};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the equities client.
#[derive(Debug, Clone)]
pub struct AlpacaClientConfig {
    /// Trading API base URL (live or paper).
    pub trading_url: String,

    /// Market-data API base URL.
    pub data_url: String,

    /// API key id.
    pub key: String,

    /// API secret.
    pub secret: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl AlpacaClientConfig {
    /// Builds a configuration from resolved account credentials.
    #[must_use]
    pub fn from_credentials(credentials: &AlpacaCredentials, data_url: impl Into<String>) -> Self {
        Self {
            trading_url: credentials.endpoint.clone(),
            data_url: data_url.into(),
            key: credentials.key.clone(),
            secret: credentials.secret.clone(),
            timeout_secs: 30,
        }
    }
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct RawAccount {
    equity: String,
    cash: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPosition {
    symbol: String,
    qty: String,
    qty_available: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOrder {
    symbol: String,
    side: String,
    filled_qty: Option<String>,
    filled_avg_price: Option<String>,
    filled_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawAsset {
    symbol: String,
    fractionable: bool,
    tradable: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawQuoteResponse {
    quote: Option<RawQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawQuote {
    #[serde(rename = "ap")]
    ask_price: Option<Decimal>,
    #[serde(rename = "bp")]
    bid_price: Option<Decimal>,
    #[serde(rename = "as")]
    ask_size: Option<Decimal>,
    #[serde(rename = "bs")]
    bid_size: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBarResponse {
    bar: Option<RawBar>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBar {
    #[serde(rename = "c")]
    close: Option<Decimal>,
}

/// Order acknowledgement; only identity and status matter downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, VenueError> {
    value
        .parse()
        .map_err(|_| VenueError::Serialization(format!("unparsable {field}: '{value}'")))
}

fn parse_side(value: &str) -> Result<OrderSide, VenueError> {
    match value {
        "buy" => Ok(OrderSide::Buy),
        "sell" => Ok(OrderSide::Sell),
        other => Err(VenueError::Serialization(format!(
            "unknown order side: '{other}'"
        ))),
    }
}

impl TryFrom<RawAccount> for AccountBalance {
    type Error = VenueError;

    fn try_from(raw: RawAccount) -> Result<Self, VenueError> {
        Ok(Self {
            equity: parse_decimal("equity", &raw.equity)?,
            cash: parse_decimal("cash", &raw.cash)?,
        })
    }
}

impl TryFrom<RawPosition> for Position {
    type Error = VenueError;

    fn try_from(raw: RawPosition) -> Result<Self, VenueError> {
        let quantity = parse_decimal("qty", &raw.qty)?;
        let quantity_available = match raw.qty_available {
            Some(qty) => parse_decimal("qty_available", &qty)?,
            None => quantity,
        };
        Ok(Self {
            symbol: raw.symbol,
            quantity,
            quantity_available,
        })
    }
}

impl TryFrom<RawOrder> for ClosedOrder {
    type Error = VenueError;

    fn try_from(raw: RawOrder) -> Result<Self, VenueError> {
        let filled_quantity = match raw.filled_qty.as_deref() {
            Some(qty) => parse_decimal("filled_qty", qty)?,
            None => Decimal::ZERO,
        };
        let filled_avg_price = match raw.filled_avg_price.as_deref() {
            Some(price) => parse_decimal("filled_avg_price", price)?,
            None => Decimal::ZERO,
        };
        Ok(Self {
            symbol: raw.symbol,
            side: parse_side(&raw.side)?,
            filled_quantity,
            filled_avg_price,
            filled_at: raw.filled_at.and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|d| d.with_timezone(&Utc))
            }),
        })
    }
}

impl From<RawAsset> for AssetMetadata {
    fn from(raw: RawAsset) -> Self {
        Self {
            symbol: raw.symbol,
            fractionable: raw.fractionable,
            tradable: raw.tradable,
        }
    }
}

// =============================================================================
// AlpacaClient
// =============================================================================

/// Equities brokerage REST client bound to one account's credentials.
#[derive(Clone)]
pub struct AlpacaClient {
    config: AlpacaClientConfig,
    http: Client,
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("trading_url", &self.config.trading_url)
            .field("data_url", &self.config.data_url)
            .finish_non_exhaustive()
    }
}

impl AlpacaClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AlpacaClientConfig) -> Result<Self, VenueError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VenueError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
    ) -> Result<T, VenueError> {
        let url = format!("{base}{path}");
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .header("APCA-API-KEY-ID", &self.config.key)
            .header("APCA-API-SECRET-KEY", &self.config.secret)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, VenueError> {
        let url = format!("{}{path}", self.config.trading_url);
        tracing::debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .header("APCA-API-KEY-ID", &self.config.key)
            .header("APCA-API-SECRET-KEY", &self.config.secret)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, VenueError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VenueError::api(status.as_u16(), message));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(Into::into)
    }

    // ===== Account =====

    /// Fetches the account's equity and settled cash.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn account_balance(&self) -> Result<AccountBalance, VenueError> {
        let raw: RawAccount = self.get(&self.config.trading_url, "/v2/account").await?;
        raw.try_into()
    }

    // ===== Positions =====

    /// Fetches the open position for one symbol; `None` when flat.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure other than the
    /// no-position case.
    pub async fn open_position(&self, symbol: &str) -> Result<Option<Position>, VenueError> {
        let url = format!("{}/v2/positions/{symbol}", self.config.trading_url);
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .header("APCA-API-KEY-ID", &self.config.key)
            .header("APCA-API-SECRET-KEY", &self.config.secret)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: RawPosition = Self::handle_response(response).await?;
        Ok(Some(raw.try_into()?))
    }

    /// Requests a full market close of the symbol's position.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn close_position(&self, symbol: &str) -> Result<(), VenueError> {
        let url = format!("{}/v2/positions/{symbol}", self.config.trading_url);
        tracing::debug!("DELETE {}", url);
        let response = self
            .http
            .delete(&url)
            .header("APCA-API-KEY-ID", &self.config.key)
            .header("APCA-API-SECRET-KEY", &self.config.secret)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VenueError::api(status.as_u16(), message));
        }
        Ok(())
    }

    // ===== Order history =====

    /// Fetches up to `limit` closed orders for one symbol, most recent
    /// first, keeping only orders that actually filled.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn closed_orders(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<ClosedOrder>, VenueError> {
        let path =
            format!("/v2/orders?status=closed&symbols={symbol}&limit={limit}&direction=desc");
        let raw: Vec<RawOrder> = self.get(&self.config.trading_url, &path).await?;
        let mut orders = Vec::with_capacity(raw.len());
        for order in raw {
            let order: ClosedOrder = order.try_into()?;
            if order.filled_quantity > Decimal::ZERO {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    // ===== Assets =====

    /// Fetches capability metadata for one asset.
    ///
    /// # Errors
    /// Returns [`VenueError::SymbolNotFound`] for unknown symbols and
    /// [`VenueError`] on transport failure.
    pub async fn asset(&self, symbol: &str) -> Result<AssetMetadata, VenueError> {
        let url = format!("{}/v2/assets/{symbol}", self.config.trading_url);
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .header("APCA-API-KEY-ID", &self.config.key)
            .header("APCA-API-SECRET-KEY", &self.config.secret)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(VenueError::symbol_not_found(symbol));
        }
        let raw: RawAsset = Self::handle_response(response).await?;
        Ok(raw.into())
    }

    // ===== Market data =====

    /// Latest quote, falling back to the latest bar's close when the
    /// quote comes back with all-zero prices. An unavailable quote after
    /// both attempts is returned as [`Quote::unavailable`], not an error.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn latest_quote(&self, symbol: &str) -> Result<Quote, VenueError> {
        let path = format!("/v2/stocks/{symbol}/quotes/latest");
        let raw: RawQuoteResponse = self.get(&self.config.data_url, &path).await?;
        let quote = raw.quote.map_or_else(Quote::unavailable, |q| Quote {
            ask_price: q.ask_price.unwrap_or_default(),
            bid_price: q.bid_price.unwrap_or_default(),
            ask_size: q.ask_size,
            bid_size: q.bid_size,
        });
        if !quote.is_unavailable() {
            return Ok(quote);
        }
        // Thinly traded symbols often have no NBBO; the last bar close is
        // the backup price source.
        self.latest_bar_as_quote(symbol).await
    }

    async fn latest_bar_as_quote(&self, symbol: &str) -> Result<Quote, VenueError> {
        let path = format!("/v2/stocks/{symbol}/bars/latest");
        let raw: RawBarResponse = self.get(&self.config.data_url, &path).await?;
        let close = raw.bar.and_then(|b| b.close).unwrap_or_default();
        Ok(Quote {
            ask_price: close,
            bid_price: close,
            ask_size: None,
            bid_size: None,
        })
    }

    // ===== Orders =====

    /// Submits one order.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderAck, VenueError> {
        let mut body = json!({
            "symbol": intent.symbol,
            "side": intent.side.as_str(),
            "time_in_force": match intent.time_in_force {
                TimeInForce::Day => "day",
                TimeInForce::Gtc => "gtc",
                TimeInForce::Ioc => "ioc",
            },
        });
        match intent.sizing {
            OrderSizing::Notional(amount) => {
                body["notional"] = json!(amount.to_string());
            }
            OrderSizing::Quantity(quantity) => {
                body["qty"] = json!(quantity.to_string());
            }
        }
        match intent.limit_price {
            Some(price) => {
                body["type"] = json!("limit");
                body["limit_price"] = json!(price.to_string());
                // Limit orders are what extended-hours sessions accept.
                body["extended_hours"] = json!(true);
            }
            None => {
                body["type"] = json!("market");
            }
        }
        self.post("/v2/orders", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> AlpacaClient {
        AlpacaClient::new(AlpacaClientConfig {
            trading_url: server.uri(),
            data_url: server.uri(),
            key: "test-key".to_string(),
            secret: "test-secret".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn account_balance_parses_string_amounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .and(header("APCA-API-KEY-ID", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "equity": "10000.00",
                "cash": "2500.50",
            })))
            .mount(&server)
            .await;

        let balance = test_client(&server).account_balance().await.unwrap();
        assert_eq!(balance.equity, dec!(10000.00));
        assert_eq!(balance.cash, dec!(2500.50));
    }

    #[tokio::test]
    async fn missing_position_is_none_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/positions/TSLZ"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 40410000,
                "message": "position does not exist",
            })))
            .mount(&server)
            .await;

        let position = test_client(&server).open_position("TSLZ").await.unwrap();
        assert!(position.is_none());
    }

    #[tokio::test]
    async fn closed_orders_drop_unfilled_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/orders"))
            .and(query_param("status", "closed"))
            .and(query_param("symbols", "TSLZ"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "symbol": "TSLZ",
                    "side": "sell",
                    "filled_qty": "10",
                    "filled_avg_price": "200",
                    "filled_at": "2024-06-12T15:00:00Z",
                },
                {
                    "symbol": "TSLZ",
                    "side": "buy",
                    "filled_qty": "0",
                    "filled_avg_price": null,
                    "filled_at": null,
                },
            ])))
            .mount(&server)
            .await;

        let orders = test_client(&server).closed_orders("TSLZ", 5).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].filled_quantity, dec!(10));
    }

    #[tokio::test]
    async fn zero_quote_falls_back_to_latest_bar() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/TSLT/quotes/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "quote": { "ap": "0", "bp": "0", "as": "0", "bs": "0" },
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/TSLT/bars/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bar": { "c": "12.34" },
            })))
            .mount(&server)
            .await;

        let quote = test_client(&server).latest_quote("TSLT").await.unwrap();
        assert_eq!(quote.ask_price, dec!(12.34));
        assert_eq!(quote.bid_price, dec!(12.34));
    }

    #[tokio::test]
    async fn market_notional_order_serializes_as_expected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .and(body_partial_json(serde_json::json!({
                "symbol": "TSLT",
                "side": "buy",
                "type": "market",
                "notional": "3300.00",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order-1",
                "status": "accepted",
            })))
            .mount(&server)
            .await;

        let intent = OrderIntent::market("TSLT", OrderSide::Buy, OrderSizing::Notional(dec!(3300.00)));
        let ack = test_client(&server).submit_order(&intent).await.unwrap();
        assert_eq!(ack.status, "accepted");
    }

    #[tokio::test]
    async fn limit_order_carries_extended_hours_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .and(body_partial_json(serde_json::json!({
                "type": "limit",
                "limit_price": "12.35",
                "extended_hours": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order-2",
                "status": "accepted",
            })))
            .mount(&server)
            .await;

        let intent = OrderIntent::limit(
            "TSLT",
            OrderSide::Buy,
            OrderSizing::Quantity(dec!(10)),
            dec!(12.35),
        );
        test_client(&server).submit_order(&intent).await.unwrap();
    }

    #[tokio::test]
    async fn api_failure_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = test_client(&server).account_balance().await.unwrap_err();
        assert!(matches!(err, VenueError::Api { status_code: 403, .. }));
    }
}

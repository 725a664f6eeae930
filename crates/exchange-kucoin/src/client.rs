//! REST client for the KuCoin spot API.
//!
//! Responses arrive in a `code`/`data` envelope; any code other than
//! `"200000"` is an API error regardless of HTTP status. KuCoin uses
//! hyphenated symbols (`BTC-USDT`) natively, so no symbol translation
//! happens here.

use crate::auth;
use chrono::Utc;
use pair_trade_core::config::KucoinCredentials;
use pair_trade_core::error::VenueError;
use pair_trade_core::types::OrderSide;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// The envelope code that signals success.
const SUCCESS_CODE: &str = "200000";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the KuCoin client.
#[derive(Debug, Clone)]
pub struct KucoinClientConfig {
    pub base_url: String,
    pub credentials: KucoinCredentials,
    pub timeout_secs: u64,
}

impl KucoinClientConfig {
    /// Builds a configuration from resolved account credentials.
    #[must_use]
    pub fn from_credentials(credentials: &KucoinCredentials, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: credentials.clone(),
            timeout_secs: 30,
        }
    }
}

// =============================================================================
// Domain types
// =============================================================================

/// One spot fill, most recent first as the venue returns them.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub price: Decimal,
    /// Quote-currency notional of the fill.
    pub funds: Decimal,
}

/// Increment constraints for one spot symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub symbol: String,
    /// Smallest base-size step.
    pub base_increment: Decimal,
    /// Smallest quote-funds step.
    pub quote_increment: Decimal,
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    currency: String,
    #[serde(rename = "type")]
    account_type: String,
    available: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawSymbol {
    symbol: String,
    #[serde(rename = "baseIncrement")]
    base_increment: Option<Decimal>,
    #[serde(rename = "quoteIncrement")]
    quote_increment: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawFillsPage {
    items: Vec<RawFill>,
}

#[derive(Debug, Deserialize)]
struct RawFill {
    symbol: String,
    side: String,
    size: Option<Decimal>,
    price: Option<Decimal>,
    funds: Option<Decimal>,
}

impl TryFrom<RawFill> for Fill {
    type Error = VenueError;

    fn try_from(raw: RawFill) -> Result<Self, VenueError> {
        let side = match raw.side.as_str() {
            "buy" => OrderSide::Buy,
            "sell" => OrderSide::Sell,
            other => {
                return Err(VenueError::Serialization(format!(
                    "unknown fill side: '{other}'"
                )))
            }
        };
        let size = raw.size.unwrap_or_default();
        let price = raw.price.unwrap_or_default();
        Ok(Self {
            symbol: raw.symbol,
            side,
            size,
            price,
            funds: raw.funds.unwrap_or(size * price),
        })
    }
}

/// Order acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// How a market order's amount is denominated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketAmount {
    /// Quote-currency `funds`, the venue's denomination for buys.
    Funds(Decimal),
    /// Base-currency `size`, the venue's denomination for sells.
    Size(Decimal),
}

// =============================================================================
// KucoinClient
// =============================================================================

/// KuCoin REST client bound to one account's key material.
#[derive(Clone)]
pub struct KucoinClient {
    config: KucoinClientConfig,
    http: Client,
}

impl std::fmt::Debug for KucoinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KucoinClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl KucoinClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: KucoinClientConfig) -> Result<Self, VenueError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VenueError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Signed GET; `endpoint` includes the query string.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, VenueError> {
        let headers = auth::sign(
            &self.config.credentials,
            Utc::now().timestamp_millis(),
            "GET",
            endpoint,
            "",
        )?;
        let url = format!("{}{endpoint}", self.config.base_url);
        tracing::debug!("GET {}", url);
        let mut request = self.http.get(&url);
        for (name, value) in headers.as_tuples() {
            request = request.header(name, value);
        }
        Self::handle_response(request.send().await?).await
    }

    async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, VenueError> {
        let body_json = serde_json::to_string(body)?;
        let headers = auth::sign(
            &self.config.credentials,
            Utc::now().timestamp_millis(),
            "POST",
            endpoint,
            &body_json,
        )?;
        let url = format!("{}{endpoint}", self.config.base_url);
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
        if envelope.code != SUCCESS_CODE {
            return Err(VenueError::api(
                status.as_u16(),
                format!(
                    "code {}: {}",
                    envelope.code,
                    envelope.msg.unwrap_or_default()
                ),
            ));
        }
        envelope
            .data
            .ok_or_else(|| VenueError::Serialization("missing data payload".to_string()))
    }

    // ===== Account =====

    /// Available trade-account balance for one currency; zero when no
    /// such account exists.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn trade_balance(&self, currency: &str) -> Result<Decimal, VenueError> {
        let endpoint = format!("/api/v1/accounts?currency={currency}&type=trade");
        let accounts: Vec<RawAccount> = self.get(&endpoint).await?;
        Ok(accounts
            .iter()
            .find(|a| a.currency == currency && a.account_type == "trade")
            .and_then(|a| a.available)
            .unwrap_or_default())
    }

    // ===== Market data =====

    /// Increment constraints for one symbol.
    ///
    /// # Errors
    /// Returns [`VenueError::SymbolNotFound`] when the venue does not
    /// list the symbol.
    pub async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, VenueError> {
        let endpoint = format!("/api/v2/symbols/{symbol}");
        let raw: RawSymbol = self.get(&endpoint).await.map_err(|err| match err {
            VenueError::Api { status_code: 404, .. } => VenueError::symbol_not_found(symbol),
            other => other,
        })?;
        Ok(SymbolInfo {
            symbol: raw.symbol,
            base_increment: raw.base_increment.unwrap_or_default(),
            quote_increment: raw.quote_increment.unwrap_or_default(),
        })
    }

    // ===== Fills =====

    /// Recent fills for one symbol, most recent first.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn fills(&self, symbol: &str) -> Result<Vec<Fill>, VenueError> {
        let endpoint = format!("/api/v1/fills?symbol={symbol}&tradeType=TRADE");
        let page: RawFillsPage = self.get(&endpoint).await?;
        page.items.into_iter().map(TryInto::try_into).collect()
    }

    // ===== Orders =====

    /// Submits a spot market order with a fresh client order id.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: MarketAmount,
    ) -> Result<OrderAck, VenueError> {
        let mut body = json!({
            "clientOid": Uuid::new_v4().to_string(),
            "symbol": symbol,
            "side": side.as_str(),
            "type": "market",
        });
        match amount {
            MarketAmount::Funds(funds) => body["funds"] = json!(funds.to_string()),
            MarketAmount::Size(size) => body["size"] = json!(size.to_string()),
        }
        self.post("/api/v1/orders", &body).await
    }
}

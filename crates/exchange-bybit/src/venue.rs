//! The Bybit spot venue wired into the pair-trade orchestration.

use crate::client::{BybitClient, BybitClientConfig, MarketUnit};
use crate::profit_loss::{self, EXECUTION_WINDOW};
use async_trait::async_trait;
use pair_trade_core::config::{Accounts, BybitConfig, TradingConfig};
use pair_trade_core::error::{ProfitLossError, VenueError};
use pair_trade_core::pairs::{SpotPair, TradingPairMap};
use pair_trade_core::sizing;
use pair_trade_core::tax::TaxKind;
use pair_trade_core::traits::PairTradeVenue;
use pair_trade_core::types::{AccountName, OrderSide};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Bybit spot venue adapter.
///
/// Spot markets have no close-position primitive: closing means market-
/// selling the whole balance of the pair's non-stablecoin leg, and a
/// position counts as open while the most recent fill is anything other
/// than a sell into the preferred stablecoin. Tax is booked by buying
/// the configured tax pair for the tax amount, so the liability is held
/// as an actual stablecoin balance.
pub struct BybitVenue {
    config: BybitConfig,
    trading: TradingConfig,
    clients: Accounts<BybitClient>,
}

impl BybitVenue {
    /// Builds the venue, constructing a client per configured account.
    ///
    /// # Errors
    /// Returns an error when an HTTP client cannot be built.
    pub fn new(config: BybitConfig, trading: TradingConfig) -> Result<Self, VenueError> {
        let clients = Accounts {
            live: config
                .accounts
                .live
                .as_ref()
                .map(|c| BybitClient::new(BybitClientConfig::from_credentials(c)))
                .transpose()?,
            paper: config
                .accounts
                .paper
                .as_ref()
                .map(|c| BybitClient::new(BybitClientConfig::from_credentials(c)))
                .transpose()?,
        };
        Ok(Self {
            config,
            trading,
            clients,
        })
    }

    fn client(&self, account: AccountName) -> Result<&BybitClient, VenueError> {
        self.clients
            .resolve(account, self.trading.development_mode)
            .ok_or_else(|| VenueError::missing_credentials(account.to_string()))
    }

    /// The side that sells the pair's non-stablecoin leg into the
    /// preferred stablecoin, i.e. the side that closes a position.
    fn closing_side(&self, pair: &SpotPair) -> OrderSide {
        if pair.base == self.config.preferred_stablecoin {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    /// Submits a market order for a fixed amount of one leg, refusing
    /// when the spending balance does not exceed the amount. Buys
    /// quantize the quote amount to the base step and sells the base
    /// quantity to the quote step, matching the venue's accepted
    /// denominations for fixed-amount spot orders.
    ///
    /// # Errors
    /// Returns [`VenueError`] on credential or transport failure.
    pub async fn submit_custom_amount(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        account: AccountName,
    ) -> Result<(), VenueError> {
        let pair = SpotPair::parse(symbol).map_err(|_| VenueError::symbol_not_found(symbol))?;
        let client = self.client(account)?;
        let venue_symbol = pair.venue_symbol();
        let instrument = client.instrument(&venue_symbol).await?;

        let (spend_coin, step, unit) = match side {
            OrderSide::Buy => (&pair.quote, instrument.base_precision, MarketUnit::QuoteCoin),
            OrderSide::Sell => (&pair.base, instrument.quote_precision, MarketUnit::BaseCoin),
        };
        let balance = client.wallet_balance(spend_coin).await?;
        if balance <= amount {
            warn!(
                symbol,
                %amount,
                %balance,
                "balance does not cover requested amount, order skipped"
            );
            return Ok(());
        }
        let qty = sizing::quantize_to_increment(amount, step);
        if qty <= Decimal::ZERO {
            warn!(symbol, %amount, "amount quantized to zero, order skipped");
            return Ok(());
        }
        let ack = client
            .place_market_order(&venue_symbol, side, qty, unit)
            .await?;
        info!(symbol, %qty, order_id = %ack.order_id, "custom amount order submitted");
        Ok(())
    }
}

#[async_trait]
impl PairTradeVenue for BybitVenue {
    fn name(&self) -> &'static str {
        "bybit"
    }

    fn tax_kind(&self) -> TaxKind {
        TaxKind::Income
    }

    fn pairs(&self) -> &TradingPairMap {
        &self.config.pairs
    }

    async fn inverse_position_open(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<bool, VenueError> {
        let pair = SpotPair::parse(symbol).map_err(|_| VenueError::symbol_not_found(symbol))?;
        let client = self.client(account)?;
        let executions = client.executions(&pair.venue_symbol(), 1).await?;
        let closing_side = self.closing_side(&pair);
        Ok(executions
            .first()
            .is_some_and(|fill| fill.side != closing_side))
    }

    async fn close_inverse_position(
        &self,
        symbol: &str,
        account: AccountName,
        _outside_market_hours: bool,
    ) -> Result<(), VenueError> {
        let pair = SpotPair::parse(symbol).map_err(|_| VenueError::symbol_not_found(symbol))?;
        let client = self.client(account)?;
        let venue_symbol = pair.venue_symbol();
        let instrument = client.instrument(&venue_symbol).await?;

        let side = self.closing_side(&pair);
        let (coin, step, unit) = match side {
            OrderSide::Sell => (&pair.base, instrument.base_precision, MarketUnit::BaseCoin),
            OrderSide::Buy => (&pair.quote, instrument.quote_precision, MarketUnit::QuoteCoin),
        };
        let balance = client.wallet_balance(coin).await?;
        let qty = sizing::quantize_to_increment(balance, step);
        if qty <= Decimal::ZERO {
            info!(symbol, coin = %coin, "no balance to close");
            return Ok(());
        }
        let ack = client.place_market_order(&venue_symbol, side, qty, unit).await?;
        info!(symbol, %qty, order_id = %ack.order_id, "close order submitted");
        Ok(())
    }

    async fn realized_profit_loss(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<Decimal, ProfitLossError> {
        let pair = SpotPair::parse(symbol)
            .map_err(|_| ProfitLossError::Venue(VenueError::symbol_not_found(symbol)))?;
        let client = self.client(account)?;
        let executions = client
            .executions(&pair.venue_symbol(), EXECUTION_WINDOW)
            .await?;
        Ok(profit_loss::realized_profit_loss(&executions))
    }

    async fn record_tax(
        &self,
        _symbol: &str,
        tax_amount: Decimal,
        account: AccountName,
    ) -> Result<(), VenueError> {
        // Tax becomes a holding: buy the tax pair for the tax amount.
        let tax_pair = self.config.tax_pair.clone();
        self.submit_custom_amount(&tax_pair, OrderSide::Buy, tax_amount, account)
            .await
    }

    async fn open_position(
        &self,
        symbol: &str,
        capital_fraction: Decimal,
        account: AccountName,
        _outside_market_hours: bool,
    ) -> Result<(), VenueError> {
        let pair = SpotPair::parse(symbol).map_err(|_| VenueError::symbol_not_found(symbol))?;
        let client = self.client(account)?;
        let venue_symbol = pair.venue_symbol();
        let instrument = client.instrument(&venue_symbol).await?;

        let side = self.closing_side(&pair).opposite();
        let (coin, step, unit) = match side {
            OrderSide::Buy => (&pair.quote, instrument.quote_precision, MarketUnit::QuoteCoin),
            OrderSide::Sell => (&pair.base, instrument.base_precision, MarketUnit::BaseCoin),
        };
        let balance = client.wallet_balance(coin).await?;
        let qty = match sizing::quantity_from_balance(balance, capital_fraction, step) {
            Ok(qty) => qty,
            Err(err) => {
                warn!(symbol, error = %err, "entry skipped");
                return Ok(());
            }
        };
        let ack = client.place_market_order(&venue_symbol, side, qty, unit).await?;
        info!(symbol, %qty, order_id = %ack.order_id, "entry order submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pair_trade_core::config::BybitCredentials;
    use pair_trade_core::pairs::PairEntry;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn venue_for(server: &MockServer) -> BybitVenue {
        let mut pairs = BTreeMap::new();
        pairs.insert(
            "BTCUP".to_string(),
            PairEntry {
                symbol: "BTC-USDT".to_string(),
                inverse: "ETH-USDT".to_string(),
            },
        );
        let mut config = BybitConfig::default();
        config.accounts = Accounts {
            live: Some(BybitCredentials {
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                testnet: false,
            }),
            paper: None,
        };
        config.pairs = TradingPairMap::new(pairs).unwrap();
        let mut venue = BybitVenue::new(
            config,
            TradingConfig {
                capital_gains_tax_rate: dec!(0.26375),
                income_tax_rate: dec!(0.42),
                capital_to_deploy: dec!(0.33),
                development_mode: false,
            },
        )
        .unwrap();
        // Point the prebuilt client at the mock server.
        let credentials = BybitCredentials {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            testnet: false,
        };
        venue.clients.live = Some(
            BybitClient::new(
                BybitClientConfig::from_credentials(&credentials).with_base_url(server.uri()),
            )
            .unwrap(),
        );
        venue
    }

    fn mock_instrument() -> serde_json::Value {
        serde_json::json!({
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
        })
    }

    #[tokio::test]
    async fn last_fill_buy_means_position_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [
                    { "symbol": "BTCUSDT", "side": "Buy", "execQty": "0.5",
                      "execPrice": "28000", "execValue": "14000" },
                ] },
            })))
            .mount(&server)
            .await;

        let venue = venue_for(&server);
        assert!(venue
            .inverse_position_open("BTC-USDT", AccountName::Live)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn last_fill_sell_into_stablecoin_means_closed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [
                    { "symbol": "BTCUSDT", "side": "Sell", "execQty": "0.5",
                      "execPrice": "30000", "execValue": "15000" },
                ] },
            })))
            .mount(&server)
            .await;

        let venue = venue_for(&server);
        assert!(!venue
            .inverse_position_open("BTC-USDT", AccountName::Live)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn entry_spends_a_fraction_of_the_stablecoin_balance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/instruments-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_instrument()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/account/wallet-balance"))
            .and(query_param("coin", "USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ { "coin": [
                    { "coin": "USDT", "walletBalance": "1500.257" },
                ] } ] },
            })))
            .mount(&server)
            .await;
        // 1500.257 * 0.33 = 495.08481 -> 495.08 on the 0.01 quote step.
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .and(body_partial_json(serde_json::json!({
                "symbol": "BTCUSDT",
                "side": "Buy",
                "orderType": "Market",
                "qty": "495.08",
                "marketUnit": "quoteCoin",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0, "retMsg": "OK", "result": { "orderId": "order-1" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let venue = venue_for(&server);
        venue
            .open_position("BTC-USDT", dec!(0.33), AccountName::Live, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn close_sells_the_whole_base_balance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/instruments-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_instrument()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/account/wallet-balance"))
            .and(query_param("coin", "BTC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ { "coin": [
                    { "coin": "BTC", "walletBalance": "0.5123456789" },
                ] } ] },
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .and(body_partial_json(serde_json::json!({
                "side": "Sell",
                "qty": "0.512345",
                "marketUnit": "baseCoin",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0, "retMsg": "OK", "result": { "orderId": "order-2" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let venue = venue_for(&server);
        venue
            .close_inverse_position("BTC-USDT", AccountName::Live, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tax_conversion_refuses_when_balance_cannot_cover_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/instruments-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ {
                    "symbol": "USDCUSDT",
                    "lotSizeFilter": {
                        "basePrecision": "0.01",
                        "quotePrecision": "0.01",
                        "minOrderQty": "1",
                        "minOrderAmt": "1",
                    },
                } ] },
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/account/wallet-balance"))
            .and(query_param("coin", "USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [ { "coin": [
                    { "coin": "USDT", "walletBalance": "50.00" },
                ] } ] },
            })))
            .mount(&server)
            .await;
        // No order mock: a submission attempt would fail the test.

        let venue = venue_for(&server);
        venue
            .record_tax("BTC-USDT", dec!(131.875), AccountName::Live)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unmatched_history_reads_as_zero_profit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "list": [] },
            })))
            .mount(&server)
            .await;

        let venue = venue_for(&server);
        let profit = venue
            .realized_profit_loss("BTC-USDT", AccountName::Live)
            .await
            .unwrap();
        assert_eq!(profit, Decimal::ZERO);
    }
}

//! The KuCoin spot venue wired into the pair-trade orchestration.

use crate::client::{KucoinClient, KucoinClientConfig, MarketAmount};
use crate::profit_loss;
use async_trait::async_trait;
use pair_trade_core::config::{Accounts, KucoinConfig, TradingConfig};
use pair_trade_core::error::{ProfitLossError, VenueError};
use pair_trade_core::pairs::{SpotPair, TradingPairMap};
use pair_trade_core::sizing;
use pair_trade_core::tax::TaxKind;
use pair_trade_core::traits::PairTradeVenue;
use pair_trade_core::types::{AccountName, OrderSide};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// KuCoin spot venue adapter.
///
/// Same shape as the other spot venue: no close-position primitive, so
/// closing market-sells the whole non-stablecoin balance; buys are
/// funds-denominated and sells size-denominated; tax is booked by buying
/// the configured tax pair for the tax amount. KuCoin has no testnet, so
/// the paper account slot is simply a second set of credentials.
pub struct KucoinVenue {
    config: KucoinConfig,
    trading: TradingConfig,
    clients: Accounts<KucoinClient>,
}

impl KucoinVenue {
    /// Builds the venue, constructing a client per configured account.
    ///
    /// # Errors
    /// Returns an error when an HTTP client cannot be built.
    pub fn new(config: KucoinConfig, trading: TradingConfig) -> Result<Self, VenueError> {
        let build = |credentials: &pair_trade_core::config::KucoinCredentials| {
            KucoinClient::new(KucoinClientConfig::from_credentials(
                credentials,
                &config.endpoint,
            ))
        };
        let clients = Accounts {
            live: config.accounts.live.as_ref().map(&build).transpose()?,
            paper: config.accounts.paper.as_ref().map(&build).transpose()?,
        };
        Ok(Self {
            config,
            trading,
            clients,
        })
    }

    fn client(&self, account: AccountName) -> Result<&KucoinClient, VenueError> {
        self.clients
            .resolve(account, self.trading.development_mode)
            .ok_or_else(|| VenueError::missing_credentials(account.to_string()))
    }

    /// The side that sells the pair's non-stablecoin leg into the
    /// preferred stablecoin.
    fn closing_side(&self, pair: &SpotPair) -> OrderSide {
        if pair.base == self.config.preferred_stablecoin {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    /// Submits a market order for a fixed quote amount, refusing when
    /// the spending balance does not exceed the amount.
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
        let info = client.symbol_info(symbol).await?;

        let (spend_coin, step) = match side {
            OrderSide::Buy => (&pair.quote, info.quote_increment),
            OrderSide::Sell => (&pair.base, info.base_increment),
        };
        let balance = client.trade_balance(spend_coin).await?;
        if balance <= amount {
            warn!(
                symbol,
                %amount,
                %balance,
                "balance does not cover requested amount, order skipped"
            );
            return Ok(());
        }
        let quantized = sizing::quantize_to_increment(amount, step);
        if quantized <= Decimal::ZERO {
            warn!(symbol, %amount, "amount quantized to zero, order skipped");
            return Ok(());
        }
        let amount = match side {
            OrderSide::Buy => MarketAmount::Funds(quantized),
            OrderSide::Sell => MarketAmount::Size(quantized),
        };
        let ack = client.place_market_order(symbol, side, amount).await?;
        info!(symbol, order_id = %ack.order_id, "custom amount order submitted");
        Ok(())
    }
}

#[async_trait]
impl PairTradeVenue for KucoinVenue {
    fn name(&self) -> &'static str {
        "kucoin"
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
        let fills = client.fills(symbol).await?;
        let closing_side = self.closing_side(&pair);
        Ok(fills.first().is_some_and(|fill| fill.side != closing_side))
    }

    async fn close_inverse_position(
        &self,
        symbol: &str,
        account: AccountName,
        _outside_market_hours: bool,
    ) -> Result<(), VenueError> {
        let pair = SpotPair::parse(symbol).map_err(|_| VenueError::symbol_not_found(symbol))?;
        let client = self.client(account)?;
        let info = client.symbol_info(symbol).await?;

        let side = self.closing_side(&pair);
        let (coin, step) = match side {
            OrderSide::Sell => (&pair.base, info.base_increment),
            OrderSide::Buy => (&pair.quote, info.quote_increment),
        };
        let balance = client.trade_balance(coin).await?;
        let quantized = sizing::quantize_to_increment(balance, step);
        if quantized <= Decimal::ZERO {
            info!(symbol, coin = %coin, "no balance to close");
            return Ok(());
        }
        let amount = match side {
            OrderSide::Sell => MarketAmount::Size(quantized),
            OrderSide::Buy => MarketAmount::Funds(quantized),
        };
        let ack = client.place_market_order(symbol, side, amount).await?;
        info!(symbol, order_id = %ack.order_id, "close order submitted");
        Ok(())
    }

    async fn realized_profit_loss(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<Decimal, ProfitLossError> {
        let client = self.client(account)?;
        let fills = client.fills(symbol).await?;
        Ok(profit_loss::realized_profit_loss(&fills))
    }

    async fn record_tax(
        &self,
        _symbol: &str,
        tax_amount: Decimal,
        account: AccountName,
    ) -> Result<(), VenueError> {
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
        let info = client.symbol_info(symbol).await?;

        let side = self.closing_side(&pair).opposite();
        let (coin, step) = match side {
            OrderSide::Buy => (&pair.quote, info.quote_increment),
            OrderSide::Sell => (&pair.base, info.base_increment),
        };
        let balance = client.trade_balance(coin).await?;
        let quantized = match sizing::quantity_from_balance(balance, capital_fraction, step) {
            Ok(amount) => amount,
            Err(err) => {
                warn!(symbol, error = %err, "entry skipped");
                return Ok(());
            }
        };
        let amount = match side {
            OrderSide::Buy => MarketAmount::Funds(quantized),
            OrderSide::Sell => MarketAmount::Size(quantized),
        };
        let ack = client.place_market_order(symbol, side, amount).await?;
        info!(symbol, order_id = %ack.order_id, "entry order submitted");
        Ok(())
    }
}

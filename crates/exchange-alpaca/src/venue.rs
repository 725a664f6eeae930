//! The equities venue wired into the pair-trade orchestration.

use crate::client::{AlpacaClient, AlpacaClientConfig};
use crate::orders;
use crate::profit_loss::{self, CLOSED_ORDER_WINDOW};
use async_trait::async_trait;
use chrono::Utc;
use pair_trade_core::config::{Accounts, AlpacaConfig, AlpacaCredentials, TradingConfig};
use pair_trade_core::error::{ProfitLossError, VenueError};
use pair_trade_core::pairs::TradingPairMap;
use pair_trade_core::poll::BoundedPoll;
use pair_trade_core::sizing;
use pair_trade_core::tax::TaxKind;
use pair_trade_core::traits::PairTradeVenue;
use pair_trade_core::types::{AccountName, OrderIntent, OrderSide, OrderSizing};
use pair_trade_ledger::ProfitLedger;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Closed orders fetched when probing for the last filled order. Wider
/// than one because the head of the closed list is often a canceled or
/// expired limit order, which carries no fill.
const FILLED_ORDER_PROBE_WINDOW: u32 = 10;

/// US equities venue adapter.
///
/// Holds one REST client per configured account; the development-mode
/// flag forces every request onto the paper account. Tax on realized
/// equity gains is booked as a ledger row, and the ledger's running
/// total is netted out of deployable equity when sizing new entries.
pub struct AlpacaVenue {
    config: AlpacaConfig,
    trading: TradingConfig,
    clients: Accounts<AlpacaClient>,
    ledger: Arc<dyn ProfitLedger>,
}

impl AlpacaVenue {
    /// Builds the venue, constructing a client for each configured
    /// account.
    ///
    /// # Errors
    /// Returns an error when an HTTP client cannot be built.
    pub fn new(
        config: AlpacaConfig,
        trading: TradingConfig,
        ledger: Arc<dyn ProfitLedger>,
    ) -> Result<Self, VenueError> {
        let build = |credentials: &AlpacaCredentials| {
            AlpacaClient::new(AlpacaClientConfig::from_credentials(
                credentials,
                &config.data_endpoint,
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
            ledger,
        })
    }

    fn client(&self, account: AccountName) -> Result<&AlpacaClient, VenueError> {
        self.clients
            .resolve(account, self.trading.development_mode)
            .ok_or_else(|| VenueError::missing_credentials(account.to_string()))
    }

    /// Deployable equity: reported equity net of the ledger's running
    /// tax liability. A failed ledger read degrades to no netting.
    async fn deployable_equity(&self, equity: Decimal) -> Decimal {
        match self.ledger.last_running_total(None).await {
            Ok(liability) => equity - liability,
            Err(err) => {
                warn!(error = %err, "ledger read failed, sizing without tax netting");
                equity
            }
        }
    }

    /// Submits a dollar-denominated market order outside the
    /// percentage-of-capital flow.
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
        let client = self.client(account)?;
        let intent = OrderIntent::market(symbol, side, OrderSizing::Notional(amount));
        let ack = client.submit_order(&intent).await?;
        info!(symbol, %amount, order_id = %ack.id, "custom amount order submitted");
        Ok(())
    }
}

#[async_trait]
impl PairTradeVenue for AlpacaVenue {
    fn name(&self) -> &'static str {
        "alpaca"
    }

    fn tax_kind(&self) -> TaxKind {
        TaxKind::CapitalGains
    }

    fn pairs(&self) -> &TradingPairMap {
        &self.config.pairs
    }

    async fn inverse_position_open(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<bool, VenueError> {
        let client = self.client(account)?;
        // closed_orders drops unfilled entries, so the head here is the
        // most recent order that actually filled.
        let orders = client
            .closed_orders(symbol, FILLED_ORDER_PROBE_WINDOW)
            .await?;
        Ok(orders
            .first()
            .is_some_and(|order| order.side == OrderSide::Buy))
    }

    async fn close_inverse_position(
        &self,
        symbol: &str,
        account: AccountName,
        outside_market_hours: bool,
    ) -> Result<(), VenueError> {
        let client = self.client(account)?;
        if !outside_market_hours {
            client.close_position(symbol).await?;
            info!(symbol, "position close requested");
            return Ok(());
        }

        // Extended session: market closes are rejected, rest a limit
        // order for the exact available quantity instead.
        let Some(position) = client.open_position(symbol).await? else {
            info!(symbol, "no position on record, nothing to close");
            return Ok(());
        };
        let quote = client.latest_quote(symbol).await?;
        match orders::extended_hours_close_order(
            symbol,
            position.quantity_available,
            &quote,
            self.config.aftermarket_slippage,
        ) {
            Ok(intent) => {
                let ack = client.submit_order(&intent).await?;
                info!(symbol, order_id = %ack.id, "extended hours close submitted");
            }
            Err(err) => {
                warn!(symbol, error = %err, "extended hours close skipped");
            }
        }
        Ok(())
    }

    async fn confirm_position_closed(&self, symbol: &str, account: AccountName) {
        let Ok(client) = self.client(account) else {
            return;
        };
        let flat = BoundedPoll::close_confirmation()
            .wait_until(|| async {
                match client.open_position(symbol).await {
                    Ok(None) => true,
                    Ok(Some(position)) => position.is_flat(),
                    Err(err) => {
                        warn!(symbol, error = %err, "position probe failed");
                        false
                    }
                }
            })
            .await;
        if !flat {
            // Proceed anyway; the close order is assumed to fill
            // eventually.
            warn!(symbol, "position not confirmed flat before timeout");
        }
    }

    async fn realized_profit_loss(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<Decimal, ProfitLossError> {
        let client = self.client(account)?;
        let orders = client.closed_orders(symbol, CLOSED_ORDER_WINDOW).await?;
        profit_loss::realized_profit_loss(symbol, &orders)
    }

    async fn record_tax(
        &self,
        symbol: &str,
        tax_amount: Decimal,
        _account: AccountName,
    ) -> Result<(), VenueError> {
        let entry = self
            .ledger
            .append(symbol, Utc::now(), tax_amount)
            .await
            .map_err(|err| VenueError::Storage(err.to_string()))?;
        info!(
            symbol,
            amount = %entry.amount,
            running_total = %entry.running_total,
            "tax liability recorded"
        );
        Ok(())
    }

    async fn open_position(
        &self,
        symbol: &str,
        capital_fraction: Decimal,
        account: AccountName,
        outside_market_hours: bool,
    ) -> Result<(), VenueError> {
        let client = self.client(account)?;
        let balance = client.account_balance().await?;
        let equity = self.deployable_equity(balance.equity).await;

        let funds = match sizing::notional_from_equity(equity, balance.cash, capital_fraction) {
            Ok(funds) => funds,
            Err(err) => {
                warn!(symbol, error = %err, "entry skipped");
                return Ok(());
            }
        };

        let asset = client.asset(symbol).await?;
        let quote = client.latest_quote(symbol).await?;
        let intent = match orders::entry_order(
            symbol,
            OrderSide::Buy,
            funds,
            asset.fractionable,
            &quote,
            self.config.aftermarket_slippage,
            outside_market_hours,
        ) {
            Ok(intent) => intent,
            Err(err) => {
                warn!(symbol, error = %err, "entry skipped");
                return Ok(());
            }
        };

        let ack = client.submit_order(&intent).await?;
        info!(symbol, %funds, order_id = %ack.id, "entry order submitted");
        Ok(())
    }
}

//! The pair-trade orchestration state machine.
//!
//! One webhook alert executes as one independent, synchronous unit of
//! work: resolve the pair, close the inverse position if its last fill
//! says it is open, wait for settlement, book tax on any realized
//! profit, then size and open the new position. Two concurrent alerts
//! for the same symbol are not mutually excluded; the at-most-one-open-
//! position assumption is the caller's, as in the source system.

use crate::config::TradingConfig;
use crate::error::ProfitLossError;
use crate::hours::is_outside_equity_trading_hours;
use crate::pairs::PairError;
use crate::tax;
use crate::traits::PairTradeVenue;
use crate::types::{AccountName, OrderSide};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// One parsed webhook alert.
#[derive(Debug, Clone)]
pub struct AlertCommand {
    /// Alert ticker as configured in the venue's pair map.
    pub ticker: String,
    /// Buy alerts open the configured symbol; sell alerts open its
    /// inverse.
    pub direction: OrderSide,
    /// Whether to compute and book tax on the closed inverse position.
    pub calculate_tax: bool,
    /// Target account.
    pub account: AccountName,
    /// Overrides the configured capital fraction when present.
    pub capital_fraction: Option<Decimal>,
}

impl AlertCommand {
    #[must_use]
    pub fn new(ticker: impl Into<String>, direction: OrderSide) -> Self {
        Self {
            ticker: ticker.into(),
            direction,
            calculate_tax: true,
            account: AccountName::Live,
            capital_fraction: None,
        }
    }

    #[must_use]
    pub const fn without_tax(mut self) -> Self {
        self.calculate_tax = false;
        self
    }

    #[must_use]
    pub const fn for_account(mut self, account: AccountName) -> Self {
        self.account = account;
        self
    }
}

/// Errors the orchestrator surfaces to its caller. Infrastructure faults
/// never appear here — they are caught, logged, and degraded to no-ops.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The alert ticker is not configured for the venue.
    #[error(transparent)]
    Pair(#[from] PairError),

    /// The equities P/L reconstruction could not match fills. Surfaced
    /// rather than silently booked as zero: a wrong zero would flow into
    /// a tax record.
    #[error(transparent)]
    ProfitLoss(ProfitLossError),
}

/// Drives the close-inverse-then-open sequence against one venue.
pub struct PairTradeOrchestrator<V> {
    venue: Arc<V>,
    trading: TradingConfig,
}

impl<V: PairTradeVenue> PairTradeOrchestrator<V> {
    #[must_use]
    pub fn new(venue: Arc<V>, trading: TradingConfig) -> Self {
        Self { venue, trading }
    }

    #[must_use]
    pub fn venue(&self) -> &Arc<V> {
        &self.venue
    }

    /// Executes one alert at the current wall-clock time.
    ///
    /// # Errors
    /// Returns [`OrchestratorError`] for unknown tickers and for
    /// unmatched equities fill history; venue faults degrade to logged
    /// no-ops instead.
    pub async fn execute(&self, alert: &AlertCommand) -> Result<(), OrchestratorError> {
        self.execute_at(alert, Utc::now()).await
    }

    /// Executes one alert as of `now`; split out so the session-hours
    /// branch is testable.
    ///
    /// # Errors
    /// See [`Self::execute`].
    pub async fn execute_at(
        &self,
        alert: &AlertCommand,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let pair = self.venue.pairs().resolve(&alert.ticker, alert.direction)?;
        let outside_hours = is_outside_equity_trading_hours(now);

        info!(
            venue = self.venue.name(),
            ticker = %alert.ticker,
            symbol = %pair.symbol,
            inverse = %pair.inverse_symbol,
            account = %alert.account,
            outside_hours,
            "pair trade alert received"
        );

        match self
            .venue
            .inverse_position_open(&pair.inverse_symbol, alert.account)
            .await
        {
            Ok(true) => {
                self.close_and_book_tax(alert, &pair.inverse_symbol, outside_hours)
                    .await?;
            }
            Ok(false) => {
                info!(
                    venue = self.venue.name(),
                    inverse = %pair.inverse_symbol,
                    "no inverse position open, skipping close"
                );
            }
            Err(err) => {
                // Degrade: treat as "nothing to close" rather than abort
                // the whole alert.
                warn!(
                    venue = self.venue.name(),
                    inverse = %pair.inverse_symbol,
                    error = %err,
                    "inverse position check failed"
                );
            }
        }

        let fraction = alert
            .capital_fraction
            .unwrap_or(self.trading.capital_to_deploy);
        if let Err(err) = self
            .venue
            .open_position(&pair.symbol, fraction, alert.account, outside_hours)
            .await
        {
            // A successful close followed by a failed reopen leaves the
            // account flat, the safer failure mode. No rollback.
            warn!(
                venue = self.venue.name(),
                symbol = %pair.symbol,
                error = %err,
                "opening new position failed"
            );
        }

        Ok(())
    }

    async fn close_and_book_tax(
        &self,
        alert: &AlertCommand,
        inverse_symbol: &str,
        outside_hours: bool,
    ) -> Result<(), OrchestratorError> {
        if let Err(err) = self
            .venue
            .close_inverse_position(inverse_symbol, alert.account, outside_hours)
            .await
        {
            warn!(
                venue = self.venue.name(),
                inverse = %inverse_symbol,
                error = %err,
                "closing inverse position failed"
            );
        }

        self.venue
            .confirm_position_closed(inverse_symbol, alert.account)
            .await;

        if !alert.calculate_tax {
            return Ok(());
        }

        let profit_loss = match self
            .venue
            .realized_profit_loss(inverse_symbol, alert.account)
            .await
        {
            Ok(amount) => amount,
            Err(ProfitLossError::Venue(err)) => {
                warn!(
                    venue = self.venue.name(),
                    inverse = %inverse_symbol,
                    error = %err,
                    "profit/loss fetch failed, skipping tax"
                );
                return Ok(());
            }
            Err(err) => return Err(OrchestratorError::ProfitLoss(err)),
        };

        let rate = self.venue.tax_kind().rate(&self.trading);
        let Some(tax_amount) = tax::tax_on_profit(profit_loss, rate) else {
            info!(
                venue = self.venue.name(),
                inverse = %inverse_symbol,
                %profit_loss,
                "no positive tax amount to record"
            );
            return Ok(());
        };

        info!(
            venue = self.venue.name(),
            inverse = %inverse_symbol,
            %profit_loss,
            %tax_amount,
            "recording tax on realized profit"
        );
        if let Err(err) = self
            .venue
            .record_tax(inverse_symbol, tax_amount, alert.account)
            .await
        {
            warn!(
                venue = self.venue.name(),
                inverse = %inverse_symbol,
                error = %err,
                "recording tax failed"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VenueError;
    use crate::pairs::{PairEntry, TradingPairMap};
    use crate::tax::TaxKind;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        InverseCheck(String),
        Close(String, bool),
        Confirm(String),
        ProfitLoss(String),
        RecordTax(String, Decimal),
        Open(String, Decimal, bool),
    }

    struct ScriptedVenue {
        pairs: TradingPairMap,
        inverse_open: Result<bool, VenueError>,
        profit_loss: Result<Decimal, ProfitLossError>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedVenue {
        fn new(inverse_open: Result<bool, VenueError>) -> Self {
            let mut pairs = BTreeMap::new();
            pairs.insert(
                "TSLT".to_string(),
                PairEntry {
                    symbol: "TSLT".to_string(),
                    inverse: "TSLZ".to_string(),
                },
            );
            Self {
                pairs: TradingPairMap::new(pairs).unwrap(),
                inverse_open,
                profit_loss: Ok(dec!(500)),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_profit_loss(mut self, profit_loss: Result<Decimal, ProfitLossError>) -> Self {
            self.profit_loss = profit_loss;
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn clone_pl(source: &Result<Decimal, ProfitLossError>) -> Result<Decimal, ProfitLossError> {
        match source {
            Ok(v) => Ok(*v),
            Err(ProfitLossError::NoSellOrder { symbol }) => Err(ProfitLossError::NoSellOrder {
                symbol: symbol.clone(),
            }),
            Err(ProfitLossError::InsufficientBuyHistory {
                symbol,
                covered,
                required,
            }) => Err(ProfitLossError::InsufficientBuyHistory {
                symbol: symbol.clone(),
                covered: *covered,
                required: *required,
            }),
            Err(ProfitLossError::Venue(err)) => {
                Err(ProfitLossError::Venue(VenueError::Network(err.to_string())))
            }
        }
    }

    #[async_trait]
    impl PairTradeVenue for ScriptedVenue {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn tax_kind(&self) -> TaxKind {
            TaxKind::CapitalGains
        }

        fn pairs(&self) -> &TradingPairMap {
            &self.pairs
        }

        async fn inverse_position_open(
            &self,
            symbol: &str,
            _account: AccountName,
        ) -> Result<bool, VenueError> {
            self.record(Call::InverseCheck(symbol.to_string()));
            match &self.inverse_open {
                Ok(open) => Ok(*open),
                Err(err) => Err(VenueError::Network(err.to_string())),
            }
        }

        async fn close_inverse_position(
            &self,
            symbol: &str,
            _account: AccountName,
            outside_market_hours: bool,
        ) -> Result<(), VenueError> {
            self.record(Call::Close(symbol.to_string(), outside_market_hours));
            Ok(())
        }

        async fn confirm_position_closed(&self, symbol: &str, _account: AccountName) {
            self.record(Call::Confirm(symbol.to_string()));
        }

        async fn realized_profit_loss(
            &self,
            symbol: &str,
            _account: AccountName,
        ) -> Result<Decimal, ProfitLossError> {
            self.record(Call::ProfitLoss(symbol.to_string()));
            clone_pl(&self.profit_loss)
        }

        async fn record_tax(
            &self,
            symbol: &str,
            tax_amount: Decimal,
            _account: AccountName,
        ) -> Result<(), VenueError> {
            self.record(Call::RecordTax(symbol.to_string(), tax_amount));
            Ok(())
        }

        async fn open_position(
            &self,
            symbol: &str,
            capital_fraction: Decimal,
            _account: AccountName,
            outside_market_hours: bool,
        ) -> Result<(), VenueError> {
            self.record(Call::Open(
                symbol.to_string(),
                capital_fraction,
                outside_market_hours,
            ));
            Ok(())
        }
    }

    fn trading_config() -> TradingConfig {
        TradingConfig {
            capital_gains_tax_rate: dec!(0.26375),
            income_tax_rate: dec!(0.42),
            capital_to_deploy: dec!(0.33),
            development_mode: false,
        }
    }

    fn eastern(hour: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        chrono_tz::US::Eastern
            .with_ymd_and_hms(2024, 6, 12, hour, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    // 12:00 ET on a Wednesday, inside the regular session.
    fn session_time() -> DateTime<Utc> {
        eastern(12)
    }

    #[tokio::test]
    async fn no_inverse_open_skips_straight_to_the_new_order() {
        let venue = Arc::new(ScriptedVenue::new(Ok(false)));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Buy), session_time())
            .await
            .unwrap();

        assert_eq!(
            venue.calls(),
            vec![
                Call::InverseCheck("TSLZ".to_string()),
                Call::Open("TSLT".to_string(), dec!(0.33), false),
            ]
        );
    }

    #[tokio::test]
    async fn open_inverse_is_closed_taxed_then_replaced() {
        let venue = Arc::new(ScriptedVenue::new(Ok(true)));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Sell), session_time())
            .await
            .unwrap();

        // Sell alert: open the inverse leg, close the primary one.
        let calls = venue.calls();
        assert_eq!(calls[0], Call::InverseCheck("TSLT".to_string()));
        assert_eq!(calls[1], Call::Close("TSLT".to_string(), false));
        assert_eq!(calls[2], Call::Confirm("TSLT".to_string()));
        assert_eq!(calls[3], Call::ProfitLoss("TSLT".to_string()));
        // 500 * 0.26375 = 131.875, recorded before ledger flooring.
        assert_eq!(
            calls[4],
            Call::RecordTax("TSLT".to_string(), dec!(131.875))
        );
        assert_eq!(calls[5], Call::Open("TSLZ".to_string(), dec!(0.33), false));
    }

    #[tokio::test]
    async fn losses_book_no_tax() {
        let venue =
            Arc::new(ScriptedVenue::new(Ok(true)).with_profit_loss(Ok(dec!(-200))));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Buy), session_time())
            .await
            .unwrap();

        assert!(!venue
            .calls()
            .iter()
            .any(|call| matches!(call, Call::RecordTax(_, _))));
    }

    #[tokio::test]
    async fn tax_toggle_off_skips_profit_loss_entirely() {
        let venue = Arc::new(ScriptedVenue::new(Ok(true)));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        orchestrator
            .execute_at(
                &AlertCommand::new("TSLT", OrderSide::Buy).without_tax(),
                session_time(),
            )
            .await
            .unwrap();

        let calls = venue.calls();
        assert!(!calls.iter().any(|call| matches!(call, Call::ProfitLoss(_))));
        assert!(calls.iter().any(|call| matches!(call, Call::Close(_, _))));
    }

    #[tokio::test]
    async fn inverse_check_fault_degrades_to_open_only() {
        let venue = Arc::new(ScriptedVenue::new(Err(VenueError::Network(
            "connection refused".to_string(),
        ))));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Buy), session_time())
            .await
            .unwrap();

        let calls = venue.calls();
        assert!(!calls.iter().any(|call| matches!(call, Call::Close(_, _))));
        assert!(calls
            .iter()
            .any(|call| matches!(call, Call::Open(symbol, _, _) if symbol == "TSLT")));
    }

    #[tokio::test]
    async fn equities_style_unmatched_history_surfaces_to_the_caller() {
        let venue = Arc::new(ScriptedVenue::new(Ok(true)).with_profit_loss(Err(
            ProfitLossError::NoSellOrder {
                symbol: "TSLZ".to_string(),
            },
        )));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        let result = orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Buy), session_time())
            .await;
        assert!(matches!(result, Err(OrchestratorError::ProfitLoss(_))));
    }

    #[tokio::test]
    async fn profit_loss_infrastructure_fault_skips_tax_but_reopens() {
        let venue = Arc::new(ScriptedVenue::new(Ok(true)).with_profit_loss(Err(
            ProfitLossError::Venue(VenueError::Network("reset".to_string())),
        )));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Buy), session_time())
            .await
            .unwrap();

        let calls = venue.calls();
        assert!(!calls.iter().any(|call| matches!(call, Call::RecordTax(_, _))));
        assert!(calls.iter().any(|call| matches!(call, Call::Open(_, _, _))));
    }

    #[tokio::test]
    async fn unknown_ticker_touches_nothing() {
        let venue = Arc::new(ScriptedVenue::new(Ok(true)));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        let result = orchestrator
            .execute_at(&AlertCommand::new("AAPL", OrderSide::Buy), session_time())
            .await;
        assert!(matches!(result, Err(OrchestratorError::Pair(_))));
        assert!(venue.calls().is_empty());
    }

    #[tokio::test]
    async fn outside_hours_flag_reaches_close_and_open() {
        let venue = Arc::new(ScriptedVenue::new(Ok(true)));
        let orchestrator = PairTradeOrchestrator::new(venue.clone(), trading_config());

        // 20:00 ET, well after the close.
        let evening = eastern(20);
        orchestrator
            .execute_at(&AlertCommand::new("TSLT", OrderSide::Buy), evening)
            .await
            .unwrap();

        let calls = venue.calls();
        assert!(calls.contains(&Call::Close("TSLZ".to_string(), true)));
        assert!(calls.contains(&Call::Open("TSLT".to_string(), dec!(0.33), true)));
    }
}

//! The venue capability seam the orchestrator drives.

use crate::error::{ProfitLossError, VenueError};
use crate::pairs::TradingPairMap;
use crate::tax::TaxKind;
use crate::types::AccountName;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// One trading venue wired into the pair-trade flow.
///
/// The orchestrator owns the sequence — resolve pair, close inverse,
/// confirm flat, book tax, open new position — while each venue supplies
/// the mechanics behind every step. Equities close through a
/// close-position primitive and confirm flatness by polling; spot crypto
/// venues close by market-selling the whole coin balance and skip
/// confirmation.
#[async_trait]
pub trait PairTradeVenue: Send + Sync {
    /// Short venue name used in logs.
    fn name(&self) -> &'static str;

    /// Which tax rate applies to this venue's realized gains.
    fn tax_kind(&self) -> TaxKind;

    /// The alert-ticker to venue-symbol pair map for this venue.
    fn pairs(&self) -> &TradingPairMap;

    /// Whether the inverse symbol's position is presumed open. Equities:
    /// last filled order was a buy. Crypto: most recent fill was not a
    /// sell into the preferred stablecoin.
    async fn inverse_position_open(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<bool, VenueError>;

    /// Requests closure of the inverse position. `outside_market_hours`
    /// only matters to the equities venue, which switches to a limit
    /// order with slippage tolerance.
    async fn close_inverse_position(
        &self,
        symbol: &str,
        account: AccountName,
        outside_market_hours: bool,
    ) -> Result<(), VenueError>;

    /// Waits for the close to settle. Default is a no-op; the equities
    /// venue polls position state on a bounded schedule. A timeout is not
    /// an error — the orchestrator proceeds regardless.
    async fn confirm_position_closed(&self, _symbol: &str, _account: AccountName) {}

    /// Realized P/L of the just-closed position, reconstructed from fill
    /// history.
    async fn realized_profit_loss(
        &self,
        symbol: &str,
        account: AccountName,
    ) -> Result<Decimal, ProfitLossError>;

    /// Books a positive tax amount: the equities venue appends a ledger
    /// entry, the crypto venues convert the amount into a stablecoin
    /// holding via a small market order.
    async fn record_tax(
        &self,
        symbol: &str,
        tax_amount: Decimal,
        account: AccountName,
    ) -> Result<(), VenueError>;

    /// Sizes and submits the new position for a fraction of deployable
    /// capital.
    async fn open_position(
        &self,
        symbol: &str,
        capital_fraction: Decimal,
        account: AccountName,
        outside_market_hours: bool,
    ) -> Result<(), VenueError>;
}

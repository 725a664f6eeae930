//! Domain types for the equities venue.

use chrono::{DateTime, Utc};
use pair_trade_core::types::OrderSide;
use rust_decimal::Decimal;

/// Account balance snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    /// Total reported equity, including unsettled value.
    pub equity: Decimal,
    /// Settled cash available to trade.
    pub cash: Decimal,
}

/// An open position in one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Total held quantity.
    pub quantity: Decimal,
    /// Quantity not tied up in open orders.
    pub quantity_available: Decimal,
}

impl Position {
    /// Whether the holding has reached zero.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity == Decimal::ZERO
    }
}

/// One closed (filled) order from the order history, most recent first
/// as the venue returns them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub filled_quantity: Decimal,
    pub filled_avg_price: Decimal,
    pub filled_at: Option<DateTime<Utc>>,
}

/// Venue capability metadata for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetMetadata {
    pub symbol: String,
    /// Whether non-integer quantities can be bought.
    pub fractionable: bool,
    pub tradable: bool,
}

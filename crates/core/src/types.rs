//! Shared domain types for the pair-trade order router.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named trading account. Development mode forces [`AccountName::Paper`]
/// regardless of what was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountName {
    Live,
    Paper,
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Paper => write!(f, "paper"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Time-in-force for submitted orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Day
    }
}

/// How an order is sized: by notional currency amount or by unit quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSizing {
    /// Dollar (or quote-currency) amount.
    Notional(Decimal),
    /// Discrete unit quantity.
    Quantity(Decimal),
}

/// A single order ready for submission to a venue. Created fresh per
/// submission and never persisted.
#[derive(Debug, Clone)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub sizing: OrderSizing,
    pub time_in_force: TimeInForce,
    /// Present for limit orders, absent for market orders.
    pub limit_price: Option<Decimal>,
}

impl OrderIntent {
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: OrderSide, sizing: OrderSizing) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            sizing,
            time_in_force: TimeInForce::default(),
            limit_price: None,
        }
    }

    #[must_use]
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        sizing: OrderSizing,
        limit_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            sizing,
            time_in_force: TimeInForce::default(),
            limit_price: Some(limit_price),
        }
    }
}

/// Current top-of-book quote. Sizes may be absent when the quote was
/// derived from a historical bar fallback.
///
/// A quote with both prices zero signals "unavailable", not a zero value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub ask_price: Decimal,
    pub bid_price: Decimal,
    pub ask_size: Option<Decimal>,
    pub bid_size: Option<Decimal>,
}

impl Quote {
    /// The "no quote available" sentinel used when a venue call degrades.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            ask_price: Decimal::ZERO,
            bid_price: Decimal::ZERO,
            ask_size: None,
            bid_size: None,
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.ask_price.is_zero() && self.bid_price.is_zero()
    }

    /// Price to rest a limit order at: ask for buys, bid for sells, each
    /// falling back to the other side when the preferred one is zero.
    #[must_use]
    pub fn entry_price(&self, side: OrderSide) -> Option<Decimal> {
        let (preferred, fallback) = match side {
            OrderSide::Buy => (self.ask_price, self.bid_price),
            OrderSide::Sell => (self.bid_price, self.ask_price),
        };
        if !preferred.is_zero() {
            Some(preferred)
        } else if !fallback.is_zero() {
            Some(fallback)
        } else {
            None
        }
    }

    /// Price used to convert a notional amount into a unit quantity.
    /// Prefers the bid, falling back to the ask.
    #[must_use]
    pub fn sizing_price(&self) -> Option<Decimal> {
        if !self.bid_price.is_zero() {
            Some(self.bid_price)
        } else if !self.ask_price.is_zero() {
            Some(self.ask_price)
        } else {
            None
        }
    }
}

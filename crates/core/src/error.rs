//! Error types shared across venue adapters.
//!
//! Two channels are kept deliberately separate: [`VenueError`] is the
//! infrastructure fault channel (network, API, decoding) that the
//! orchestrator always catches and degrades, while business conditions
//! such as insufficient funds or an unmatched fill history get their own
//! recoverable types ([`crate::sizing::SizingError`], [`ProfitLossError`]).

use thiserror::Error;

/// Infrastructure faults from a brokerage or exchange call.
#[derive(Debug, Error)]
pub enum VenueError {
    /// No credentials configured for the requested account. Treated as
    /// "feature not configured", never a hard failure.
    #[error("no credentials configured for account '{account}'")]
    MissingCredentials {
        /// The account that had no configuration.
        account: String,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the venue.
        message: String,
    },

    /// Venue does not know the requested symbol.
    #[error("symbol not found: {symbol}")]
    SymbolNotFound {
        /// The unknown symbol.
        symbol: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A storage collaborator (ledger) could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl VenueError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a missing-credentials error.
    pub fn missing_credentials(account: impl Into<String>) -> Self {
        Self::MissingCredentials {
            account: account.into(),
        }
    }

    /// Creates a symbol-not-found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }
}

impl From<reqwest::Error> for VenueError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VenueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failures reconstructing realized P/L from fill history.
///
/// The equities venue surfaces these to the caller (an incorrect zero
/// would flow into a tax filing); the crypto venues return zero instead.
/// That asymmetry is intentional and preserved from the source system.
#[derive(Debug, Error)]
pub enum ProfitLossError {
    /// No sell order found in the fetched closed-order window.
    #[error("no sell order found in recent history for {symbol}")]
    NoSellOrder {
        /// Symbol whose history was searched.
        symbol: String,
    },

    /// The buy orders in the window do not cover the sell quantity.
    #[error(
        "buy history for {symbol} covers only {covered} of {required} sold units"
    )]
    InsufficientBuyHistory {
        /// Symbol whose history was searched.
        symbol: String,
        /// Accumulated buy quantity found.
        covered: rust_decimal::Decimal,
        /// Sell quantity that needed covering.
        required: rust_decimal::Decimal,
    },

    /// The underlying history fetch failed.
    #[error(transparent)]
    Venue(#[from] VenueError),
}

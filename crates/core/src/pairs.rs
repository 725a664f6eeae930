//! Alert-ticker to venue-symbol mapping, including the inverse pair.

use crate::types::OrderSide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from pair-map lookup or validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairError {
    /// Alert ticker has no configured pair.
    #[error("ticker '{0}' is not configured for this venue")]
    UnknownTicker(String),

    /// A ticker maps to itself as its own inverse.
    #[error("ticker '{0}' maps to the same symbol and inverse")]
    SelfInverse(String),

    /// The same venue symbol appears in more than one pair, which breaks
    /// the inverse-of-inverse symmetry.
    #[error("venue symbol '{0}' appears in more than one configured pair")]
    DuplicateSymbol(String),
}

/// The two venue symbols an alert resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSymbols {
    /// Symbol the new position is opened in.
    pub symbol: String,
    /// The inversely-correlated symbol whose position is closed first.
    pub inverse_symbol: String,
}

/// One configured pair: an alert ticker's venue symbol and its
/// inverse-correlated counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairEntry {
    pub symbol: String,
    pub inverse: String,
}

/// Map from alert ticker to its (symbol, inverse) pair for one venue.
///
/// Invariant: every ticker has exactly one inverse, no venue symbol is
/// shared between pairs, and resolving a sell alert swaps the two legs so
/// that inverse-of-inverse is always the original symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TradingPairMap {
    pairs: BTreeMap<String, PairEntry>,
}

impl TradingPairMap {
    /// Builds a pair map, rejecting self-inverse and duplicate symbols.
    ///
    /// # Errors
    /// Returns [`PairError`] when the configured pairs violate the
    /// symmetry invariant.
    pub fn new(pairs: BTreeMap<String, PairEntry>) -> Result<Self, PairError> {
        let map = Self { pairs };
        map.validate()?;
        Ok(map)
    }

    /// Re-checks the symmetry invariant, for maps that came straight from
    /// deserialized configuration.
    ///
    /// # Errors
    /// Returns [`PairError`] when the configured pairs violate the
    /// symmetry invariant.
    pub fn validate(&self) -> Result<(), PairError> {
        let mut seen = std::collections::BTreeSet::new();
        for (ticker, entry) in &self.pairs {
            if entry.symbol == entry.inverse {
                return Err(PairError::SelfInverse(ticker.clone()));
            }
            for symbol in [&entry.symbol, &entry.inverse] {
                if !seen.insert(symbol.clone()) {
                    return Err(PairError::DuplicateSymbol(symbol.clone()));
                }
            }
        }
        Ok(())
    }

    /// Resolves the symbol to open and the inverse symbol to close for an
    /// alert. A buy alert targets the configured symbol; a sell alert
    /// targets the inverse, so the two legs swap.
    ///
    /// # Errors
    /// Returns [`PairError::UnknownTicker`] when the ticker is not
    /// configured.
    pub fn resolve(&self, ticker: &str, direction: OrderSide) -> Result<PairSymbols, PairError> {
        let entry = self
            .pairs
            .get(ticker)
            .ok_or_else(|| PairError::UnknownTicker(ticker.to_string()))?;
        Ok(match direction {
            OrderSide::Buy => PairSymbols {
                symbol: entry.symbol.clone(),
                inverse_symbol: entry.inverse.clone(),
            },
            OrderSide::Sell => PairSymbols {
                symbol: entry.inverse.clone(),
                inverse_symbol: entry.symbol.clone(),
            },
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// A hyphenated spot pair such as `BTC-USDT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotPair {
    pub base: String,
    pub quote: String,
}

impl SpotPair {
    /// Splits a `BASE-QUOTE` symbol into its two legs.
    ///
    /// # Errors
    /// Returns [`PairError::UnknownTicker`] when the symbol is not of the
    /// `BASE-QUOTE` form.
    pub fn parse(symbol: &str) -> Result<Self, PairError> {
        match symbol.split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok(Self {
                base: base.to_string(),
                quote: quote.to_string(),
            }),
            _ => Err(PairError::UnknownTicker(symbol.to_string())),
        }
    }

    /// The hyphen-free form some venues expect, e.g. `BTCUSDT`.
    #[must_use]
    pub fn venue_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Whether either leg is the given currency.
    #[must_use]
    pub fn contains(&self, currency: &str) -> bool {
        self.base == currency || self.quote == currency
    }
}

//! Order sizing arithmetic shared by the venue adapters.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

/// Haircut applied when converting a notional amount to a unit quantity,
/// absorbing staleness in the latest quote.
pub const QUOTE_STALENESS_HAIRCUT: Decimal = dec!(0.97);

/// Expected business conditions that stop an order from being sized.
/// These are guarded no-ops, not faults: the orchestrator logs them and
/// moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizingError {
    /// The computed deployable amount was zero or negative.
    #[error("insufficient funds to deploy: {funds}")]
    InsufficientFunds {
        /// The non-positive amount that was computed.
        funds: Decimal,
    },

    /// No usable price to convert notional into quantity.
    #[error("no usable quote for {symbol}")]
    QuoteUnavailable {
        /// Symbol whose quote was unavailable.
        symbol: String,
    },
}

/// Computes the notional amount to deploy from account equity.
///
/// `funds = equity * fraction`, floored to whole cents. When the result
/// exceeds settled cash it is clamped to cash, which allows trading on
/// unsettled-but-reported equity.
///
/// # Errors
/// Returns [`SizingError::InsufficientFunds`] when the computed amount is
/// not positive.
pub fn notional_from_equity(
    equity: Decimal,
    settled_cash: Decimal,
    fraction: Decimal,
) -> Result<Decimal, SizingError> {
    let funds = (equity * fraction).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    if funds <= Decimal::ZERO {
        return Err(SizingError::InsufficientFunds { funds });
    }
    if funds > settled_cash {
        // Fully-invested accounts report positive equity with no settled
        // cash; the clamp must not turn that into a zero-notional order.
        if settled_cash <= Decimal::ZERO {
            return Err(SizingError::InsufficientFunds {
                funds: settled_cash,
            });
        }
        return Ok(settled_cash);
    }
    Ok(funds)
}

/// Converts a notional amount into a whole-unit quantity for assets that
/// cannot be bought fractionally. The haircut absorbs quote staleness;
/// the result is floored to an integer.
///
/// # Errors
/// Returns [`SizingError::QuoteUnavailable`] when `price` is not positive
/// and [`SizingError::InsufficientFunds`] when the floored quantity is
/// zero.
pub fn whole_quantity_from_notional(
    symbol: &str,
    funds: Decimal,
    price: Decimal,
) -> Result<Decimal, SizingError> {
    if price <= Decimal::ZERO {
        return Err(SizingError::QuoteUnavailable {
            symbol: symbol.to_string(),
        });
    }
    let quantity = (funds * QUOTE_STALENESS_HAIRCUT / price)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero);
    if quantity <= Decimal::ZERO {
        return Err(SizingError::InsufficientFunds { funds });
    }
    Ok(quantity)
}

/// Sizes a crypto order from a coin balance: `balance * fraction`,
/// floored to the venue's minimum increment.
///
/// # Errors
/// Returns [`SizingError::InsufficientFunds`] when the quantized amount
/// is not positive.
pub fn quantity_from_balance(
    balance: Decimal,
    fraction: Decimal,
    increment: Decimal,
) -> Result<Decimal, SizingError> {
    let funds = quantize_to_increment(balance * fraction, increment);
    if funds <= Decimal::ZERO {
        return Err(SizingError::InsufficientFunds { funds });
    }
    Ok(funds)
}

/// Floors an amount to a venue-reported increment such as `0.000001`.
/// Falls back to the raw amount when the increment is not positive.
#[must_use]
pub fn quantize_to_increment(amount: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return amount;
    }
    let steps = (amount / increment).round_dp_with_strategy(0, RoundingStrategy::ToZero);
    steps * increment
}

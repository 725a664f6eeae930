//! Realized P/L from recent spot executions.

use crate::client::Execution;
use pair_trade_core::types::OrderSide;
use rust_decimal::Decimal;

/// How many executions are fetched to reconstruct one round trip.
pub const EXECUTION_WINDOW: u32 = 10;

/// Computes realized P/L from a most-recent-first execution window.
///
/// The most recent fill is matched against opposite-side fills, oldest
/// first within the window, prorating the final contributing fill. With
/// a most-recent sell the result is `value(sell) - value(matched buys)`;
/// with a most-recent buy the sign flips.
///
/// An empty or unmatched window yields zero rather than an error. The
/// equities venue raises in the same situation; the difference is kept
/// on purpose.
#[must_use]
pub fn realized_profit_loss(executions: &[Execution]) -> Decimal {
    let Some(last) = executions.first() else {
        return Decimal::ZERO;
    };
    let opposite = last.side.opposite();

    let mut remaining = last.quantity;
    let mut matched_value = Decimal::ZERO;
    for fill in executions[1..]
        .iter()
        .rev()
        .filter(|fill| fill.side == opposite)
    {
        if remaining <= Decimal::ZERO {
            break;
        }
        if fill.quantity <= remaining {
            matched_value += fill.value;
            remaining -= fill.quantity;
        } else if fill.quantity > Decimal::ZERO {
            matched_value += fill.value * remaining / fill.quantity;
            remaining = Decimal::ZERO;
        }
    }

    if remaining > Decimal::ZERO {
        return Decimal::ZERO;
    }

    match last.side {
        OrderSide::Sell => last.value - matched_value,
        OrderSide::Buy => matched_value - last.value,
    }
}

//! Realized P/L from recent fills, matched by contiguous runs.

use crate::client::Fill;
use pair_trade_core::types::OrderSide;
use rust_decimal::Decimal;

/// Computes realized P/L from a most-recent-first fill window.
///
/// A market order fills as a contiguous run of same-side executions, so
/// the head run is the latest order and the run after it is the order
/// that opened the position. Profit is the sell run's funds minus the
/// buy run's funds, whichever order they occurred in.
///
/// An empty window or one without a second run yields zero rather than
/// an error; the equities venue raises in the same situation, and the
/// difference is kept on purpose.
#[must_use]
pub fn realized_profit_loss(fills: &[Fill]) -> Decimal {
    let Some(first) = fills.first() else {
        return Decimal::ZERO;
    };
    let head_side = first.side;

    let mut head_funds = Decimal::ZERO;
    let mut index = 0;
    while index < fills.len() && fills[index].side == head_side {
        head_funds += fills[index].funds;
        index += 1;
    }

    let mut opposite_funds = Decimal::ZERO;
    let mut matched = false;
    while index < fills.len() && fills[index].side == head_side.opposite() {
        opposite_funds += fills[index].funds;
        matched = true;
        index += 1;
    }
    if !matched {
        return Decimal::ZERO;
    }

    match head_side {
        OrderSide::Sell => head_funds - opposite_funds,
        OrderSide::Buy => opposite_funds - head_funds,
    }
}

//! Realized P/L reconstruction from recent closed orders.

use crate::types::ClosedOrder;
use pair_trade_core::error::ProfitLossError;
use pair_trade_core::types::OrderSide;
use rust_decimal::Decimal;

/// How many closed orders are fetched to reconstruct one round trip.
/// A deliberately bounded window; history beyond it is never consulted.
pub const CLOSED_ORDER_WINDOW: u32 = 5;

/// Computes realized P/L from a most-recent-first closed-order window.
///
/// The most recent sell is matched against the buys that precede it
/// (most recent first), prorating the last contributing buy when it only
/// partially covers the sell. Profit is
/// `(sell_price - weighted_average_buy_price) * sell_quantity`.
///
/// # Errors
/// Returns [`ProfitLossError::NoSellOrder`] when the window holds no
/// sell, and [`ProfitLossError::InsufficientBuyHistory`] when the buys in
/// the window cannot cover the sell quantity. Both are surfaced rather
/// than reported as zero: a silent zero would flow into the tax ledger.
pub fn realized_profit_loss(
    symbol: &str,
    orders: &[ClosedOrder],
) -> Result<Decimal, ProfitLossError> {
    let sell_index = orders
        .iter()
        .position(|order| order.side == OrderSide::Sell)
        .ok_or_else(|| ProfitLossError::NoSellOrder {
            symbol: symbol.to_string(),
        })?;
    let sell = &orders[sell_index];

    let mut remaining = sell.filled_quantity;
    let mut cost = Decimal::ZERO;
    for buy in orders[sell_index + 1..]
        .iter()
        .filter(|order| order.side == OrderSide::Buy)
    {
        if remaining <= Decimal::ZERO {
            break;
        }
        let matched = remaining.min(buy.filled_quantity);
        cost += matched * buy.filled_avg_price;
        remaining -= matched;
    }

    if remaining > Decimal::ZERO {
        return Err(ProfitLossError::InsufficientBuyHistory {
            symbol: symbol.to_string(),
            covered: sell.filled_quantity - remaining,
            required: sell.filled_quantity,
        });
    }

    Ok(sell.filled_quantity * sell.filled_avg_price - cost)
}

//! Order construction for the equities venue.
//!
//! Sizing turns a capital fraction into either a notional amount
//! (fractionable assets) or a whole-share quantity, and extended-hours
//! submissions become limit orders with a slippage tolerance applied to
//! the current quote.

use pair_trade_core::sizing::{self, SizingError};
use pair_trade_core::types::{OrderIntent, OrderSide, OrderSizing, Quote};
use rust_decimal::{Decimal, RoundingStrategy};

/// Adds (buys) or subtracts (sells) the slippage fraction to the resting
/// price, rounded half-up to whole cents.
#[must_use]
pub fn limit_price_with_slippage(price: Decimal, slippage: Decimal, side: OrderSide) -> Decimal {
    let adjusted = match side {
        OrderSide::Buy => price * (Decimal::ONE + slippage),
        OrderSide::Sell => price * (Decimal::ONE - slippage),
    };
    adjusted.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds the order intent for a new position worth `funds`.
///
/// Fractionable assets are denominated in notional dollars; whole-share
/// assets are converted to a quantity from the sizing price. Outside
/// session hours every order becomes a quantity-denominated limit order,
/// because notional market orders are rejected in extended sessions.
///
/// # Errors
/// Returns [`SizingError`] when funds or the quote cannot produce a
/// submittable order.
pub fn entry_order(
    symbol: &str,
    side: OrderSide,
    funds: Decimal,
    fractionable: bool,
    quote: &Quote,
    slippage: Decimal,
    outside_market_hours: bool,
) -> Result<OrderIntent, SizingError> {
    if outside_market_hours {
        let price = quote.entry_price(side).ok_or_else(|| {
            SizingError::QuoteUnavailable {
                symbol: symbol.to_string(),
            }
        })?;
        let quantity = quantity_for(symbol, funds, quote, fractionable)?;
        let limit = limit_price_with_slippage(price, slippage, side);
        return Ok(OrderIntent::limit(symbol, side, quantity, limit));
    }

    if fractionable {
        return Ok(OrderIntent::market(
            symbol,
            side,
            OrderSizing::Notional(funds),
        ));
    }
    let quantity = quantity_for(symbol, funds, quote, fractionable)?;
    Ok(OrderIntent::market(symbol, side, quantity))
}

fn quantity_for(
    symbol: &str,
    funds: Decimal,
    quote: &Quote,
    fractionable: bool,
) -> Result<OrderSizing, SizingError> {
    let price = quote
        .sizing_price()
        .ok_or_else(|| SizingError::QuoteUnavailable {
            symbol: symbol.to_string(),
        })?;
    if fractionable {
        // Extended-hours fractionable entries still need a quantity;
        // reuse the haircut then keep the fractional part.
        let quantity = (funds * sizing::QUOTE_STALENESS_HAIRCUT / price)
            .round_dp_with_strategy(2, RoundingStrategy::ToZero);
        if quantity <= Decimal::ZERO {
            return Err(SizingError::InsufficientFunds { funds });
        }
        return Ok(OrderSizing::Quantity(quantity));
    }
    let quantity = sizing::whole_quantity_from_notional(symbol, funds, price)?;
    Ok(OrderSizing::Quantity(quantity))
}

/// Builds the limit order that closes an exact position quantity outside
/// session hours.
///
/// # Errors
/// Returns [`SizingError::QuoteUnavailable`] when no price is available
/// to rest the order at.
pub fn extended_hours_close_order(
    symbol: &str,
    quantity: Decimal,
    quote: &Quote,
    slippage: Decimal,
) -> Result<OrderIntent, SizingError> {
    let price = quote
        .entry_price(OrderSide::Sell)
        .ok_or_else(|| SizingError::QuoteUnavailable {
            symbol: symbol.to_string(),
        })?;
    let limit = limit_price_with_slippage(price, slippage, OrderSide::Sell);
    Ok(OrderIntent::limit(
        symbol,
        OrderSide::Sell,
        OrderSizing::Quantity(quantity),
        limit,
    ))
}

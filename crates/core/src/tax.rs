//! Tax arithmetic applied to realized profit.

use crate::config::TradingConfig;
use rust_decimal::{Decimal, RoundingStrategy};

/// Which jurisdictional rate applies to a venue's realized gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxKind {
    /// Equities: capital-gains rate.
    CapitalGains,
    /// Crypto assets taxed as personal income.
    Income,
}

impl TaxKind {
    #[must_use]
    pub fn rate(self, trading: &TradingConfig) -> Decimal {
        match self {
            Self::CapitalGains => trading.capital_gains_tax_rate,
            Self::Income => trading.income_tax_rate,
        }
    }
}

/// Rounds a monetary amount toward zero at two decimal places, the
/// rounding the profit ledger stores.
#[must_use]
pub fn floor_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Tax owed on a realized result, or `None` when nothing is owed.
/// Losses and break-even trades never produce a tax amount.
#[must_use]
pub fn tax_on_profit(profit_loss: Decimal, rate: Decimal) -> Option<Decimal> {
    let tax = profit_loss * rate;
    (tax > Decimal::ZERO).then_some(tax)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn profit_times_rate_floors_to_cents() {
        // 500 * 0.26375 = 131.875, stored as 131.87 (toward zero, not
        // half-up).
        let tax = tax_on_profit(dec!(500), dec!(0.26375)).unwrap();
        assert_eq!(floor_to_cents(tax), dec!(131.87));
    }

    #[test]
    fn losses_and_breakeven_owe_nothing() {
        assert_eq!(tax_on_profit(dec!(-120.50), dec!(0.26375)), None);
        assert_eq!(tax_on_profit(Decimal::ZERO, dec!(0.26375)), None);
    }

    #[test]
    fn negative_amounts_floor_toward_zero() {
        assert_eq!(floor_to_cents(dec!(-1.999)), dec!(-1.99));
        assert_eq!(floor_to_cents(dec!(1.999)), dec!(1.99));
    }

    #[test]
    fn kind_selects_the_configured_rate() {
        let trading = TradingConfig {
            capital_gains_tax_rate: dec!(0.26375),
            income_tax_rate: dec!(0.42),
            capital_to_deploy: dec!(0.33),
            development_mode: false,
        };
        assert_eq!(TaxKind::CapitalGains.rate(&trading), dec!(0.26375));
        assert_eq!(TaxKind::Income.rate(&trading), dec!(0.42));
    }
}

//! Core types: Cents, Quantity, Money, reserved tickers

use std::fmt;

/// Currency amount in the smallest unit (cents).
///
/// `10050` represents $100.50. Every value the engine handles (prices,
/// cost basis, gains, target values) uses this fixed-point unit so cash
/// conservation is exact.
pub type Cents = i64;

/// Whole shares. Always non-negative.
pub type Quantity = u64;

/// Ticker of the base cash position.
pub const BASE_CASH_TICKER: &str = "$$$$";

/// Ticker of user-entered (manual) cash.
pub const MANUAL_CASH_TICKER: &str = "MANUAL_CASH";

/// Sleeve id of the synthetic cash sleeve.
pub const CASH_SLEEVE_ID: &str = "cash";

/// Sleeve id of the synthetic orphan sleeve.
pub const ORPHAN_SLEEVE_ID: &str = "orphan-securities";

/// Rank given to orphan positions: below every configured member.
/// Member ranks must be strictly less than this.
pub const ORPHAN_RANK: u32 = 999;

/// Upper bound on `max_overinvestment_percent`.
pub const MAX_OVERINVESTMENT_PERCENT: f64 = 100.0;

/// Basis points in a whole model.
pub const FULL_WEIGHT_BPS: u32 = 10_000;

/// True if `ticker` is one of the reserved cash tickers.
#[inline]
pub fn is_cash_ticker(ticker: &str) -> bool {
    ticker == BASE_CASH_TICKER || ticker == MANUAL_CASH_TICKER
}

/// Display wrapper for a cents amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Money(pub Cents);

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 {
            write!(f, "-${}.{:02}", dollars.abs(), cents)
        } else {
            write!(f, "${}.{:02}", dollars, cents)
        }
    }
}

/// `qty × price` widened so large positions cannot overflow mid-computation.
#[inline]
pub(crate) fn notional(qty: Quantity, price: Cents) -> Cents {
    let value = qty as i128 * price as i128;
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Sum of cents amounts, saturating at the `i64` bounds.
pub(crate) fn saturating_sum(values: impl IntoIterator<Item = Cents>) -> Cents {
    let total: i128 = values.into_iter().map(i128::from).sum();
    i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_display() {
        assert_eq!(format!("{}", Money(10050)), "$100.50");
        assert_eq!(format!("{}", Money(100)), "$1.00");
        assert_eq!(format!("{}", Money(5)), "$0.05");
        assert_eq!(format!("{}", Money(-250)), "-$2.50");
        assert_eq!(format!("{}", Money(-3_000_00)), "-$3000.00");
    }

    #[test]
    fn cash_tickers() {
        assert!(is_cash_ticker("$$$$"));
        assert!(is_cash_ticker("MANUAL_CASH"));
        assert!(!is_cash_ticker("AAPL"));
    }

    #[test]
    fn notional_widens() {
        assert_eq!(notional(125, 200_00), 25_000_00);
        assert_eq!(notional(0, 200_00), 0);
        assert_eq!(notional(u64::MAX, i64::MAX), i64::MAX);
    }

    #[test]
    fn saturating_sum_clamps() {
        assert_eq!(saturating_sum([1_00, 2_50]), 3_50);
        assert_eq!(saturating_sum([i64::MAX, i64::MAX]), i64::MAX);
        assert_eq!(saturating_sum([i64::MIN, -1]), i64::MIN);
    }
}

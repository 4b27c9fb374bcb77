//! Sleeves and their security entries, as seen by the trade engine.

use chrono::{DateTime, Utc};

use crate::types::{Cents, Quantity, notional};

/// Whether a member may receive new money.
///
/// Only `Eligible` members get a target; every other state is sell-only.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "state", rename_all = "snake_case"))]
pub enum Eligibility {
    Eligible,
    /// Blocked by an active wash-sale restriction.
    Restricted {
        until: DateTime<Utc>,
        sold_at: Option<DateTime<Utc>>,
        reason: String,
    },
    Inactive,
    Legacy,
}

impl Eligibility {
    #[inline]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// What a sleeve represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SleeveKind {
    /// Synthetic sleeve holding base and manual cash. Target 0%.
    Cash,
    /// A sleeve from the model.
    Model,
    /// Synthetic sleeve of held tickers mapped to no sleeve. Target 0%.
    Orphan,
}

/// One ticker's aggregated position within a sleeve.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecurityEntry {
    pub ticker: String,
    pub rank: u32,
    pub current_qty: Quantity,
    /// Share of the whole portfolio (fraction) this member should hold.
    pub target_pct: f64,
    /// Target value (cents). Member targets of a sleeve sum to the sleeve target.
    pub target_value: Cents,
    /// Cents per share. Zero when no price is known.
    pub price: Cents,
    /// Account of record, used to route trades.
    pub account_id: String,
    /// True if any lot sits in a taxable account.
    pub is_taxable: bool,
    pub cost_basis: Cents,
    /// Market value minus cost basis (negative = loss).
    pub unrealized_gain: Cents,
    /// Earliest open date known from the holdings.
    pub opened_at: Option<DateTime<Utc>>,
    pub eligibility: Eligibility,
}

impl SecurityEntry {
    #[inline]
    pub fn current_value(&self) -> Cents {
        notional(self.current_qty, self.price)
    }

    #[inline]
    pub fn is_eligible(&self) -> bool {
        self.eligibility.is_eligible()
    }

    /// Loss as a percentage of cost basis (positive number), zero for gains.
    pub fn loss_pct(&self) -> f64 {
        if self.unrealized_gain >= 0 || self.cost_basis <= 0 {
            return 0.0;
        }
        (-self.unrealized_gain) as f64 / self.cost_basis as f64 * 100.0
    }
}

/// A ranked group of interchangeable securities with a shared target.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sleeve {
    pub sleeve_id: String,
    pub kind: SleeveKind,
    pub target_value: Cents,
    /// Fraction of the portfolio.
    pub target_pct: f64,
    pub current_value: Cents,
    /// Sorted by rank ascending.
    pub securities: Vec<SecurityEntry>,
}

impl Sleeve {
    pub fn new(sleeve_id: &str, kind: SleeveKind) -> Self {
        Self {
            sleeve_id: sleeve_id.to_string(),
            kind,
            target_value: 0,
            target_pct: 0.0,
            current_value: 0,
            securities: Vec::new(),
        }
    }

    /// Members that may receive new money, in rank order.
    pub fn eligible(&self) -> impl Iterator<Item = &SecurityEntry> {
        self.securities.iter().filter(|s| s.is_eligible())
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible().count()
    }

    pub fn get(&self, ticker: &str) -> Option<&SecurityEntry> {
        self.securities.iter().find(|s| s.ticker == ticker)
    }

    /// Target minus current value; negative when over target.
    #[inline]
    pub fn drift(&self) -> Cents {
        self.target_value - self.current_value
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn entry(ticker: &str, rank: u32, qty: Quantity, price: Cents) -> SecurityEntry {
        let value = notional(qty, price);
        SecurityEntry {
            ticker: ticker.to_string(),
            rank,
            current_qty: qty,
            target_pct: 0.0,
            target_value: 0,
            price,
            account_id: "ACC1".to_string(),
            is_taxable: false,
            cost_basis: value,
            unrealized_gain: 0,
            opened_at: None,
            eligibility: Eligibility::Eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::entry;
    use super::*;

    #[test]
    fn loss_pct() {
        let mut e = entry("AAPL", 1, 250, 188_00);
        e.cost_basis = 50_000_00;
        e.unrealized_gain = -3_000_00;
        assert!((e.loss_pct() - 6.0).abs() < 1e-9);

        e.unrealized_gain = 1_000_00;
        assert_eq!(e.loss_pct(), 0.0);
    }

    #[test]
    fn eligible_iterates_in_rank_order() {
        let mut sleeve = Sleeve::new("tech", SleeveKind::Model);
        sleeve.securities.push(entry("AAPL", 1, 0, 200_00));
        let mut msft = entry("MSFT", 2, 0, 400_00);
        msft.eligibility = Eligibility::Legacy;
        sleeve.securities.push(msft);
        sleeve.securities.push(entry("GOOG", 3, 0, 150_00));

        let tickers: Vec<_> = sleeve.eligible().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "GOOG"]);
        assert_eq!(sleeve.eligible_count(), 2);
    }
}

//! Output of a rebalance run: ordered trades plus diagnostics.

use std::fmt;

use crate::request::Method;
use crate::trade::Trade;
use crate::types::{Cents, Money};

/// A sleeve- or security-level problem that did not abort the run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Diagnostic {
    /// No member can receive money; the sleeve target stays in cash.
    NoEligibleMembers { sleeve_id: String, unallocated: Cents },
    /// A member has no usable price and was skipped.
    MissingPrice { sleeve_id: String, ticker: String },
    /// A buy could not afford one whole share and was dropped.
    InsufficientCash {
        sleeve_id: String,
        ticker: String,
        allocated: Cents,
        price: Cents,
    },
    /// Cash left after whole-share rounding; stays in the cash sleeve.
    UnallocatedCash { amount: Cents },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoEligibleMembers {
                sleeve_id,
                unallocated,
            } => write!(
                f,
                "sleeve {sleeve_id} has zero eligible members; {} unallocated",
                Money(*unallocated)
            ),
            Diagnostic::MissingPrice { sleeve_id, ticker } => {
                write!(f, "{ticker} in sleeve {sleeve_id} has no price; skipped")
            }
            Diagnostic::InsufficientCash {
                sleeve_id,
                ticker,
                allocated,
                price,
            } => write!(
                f,
                "{ticker} in sleeve {sleeve_id}: {} allocated cannot buy one share at {}",
                Money(*allocated),
                Money(*price)
            ),
            Diagnostic::UnallocatedCash { amount } => {
                write!(f, "{} left in cash after rounding", Money(*amount))
            }
        }
    }
}

/// Cash accounting for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CashSummary {
    /// Cash pool the buys were sized against.
    pub available: Cents,
    /// Proceeds of executable sells.
    pub sell_proceeds: Cents,
    /// Total value of executable buys.
    pub invested: Cents,
    /// Amount by which `invested` exceeds `available` (zero unless allowed).
    pub overinvested: Cents,
}

impl CashSummary {
    /// Cash left after all buys (never negative).
    pub fn remaining(&self) -> Cents {
        (self.available - self.invested).max(0)
    }
}

/// Ordered trade list and everything worth telling the caller about the run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceResult {
    pub portfolio_id: String,
    pub method: Method,
    pub total_value: Cents,
    /// Sorted by sleeve id, SELL before BUY within a sleeve.
    pub trades: Vec<Trade>,
    pub diagnostics: Vec<Diagnostic>,
    pub cash: CashSummary,
}

impl RebalanceResult {
    pub fn buys(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_buy())
    }

    pub fn sells(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_sell())
    }

    /// Trades that cannot execute as proposed.
    pub fn blocked(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.can_execute())
    }

    pub fn has_blocked(&self) -> bool {
        self.blocked().next().is_some()
    }

    /// Sum of realized gain/loss over executable sells.
    pub fn realized_gain_loss(&self) -> Cents {
        self.sells()
            .filter(|t| t.can_execute())
            .filter_map(|t| t.realized_gain_loss)
            .sum()
    }
}

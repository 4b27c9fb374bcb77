//! Point-in-time portfolio snapshot: everything a rebalance run reads.
//!
//! The caller resolves these collections from storage and market data
//! before invoking the engine. Nothing here is mutated by a run.

use chrono::{DateTime, Utc};

use crate::replacement::ReplacementCandidate;
use crate::types::{Cents, Quantity};
use crate::wash_sale::WashSaleRestriction;

/// One position in one account.
///
/// Cash balances are holdings of [`BASE_CASH_TICKER`](crate::BASE_CASH_TICKER)
/// or [`MANUAL_CASH_TICKER`](crate::MANUAL_CASH_TICKER) with `price = 1` and
/// `qty` equal to the balance in cents.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Holding {
    pub ticker: String,
    pub account_id: String,
    pub qty: Quantity,
    /// Last price (cents per share)
    pub price: Cents,
    /// Total cost basis of the position (cents)
    #[cfg_attr(feature = "serde", serde(default))]
    pub cost_basis: Cents,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_taxable: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub opened_at: Option<DateTime<Utc>>,
}

impl Holding {
    /// Create a non-taxable position with no recorded cost basis.
    pub fn new(ticker: &str, account_id: &str, qty: Quantity, price: Cents) -> Self {
        Self {
            ticker: ticker.to_string(),
            account_id: account_id.to_string(),
            qty,
            price,
            cost_basis: crate::types::notional(qty, price),
            is_taxable: false,
            opened_at: None,
        }
    }

    /// A base cash balance in `account_id`.
    pub fn cash(account_id: &str, amount: Cents) -> Self {
        Self::new(crate::BASE_CASH_TICKER, account_id, amount.max(0) as Quantity, 1)
    }

    /// A manual (user-entered) cash balance in `account_id`.
    pub fn manual_cash(account_id: &str, amount: Cents) -> Self {
        Self::new(crate::MANUAL_CASH_TICKER, account_id, amount.max(0) as Quantity, 1)
    }

    /// Mark the position taxable with the given total cost basis.
    pub fn taxable(mut self, cost_basis: Cents) -> Self {
        self.is_taxable = true;
        self.cost_basis = cost_basis;
        self
    }

    /// Market value (cents).
    #[inline]
    pub fn value(&self) -> Cents {
        crate::types::notional(self.qty, self.price)
    }
}

/// Lifecycle state of a sleeve member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MemberStatus {
    #[default]
    Active,
    /// Disabled by the model owner; sell-only.
    Inactive,
    /// Kept for historical holdings; sell-only.
    Legacy,
}

/// A security configured in a sleeve.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SleeveMember {
    pub ticker: String,
    /// Lower is preferred; unique within the sleeve.
    pub rank: u32,
    /// Current price (cents). Falls back to the holding price when zero.
    #[cfg_attr(feature = "serde", serde(default))]
    pub price: Cents,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: MemberStatus,
}

impl SleeveMember {
    pub fn new(ticker: &str, rank: u32, price: Cents) -> Self {
        Self {
            ticker: ticker.to_string(),
            rank,
            price,
            status: MemberStatus::Active,
        }
    }

    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }
}

/// A sleeve as configured: an id plus its ranked members.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SleeveDefinition {
    pub sleeve_id: String,
    pub members: Vec<SleeveMember>,
}

impl SleeveDefinition {
    pub fn new(sleeve_id: &str, members: Vec<SleeveMember>) -> Self {
        Self {
            sleeve_id: sleeve_id.to_string(),
            members,
        }
    }
}

/// One row of a model: a sleeve and its weight in basis points.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelMember {
    pub sleeve_id: String,
    pub target_weight_bps: u32,
}

impl ModelMember {
    pub fn new(sleeve_id: &str, target_weight_bps: u32) -> Self {
        Self {
            sleeve_id: sleeve_id.to_string(),
            target_weight_bps,
        }
    }
}

/// Direction of a historical transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransactionKind {
    Buy,
    Sell,
}

/// A historical fill, used only for holding-period narration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    pub ticker: String,
    pub account_id: String,
    pub kind: TransactionKind,
    pub qty: Quantity,
    pub price: Cents,
    pub executed_at: DateTime<Utc>,
}

/// Everything a run needs, resolved by the caller at one instant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSnapshot {
    pub portfolio_id: String,
    /// The single logical instant of the run.
    pub as_of: DateTime<Utc>,
    pub model: Vec<ModelMember>,
    pub sleeves: Vec<SleeveDefinition>,
    pub holdings: Vec<Holding>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub restrictions: Vec<WashSaleRestriction>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub replacements: Vec<ReplacementCandidate>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transactions: Vec<Transaction>,
}

impl PortfolioSnapshot {
    /// Empty snapshot for `portfolio_id` at `as_of`.
    pub fn new(portfolio_id: &str, as_of: DateTime<Utc>) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            as_of,
            model: Vec::new(),
            sleeves: Vec::new(),
            holdings: Vec::new(),
            restrictions: Vec::new(),
            replacements: Vec::new(),
            transactions: Vec::new(),
        }
    }

    /// Total portfolio value: `sum(qty × price)` over all holdings, cash included.
    pub fn total_value(&self) -> Cents {
        crate::types::saturating_sum(self.holdings.iter().map(Holding::value))
    }
}

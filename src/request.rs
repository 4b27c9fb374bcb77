//! Rebalance request: which strategy to run and its cash tolerances.

use std::fmt;
use std::str::FromStr;

use crate::error::{RebalanceError, Result};
use crate::types::{Cents, MAX_OVERINVESTMENT_PERCENT};

/// The four rebalance strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Method {
    /// Move every sleeve member toward its target.
    Allocation,
    /// Harvest qualifying losses, swapping into a sleeve substitute.
    TlhSwap,
    /// Harvest first, then allocate against post-harvest holdings.
    TlhRebalance,
    /// Deploy idle cash only; never sells.
    InvestCash,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::Allocation,
        Method::TlhSwap,
        Method::TlhRebalance,
        Method::InvestCash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Allocation => "allocation",
            Method::TlhSwap => "tlhSwap",
            Method::TlhRebalance => "tlhRebalance",
            Method::InvestCash => "investCash",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RebalanceError;

    /// Accepts camelCase (`tlhSwap`), kebab-case (`tlh-swap`) and snake_case.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "allocation" => Ok(Method::Allocation),
            "tlhswap" => Ok(Method::TlhSwap),
            "tlhrebalance" => Ok(Method::TlhRebalance),
            "investcash" => Ok(Method::InvestCash),
            _ => Err(RebalanceError::UnknownMethod(s.to_string())),
        }
    }
}

/// When a taxable loss is worth harvesting: either threshold suffices.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarvestThresholds {
    /// Loss as percent of cost basis.
    pub min_loss_pct: f64,
    /// Absolute loss (cents).
    pub min_loss: Cents,
}

impl Default for HarvestThresholds {
    fn default() -> Self {
        Self {
            min_loss_pct: 5.0,
            min_loss: 2_500_00,
        }
    }
}

impl HarvestThresholds {
    /// True if a loss of `loss` cents (positive number) at `loss_pct` qualifies.
    pub fn qualifies(&self, loss: Cents, loss_pct: f64) -> bool {
        loss > 0 && (loss_pct >= self.min_loss_pct || loss >= self.min_loss)
    }
}

/// A request to rebalance one portfolio.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceRequest {
    pub portfolio_id: String,
    pub method: Method,
    /// Let the last buy of a sleeve round up past available cash.
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_overinvestment: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_max_overinvestment"))]
    pub max_overinvestment_percent: f64,
    /// investCash only: amount to deploy instead of the cash sleeve balance.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cash_amount: Option<Cents>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub harvest: HarvestThresholds,
}

#[cfg(feature = "serde")]
fn default_max_overinvestment() -> f64 {
    5.0
}

impl RebalanceRequest {
    pub fn new(portfolio_id: &str, method: Method) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            method,
            allow_overinvestment: false,
            max_overinvestment_percent: 5.0,
            cash_amount: None,
            harvest: HarvestThresholds::default(),
        }
    }

    pub fn with_overinvestment(mut self, max_percent: f64) -> Self {
        self.allow_overinvestment = true;
        self.max_overinvestment_percent = max_percent;
        self
    }

    pub fn with_cash_amount(mut self, amount: Cents) -> Self {
        self.cash_amount = Some(amount);
        self
    }

    /// Reject malformed requests before anything is computed.
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.cash_amount {
            if amount < 0 {
                return Err(RebalanceError::NegativeCashAmount(amount));
            }
        }
        if !(0.0..=MAX_OVERINVESTMENT_PERCENT).contains(&self.max_overinvestment_percent) {
            return Err(RebalanceError::InvalidOverinvestment(
                self.max_overinvestment_percent,
            ));
        }
        if !self.harvest.min_loss_pct.is_finite()
            || self.harvest.min_loss_pct < 0.0
            || self.harvest.min_loss < 0
        {
            return Err(RebalanceError::InvalidHarvestThreshold);
        }
        Ok(())
    }
}

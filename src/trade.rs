//! Trades proposed by a rebalance run.

use std::cmp::Ordering;
use std::fmt;

use crate::holding::HoldingPeriod;
use crate::replacement::BlockingReason;
use crate::types::{Cents, Money, Quantity};

/// Trade direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => write!(f, "BUY"),
            TradeType::Sell => write!(f, "SELL"),
        }
    }
}

/// What triggered a trade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum TradeReason {
    /// Over target: trim toward the member target.
    Overweight { target: Cents, current: Cents },
    /// Under target: buy toward the member target.
    Underweight { target: Cents, current: Cents },
    /// Held ticker mapped to no sleeve.
    OrphanLiquidation,
    /// Member that may no longer receive money (restricted, inactive, legacy).
    IneligibleLiquidation { state: String },
    /// Loss harvest of a taxable position.
    Harvest {
        loss: Cents,
        loss_pct: f64,
        period: Option<HoldingPeriod>,
    },
    /// Buy of the substitute for a harvested position.
    HarvestReplacement { original: String, proceeds: Cents },
    /// Deployment of idle cash toward an underfunded sleeve.
    InvestCash { sleeve_need: Cents },
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeReason::Overweight { target, current } => write!(
                f,
                "overweight: {} held vs {} target",
                Money(*current),
                Money(*target)
            ),
            TradeReason::Underweight { target, current } => write!(
                f,
                "underweight: {} held vs {} target",
                Money(*current),
                Money(*target)
            ),
            TradeReason::OrphanLiquidation => write!(f, "not mapped to any sleeve; liquidate"),
            TradeReason::IneligibleLiquidation { state } => {
                write!(f, "{state} member; zero target, liquidate")
            }
            TradeReason::Harvest {
                loss,
                loss_pct,
                period,
            } => {
                write!(f, "harvest {} loss ({:.1}%)", Money(*loss), loss_pct)?;
                if let Some(p) = period {
                    write!(f, ", {p}")?;
                }
                Ok(())
            }
            TradeReason::HarvestReplacement { original, proceeds } => write!(
                f,
                "replacement for harvested {original}, reinvesting {}",
                Money(*proceeds)
            ),
            TradeReason::InvestCash { sleeve_need } => {
                write!(f, "invest cash; sleeve needs {}", Money(*sleeve_need))
            }
        }
    }
}

/// A proposed whole-share trade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub ticker: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub trade_type: TradeType,
    /// Whole shares, always >= 1.
    pub qty: Quantity,
    pub estimated_value: Cents,
    pub reason: TradeReason,
    /// Realized gain (negative = loss). SELL only.
    pub realized_gain_loss: Option<Cents>,
    /// Present iff the trade cannot execute.
    pub blocking_reason: Option<BlockingReason>,
    pub account_id: String,
    pub sleeve_id: String,
    pub rank: u32,
}

impl Trade {
    /// False when a blocking reason is attached.
    #[inline]
    pub fn can_execute(&self) -> bool {
        self.blocking_reason.is_none()
    }

    #[inline]
    pub fn is_buy(&self) -> bool {
        self.trade_type == TradeType::Buy
    }

    #[inline]
    pub fn is_sell(&self) -> bool {
        self.trade_type == TradeType::Sell
    }

    /// Final ordering: sleeve id ascending, then SELL before BUY.
    pub fn output_order(a: &Trade, b: &Trade) -> Ordering {
        a.sleeve_id.cmp(&b.sleeve_id).then_with(|| {
            let rank = |t: &Trade| match t.trade_type {
                TradeType::Sell => 0,
                TradeType::Buy => 1,
            };
            rank(a).cmp(&rank(b))
        })
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({}) [{}]",
            self.trade_type,
            self.qty,
            self.ticker,
            Money(self.estimated_value),
            self.reason
        )?;
        if let Some(block) = &self.blocking_reason {
            write!(f, " BLOCKED: {}", block.to_string().replace('\n', "; "))?;
        }
        Ok(())
    }
}

// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # sleevebook
//!
//! A deterministic sleeve-based rebalancing and tax-loss harvesting engine.
//!
//! A portfolio follows a *model*: a list of sleeves with target weights in
//! basis points. Each sleeve is a ranked group of interchangeable
//! securities. Given a point-in-time snapshot of holdings, the engine
//! proposes whole-share BUY/SELL trades that move the portfolio toward the
//! model without ever buying a wash-sale restricted security.
//!
//! ## Features
//!
//! - **Four strategies**: allocation, tlhSwap, tlhRebalance, investCash
//! - **Wash-sale aware**: restricted members get no target and are never bought
//! - **Same-sleeve substitutes**: harvested losses rotate into the next-ranked member
//! - **Exact cash**: integer cents, whole shares, buys bounded by available cash
//! - **Deterministic**: same inputs, same trades, same order
//!
//! ## Quick Start
//!
//! ```
//! use sleevebook::{
//!     Holding, Method, ModelMember, PortfolioSnapshot, RebalanceRequest, SleeveDefinition,
//!     SleeveMember, TradeType, rebalance,
//! };
//! use chrono::{TimeZone, Utc};
//!
//! let mut snapshot = PortfolioSnapshot::new("p1", Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap());
//! snapshot.model = vec![ModelMember::new("tech", 2_000), ModelMember::new("bonds", 8_000)];
//! snapshot.sleeves = vec![
//!     SleeveDefinition::new("tech", vec![
//!         SleeveMember::new("AAPL", 1, 200_00),
//!         SleeveMember::new("MSFT", 2, 200_00),
//!     ]),
//!     SleeveDefinition::new("bonds", vec![SleeveMember::new("BND", 1, 100_00)]),
//! ];
//! snapshot.holdings = vec![
//!     Holding::new("AAPL", "ACC1", 125, 200_00),
//!     Holding::new("BND", "ACC1", 1_750, 100_00),
//! ];
//!
//! let request = RebalanceRequest::new("p1", Method::Allocation);
//! let result = rebalance(&request, &snapshot).unwrap();
//!
//! // Sorted by sleeve id, SELL before BUY
//! let plan: Vec<_> = result.trades.iter()
//!     .map(|t| (t.trade_type, t.ticker.as_str(), t.qty))
//!     .collect();
//! assert_eq!(plan, vec![
//!     (TradeType::Sell, "BND", 150),
//!     (TradeType::Sell, "AAPL", 25),
//!     (TradeType::Buy, "MSFT", 100),
//! ]);
//! ```
//!
//! ## Money Representation
//!
//! Amounts are [`i64`] cents. Cash balances are holdings of
//! [`BASE_CASH_TICKER`] or [`MANUAL_CASH_TICKER`] priced at one cent:
//!
//! ```
//! use sleevebook::{Holding, Money};
//!
//! let cash = Holding::cash("ACC1", 1_500_00);
//! assert_eq!(cash.value(), 1_500_00);
//! assert_eq!(format!("{}", Money(100_50)), "$100.50");
//! ```
//!
//! ## Strategies
//!
//! | Method | Sells | Buys |
//! |--------|-------|------|
//! | **allocation** | overweight, ineligible and orphan positions | underweight eligible members |
//! | **tlhSwap** | qualifying taxable losses, orphans | same-sleeve substitute with the proceeds |
//! | **tlhRebalance** | harvest first, then allocation on what is left | substitutes, then underweight members |
//! | **investCash** | never | underfunded sleeves, pro rata to need |
//!
//! ## Blocked Trades
//!
//! A harvest whose only substitutes are wash-sale restricted is still
//! proposed, with a reason it cannot execute:
//!
//! ```
//! use sleevebook::{
//!     Holding, Method, ModelMember, PortfolioSnapshot, RebalanceRequest, SleeveDefinition,
//!     SleeveMember, WashSaleRestriction, rebalance,
//! };
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let now = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
//! let mut snapshot = PortfolioSnapshot::new("p1", now);
//! snapshot.model = vec![ModelMember::new("us-equity", 10_000)];
//! snapshot.sleeves = vec![SleeveDefinition::new("us-equity", vec![
//!     SleeveMember::new("AAPL", 1, 188_00),
//!     SleeveMember::new("VOO", 2, 400_00),
//! ])];
//! // $3,000 loss on a $50,000 cost basis
//! snapshot.holdings = vec![Holding::new("AAPL", "TAX1", 250, 188_00).taxable(50_000_00)];
//! snapshot.restrictions = vec![
//!     WashSaleRestriction::new("VOO", now + Duration::days(10), "harvested"),
//! ];
//!
//! let result = rebalance(&RebalanceRequest::new("p1", Method::TlhSwap), &snapshot).unwrap();
//! assert_eq!(result.trades.len(), 1);
//! assert!(!result.trades[0].can_execute());
//! assert!(result.trades[0].blocking_reason.as_ref().unwrap().to_string().contains("VOO"));
//! ```

mod batch;
mod cash;
mod engine;
mod error;
pub mod holding;
#[cfg(feature = "persistence")]
pub mod persistence;
mod replacement;
mod request;
mod result;
mod sleeve;
mod snapshot;
mod target;
mod trade;
mod types;
pub mod wash_sale;

// Re-export public API
pub use batch::{RebalanceJob, rebalance_many};
pub use cash::CashPool;
pub use engine::{execute_rebalance, rebalance};
pub use error::{RebalanceError, Result};
pub use holding::HoldingPeriod;
pub use replacement::{
    BlockingReason, ReplacementCandidate, ReplacementResolver, RestrictedCandidate,
};
pub use request::{HarvestThresholds, Method, RebalanceRequest};
pub use result::{CashSummary, Diagnostic, RebalanceResult};
pub use sleeve::{Eligibility, SecurityEntry, Sleeve, SleeveKind};
pub use snapshot::{
    Holding, MemberStatus, ModelMember, PortfolioSnapshot, SleeveDefinition, SleeveMember,
    Transaction, TransactionKind,
};
pub use target::{SleeveBook, build_sleeves};
pub use trade::{Trade, TradeReason, TradeType};
pub use types::{
    BASE_CASH_TICKER, CASH_SLEEVE_ID, Cents, FULL_WEIGHT_BPS, MANUAL_CASH_TICKER, Money,
    MAX_OVERINVESTMENT_PERCENT, ORPHAN_RANK, ORPHAN_SLEEVE_ID, Quantity, is_cash_ticker,
};
pub use wash_sale::{RestrictionIndex, WashSaleRestriction};

//! Trade generation.
//!
//! A run is a pure function of its inputs: the same request, sleeves,
//! restrictions and replacement seeds always produce the same trade list.
//! Every strategy tallies its sells before sizing any buy, and the final
//! list is ordered by sleeve id with SELL ahead of BUY.

mod allocation;
mod harvest;
mod invest_cash;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cash::CashPool;
use crate::error::Result;
use crate::replacement::{BlockingReason, ReplacementCandidate, ReplacementResolver};
use crate::request::{Method, RebalanceRequest};
use crate::result::{Diagnostic, RebalanceResult};
use crate::sleeve::{Eligibility, SecurityEntry, Sleeve, SleeveKind};
use crate::snapshot::{PortfolioSnapshot, Transaction};
use crate::target::{SleeveBook, build_sleeves};
use crate::trade::{Trade, TradeReason, TradeType};
use crate::types::{Cents, Quantity, notional};
use crate::wash_sale::RestrictionIndex;

/// Run `request` against a full snapshot: validate, index restrictions at
/// `as_of`, build sleeves, generate trades.
pub fn rebalance(
    request: &RebalanceRequest,
    snapshot: &PortfolioSnapshot,
) -> Result<RebalanceResult> {
    request.validate()?;
    let restrictions = RestrictionIndex::new(&snapshot.restrictions, snapshot.as_of);
    let book = build_sleeves(
        &snapshot.model,
        &snapshot.sleeves,
        &snapshot.holdings,
        &restrictions,
    )?;
    execute_rebalance(
        request,
        &book,
        &restrictions,
        &snapshot.replacements,
        &snapshot.transactions,
    )
}

/// Generate trades for already-built sleeves.
///
/// `book` should be built against `restrictions`; the index is consulted
/// again before every buy, so a stale book can never buy a restricted ticker.
pub fn execute_rebalance(
    request: &RebalanceRequest,
    book: &SleeveBook,
    restrictions: &RestrictionIndex,
    replacements: &[ReplacementCandidate],
    transactions: &[Transaction],
) -> Result<RebalanceResult> {
    request.validate()?;
    info!(
        "rebalance {} ({}): {} sleeves, total value {}, {} active restrictions",
        request.portfolio_id,
        request.method,
        book.sleeves.len(),
        book.total_value,
        restrictions.len()
    );

    let mut run = Run::new(request, book, restrictions, replacements, transactions);
    match request.method {
        Method::Allocation => {
            run.liquidate_orphans();
            run.allocation_sells();
            run.allocation_buys();
            run.report_unallocated();
        }
        Method::TlhSwap => {
            run.liquidate_orphans();
            run.harvest();
        }
        Method::TlhRebalance => {
            run.liquidate_orphans();
            run.harvest();
            run.allocation_sells();
            run.allocation_buys();
            run.report_unallocated();
        }
        Method::InvestCash => {
            run.invest_cash();
        }
    }

    Ok(run.finish())
}

/// Mutable state of one run.
pub(crate) struct Run<'a> {
    request: &'a RebalanceRequest,
    book: &'a SleeveBook,
    restrictions: &'a RestrictionIndex,
    resolver: ReplacementResolver<'a>,
    transactions: &'a [Transaction],
    now: DateTime<Utc>,
    cash: CashPool,
    /// Shares bought so far this run, per ticker.
    bought: FxHashMap<&'a str, Quantity>,
    /// Tickers sold by the harvest phase (executable or blocked).
    harvested: FxHashSet<String>,
    /// Tickers bought as harvest replacements.
    replacements: FxHashSet<String>,
    trades: Vec<Trade>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Run<'a> {
    fn new(
        request: &'a RebalanceRequest,
        book: &'a SleeveBook,
        restrictions: &'a RestrictionIndex,
        seeds: &'a [ReplacementCandidate],
        transactions: &'a [Transaction],
    ) -> Self {
        let now = restrictions.as_of();
        let starting_cash = match (request.method, request.cash_amount) {
            (Method::InvestCash, Some(amount)) => amount.min(book.cash().current_value),
            _ => book.cash().current_value,
        };
        Self {
            request,
            book,
            restrictions,
            resolver: ReplacementResolver::new(seeds, now),
            transactions,
            now,
            cash: CashPool::new(starting_cash, request, book.total_value),
            bought: FxHashMap::default(),
            harvested: FxHashSet::default(),
            replacements: FxHashSet::default(),
            trades: Vec::new(),
            diagnostics: book.diagnostics.clone(),
        }
    }

    fn model_sleeves(&self) -> impl Iterator<Item = &'a Sleeve> + use<'a> {
        let book: &'a SleeveBook = self.book;
        book.sleeves.iter().filter(|s| s.kind == SleeveKind::Model)
    }

    /// Quantity held after this run's buys so far.
    fn projected_qty(&self, entry: &SecurityEntry) -> Quantity {
        entry.current_qty + self.bought.get(entry.ticker.as_str()).copied().unwrap_or(0)
    }

    /// May this run put money into `entry`?
    fn may_buy(&self, entry: &SecurityEntry) -> bool {
        if !entry.is_eligible() {
            return false;
        }
        if let Some(r) = self.restrictions.is_restricted(&entry.ticker) {
            warn!(
                "{} marked eligible but restricted until {}; not buying",
                entry.ticker, r.restricted_until
            );
            return false;
        }
        true
    }

    fn missing_price(&mut self, sleeve: &Sleeve, entry: &SecurityEntry) {
        warn!("{} in sleeve {} has no price", entry.ticker, sleeve.sleeve_id);
        self.diagnostics.push(Diagnostic::MissingPrice {
            sleeve_id: sleeve.sleeve_id.clone(),
            ticker: entry.ticker.clone(),
        });
    }

    /// Record a sell of `qty` shares. Executable proceeds go to the pool.
    fn push_sell(
        &mut self,
        sleeve: &Sleeve,
        entry: &SecurityEntry,
        qty: Quantity,
        reason: TradeReason,
        blocking_reason: Option<BlockingReason>,
    ) -> Cents {
        let value = notional(qty, entry.price);
        let trade = Trade {
            ticker: entry.ticker.clone(),
            trade_type: TradeType::Sell,
            qty,
            estimated_value: value,
            reason,
            realized_gain_loss: Some(realized_gain(entry, qty)),
            blocking_reason,
            account_id: entry.account_id.clone(),
            sleeve_id: sleeve.sleeve_id.clone(),
            rank: entry.rank,
        };
        debug!("{}: {trade}", sleeve.sleeve_id);
        if trade.can_execute() {
            self.cash.add_proceeds(value);
        }
        self.trades.push(trade);
        value
    }

    /// Record a buy, debiting the pool. `account_id` overrides the entry's
    /// account of record.
    fn push_buy(
        &mut self,
        sleeve: &Sleeve,
        entry: &'a SecurityEntry,
        qty: Quantity,
        reason: TradeReason,
        account_id: Option<&str>,
    ) -> Cents {
        let value = self.cash.spend(qty, entry.price);
        let trade = Trade {
            ticker: entry.ticker.clone(),
            trade_type: TradeType::Buy,
            qty,
            estimated_value: value,
            reason,
            realized_gain_loss: None,
            blocking_reason: None,
            account_id: account_id.unwrap_or(&entry.account_id).to_string(),
            sleeve_id: sleeve.sleeve_id.clone(),
            rank: entry.rank,
        };
        debug!("{}: {trade}", sleeve.sleeve_id);
        *self.bought.entry(entry.ticker.as_str()).or_insert(0) += qty;
        self.trades.push(trade);
        value
    }

    /// Orphans have a zero target and are always sold in full.
    fn liquidate_orphans(&mut self) {
        let book = self.book;
        for sleeve in book.sleeves.iter().filter(|s| s.kind == SleeveKind::Orphan) {
            for entry in sleeve.securities.iter().filter(|e| e.current_qty > 0) {
                if entry.price <= 0 {
                    self.missing_price(sleeve, entry);
                }
                self.push_sell(
                    sleeve,
                    entry,
                    entry.current_qty,
                    TradeReason::OrphanLiquidation,
                    None,
                );
            }
        }
    }

    fn report_unallocated(&mut self) {
        let left = self.cash.remaining();
        if left > 0 {
            debug!("{left} cents left in cash");
            self.diagnostics
                .push(Diagnostic::UnallocatedCash { amount: left });
        }
    }

    fn finish(mut self) -> RebalanceResult {
        self.trades.sort_by(Trade::output_order);
        let summary = self.cash.summary();
        info!(
            "rebalance {} ({}): {} trades, {} blocked, invested {} of {}",
            self.request.portfolio_id,
            self.request.method,
            self.trades.len(),
            self.trades.iter().filter(|t| !t.can_execute()).count(),
            summary.invested,
            summary.available
        );
        RebalanceResult {
            portfolio_id: self.request.portfolio_id.clone(),
            method: self.request.method,
            total_value: self.book.total_value,
            trades: self.trades,
            diagnostics: self.diagnostics,
            cash: summary,
        }
    }
}

/// Average-cost realized gain for selling `qty` of `entry`.
fn realized_gain(entry: &SecurityEntry, qty: Quantity) -> Cents {
    if entry.current_qty == 0 || qty >= entry.current_qty {
        return entry.unrealized_gain;
    }
    (entry.unrealized_gain as i128 * qty as i128 / entry.current_qty as i128) as Cents
}

/// Short name of an ineligible state, for trade narration.
fn state_name(eligibility: &Eligibility) -> &'static str {
    match eligibility {
        Eligibility::Eligible => "eligible",
        Eligibility::Restricted { .. } => "restricted",
        Eligibility::Inactive => "inactive",
        Eligibility::Legacy => "legacy",
    }
}

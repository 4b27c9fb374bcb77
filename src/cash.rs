//! Cash and rounding reconciler.
//!
//! Pools sell proceeds with pre-existing cash and sizes buys in whole shares
//! so the run never spends more than it has. With overinvestment allowed,
//! only the last buy of a sleeve may round up, and only within
//! `min(available, total_value) × max_overinvestment_percent / 100`.

use log::trace;

use crate::request::RebalanceRequest;
use crate::result::CashSummary;
use crate::types::{Cents, Quantity, notional};

/// Cash available to one run.
#[derive(Clone, Debug)]
pub struct CashPool {
    available: Cents,
    sell_proceeds: Cents,
    spent: Cents,
    allow_overinvestment: bool,
    max_overinvestment_percent: f64,
    total_value: Cents,
}

impl CashPool {
    /// Start a pool with `starting_cash` (the cash sleeve balance, capped
    /// by the caller's amount for investCash).
    pub fn new(starting_cash: Cents, request: &RebalanceRequest, total_value: Cents) -> Self {
        Self {
            available: starting_cash.max(0),
            sell_proceeds: 0,
            spent: 0,
            allow_overinvestment: request.allow_overinvestment,
            max_overinvestment_percent: request.max_overinvestment_percent,
            total_value,
        }
    }

    /// Credit proceeds from an executable sell.
    pub fn add_proceeds(&mut self, amount: Cents) {
        assert!(amount >= 0, "negative sell proceeds: {amount}");
        self.available = self.available.saturating_add(amount);
        self.sell_proceeds = self.sell_proceeds.saturating_add(amount);
    }

    pub fn available(&self) -> Cents {
        self.available
    }

    /// Cash not yet spent (zero once overinvested).
    pub fn remaining(&self) -> Cents {
        (self.available - self.spent).max(0)
    }

    /// Tolerance above `available`, in cents.
    pub fn allowance(&self) -> Cents {
        if !self.allow_overinvestment {
            return 0;
        }
        let base = self.available.min(self.total_value).max(0);
        (base as f64 * self.max_overinvestment_percent / 100.0).floor() as Cents
    }

    /// Whole shares affordable with up to `wanted` cents at `price`.
    ///
    /// `wanted` is capped by the remaining cash. When `last_in_sleeve` is set
    /// and overinvestment is allowed, one extra share is taken if the total
    /// stays within `available + allowance`. Returns 0 when nothing fits.
    pub fn size_buy(&self, wanted: Cents, price: Cents, last_in_sleeve: bool) -> Quantity {
        if price <= 0 || wanted <= 0 {
            return 0;
        }
        let allocated = wanted.min(self.remaining());
        let mut qty = (allocated / price) as Quantity;

        if last_in_sleeve && self.allow_overinvestment && allocated % price != 0 {
            let cost = notional(qty + 1, price);
            if self.spent.saturating_add(cost) <= self.available.saturating_add(self.allowance()) {
                trace!(
                    "rounding up last buy: {} shares at {} with {} allocated",
                    qty + 1,
                    price,
                    allocated
                );
                qty += 1;
            }
        }

        qty
    }

    /// Debit an executable buy.
    pub fn spend(&mut self, qty: Quantity, price: Cents) -> Cents {
        let cost = notional(qty, price);
        self.spent = self.spent.saturating_add(cost);
        assert!(
            self.spent <= self.available.saturating_add(self.allowance()),
            "spent {} exceeds available {} plus allowance {}",
            self.spent,
            self.available,
            self.allowance()
        );
        cost
    }

    pub fn summary(&self) -> CashSummary {
        CashSummary {
            available: self.available,
            sell_proceeds: self.sell_proceeds,
            invested: self.spent,
            overinvested: (self.spent - self.available).max(0),
        }
    }
}

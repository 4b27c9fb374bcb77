//! Allocation: move every sleeve member toward its target.
//!
//! Sells run first over all sleeves (ineligible members in full, eligible
//! members trimmed to target), then buys walk the sleeves in order and
//! spend the pooled cash on underweight members by rank.

use log::debug;

use super::{Run, state_name};
use crate::result::Diagnostic;
use crate::sleeve::SecurityEntry;
use crate::trade::TradeReason;
use crate::types::{Cents, Quantity, notional};

impl<'a> Run<'a> {
    /// Ineligible state name, counting a stale book's eligible-but-restricted
    /// entries as restricted.
    fn ineligible_state(&self, entry: &SecurityEntry) -> &'static str {
        if entry.is_eligible() {
            "restricted"
        } else {
            state_name(&entry.eligibility)
        }
    }

    pub(super) fn allocation_sells(&mut self) {
        for sleeve in self.model_sleeves() {
            for entry in &sleeve.securities {
                if self.harvested.contains(&entry.ticker) || self.replacements.contains(&entry.ticker)
                {
                    continue;
                }
                let qty = self.projected_qty(entry);
                if qty == 0 {
                    continue;
                }
                if entry.price <= 0 {
                    self.missing_price(sleeve, entry);
                    continue;
                }

                if !self.may_buy(entry) {
                    let state = self.ineligible_state(entry).to_string();
                    self.push_sell(
                        sleeve,
                        entry,
                        qty,
                        TradeReason::IneligibleLiquidation { state },
                        None,
                    );
                    continue;
                }

                let current = notional(qty, entry.price);
                let excess = current - entry.target_value;
                if excess <= 0 {
                    continue;
                }
                let shares = ((excess / entry.price) as Quantity).min(qty);
                if shares == 0 {
                    debug!(
                        "{} over target by {} cents, less than one share",
                        entry.ticker, excess
                    );
                    continue;
                }
                self.push_sell(
                    sleeve,
                    entry,
                    shares,
                    TradeReason::Overweight {
                        target: entry.target_value,
                        current,
                    },
                    None,
                );
            }
        }
    }

    pub(super) fn allocation_buys(&mut self) {
        for sleeve in self.model_sleeves() {
            let mut wants: Vec<(&'a SecurityEntry, Cents)> = Vec::new();
            for entry in &sleeve.securities {
                if self.harvested.contains(&entry.ticker) || !self.may_buy(entry) {
                    continue;
                }
                let qty = self.projected_qty(entry);
                if entry.price <= 0 {
                    // Held entries were reported on the sell side.
                    if qty == 0 {
                        self.missing_price(sleeve, entry);
                    }
                    continue;
                }
                let current = notional(qty, entry.price);
                if entry.target_value > current {
                    wants.push((entry, current));
                }
            }

            let last = wants.len().saturating_sub(1);
            for (i, (entry, current)) in wants.into_iter().enumerate() {
                let shortfall = entry.target_value - current;
                let qty = self.cash.size_buy(shortfall, entry.price, i == last);
                if qty == 0 {
                    let allocated = shortfall.min(self.cash.remaining());
                    if allocated > 0 {
                        self.diagnostics.push(Diagnostic::InsufficientCash {
                            sleeve_id: sleeve.sleeve_id.clone(),
                            ticker: entry.ticker.clone(),
                            allocated,
                            price: entry.price,
                        });
                    }
                    continue;
                }
                self.push_buy(
                    sleeve,
                    entry,
                    qty,
                    TradeReason::Underweight {
                        target: entry.target_value,
                        current,
                    },
                    None,
                );
            }
        }
    }
}

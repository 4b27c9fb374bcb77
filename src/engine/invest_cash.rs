//! Cash deployment without selling.
//!
//! Deployable cash is split across underfunded sleeves in proportion to
//! their need (`max(target - current, 0)`), never more than the need. Within
//! a sleeve, members are funded by rank. Whatever whole-share rounding
//! leaves behind carries into the next sleeve; the final remainder stays in
//! cash.

use log::debug;

use super::Run;
use crate::result::Diagnostic;
use crate::sleeve::{SecurityEntry, Sleeve};
use crate::trade::TradeReason;
use crate::types::Cents;

impl<'a> Run<'a> {
    /// Eligible, priced and under its own target.
    fn fundable(&self, entry: &SecurityEntry) -> bool {
        entry.price > 0 && entry.target_value > entry.current_value() && self.may_buy(entry)
    }

    pub(super) fn invest_cash(&mut self) {
        let deployable = self.cash.available();
        let needs: Vec<(&'a Sleeve, Cents)> = self
            .model_sleeves()
            .filter(|s| s.drift() > 0)
            .filter(|s| s.securities.iter().any(|e| self.fundable(e)))
            .map(|s| (s, s.drift()))
            .collect();
        let total_need: Cents = needs.iter().map(|(_, need)| need).sum();
        debug!(
            "investing {deployable} cents across {} sleeves needing {total_need}",
            needs.len()
        );

        if deployable > 0 && total_need > 0 {
            let mut carry: Cents = 0;
            for (sleeve, need) in needs {
                let share = if deployable >= total_need {
                    need
                } else {
                    (deployable as i128 * need as i128 / total_need as i128) as Cents
                };
                carry = self.fund_sleeve(sleeve, need, share + carry);
            }
        }

        self.report_unallocated();
    }

    /// Spend up to `budget` on the sleeve's members by rank; returns what is
    /// left.
    fn fund_sleeve(&mut self, sleeve: &'a Sleeve, need: Cents, budget: Cents) -> Cents {
        let members: Vec<&'a SecurityEntry> = sleeve
            .securities
            .iter()
            .filter(|e| self.fundable(e))
            .collect();
        let last = members.len().saturating_sub(1);
        let mut budget = budget;

        for (i, entry) in members.into_iter().enumerate() {
            let wanted = (entry.target_value - entry.current_value()).min(budget);
            if wanted <= 0 {
                break;
            }
            let qty = self.cash.size_buy(wanted, entry.price, i == last);
            if qty == 0 {
                self.diagnostics.push(Diagnostic::InsufficientCash {
                    sleeve_id: sleeve.sleeve_id.clone(),
                    ticker: entry.ticker.clone(),
                    allocated: wanted,
                    price: entry.price,
                });
                continue;
            }
            budget -= self.push_buy(
                sleeve,
                entry,
                qty,
                TradeReason::InvestCash { sleeve_need: need },
                None,
            );
        }

        budget.max(0)
    }
}

//! Tax-loss harvesting.
//!
//! A taxable position qualifies when its unrealized loss reaches either the
//! percentage or the dollar threshold. The whole position is sold and the
//! proceeds buy the best-ranked eligible substitute in the same sleeve. A
//! ticker harvested in this run is never a substitute. With no substitute
//! the sell is still emitted, carrying the reason it cannot execute.

use log::{debug, info};

use super::Run;
use crate::holding::HoldingPeriod;
use crate::replacement::{BlockingReason, RestrictedCandidate};
use crate::result::Diagnostic;
use crate::sleeve::{SecurityEntry, Sleeve};
use crate::trade::TradeReason;
use crate::wash_sale::days_until;

impl<'a> Run<'a> {
    pub(super) fn harvest(&mut self) {
        let thresholds = self.request.harvest;
        let candidates: Vec<(&'a Sleeve, &'a SecurityEntry)> = self
            .model_sleeves()
            .flat_map(|s| s.securities.iter().map(move |e| (s, e)))
            .filter(|(_, e)| {
                e.is_taxable
                    && e.current_qty > 0
                    && e.price > 0
                    && thresholds.qualifies(-e.unrealized_gain, e.loss_pct())
            })
            .collect();
        debug!("{} positions qualify for harvest", candidates.len());

        // Every harvested ticker is excluded before any substitute is chosen.
        self.harvested
            .extend(candidates.iter().map(|(_, e)| e.ticker.clone()));

        for (sleeve, entry) in candidates {
            self.harvest_one(sleeve, entry);
        }
    }

    fn harvest_one(&mut self, sleeve: &'a Sleeve, entry: &'a SecurityEntry) {
        let period =
            HoldingPeriod::for_ticker(&entry.ticker, self.transactions, entry.opened_at, self.now);
        let reason = TradeReason::Harvest {
            loss: entry.unrealized_gain,
            loss_pct: entry.loss_pct(),
            period,
        };

        let replacement = match self.replacement_for(sleeve, entry) {
            Ok(r) => r,
            Err(block) => {
                info!(
                    "harvest of {} blocked: {}",
                    entry.ticker,
                    block.to_string().replace('\n', "; ")
                );
                self.push_sell(sleeve, entry, entry.current_qty, reason, Some(block));
                return;
            }
        };

        let proceeds = self.push_sell(sleeve, entry, entry.current_qty, reason, None);
        let qty = self.cash.size_buy(proceeds, replacement.price, false);
        if qty == 0 {
            self.diagnostics.push(Diagnostic::InsufficientCash {
                sleeve_id: sleeve.sleeve_id.clone(),
                ticker: replacement.ticker.clone(),
                allocated: proceeds,
                price: replacement.price,
            });
            return;
        }

        self.replacements.insert(replacement.ticker.clone());
        // Proceeds settle where the harvested lot was held.
        self.push_buy(
            sleeve,
            replacement,
            qty,
            TradeReason::HarvestReplacement {
                original: entry.ticker.clone(),
                proceeds,
            },
            Some(&entry.account_id),
        );
    }

    /// Substitute for `entry`, re-checked against the restriction index.
    fn replacement_for(
        &self,
        sleeve: &'a Sleeve,
        entry: &SecurityEntry,
    ) -> Result<&'a SecurityEntry, BlockingReason> {
        let replacement = self
            .resolver
            .resolve(sleeve, &entry.ticker, &self.harvested)?;
        if let Some(r) = self.restrictions.is_restricted(&replacement.ticker) {
            return Err(BlockingReason::RestrictedReplacement {
                restricted: vec![RestrictedCandidate {
                    ticker: r.ticker.clone(),
                    until: r.restricted_until,
                    sold_at: r.sold_at,
                    days_remaining: days_until(r.restricted_until, self.now),
                    reason: r.reason.clone(),
                }],
            });
        }
        Ok(replacement)
    }
}

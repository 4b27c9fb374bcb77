//! Sleeve target builder.
//!
//! Turns model weights and holdings into per-sleeve target values and
//! per-member target percentages. The output sleeve list is ordered for the
//! trade engine: cash first, then model sleeves in the order supplied, then
//! the orphan sleeve.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{RebalanceError, Result};
use crate::result::Diagnostic;
use crate::sleeve::{Eligibility, SecurityEntry, Sleeve, SleeveKind};
use crate::snapshot::{Holding, MemberStatus, ModelMember, SleeveDefinition, SleeveMember};
use crate::types::{
    BASE_CASH_TICKER, CASH_SLEEVE_ID, Cents, FULL_WEIGHT_BPS, MANUAL_CASH_TICKER,
    ORPHAN_RANK, ORPHAN_SLEEVE_ID, Quantity, is_cash_ticker, notional, saturating_sum,
};
use crate::wash_sale::RestrictionIndex;

/// Sleeves with targets, ready for trade generation.
#[derive(Clone, Debug)]
pub struct SleeveBook {
    /// Sum of `qty × price` across all holdings, cash included.
    pub total_value: Cents,
    /// Cash, model sleeves (supplied order), orphan.
    pub sleeves: Vec<Sleeve>,
    pub diagnostics: Vec<Diagnostic>,
    /// Account that receives buys of tickers not currently held.
    pub default_account: String,
}

impl SleeveBook {
    pub fn cash(&self) -> &Sleeve {
        &self.sleeves[0]
    }

    pub fn get(&self, sleeve_id: &str) -> Option<&Sleeve> {
        self.sleeves.iter().find(|s| s.sleeve_id == sleeve_id)
    }
}

/// A held ticker aggregated over accounts.
struct Position {
    qty: Quantity,
    price: Cents,
    cost_basis: Cents,
    is_taxable: bool,
    opened_at: Option<DateTime<Utc>>,
    account_qty: Vec<(String, Quantity)>,
}

impl Position {
    /// Account holding the most shares; ties go to the smallest account id.
    fn account_of_record(&self) -> String {
        self.account_qty
            .iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(acc, _)| acc.clone())
            .unwrap_or_default()
    }
}

/// Build sleeves and targets from a model, sleeve definitions and holdings.
pub fn build_sleeves(
    model: &[ModelMember],
    definitions: &[SleeveDefinition],
    holdings: &[Holding],
    restrictions: &RestrictionIndex,
) -> Result<SleeveBook> {
    validate(model, definitions, holdings)?;

    let (positions, order) = aggregate(holdings);
    let total_value = saturating_sum(holdings.iter().map(Holding::value));
    let default_account = default_account(holdings);
    let mut diagnostics = Vec::new();

    let mut sleeves = Vec::with_capacity(definitions.len() + 2);
    sleeves.push(cash_sleeve(&positions, &default_account));

    let weights: FxHashMap<&str, u32> = model
        .iter()
        .map(|m| (m.sleeve_id.as_str(), m.target_weight_bps))
        .collect();
    let defs: FxHashMap<&str, &SleeveDefinition> = definitions
        .iter()
        .map(|d| (d.sleeve_id.as_str(), d))
        .collect();

    // Model order first, then definitions the model gives no weight.
    let mut sleeve_order: Vec<&SleeveDefinition> = model
        .iter()
        .filter_map(|m| defs.get(m.sleeve_id.as_str()).copied())
        .collect();
    sleeve_order.extend(
        definitions
            .iter()
            .filter(|d| !weights.contains_key(d.sleeve_id.as_str())),
    );

    for def in sleeve_order {
        let bps = weights.get(def.sleeve_id.as_str()).copied().unwrap_or(0);
        let sleeve = model_sleeve(
            def,
            bps,
            total_value,
            &positions,
            restrictions,
            &default_account,
            &mut diagnostics,
        );
        sleeves.push(sleeve);
    }

    let mapped: FxHashSet<&str> = definitions
        .iter()
        .flat_map(|d| d.members.iter().map(|m| m.ticker.as_str()))
        .collect();
    sleeves.push(orphan_sleeve(&order, &positions, &mapped));

    let pct_sum: f64 = sleeves.iter().map(|s| s.target_pct).sum();
    assert!(
        pct_sum <= 1.0 + 1e-9,
        "sleeve target pct sums to {pct_sum}, above 100%"
    );
    let value_sum: Cents = sleeves.iter().map(|s| s.target_value).sum();
    assert!(
        value_sum <= total_value.max(0),
        "sleeve targets {value_sum} exceed portfolio value {total_value}"
    );

    Ok(SleeveBook {
        total_value,
        sleeves,
        diagnostics,
        default_account,
    })
}

fn validate(
    model: &[ModelMember],
    definitions: &[SleeveDefinition],
    holdings: &[Holding],
) -> Result<()> {
    let mut sleeve_ids = FxHashSet::default();
    let mut member_of: FxHashMap<&str, &str> = FxHashMap::default();

    for def in definitions {
        if !sleeve_ids.insert(def.sleeve_id.as_str())
            || def.sleeve_id == CASH_SLEEVE_ID
            || def.sleeve_id == ORPHAN_SLEEVE_ID
        {
            return Err(RebalanceError::DuplicateSleeve(def.sleeve_id.clone()));
        }

        let mut ranks = FxHashSet::default();
        for m in &def.members {
            if m.rank >= ORPHAN_RANK {
                return Err(RebalanceError::RankOutOfRange {
                    sleeve_id: def.sleeve_id.clone(),
                    ticker: m.ticker.clone(),
                    rank: m.rank,
                });
            }
            if !ranks.insert(m.rank) {
                return Err(RebalanceError::DuplicateRank {
                    sleeve_id: def.sleeve_id.clone(),
                    rank: m.rank,
                });
            }
            if m.price < 0 {
                return Err(RebalanceError::NegativePrice {
                    ticker: m.ticker.clone(),
                    price: m.price,
                });
            }
            if let Some(first) = member_of.insert(m.ticker.as_str(), def.sleeve_id.as_str()) {
                return Err(RebalanceError::DuplicateMember {
                    ticker: m.ticker.clone(),
                    first: first.to_string(),
                    second: def.sleeve_id.clone(),
                });
            }
        }
    }

    let mut in_model = FxHashSet::default();
    for m in model {
        if !sleeve_ids.contains(m.sleeve_id.as_str()) {
            return Err(RebalanceError::UnknownSleeve(m.sleeve_id.clone()));
        }
        if !in_model.insert(m.sleeve_id.as_str()) {
            return Err(RebalanceError::DuplicateSleeve(m.sleeve_id.clone()));
        }
    }

    let total_bps: u64 = model.iter().map(|m| m.target_weight_bps as u64).sum();
    if total_bps != FULL_WEIGHT_BPS as u64 {
        return Err(RebalanceError::WeightSum { total_bps });
    }

    if let Some(h) = holdings.iter().find(|h| h.price < 0) {
        return Err(RebalanceError::NegativePrice {
            ticker: h.ticker.clone(),
            price: h.price,
        });
    }

    Ok(())
}

/// Aggregate holdings per ticker, remembering first-seen order.
fn aggregate(holdings: &[Holding]) -> (FxHashMap<String, Position>, Vec<String>) {
    let mut positions: FxHashMap<String, Position> = FxHashMap::default();
    let mut order = Vec::new();

    for h in holdings {
        let pos = positions.entry(h.ticker.clone()).or_insert_with(|| {
            order.push(h.ticker.clone());
            Position {
                qty: 0,
                price: 0,
                cost_basis: 0,
                is_taxable: false,
                opened_at: None,
                account_qty: Vec::new(),
            }
        });

        pos.qty += h.qty;
        if pos.price == 0 {
            pos.price = h.price;
        }
        pos.cost_basis = pos.cost_basis.saturating_add(h.cost_basis);
        pos.is_taxable |= h.is_taxable && h.qty > 0;
        pos.opened_at = match (pos.opened_at, h.opened_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match pos.account_qty.iter_mut().find(|(acc, _)| *acc == h.account_id) {
            Some((_, q)) => *q += h.qty,
            None => pos.account_qty.push((h.account_id.clone(), h.qty)),
        }
    }

    (positions, order)
}

/// The account with the largest base cash balance, else the first holding's.
fn default_account(holdings: &[Holding]) -> String {
    let mut cash_by_account: Vec<(&str, Quantity)> = Vec::new();
    for h in holdings.iter().filter(|h| h.ticker == BASE_CASH_TICKER) {
        match cash_by_account.iter_mut().find(|(acc, _)| *acc == h.account_id) {
            Some((_, q)) => *q += h.qty,
            None => cash_by_account.push((h.account_id.as_str(), h.qty)),
        }
    }

    cash_by_account
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(acc, _)| acc.to_string())
        .or_else(|| holdings.first().map(|h| h.account_id.clone()))
        .unwrap_or_default()
}

fn held_entry(ticker: &str, rank: u32, pos: &Position, price: Cents) -> SecurityEntry {
    let value = notional(pos.qty, price);
    SecurityEntry {
        ticker: ticker.to_string(),
        rank,
        current_qty: pos.qty,
        target_pct: 0.0,
        target_value: 0,
        price,
        account_id: pos.account_of_record(),
        is_taxable: pos.is_taxable,
        cost_basis: pos.cost_basis,
        unrealized_gain: value.saturating_sub(pos.cost_basis),
        opened_at: pos.opened_at,
        eligibility: Eligibility::Eligible,
    }
}

fn cash_sleeve(positions: &FxHashMap<String, Position>, default_account: &str) -> Sleeve {
    let mut sleeve = Sleeve::new(CASH_SLEEVE_ID, SleeveKind::Cash);
    // Base cash ranks ahead of manual cash.
    for (rank, ticker) in [(1, BASE_CASH_TICKER), (2, MANUAL_CASH_TICKER)] {
        if let Some(pos) = positions.get(ticker) {
            let mut entry = held_entry(ticker, rank, pos, 1);
            if entry.account_id.is_empty() {
                entry.account_id = default_account.to_string();
            }
            sleeve.securities.push(entry);
        }
    }
    sleeve.current_value =
        saturating_sum(sleeve.securities.iter().map(SecurityEntry::current_value));
    sleeve
}

fn eligibility_of(member: &SleeveMember, restrictions: &RestrictionIndex) -> Eligibility {
    match member.status {
        MemberStatus::Inactive => Eligibility::Inactive,
        MemberStatus::Legacy => Eligibility::Legacy,
        MemberStatus::Active => match restrictions.is_restricted(&member.ticker) {
            Some(r) => Eligibility::Restricted {
                until: r.restricted_until,
                sold_at: r.sold_at,
                reason: r.reason.clone(),
            },
            None => Eligibility::Eligible,
        },
    }
}

fn model_sleeve(
    def: &SleeveDefinition,
    bps: u32,
    total_value: Cents,
    positions: &FxHashMap<String, Position>,
    restrictions: &RestrictionIndex,
    default_account: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Sleeve {
    let mut sleeve = Sleeve::new(&def.sleeve_id, SleeveKind::Model);
    sleeve.target_pct = bps as f64 / FULL_WEIGHT_BPS as f64;
    sleeve.target_value =
        (total_value.max(0) as i128 * bps as i128 / FULL_WEIGHT_BPS as i128) as Cents;

    let mut members: Vec<&SleeveMember> = def.members.iter().collect();
    members.sort_by_key(|m| m.rank);

    for m in members {
        let mut entry = match positions.get(&m.ticker) {
            Some(pos) => {
                let price = if m.price > 0 { m.price } else { pos.price };
                held_entry(&m.ticker, m.rank, pos, price)
            }
            None => SecurityEntry {
                ticker: m.ticker.clone(),
                rank: m.rank,
                current_qty: 0,
                target_pct: 0.0,
                target_value: 0,
                price: m.price,
                account_id: default_account.to_string(),
                is_taxable: false,
                cost_basis: 0,
                unrealized_gain: 0,
                opened_at: None,
                eligibility: Eligibility::Eligible,
            },
        };
        entry.eligibility = eligibility_of(m, restrictions);
        sleeve.securities.push(entry);
    }

    let eligible = sleeve.eligible_count();
    if eligible == 0 {
        if sleeve.target_value > 0 {
            warn!(
                "sleeve {} has no eligible members; {} cents unallocated",
                sleeve.sleeve_id, sleeve.target_value
            );
        }
        diagnostics.push(Diagnostic::NoEligibleMembers {
            sleeve_id: sleeve.sleeve_id.clone(),
            unallocated: sleeve.target_value,
        });
    } else {
        let n = eligible as Cents;
        let share = sleeve.target_value / n;
        let mut remainder = sleeve.target_value % n;
        let pct = sleeve.target_pct / eligible as f64;
        for entry in sleeve.securities.iter_mut().filter(|e| e.is_eligible()) {
            entry.target_pct = pct;
            // Remainder cents go to the most preferred members.
            entry.target_value = share + if remainder > 0 { 1 } else { 0 };
            remainder -= 1;
        }
    }

    sleeve.current_value =
        saturating_sum(sleeve.securities.iter().map(SecurityEntry::current_value));
    debug!(
        "sleeve {}: target {} ({} bps), current {}, {} eligible of {}",
        sleeve.sleeve_id,
        sleeve.target_value,
        bps,
        sleeve.current_value,
        eligible,
        sleeve.securities.len()
    );
    sleeve
}

fn orphan_sleeve(
    order: &[String],
    positions: &FxHashMap<String, Position>,
    mapped: &FxHashSet<&str>,
) -> Sleeve {
    let mut sleeve = Sleeve::new(ORPHAN_SLEEVE_ID, SleeveKind::Orphan);
    for ticker in order {
        if is_cash_ticker(ticker) || mapped.contains(ticker.as_str()) {
            continue;
        }
        if let Some(pos) = positions.get(ticker) {
            if pos.qty == 0 {
                continue;
            }
            sleeve
                .securities
                .push(held_entry(ticker, ORPHAN_RANK, pos, pos.price));
        }
    }
    sleeve.current_value =
        saturating_sum(sleeve.securities.iter().map(SecurityEntry::current_value));
    sleeve
}

//! Sleeve drift: target vs current vs projected post-trade weights.

use rustc_hash::FxHashMap;
use serde::Serialize;
use sleevebook::{
    Cents, PortfolioSnapshot, RebalanceResult, RestrictionIndex, SleeveBook, SleeveKind,
    build_sleeves,
};

use crate::error::Result;

/// Drift report comparing each sleeve against its model weight.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub entries: Vec<DriftEntry>,
    pub total_value: Cents,
    pub tracking_error_pct: f64,
    /// Tracking error after the plan, when one was supplied.
    pub projected_tracking_error_pct: Option<f64>,
}

/// One sleeve's drift entry.
#[derive(Debug, Clone, Serialize)]
pub struct DriftEntry {
    pub sleeve_id: String,
    pub target_weight: f64,
    pub current_weight: f64,
    pub projected_weight: Option<f64>,
    pub diff_weight: f64,
}

/// Build the sleeve book for `snapshot` and report its drift.
pub fn drift_for(
    snapshot: &PortfolioSnapshot,
    plan: Option<&RebalanceResult>,
) -> Result<DriftReport> {
    let index = RestrictionIndex::new(&snapshot.restrictions, snapshot.as_of);
    let book = build_sleeves(&snapshot.model, &snapshot.sleeves, &snapshot.holdings, &index)?;
    Ok(drift(&book, plan))
}

/// Compare current sleeve values, and optionally the post-plan values,
/// against the model.
///
/// Only executable trades move the projection. Sells credit and buys debit
/// the cash sleeve, so the projected weights still sum to one.
pub fn drift(book: &SleeveBook, plan: Option<&RebalanceResult>) -> DriftReport {
    let total = book.total_value;
    let weight = |value: Cents| {
        if total > 0 {
            value as f64 / total as f64
        } else {
            0.0
        }
    };

    let flows: Option<FxHashMap<&str, Cents>> = plan.map(|result| {
        let mut flows: FxHashMap<&str, Cents> = FxHashMap::default();
        let mut cash_flow: Cents = 0;
        for t in result.trades.iter().filter(|t| t.can_execute()) {
            let signed = if t.is_buy() {
                t.estimated_value
            } else {
                -t.estimated_value
            };
            *flows.entry(t.sleeve_id.as_str()).or_insert(0) += signed;
            cash_flow -= signed;
        }
        *flows.entry(book.cash().sleeve_id.as_str()).or_insert(0) += cash_flow;
        flows
    });

    let mut entries = Vec::with_capacity(book.sleeves.len());
    let mut sum_sq_diff = 0.0_f64;
    let mut sum_sq_projected = 0.0_f64;

    for sleeve in &book.sleeves {
        // Empty synthetic sleeves carry no information.
        if sleeve.kind != SleeveKind::Model && sleeve.current_value == 0 {
            continue;
        }
        let target_weight = sleeve.target_pct;
        let current_weight = weight(sleeve.current_value);
        let projected_weight = flows.as_ref().map(|f| {
            let flow = f.get(sleeve.sleeve_id.as_str()).copied().unwrap_or(0);
            weight(sleeve.current_value + flow)
        });

        let diff_weight = current_weight - target_weight;
        sum_sq_diff += diff_weight * diff_weight;
        if let Some(p) = projected_weight {
            let d = p - target_weight;
            sum_sq_projected += d * d;
        }

        entries.push(DriftEntry {
            sleeve_id: sleeve.sleeve_id.clone(),
            target_weight,
            current_weight,
            projected_weight,
            diff_weight,
        });
    }
    entries.sort_by(|a, b| a.sleeve_id.cmp(&b.sleeve_id));

    let n = entries.len().max(1) as f64;
    DriftReport {
        entries,
        total_value: total,
        tracking_error_pct: (sum_sq_diff / n).sqrt() * 100.0,
        projected_tracking_error_pct: flows.map(|_| (sum_sq_projected / n).sqrt() * 100.0),
    }
}

impl std::fmt::Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DRIFT:")?;
        writeln!(
            f,
            "  {:20} {:>10} {:>10} {:>10} {:>10}",
            "Sleeve", "Target%", "Current%", "Diff%", "Projected%"
        )?;
        for e in &self.entries {
            let projected = match e.projected_weight {
                Some(p) => format!("{:.2}%", p * 100.0),
                None => "-".into(),
            };
            writeln!(
                f,
                "  {:20} {:>9.2}% {:>9.2}% {:>+9.2}% {:>10}",
                e.sleeve_id,
                e.target_weight * 100.0,
                e.current_weight * 100.0,
                e.diff_weight * 100.0,
                projected,
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        if let Some(te) = self.projected_tracking_error_pct {
            writeln!(f, "  After plan:     {te:.3}%")?;
        }
        Ok(())
    }
}

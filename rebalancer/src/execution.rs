//! Run orchestrator: load → plan → report → audit.
//!
//! This is the main workflow that ties together all components. Nothing is
//! submitted anywhere; the output is a trade list for a human or another
//! system to act on.

use std::path::{Path, PathBuf};

use log::{info, warn};
use sleevebook::{
    Cents, Method, Money, PortfolioSnapshot, RebalanceRequest, RebalanceResult, RestrictionIndex,
    build_sleeves, persistence, rebalance,
};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::drift::{self, DriftReport};
use crate::error::{Error, Result};

/// Per-run overrides from the command line.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub method: Method,
    /// investCash only: cap on the dollars deployed from the cash balance.
    pub cash_amount: Option<f64>,
    pub allow_overinvestment: bool,
    pub max_overinvestment_pct: Option<f64>,
    /// Write the trade list here as JSON Lines.
    pub output: Option<PathBuf>,
    /// Fail when any proposed trade is blocked.
    pub strict: bool,
}

impl PlanOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            cash_amount: None,
            allow_overinvestment: false,
            max_overinvestment_pct: None,
            output: None,
            strict: false,
        }
    }
}

/// What a plan run produced.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub result: RebalanceResult,
    pub drift: DriftReport,
}

/// Load a JSON portfolio snapshot.
pub fn load_snapshot(path: &Path) -> Result<PortfolioSnapshot> {
    persistence::load_snapshot(path).map_err(|e| Error::SnapshotRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Convert a dollar amount from the command line to cents.
pub fn dollars_to_cents(dollars: f64) -> Cents {
    (dollars * 100.0).round() as Cents
}

/// The request for this run: config defaults, then command-line overrides.
pub fn build_request(
    config: &Config,
    snapshot: &PortfolioSnapshot,
    opts: &PlanOptions,
) -> RebalanceRequest {
    let mut request = config.request(&snapshot.portfolio_id, opts.method);
    if opts.allow_overinvestment {
        request.allow_overinvestment = true;
    }
    if let Some(pct) = opts.max_overinvestment_pct {
        request.max_overinvestment_percent = pct;
    }
    request.cash_amount = opts.cash_amount.map(dollars_to_cents);
    request
}

/// Compute a plan for the snapshot at `snapshot_path`.
pub fn run(config: &Config, snapshot_path: &Path, opts: &PlanOptions) -> Result<PlanOutcome> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, &snapshot_path.display().to_string(), opts.method)?;

    let snapshot = load_snapshot(snapshot_path)?;
    audit::log_snapshot_loaded(&mut audit, &snapshot)?;
    info!(
        "loaded {} holdings for {} as of {}",
        snapshot.holdings.len(),
        snapshot.portfolio_id,
        snapshot.as_of
    );

    let request = build_request(config, &snapshot, opts);
    let result = rebalance(&request, &snapshot)?;
    audit::log_plan(&mut audit, &result)?;

    display_plan(&result);
    let drift = drift::drift_for(&snapshot, Some(&result))?;
    print!("\n{drift}");

    if let Some(path) = &opts.output {
        persistence::save_trades(&result.trades, path).map_err(|e| Error::Output {
            path: path.clone(),
            source: e,
        })?;
        println!("\nTrades written to {}", path.display());
    }

    let blocked = result.blocked().count();
    audit::log_run_completed(
        &mut audit,
        result.trades.len(),
        blocked,
        opts.output.as_deref(),
    )?;

    if blocked > 0 {
        warn!("{blocked} trade(s) cannot execute as proposed");
        if opts.strict {
            return Err(Error::Blocked(blocked));
        }
    }

    Ok(PlanOutcome { result, drift })
}

/// Print the current drift of the snapshot at `snapshot_path`.
pub fn run_drift(snapshot_path: &Path) -> Result<DriftReport> {
    let snapshot = load_snapshot(snapshot_path)?;
    let report = drift::drift_for(&snapshot, None)?;
    println!(
        "Portfolio {}: {} as of {}\n",
        snapshot.portfolio_id,
        Money(report.total_value),
        snapshot.as_of
    );
    print!("{report}");
    Ok(report)
}

/// Check that a snapshot is well-formed without planning anything.
pub fn run_validate(snapshot_path: &Path) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path)?;
    let index = RestrictionIndex::new(&snapshot.restrictions, snapshot.as_of);
    let book = build_sleeves(&snapshot.model, &snapshot.sleeves, &snapshot.holdings, &index)?;

    println!(
        "OK: {} sleeves, {} holdings, {} active restrictions, {}",
        snapshot.sleeves.len(),
        snapshot.holdings.len(),
        index.len(),
        Money(book.total_value),
    );
    for d in &book.diagnostics {
        println!("  warning: {d}");
    }
    Ok(())
}

// === Helpers ===

fn display_plan(result: &RebalanceResult) {
    println!(
        "\nPLAN ({}, {}): {} total",
        result.portfolio_id,
        result.method,
        Money(result.total_value)
    );

    if result.trades.is_empty() {
        println!("  No trades needed.");
    } else {
        println!(
            "  {:>3}  {:16} {:4} {:10} {:>8} {:10} {:>14}",
            "#", "Sleeve", "Side", "Ticker", "Qty", "Account", "Value"
        );
        for (i, t) in result.trades.iter().enumerate() {
            println!(
                "  {:>3}  {:16} {:4} {:10} {:>8} {:10} {:>14}   ({})",
                i + 1,
                t.sleeve_id,
                t.trade_type,
                t.ticker,
                t.qty,
                t.account_id,
                Money(t.estimated_value).to_string(),
                t.reason,
            );
            if let Some(reason) = &t.blocking_reason {
                println!("        BLOCKED: {reason}");
            }
        }
    }

    for d in &result.diagnostics {
        println!("  note: {d}");
    }

    let cash = &result.cash;
    println!(
        "\nCash: {} available, {} from sells, {} invested, {} remaining",
        Money(cash.available),
        Money(cash.sell_proceeds),
        Money(cash.invested),
        Money(cash.remaining()),
    );
    if cash.overinvested > 0 {
        println!("  Overinvested by {}", Money(cash.overinvested));
    }
    let realized = result.realized_gain_loss();
    if realized != 0 {
        println!("  Realized gain/loss: {}", Money(realized));
    }
}

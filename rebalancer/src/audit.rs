//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line (the same layout as sleevebook's trade files).

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sleevebook::{Method, PortfolioSnapshot, RebalanceResult};

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn log_run_started(audit: &mut AuditLog, snapshot_file: &str, method: Method) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "snapshot_file": snapshot_file,
            "method": method.as_str(),
        }),
    )
}

pub fn log_snapshot_loaded(audit: &mut AuditLog, snapshot: &PortfolioSnapshot) -> Result<()> {
    audit.log(
        "snapshot_loaded",
        serde_json::json!({
            "portfolio": snapshot.portfolio_id,
            "as_of": snapshot.as_of,
            "holdings": snapshot.holdings.len(),
            "sleeves": snapshot.sleeves.len(),
            "restrictions": snapshot.restrictions.len(),
            "total_value": snapshot.total_value() as f64 / 100.0,
        }),
    )
}

/// Log the planned trades and diagnostics.
pub fn log_plan(audit: &mut AuditLog, result: &RebalanceResult) -> Result<()> {
    let trades: Vec<_> = result
        .trades
        .iter()
        .map(|t| {
            serde_json::json!({
                "sleeve": t.sleeve_id,
                "action": t.trade_type.to_string(),
                "ticker": t.ticker,
                "qty": t.qty,
                "account": t.account_id,
                "value": t.estimated_value as f64 / 100.0,
                "reason": t.reason.to_string(),
                "blocked": t.blocking_reason.as_ref().map(ToString::to_string),
            })
        })
        .collect();
    let diagnostics: Vec<String> = result.diagnostics.iter().map(ToString::to_string).collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "portfolio": result.portfolio_id,
            "method": result.method.as_str(),
            "trades": trades,
            "diagnostics": diagnostics,
            "invested": result.cash.invested as f64 / 100.0,
            "sell_proceeds": result.cash.sell_proceeds as f64 / 100.0,
        }),
    )
}

pub fn log_run_completed(
    audit: &mut AuditLog,
    trades: usize,
    blocked: usize,
    output: Option<&Path>,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "trades": trades,
            "blocked": blocked,
            "output": output.map(|p| p.display().to_string()),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log_run_started(&mut log, "snap.json", Method::TlhSwap).unwrap();
            log_run_completed(&mut log, 3, 1, None).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "run_started");
        assert_eq!(first["method"], "tlhSwap");

        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["blocked"], 1);
        assert!(last["output"].is_null());
    }

    #[test]
    fn audit_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        for _ in 0..2 {
            let mut log = AuditLog::open(&path).unwrap();
            log.log("ping", serde_json::json!({})).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log("test", serde_json::json!({})).unwrap();

        assert!(path.exists());
    }
}

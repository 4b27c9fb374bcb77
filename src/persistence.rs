//! File-based persistence: JSON snapshots and JSON Lines trade lists.
//!
//! A snapshot is one pretty-printed JSON document. Trades are stored one
//! JSON object per line (`.jsonl`), which streams and diffs well.
//!
//! # Usage
//!
//! ```no_run
//! use sleevebook::{PortfolioSnapshot, RebalanceRequest, Method, rebalance, persistence};
//! use std::path::Path;
//!
//! let snapshot = PortfolioSnapshot::load(Path::new("portfolio.json")).unwrap();
//! let result = rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snapshot).unwrap();
//! persistence::save_trades(&result.trades, Path::new("trades.jsonl")).unwrap();
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::snapshot::PortfolioSnapshot;
use crate::trade::Trade;

/// Read a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> io::Result<PortfolioSnapshot> {
    let file = std::fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {}", path.display(), e),
        )
    })
}

/// Write a snapshot as pretty-printed JSON.
pub fn save_snapshot(snapshot: &PortfolioSnapshot, path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot).map_err(io::Error::other)?;
    writeln!(writer)?;
    writer.flush()
}

/// Save trades in JSON Lines format, one trade per line.
pub fn save_trades(trades: &[Trade], path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);

    for trade in trades {
        let json = serde_json::to_string(trade).map_err(io::Error::other)?;
        writeln!(writer, "{json}")?;
    }

    writer.flush()
}

/// Load trades from a JSON Lines file. Empty lines are skipped.
pub fn load_trades(path: &Path) -> io::Result<Vec<Trade>> {
    let file = std::fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let mut trades = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let trade: Trade = serde_json::from_str(line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", line_num + 1, e),
            )
        })?;
        trades.push(trade);
    }

    Ok(trades)
}

impl PortfolioSnapshot {
    /// Load a snapshot from a JSON file.
    ///
    /// Requires the `persistence` feature.
    pub fn load(path: &Path) -> io::Result<Self> {
        load_snapshot(path)
    }

    /// Save this snapshot as JSON.
    ///
    /// Requires the `persistence` feature.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        save_snapshot(self, path)
    }
}

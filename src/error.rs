//! Input errors for a rebalance run.
//!
//! These reject a malformed request before anything is computed. Per-trade
//! infeasibility is never an error: it is reported on the trade or as a
//! [`Diagnostic`](crate::Diagnostic).

use crate::types::Cents;

/// Errors returned when a request or snapshot is structurally invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RebalanceError {
    #[error("unknown rebalance method: {0}")]
    UnknownMethod(String),

    #[error("model target weights sum to {total_bps} bps, expected 10000")]
    WeightSum { total_bps: u64 },

    #[error("cash amount must not be negative, got {0}")]
    NegativeCashAmount(Cents),

    #[error("max overinvestment percent must be between 0 and 100, got {0}")]
    InvalidOverinvestment(f64),

    #[error("harvest thresholds must be finite and >= 0")]
    InvalidHarvestThreshold,

    #[error("model references unknown sleeve: {0}")]
    UnknownSleeve(String),

    #[error("duplicate sleeve id: {0}")]
    DuplicateSleeve(String),

    #[error("ticker {ticker} is a member of both {first} and {second}")]
    DuplicateMember {
        ticker: String,
        first: String,
        second: String,
    },

    #[error("duplicate rank {rank} in sleeve {sleeve_id}")]
    DuplicateRank { sleeve_id: String, rank: u32 },

    #[error("rank {rank} of {ticker} in sleeve {sleeve_id} must be below 999")]
    RankOutOfRange {
        sleeve_id: String,
        ticker: String,
        rank: u32,
    },

    #[error("negative price for {ticker}: {price}")]
    NegativePrice { ticker: String, price: Cents },
}

pub type Result<T> = std::result::Result<T, RebalanceError>;

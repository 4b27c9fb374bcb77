//! Holding-period classification for narration.
//!
//! Eligibility never depends on this; it only decides whether a sell is
//! described as short-term or long-term.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::snapshot::{Transaction, TransactionKind};

/// Days after which a lot is long-term.
pub const LONG_TERM_DAYS: i64 = 365;

/// How long a position has been held at the run instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoldingPeriod {
    pub days_held: i64,
    pub is_long_term: bool,
}

impl HoldingPeriod {
    /// `days_held = floor((now - opened_at) / 86400s)`, long-term above 365 days.
    pub fn between(opened_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days_held = (now - opened_at).num_seconds().div_euclid(86_400).max(0);
        Self {
            days_held,
            is_long_term: days_held > LONG_TERM_DAYS,
        }
    }

    /// Holding period of `ticker` from its earliest buy in `transactions`,
    /// falling back to `opened_at` from the holdings.
    pub fn for_ticker(
        ticker: &str,
        transactions: &[Transaction],
        opened_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        transactions
            .iter()
            .filter(|t| t.ticker == ticker && t.kind == TransactionKind::Buy && t.executed_at <= now)
            .map(|t| t.executed_at)
            .min()
            .or(opened_at)
            .map(|opened| Self::between(opened, now))
    }
}

impl fmt::Display for HoldingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = if self.is_long_term { "long-term" } else { "short-term" };
        write!(f, "{term}, held {} days", self.days_held)
    }
}

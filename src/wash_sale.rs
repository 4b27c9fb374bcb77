//! Wash-sale restriction index.
//!
//! Restrictions are computed upstream (the repurchase window length is not
//! known here); the index only answers whether a ticker is blocked at the
//! run's instant. The instant is fixed at construction: a run is a single
//! logical point in time.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

/// A repurchase block on one ticker.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WashSaleRestriction {
    pub ticker: String,
    pub restricted_until: DateTime<Utc>,
    /// Sale date of the harvested lot that created the block
    #[cfg_attr(feature = "serde", serde(default))]
    pub sold_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reason: String,
}

impl WashSaleRestriction {
    pub fn new(ticker: &str, restricted_until: DateTime<Utc>, reason: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            restricted_until,
            sold_at: None,
            reason: reason.to_string(),
        }
    }

    pub fn sold_at(mut self, sold_at: DateTime<Utc>) -> Self {
        self.sold_at = Some(sold_at);
        self
    }

    /// Active iff `now < restricted_until`.
    #[inline]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.restricted_until
    }

    /// Whole days until the block lifts, rounded up. Zero once expired.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        days_until(self.restricted_until, now)
    }
}

/// Whole days from `now` until `until`, rounded up; zero when past.
pub fn days_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (until - now).num_seconds();
    if secs <= 0 { 0 } else { (secs + 86_399) / 86_400 }
}

/// Active restrictions keyed by ticker, frozen at one instant.
#[derive(Clone, Debug)]
pub struct RestrictionIndex {
    as_of: DateTime<Utc>,
    active: FxHashMap<String, WashSaleRestriction>,
}

impl RestrictionIndex {
    /// Keep only restrictions active at `as_of`. When a ticker has several,
    /// the one lasting longest wins.
    pub fn new(restrictions: &[WashSaleRestriction], as_of: DateTime<Utc>) -> Self {
        let mut active: FxHashMap<String, WashSaleRestriction> = FxHashMap::default();
        for r in restrictions.iter().filter(|r| r.is_active(as_of)) {
            match active.get(&r.ticker) {
                Some(existing) if existing.restricted_until >= r.restricted_until => {}
                _ => {
                    active.insert(r.ticker.clone(), r.clone());
                }
            }
        }
        Self { as_of, active }
    }

    /// An index with no restrictions.
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            active: FxHashMap::default(),
        }
    }

    /// The restriction blocking `ticker`, if any.
    #[inline]
    pub fn is_restricted(&self, ticker: &str) -> Option<&WashSaleRestriction> {
        self.active.get(ticker)
    }

    /// The instant the index was frozen at.
    #[inline]
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

//! Replacement resolver: best-ranked substitute within the same sleeve.
//!
//! Substitutes never come from outside the sleeve. Caller-supplied
//! [`ReplacementCandidate`] seeds may reorder preference, but a seed whose
//! replacement is not a member of the sleeve is ignored.

use std::fmt;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;

use crate::sleeve::{Eligibility, SecurityEntry, Sleeve};
use crate::wash_sale::days_until;

/// A caller-seeded substitution preference.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplacementCandidate {
    pub original_ticker: String,
    pub replacement_ticker: String,
    pub rank: u32,
}

impl ReplacementCandidate {
    pub fn new(original: &str, replacement: &str, rank: u32) -> Self {
        Self {
            original_ticker: original.to_string(),
            replacement_ticker: replacement.to_string(),
            rank,
        }
    }
}

/// A candidate that exists but is wash-sale blocked.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RestrictedCandidate {
    pub ticker: String,
    pub until: DateTime<Utc>,
    pub sold_at: Option<DateTime<Utc>>,
    pub days_remaining: i64,
    pub reason: String,
}

impl fmt::Display for RestrictedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is wash-sale restricted", self.ticker)?;
        if let Some(sold) = self.sold_at {
            write!(f, " (harvested {})", sold.format("%Y-%m-%d"))?;
        }
        write!(
            f,
            " until {}, {} days remaining",
            self.until.format("%Y-%m-%d"),
            self.days_remaining
        )?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

/// Why a trade cannot execute.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum BlockingReason {
    /// Every candidate is wash-sale restricted.
    RestrictedReplacement { restricted: Vec<RestrictedCandidate> },
    /// Every candidate is inactive or legacy.
    InactiveReplacement { tickers: Vec<String> },
    /// The sleeve has no member besides the original.
    NoReplacementAvailable,
    /// Some candidates restricted, others inactive or legacy.
    Combined {
        restricted: Vec<RestrictedCandidate>,
        inactive: Vec<String>,
    },
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingReason::RestrictedReplacement { restricted } => {
                let lines: Vec<String> = restricted.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", lines.join("\n"))
            }
            BlockingReason::InactiveReplacement { tickers } => {
                write!(f, "replacement candidates inactive: {}", tickers.join(", "))
            }
            BlockingReason::NoReplacementAvailable => write!(f, "no replacement available"),
            BlockingReason::Combined {
                restricted,
                inactive,
            } => {
                let mut lines: Vec<String> = restricted.iter().map(|r| r.to_string()).collect();
                lines.push(format!(
                    "replacement candidates inactive: {}",
                    inactive.join(", ")
                ));
                write!(f, "{}", lines.join("\n"))
            }
        }
    }
}

/// Finds substitutes for one run.
#[derive(Clone, Debug)]
pub struct ReplacementResolver<'a> {
    seeds: &'a [ReplacementCandidate],
    now: DateTime<Utc>,
}

impl<'a> ReplacementResolver<'a> {
    pub fn new(seeds: &'a [ReplacementCandidate], now: DateTime<Utc>) -> Self {
        Self { seeds, now }
    }

    /// Candidates for `original` in preference order: seeded members first
    /// (by seed rank), then every other member by sleeve rank. Tickers in
    /// `exclude` are skipped entirely.
    fn candidates<'s>(
        &self,
        sleeve: &'s Sleeve,
        original: &str,
        exclude: &FxHashSet<String>,
    ) -> Vec<&'s SecurityEntry> {
        let mut seeded: Vec<&ReplacementCandidate> = self
            .seeds
            .iter()
            .filter(|c| c.original_ticker == original)
            .collect();
        seeded.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.replacement_ticker.cmp(&b.replacement_ticker))
        });

        let usable = |s: &SecurityEntry| s.ticker != original && !exclude.contains(&s.ticker);

        let mut out: Vec<&SecurityEntry> = Vec::with_capacity(sleeve.securities.len());
        for c in &seeded {
            if let Some(s) = sleeve.get(&c.replacement_ticker) {
                if usable(s) && !out.iter().any(|o| o.ticker == s.ticker) {
                    out.push(s);
                }
            }
        }

        let mut rest: Vec<&SecurityEntry> = sleeve
            .securities
            .iter()
            .filter(|s| usable(*s) && !out.iter().any(|o| o.ticker == s.ticker))
            .collect();
        rest.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.ticker.cmp(&b.ticker)));
        out.extend(rest);
        out
    }

    /// The best-ranked eligible substitute, if any.
    pub fn find_replacement<'s>(
        &self,
        sleeve: &'s Sleeve,
        original: &str,
        exclude: &FxHashSet<String>,
    ) -> Option<&'s SecurityEntry> {
        self.candidates(sleeve, original, exclude)
            .into_iter()
            .find(|s| s.is_eligible() && s.price > 0)
    }

    /// Classify why no substitute exists.
    pub fn blocking_reason(
        &self,
        sleeve: &Sleeve,
        original: &str,
        exclude: &FxHashSet<String>,
    ) -> BlockingReason {
        let mut restricted = Vec::new();
        let mut inactive = Vec::new();

        for c in self.candidates(sleeve, original, exclude) {
            match &c.eligibility {
                Eligibility::Restricted {
                    until,
                    sold_at,
                    reason,
                } => {
                    restricted.push(RestrictedCandidate {
                        ticker: c.ticker.clone(),
                        until: *until,
                        sold_at: *sold_at,
                        days_remaining: days_until(*until, self.now),
                        reason: reason.clone(),
                    });
                }
                Eligibility::Inactive | Eligibility::Legacy => inactive.push(c.ticker.clone()),
                // Eligible but unpriced.
                Eligibility::Eligible => inactive.push(c.ticker.clone()),
            }
        }

        match (restricted.is_empty(), inactive.is_empty()) {
            (true, true) => BlockingReason::NoReplacementAvailable,
            (false, true) => BlockingReason::RestrictedReplacement { restricted },
            (true, false) => BlockingReason::InactiveReplacement { tickers: inactive },
            (false, false) => BlockingReason::Combined {
                restricted,
                inactive,
            },
        }
    }

    /// The substitute, or the classified reason there is none.
    pub fn resolve<'s>(
        &self,
        sleeve: &'s Sleeve,
        original: &str,
        exclude: &FxHashSet<String>,
    ) -> Result<&'s SecurityEntry, BlockingReason> {
        self.find_replacement(sleeve, original, exclude)
            .ok_or_else(|| self.blocking_reason(sleeve, original, exclude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeve::SleeveKind;
    use crate::sleeve::fixtures::entry;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
    }

    fn sleeve(entries: Vec<SecurityEntry>) -> Sleeve {
        let mut s = Sleeve::new("us-large", SleeveKind::Model);
        s.securities = entries;
        s
    }

    fn restricted(mut e: SecurityEntry, days: i64) -> SecurityEntry {
        e.eligibility = Eligibility::Restricted {
            until: now() + Duration::days(days),
            sold_at: Some(now() - Duration::days(30 - days)),
            reason: "loss harvest".into(),
        };
        e
    }

    #[test]
    fn picks_lowest_rank_eligible() {
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            restricted(entry("VOO", 2, 0, 400_00), 10),
            entry("IVV", 3, 0, 410_00),
            entry("SPLG", 4, 0, 50_00),
        ]);
        let resolver = ReplacementResolver::new(&[], now());
        let r = resolver.find_replacement(&s, "AAPL", &FxHashSet::default());
        assert_eq!(r.map(|e| e.ticker.as_str()), Some("IVV"));
    }

    #[test]
    fn seeds_reorder_but_stay_in_sleeve() {
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            entry("VOO", 2, 0, 400_00),
            entry("IVV", 3, 0, 410_00),
        ]);
        let seeds = vec![
            ReplacementCandidate::new("AAPL", "QQQ", 1), // not in sleeve
            ReplacementCandidate::new("AAPL", "IVV", 2),
        ];
        let resolver = ReplacementResolver::new(&seeds, now());
        let r = resolver.find_replacement(&s, "AAPL", &FxHashSet::default());
        assert_eq!(r.map(|e| e.ticker.as_str()), Some("IVV"));
    }

    #[test]
    fn restricted_seed_falls_through_to_unseeded_member() {
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            restricted(entry("VOO", 2, 0, 400_00), 10),
            entry("IVV", 3, 0, 410_00),
        ]);
        let seeds = vec![ReplacementCandidate::new("AAPL", "VOO", 1)];
        let resolver = ReplacementResolver::new(&seeds, now());
        let r = resolver.resolve(&s, "AAPL", &FxHashSet::default());
        assert_eq!(r.map(|e| e.ticker.as_str()), Ok("IVV"));
    }

    #[test]
    fn blocking_reason_covers_unseeded_members() {
        let mut ivv = entry("IVV", 3, 0, 410_00);
        ivv.eligibility = Eligibility::Inactive;
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            restricted(entry("VOO", 2, 0, 400_00), 10),
            ivv,
        ]);
        let seeds = vec![ReplacementCandidate::new("AAPL", "VOO", 1)];
        let resolver = ReplacementResolver::new(&seeds, now());
        let err = resolver
            .resolve(&s, "AAPL", &FxHashSet::default())
            .unwrap_err();
        match err {
            BlockingReason::Combined {
                restricted,
                inactive,
            } => {
                assert_eq!(restricted[0].ticker, "VOO");
                assert_eq!(inactive, vec!["IVV".to_string()]);
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn only_original_member() {
        let s = sleeve(vec![entry("AAPL", 1, 100, 200_00)]);
        let resolver = ReplacementResolver::new(&[], now());
        let err = resolver
            .resolve(&s, "AAPL", &FxHashSet::default())
            .unwrap_err();
        assert_eq!(err, BlockingReason::NoReplacementAvailable);
        assert_eq!(err.to_string(), "no replacement available");
    }

    #[test]
    fn restricted_only_lists_unblock_dates() {
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            restricted(entry("VOO", 2, 0, 400_00), 10),
        ]);
        let resolver = ReplacementResolver::new(&[], now());
        let err = resolver
            .resolve(&s, "AAPL", &FxHashSet::default())
            .unwrap_err();

        match &err {
            BlockingReason::RestrictedReplacement { restricted } => {
                assert_eq!(restricted.len(), 1);
                assert_eq!(restricted[0].ticker, "VOO");
                assert_eq!(restricted[0].days_remaining, 10);
            }
            other => panic!("unexpected reason: {other:?}"),
        }
        let text = err.to_string();
        assert!(text.contains("VOO"));
        assert!(text.contains("2026-03-12"));
        assert!(text.contains("harvested 2026-02-10"));
        assert!(text.contains("10 days remaining"));
    }

    #[test]
    fn inactive_only() {
        let mut voo = entry("VOO", 2, 0, 400_00);
        voo.eligibility = Eligibility::Inactive;
        let mut ivv = entry("IVV", 3, 0, 400_00);
        ivv.eligibility = Eligibility::Legacy;
        let s = sleeve(vec![entry("AAPL", 1, 100, 200_00), voo, ivv]);

        let resolver = ReplacementResolver::new(&[], now());
        let err = resolver
            .resolve(&s, "AAPL", &FxHashSet::default())
            .unwrap_err();
        assert_eq!(
            err,
            BlockingReason::InactiveReplacement {
                tickers: vec!["VOO".into(), "IVV".into()]
            }
        );
    }

    #[test]
    fn mixed_causes_combine() {
        let mut ivv = entry("IVV", 3, 0, 400_00);
        ivv.eligibility = Eligibility::Inactive;
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            restricted(entry("VOO", 2, 0, 400_00), 5),
            ivv,
        ]);

        let resolver = ReplacementResolver::new(&[], now());
        let err = resolver
            .resolve(&s, "AAPL", &FxHashSet::default())
            .unwrap_err();
        assert!(matches!(err, BlockingReason::Combined { .. }));
        assert_eq!(err.to_string().lines().count(), 2);
    }

    #[test]
    fn excluded_tickers_are_not_candidates() {
        let s = sleeve(vec![
            entry("AAPL", 1, 100, 200_00),
            entry("VOO", 2, 10, 400_00),
        ]);
        let resolver = ReplacementResolver::new(&[], now());
        let exclude: FxHashSet<String> = ["VOO".to_string()].into_iter().collect();
        assert_eq!(
            resolver.resolve(&s, "AAPL", &exclude).unwrap_err(),
            BlockingReason::NoReplacementAvailable
        );
    }
}

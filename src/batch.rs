//! Many independent runs at once.
//!
//! Runs share nothing, so with the `parallel` feature they are spread over
//! the rayon pool. Output order always matches input order, and each result
//! is identical to what [`rebalance`] returns for that job alone.

use crate::engine::rebalance;
use crate::error::Result;
use crate::request::RebalanceRequest;
use crate::result::RebalanceResult;
use crate::snapshot::PortfolioSnapshot;

/// One request against one snapshot.
#[derive(Clone, Debug)]
pub struct RebalanceJob {
    pub request: RebalanceRequest,
    pub snapshot: PortfolioSnapshot,
}

impl RebalanceJob {
    pub fn new(request: RebalanceRequest, snapshot: PortfolioSnapshot) -> Self {
        Self { request, snapshot }
    }

    pub fn run(&self) -> Result<RebalanceResult> {
        rebalance(&self.request, &self.snapshot)
    }
}

/// Run every job, in parallel when the `parallel` feature is enabled.
///
/// # Example
///
/// ```ignore
/// use sleevebook::{RebalanceJob, rebalance_many};
///
/// let results = rebalance_many(&jobs);
/// assert_eq!(results.len(), jobs.len());
/// ```
#[cfg(feature = "parallel")]
pub fn rebalance_many(jobs: &[RebalanceJob]) -> Vec<Result<RebalanceResult>> {
    use rayon::prelude::*;

    jobs.par_iter().map(RebalanceJob::run).collect()
}

/// Run every job sequentially.
#[cfg(not(feature = "parallel"))]
pub fn rebalance_many(jobs: &[RebalanceJob]) -> Vec<Result<RebalanceResult>> {
    jobs.iter().map(RebalanceJob::run).collect()
}

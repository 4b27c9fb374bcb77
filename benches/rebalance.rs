// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Rebalance benchmarks: each strategy on large synthetic portfolios, plus
//! a batch of households.

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sleevebook::{
    FULL_WEIGHT_BPS, Holding, Method, ModelMember, PortfolioSnapshot, RebalanceJob,
    RebalanceRequest, SleeveDefinition, SleeveMember, WashSaleRestriction, rebalance,
    rebalance_many,
};

/// Generate a portfolio with `n_sleeves` sleeves of `members` tickers each.
///
/// Prices, quantities and cost bases come from a deterministic xorshift32 so
/// roughly a third of the taxable lots sit at a harvestable loss, and every
/// seventh ticker is inside a wash-sale window.
fn generate_portfolio(n_sleeves: usize, members: usize) -> PortfolioSnapshot {
    let as_of = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
    let mut snap = PortfolioSnapshot::new("bench", as_of);
    let mut rng_state: u32 = 42;
    let mut next = || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 17;
        rng_state ^= rng_state << 5;
        rng_state
    };

    let base = FULL_WEIGHT_BPS / n_sleeves as u32;
    for s in 0..n_sleeves {
        let sleeve_id = format!("sleeve-{s:03}");
        let bps = if s + 1 == n_sleeves {
            FULL_WEIGHT_BPS - base * (n_sleeves as u32 - 1)
        } else {
            base
        };
        snap.model.push(ModelMember::new(&sleeve_id, bps));

        let mut defs = Vec::with_capacity(members);
        for m in 0..members {
            let ticker = format!("T{s:03}{m:02}");
            let price = 10_00 + (next() % 490_00) as i64;
            defs.push(SleeveMember::new(&ticker, m as u32 + 1, price));

            if m % 2 == 0 {
                let qty = 1 + (next() % 500) as u64;
                let value = qty as i64 * price;
                // 70%..130% of market value
                let basis = value * (70 + (next() % 61) as i64) / 100;
                snap.holdings
                    .push(Holding::new(&ticker, "TAX1", qty, price).taxable(basis));
            }
            if (s * members + m) % 7 == 3 {
                snap.restrictions.push(WashSaleRestriction::new(
                    &ticker,
                    as_of + Duration::days(1 + (next() % 30) as i64),
                    "harvested",
                ));
            }
        }
        snap.sleeves.push(SleeveDefinition::new(&sleeve_id, defs));
    }

    snap.holdings.push(Holding::cash("TAX1", 250_000_00));
    snap.holdings.push(Holding::new("LEGACY", "IRA1", 100, 42_00));
    snap
}

/// Benchmark: one run per strategy on a 50-sleeve, 500-ticker portfolio
fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/method");
    let snap = generate_portfolio(50, 10);

    for method in Method::ALL {
        let req = RebalanceRequest::new("bench", method);
        group.bench_with_input(BenchmarkId::from_parameter(method), &req, |b, req| {
            b.iter(|| black_box(rebalance(req, &snap)));
        });
    }

    group.finish();
}

/// Benchmark: allocation as the portfolio grows
fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/scaling");
    let req = RebalanceRequest::new("bench", Method::Allocation).with_overinvestment(2.0);

    for n_sleeves in [10, 100, 1_000] {
        let snap = generate_portfolio(n_sleeves, 5);
        group.bench_with_input(BenchmarkId::from_parameter(n_sleeves), &snap, |b, snap| {
            b.iter(|| black_box(rebalance(&req, snap)));
        });
    }

    group.finish();
}

/// Benchmark: 200 households through `rebalance_many`
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/batch");
    let jobs: Vec<RebalanceJob> = (0..200)
        .map(|i| {
            let method = Method::ALL[i % Method::ALL.len()];
            RebalanceJob::new(
                RebalanceRequest::new("bench", method),
                generate_portfolio(20, 5),
            )
        })
        .collect();

    group.bench_function("200_households", |b| {
        b.iter(|| black_box(rebalance_many(&jobs)));
    });

    group.finish();
}

criterion_group!(benches, bench_methods, bench_scaling, bench_batch);
criterion_main!(benches);

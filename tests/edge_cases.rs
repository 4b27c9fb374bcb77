// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Edge-case tests: malformed input and degenerate portfolios.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sleevebook::{
    CASH_SLEEVE_ID, Diagnostic, Holding, MAX_OVERINVESTMENT_PERCENT, MemberStatus, Method,
    ModelMember, ORPHAN_RANK, ORPHAN_SLEEVE_ID, PortfolioSnapshot, RebalanceError,
    RebalanceRequest, ReplacementCandidate, SleeveDefinition, SleeveMember, TradeReason,
    TradeType, WashSaleRestriction, rebalance,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
}

fn one_sleeve(members: Vec<SleeveMember>, holdings: Vec<Holding>) -> PortfolioSnapshot {
    let mut s = PortfolioSnapshot::new("p1", now());
    s.model = vec![ModelMember::new("core", 10_000)];
    s.sleeves = vec![SleeveDefinition::new("core", members)];
    s.holdings = holdings;
    s
}

// ============================================================================
// Input errors
// ============================================================================

#[test]
fn unknown_method_string() {
    let err = "momentum".parse::<Method>().unwrap_err();
    assert_eq!(err, RebalanceError::UnknownMethod("momentum".into()));
    assert_eq!(err.to_string(), "unknown rebalance method: momentum");
}

#[test]
fn weights_must_sum_to_full() {
    let mut snap = one_sleeve(vec![SleeveMember::new("VTI", 1, 100_00)], vec![]);
    snap.model[0].target_weight_bps = 9_999;
    assert_eq!(
        rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap),
        Err(RebalanceError::WeightSum { total_bps: 9_999 })
    );
}

#[test]
fn negative_cash_amount() {
    let snap = one_sleeve(vec![SleeveMember::new("VTI", 1, 100_00)], vec![]);
    let req = RebalanceRequest::new("p1", Method::InvestCash).with_cash_amount(-1_00);
    assert_eq!(
        rebalance(&req, &snap),
        Err(RebalanceError::NegativeCashAmount(-1_00))
    );
}

#[test]
fn model_names_missing_sleeve() {
    let mut snap = one_sleeve(vec![SleeveMember::new("VTI", 1, 100_00)], vec![]);
    snap.model = vec![ModelMember::new("ghost", 10_000)];
    assert_eq!(
        rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap),
        Err(RebalanceError::UnknownSleeve("ghost".into()))
    );
}

#[test]
fn reserved_sleeve_id_rejected() {
    let mut snap = one_sleeve(vec![SleeveMember::new("VTI", 1, 100_00)], vec![]);
    snap.sleeves[0].sleeve_id = CASH_SLEEVE_ID.into();
    snap.model[0].sleeve_id = CASH_SLEEVE_ID.into();
    assert!(matches!(
        rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap),
        Err(RebalanceError::DuplicateSleeve(_))
    ));
}

#[test]
fn negative_holding_price_rejected() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 0)],
        vec![Holding::new("VTI", "ACC1", 10, -5_00)],
    );
    assert!(matches!(
        rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap),
        Err(RebalanceError::NegativePrice { .. })
    ));
}

#[test]
fn overinvestment_percent_above_bound() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 300_00)],
        vec![Holding::cash("ACC1", 1_000_00)],
    );
    for pct in [MAX_OVERINVESTMENT_PERCENT + 0.5, 1e20] {
        let req = RebalanceRequest::new("p1", Method::Allocation).with_overinvestment(pct);
        assert_eq!(
            rebalance(&req, &snap),
            Err(RebalanceError::InvalidOverinvestment(pct))
        );
    }
}

#[test]
fn member_rank_collides_with_orphan_rank() {
    let snap = one_sleeve(vec![SleeveMember::new("VTI", ORPHAN_RANK, 100_00)], vec![]);
    assert!(matches!(
        rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap),
        Err(RebalanceError::RankOutOfRange { rank: ORPHAN_RANK, .. })
    ));
}

// ============================================================================
// Degenerate portfolios
// ============================================================================

#[test]
fn empty_portfolio_produces_nothing() {
    let snap = one_sleeve(vec![SleeveMember::new("VTI", 1, 100_00)], vec![]);
    for method in Method::ALL {
        let result = rebalance(&RebalanceRequest::new("p1", method), &snap).unwrap();
        assert!(result.trades.is_empty(), "{method} traded an empty portfolio");
        assert_eq!(result.total_value, 0);
    }
}

#[test]
fn all_cash_allocation_buys_by_rank() {
    let snap = one_sleeve(
        vec![
            SleeveMember::new("VTI", 1, 250_00),
            SleeveMember::new("ITOT", 2, 100_00),
        ],
        vec![Holding::cash("ACC1", 10_000_00)],
    );
    let result = rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap).unwrap();

    let buys: Vec<_> = result.buys().map(|t| (t.ticker.as_str(), t.qty)).collect();
    assert_eq!(buys, vec![("VTI", 20), ("ITOT", 50)]);
    assert!(result.buys().all(|t| t.account_id == "ACC1"));
}

#[test]
fn zero_eligible_sleeve_reports_and_keeps_cash() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 100_00).with_status(MemberStatus::Inactive)],
        vec![Holding::cash("ACC1", 5_000_00)],
    );

    let result = rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap).unwrap();
    assert!(result.trades.is_empty());
    assert!(result.diagnostics.contains(&Diagnostic::NoEligibleMembers {
        sleeve_id: "core".into(),
        unallocated: 5_000_00,
    }));
}

#[test]
fn no_sell_for_unheld_restricted_member() {
    let mut snap = one_sleeve(
        vec![
            SleeveMember::new("VTI", 1, 100_00),
            SleeveMember::new("ITOT", 2, 100_00),
        ],
        vec![Holding::new("VTI", "ACC1", 100, 100_00)],
    );
    snap.restrictions = vec![WashSaleRestriction::new(
        "ITOT",
        now() + Duration::days(3),
        "harvested",
    )];

    for method in Method::ALL {
        let result = rebalance(&RebalanceRequest::new("p1", method), &snap).unwrap();
        assert!(
            result.trades.iter().all(|t| t.ticker != "ITOT"),
            "{method} traded a restricted ticker with no shares"
        );
    }
}

#[test]
fn restricted_holding_is_sold_not_bought() {
    let snap = {
        let mut s = one_sleeve(
            vec![
                SleeveMember::new("VTI", 1, 100_00),
                SleeveMember::new("ITOT", 2, 100_00),
            ],
            vec![
                Holding::new("VTI", "ACC1", 50, 100_00),
                Holding::new("ITOT", "ACC1", 50, 100_00),
            ],
        );
        s.restrictions = vec![WashSaleRestriction::new(
            "ITOT",
            now() + Duration::days(3),
            "harvested",
        )];
        s
    };
    let result = rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap).unwrap();

    let itot: Vec<_> = result.trades.iter().filter(|t| t.ticker == "ITOT").collect();
    assert_eq!(itot.len(), 1);
    assert_eq!(itot[0].trade_type, TradeType::Sell);
    assert_eq!(itot[0].qty, 50);

    let vti = result.trades.iter().find(|t| t.ticker == "VTI").unwrap();
    assert_eq!((vti.trade_type, vti.qty), (TradeType::Buy, 50));
}

#[test]
fn orphans_sold_under_every_method_but_invest_cash() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 100_00)],
        vec![
            Holding::new("VTI", "ACC1", 10, 100_00),
            Holding::new("GME", "ACC2", 7, 30_00),
            Holding::manual_cash("ACC1", 500_00),
        ],
    );

    for method in Method::ALL {
        let result = rebalance(&RebalanceRequest::new("p1", method), &snap).unwrap();
        let orphan_sells: Vec<_> = result
            .sells()
            .filter(|t| t.sleeve_id == ORPHAN_SLEEVE_ID)
            .collect();
        if method == Method::InvestCash {
            assert_eq!(result.sells().count(), 0);
        } else {
            assert_eq!(orphan_sells.len(), 1, "{method}");
            assert_eq!(orphan_sells[0].ticker, "GME");
            assert_eq!(orphan_sells[0].rank, ORPHAN_RANK);
            assert_eq!(orphan_sells[0].qty, 7);
        }
    }
}

#[test]
fn cash_is_never_traded() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 100_00)],
        vec![
            Holding::cash("ACC1", 1_234_56),
            Holding::manual_cash("ACC1", 100_00),
        ],
    );
    for method in Method::ALL {
        let result = rebalance(&RebalanceRequest::new("p1", method), &snap).unwrap();
        assert!(result.trades.iter().all(|t| t.sleeve_id != CASH_SLEEVE_ID));
    }
}

#[test]
fn unpriced_member_is_skipped_with_diagnostic() {
    let snap = one_sleeve(
        vec![
            SleeveMember::new("VTI", 1, 0),
            SleeveMember::new("ITOT", 2, 100_00),
        ],
        vec![Holding::cash("ACC1", 1_000_00)],
    );
    let result = rebalance(&RebalanceRequest::new("p1", Method::Allocation), &snap).unwrap();
    assert!(result.trades.iter().all(|t| t.ticker != "VTI"));
    assert!(result.diagnostics.contains(&Diagnostic::MissingPrice {
        sleeve_id: "core".into(),
        ticker: "VTI".into(),
    }));
}

#[test]
fn overinvestment_at_the_bound_rounds_up_last_buy() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 300_00)],
        vec![Holding::cash("ACC1", 1_000_00)],
    );
    let req = RebalanceRequest::new("p1", Method::Allocation)
        .with_overinvestment(MAX_OVERINVESTMENT_PERCENT);
    let result = rebalance(&req, &snap).unwrap();

    let buys: Vec<_> = result.buys().map(|t| (t.ticker.as_str(), t.qty)).collect();
    assert_eq!(buys, vec![("VTI", 4)]);
    assert_eq!(result.cash.invested, 1_200_00);
    assert_eq!(result.cash.overinvested, 200_00);
}

#[test]
fn invest_cash_amount_above_balance() {
    let snap = one_sleeve(
        vec![SleeveMember::new("VTI", 1, 100_00)],
        vec![Holding::cash("ACC1", 100_00)],
    );
    let req = RebalanceRequest::new("p1", Method::InvestCash).with_cash_amount(1_000_00);
    let result = rebalance(&req, &snap).unwrap();

    assert_eq!(result.cash.available, 100_00);
    let buys: Vec<_> = result.buys().map(|t| (t.ticker.as_str(), t.qty)).collect();
    assert_eq!(buys, vec![("VTI", 1)]);
    assert_eq!(result.cash.remaining(), 0);
}

#[test]
fn restricted_seed_does_not_hide_unseeded_substitute() {
    let mut snap = one_sleeve(
        vec![
            SleeveMember::new("AAPL", 1, 188_00),
            SleeveMember::new("VOO", 2, 400_00),
            SleeveMember::new("IVV", 3, 410_00),
        ],
        vec![Holding::new("AAPL", "TAX1", 250, 188_00).taxable(50_000_00)],
    );
    snap.replacements = vec![ReplacementCandidate::new("AAPL", "VOO", 1)];
    snap.restrictions = vec![WashSaleRestriction::new(
        "VOO",
        now() + Duration::days(10),
        "harvested",
    )];

    let result = rebalance(&RebalanceRequest::new("p1", Method::TlhSwap), &snap).unwrap();
    assert!(result.trades.iter().all(|t| t.can_execute()));

    let sell = result.sells().next().unwrap();
    assert_eq!((sell.ticker.as_str(), sell.qty), ("AAPL", 250));
    let buy = result.buys().next().unwrap();
    assert_eq!((buy.ticker.as_str(), buy.qty), ("IVV", 114));
    assert!(matches!(
        &buy.reason,
        TradeReason::HarvestReplacement { original, .. } if original == "AAPL"
    ));
}

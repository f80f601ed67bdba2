use super::*;
use crate::errors::{Error, Result};
use crate::funds::{FundId, NavObservation, StoreRange, StoreTimestamp, TimeSeriesStore};
use chrono::{DateTime, Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Mock store
// =============================================================================

/// In-memory store keyed by UTC midnight timestamps.
#[derive(Default)]
struct MockStore {
    navs: BTreeMap<FundId, Vec<NavObservation>>,
    distributions: BTreeMap<FundId, Vec<(StoreTimestamp, Decimal)>>,
}

fn ts(date: NaiveDate) -> StoreTimestamp {
    StoreTimestamp(date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp())
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

impl MockStore {
    /// Daily NAVs from `first` to `last` for `fund`, produced by `nav(t)`.
    fn with_fund(
        mut self,
        fund: &str,
        first: NaiveDate,
        last: NaiveDate,
        nav: impl Fn(usize) -> Decimal,
    ) -> Self {
        let mut obs = Vec::new();
        let mut date = first;
        let mut t = 0;
        while date <= last {
            obs.push(NavObservation {
                timestamp: ts(date),
                nav: nav(t),
            });
            date += Duration::days(1);
            t += 1;
        }
        self.navs.insert(FundId::new(fund), obs);
        self
    }

    fn with_distribution(mut self, fund: &str, date: NaiveDate, amount: Decimal) -> Self {
        self.distributions
            .entry(FundId::new(fund))
            .or_default()
            .push((ts(date), amount));
        self
    }
}

impl TimeSeriesStore for MockStore {
    fn to_timestamp(&self, date: NaiveDate) -> Result<StoreTimestamp> {
        Ok(ts(date))
    }

    fn to_date(&self, timestamp: StoreTimestamp) -> Result<NaiveDate> {
        Ok(DateTime::from_timestamp(timestamp.seconds(), 0)
            .unwrap()
            .date_naive())
    }

    fn observation_dates(
        &self,
        fund_id: Option<&FundId>,
        range: &StoreRange,
    ) -> Result<Vec<StoreTimestamp>> {
        let mut dates: Vec<StoreTimestamp> = self
            .navs
            .iter()
            .filter(|(id, _)| fund_id.map_or(true, |f| f == *id))
            .flat_map(|(_, obs)| obs.iter().map(|o| o.timestamp))
            .filter(|t| range.contains(*t))
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    fn nav_history(&self, fund_id: &FundId, range: &StoreRange) -> Result<Vec<NavObservation>> {
        Ok(self
            .navs
            .get(fund_id)
            .map(|obs| {
                obs.iter()
                    .filter(|o| range.contains(o.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn distribution_total(&self, fund_ids: &[FundId], range: &StoreRange) -> Result<Decimal> {
        Ok(fund_ids
            .iter()
            .filter_map(|f| self.distributions.get(f))
            .flatten()
            .filter(|(t, _)| range.contains(*t))
            .map(|(_, amount)| *amount)
            .sum())
    }

    fn fund_ids(&self, range: &StoreRange) -> Result<Vec<FundId>> {
        Ok(self
            .navs
            .iter()
            .filter(|(_, obs)| obs.iter().any(|o| range.contains(o.timestamp)))
            .map(|(id, _)| id.clone())
            .collect())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// NAV path compounding a group-specific daily return plus a small
/// fund-specific wiggle, rounded to cents.
fn wave(group: usize, member: usize) -> impl Fn(usize) -> Decimal {
    move |t| {
        let mut nav = 100.0;
        for k in 0..t {
            let k = k as f64;
            let base = 0.01 * ((k + 1.0) * (group as f64 + 1.0) * 0.7).sin();
            let wiggle = 0.001 * member as f64 * (k * 3.1).cos();
            nav *= 1.0 + base + wiggle;
        }
        Decimal::new((nav * 100.0).round() as i64, 2)
    }
}

/// Eight trending funds in four correlated pairs plus one flat fund,
/// trading daily from December 2023 through February 2024.
fn universe() -> MockStore {
    let (first, last) = (d(2023, 12, 1), d(2024, 2, 29));
    let mut store = MockStore::default();
    for group in 0..4 {
        for member in 0..2 {
            store = store.with_fund(&format!("G{}M{}", group, member), first, last, wave(group, member));
        }
    }
    store.with_fund("FLAT", first, last, |_| dec!(50))
}

fn service(store: MockStore, config: AnalysisConfig) -> FundAnalysisService {
    FundAnalysisService::new(Arc::new(store), config)
}

fn sequential() -> AnalysisConfig {
    AnalysisConfig {
        parallel_embeddings: false,
        ..Default::default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_analyze_picks_one_representative_per_cluster() {
    let analysis = service(universe(), AnalysisConfig::default())
        .analyze(d(2024, 1, 1), d(2024, 2, 29))
        .unwrap();

    assert_eq!(analysis.universe_size, 9);
    assert_eq!(analysis.cohort.len(), 9);
    assert_eq!(analysis.representatives.len(), 4);

    let mut labels: Vec<usize> = analysis
        .representatives
        .iter()
        .map(|f| analysis.assignment.label_of(f).unwrap())
        .collect();
    labels.sort();
    assert_eq!(labels, vec![0, 1, 2, 3]);

    // The flat fund never reaches clustering
    assert!(analysis.assignment.label_of(&FundId::new("FLAT")).is_none());
    assert!(!analysis.representatives.contains(&FundId::new("FLAT")));
}

#[test]
fn test_profit_starts_at_zero_and_covers_every_day() {
    let analysis = service(universe(), AnalysisConfig::default())
        .analyze(d(2024, 1, 1), d(2024, 2, 29))
        .unwrap();

    let profit = &analysis.profit;
    assert_eq!(profit.len(), 60);
    assert!(profit.points[0].profit.is_zero());
    assert_eq!(profit.points[0].date, d(2024, 1, 1));
    assert_eq!(profit.points.last().unwrap().date, d(2024, 2, 29));
    assert_eq!(analysis.average_returns.len(), 59);
}

#[test]
fn test_compute_profit_matches_analyze() {
    let svc = service(universe(), sequential());
    let full = svc.analyze(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
    let profit = svc.compute_profit(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
    assert_eq!(full.profit, profit);
}

#[test]
fn test_distributions_of_representatives_are_summed() {
    let mut store = universe();
    for group in 0..4 {
        for member in 0..2 {
            store = store.with_distribution(&format!("G{}M{}", group, member), d(2024, 1, 15), dec!(1));
        }
    }
    // Outside the range, never counted
    store = store.with_distribution("G0M0", d(2023, 12, 15), dec!(100));

    let profit = service(store, AnalysisConfig::default())
        .compute_profit(d(2024, 1, 1), d(2024, 1, 31))
        .unwrap();
    assert_eq!(profit.distributions, dec!(4));
}

#[test]
fn test_embeddings_indexed_by_month_from_start() {
    let start = d(2024, 1, 10);
    let embeddings = service(universe(), AnalysisConfig::default())
        .compute_embeddings(start, d(2024, 2, 20))
        .unwrap();

    assert_eq!(embeddings.month_count(), 2);
    let feb = embeddings.lookup(start, d(2024, 2, 3)).unwrap();
    assert_eq!(feb.month, d(2024, 2, 1));
    assert_eq!(feb.points.len(), 8);
    assert_eq!(feb.dropped, vec![FundId::new("FLAT")]);
    assert_eq!(
        feb.points
            .iter()
            .filter(|p| p.highlight == Highlight::Chosen)
            .count(),
        4
    );

    let err = embeddings.lookup(start, d(2024, 3, 1)).unwrap_err();
    assert!(matches!(
        err,
        Error::Analysis(AnalysisError::IndexOutOfRange { offset: 2, .. })
    ));
}

#[test]
fn test_same_seed_reproduces_everything() {
    let first = service(universe(), AnalysisConfig::default())
        .analyze(d(2024, 1, 1), d(2024, 2, 29))
        .unwrap();
    let second = service(universe(), sequential())
        .analyze(d(2024, 1, 1), d(2024, 2, 29))
        .unwrap();

    assert_eq!(first.representatives, second.representatives);
    assert_eq!(first.embeddings, second.embeddings);
}

#[test]
fn test_cohort_is_sampled_when_universe_is_larger() {
    let config = AnalysisConfig {
        cohort_size: 6,
        ..Default::default()
    };
    let analysis = service(universe(), config)
        .analyze(d(2024, 1, 1), d(2024, 1, 31))
        .unwrap();

    assert_eq!(analysis.universe_size, 9);
    assert_eq!(analysis.cohort.len(), 6);
    assert_eq!(analysis.representatives.len(), 4);
    assert!(analysis
        .representatives
        .iter()
        .all(|f| analysis.cohort.contains(f)));
}

#[test]
fn test_too_few_trending_funds_is_insufficient() {
    let (first, last) = (d(2023, 12, 1), d(2024, 1, 31));
    let store = MockStore::default()
        .with_fund("A", first, last, wave(0, 0))
        .with_fund("B", first, last, wave(1, 0))
        .with_fund("C", first, last, wave(2, 0))
        .with_fund("FLAT", first, last, |_| dec!(50));

    let err = service(store, AnalysisConfig::default())
        .analyze(d(2024, 1, 1), d(2024, 1, 31))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Analysis(AnalysisError::InsufficientCluster {
            required: 4,
            available: 3
        })
    ));
}

#[test]
fn test_empty_lookback_month_is_reported() {
    let err = service(universe(), AnalysisConfig::default())
        .analyze(d(2023, 12, 1), d(2023, 12, 31))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Analysis(AnalysisError::EmptyWindow { .. })
    ));
}

#[test]
fn test_fund_missing_from_a_later_month_is_a_data_gap() {
    let store = universe().with_fund("LATE", d(2023, 12, 1), d(2024, 1, 31), wave(3, 1));
    let svc = service(store, AnalysisConfig::default());

    let err = svc
        .compute_embeddings(d(2024, 1, 1), d(2024, 2, 29))
        .unwrap_err();
    match err {
        Error::Analysis(AnalysisError::DataGap { fund_id, .. }) => assert_eq!(fund_id, "LATE"),
        other => panic!("expected a data gap, got {:?}", other),
    }
    assert!(svc.analyze(d(2024, 1, 1), d(2024, 2, 29)).is_err());

    // The same cohort is fine while LATE still trades
    let january = svc.compute_embeddings(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
    assert!(january.get(0).unwrap().point(&FundId::new("LATE")).is_some());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = AnalysisConfig {
        cluster_count: 0,
        ..Default::default()
    };
    let err = service(universe(), config)
        .analyze(d(2024, 1, 1), d(2024, 1, 31))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue(_)));
}

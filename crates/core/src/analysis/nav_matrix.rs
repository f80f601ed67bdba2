//! Dense NAV matrix extraction.
//!
//! The column index is the union of trading dates observed for any fund in
//! the store over the window, so every fund row lines up on the same days.
//! Days a fund did not report are filled according to [`FillPolicy`].

use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::errors::AnalysisError;
use crate::errors::Result;
use crate::funds::{FundId, StoreRange, StoreTimestamp, TimeSeriesStore};

/// How a fund row is completed on shared trading days it has no observation for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillPolicy {
    /// Carry the previous filled value forward. The first column takes the
    /// fund's first observation in the window; values are never interpolated
    /// and never pulled back from later days past column 0.
    #[default]
    ForwardFill,
    /// Every fund must report on every shared day; a missing day is a data gap.
    Strict,
}

/// Funds × trading-days grid of NAVs on a shared ascending date index.
#[derive(Debug, Clone, PartialEq)]
pub struct NavMatrix {
    fund_ids: Vec<FundId>,
    dates: Vec<StoreTimestamp>,
    values: Vec<Vec<Decimal>>,
}

impl NavMatrix {
    /// Builds a matrix from pre-aligned rows.
    ///
    /// Rows must be parallel to `fund_ids` and every row as long as `dates`.
    pub fn from_rows(
        fund_ids: Vec<FundId>,
        dates: Vec<StoreTimestamp>,
        values: Vec<Vec<Decimal>>,
    ) -> Self {
        debug_assert_eq!(fund_ids.len(), values.len());
        debug_assert!(values.iter().all(|row| row.len() == dates.len()));
        Self {
            fund_ids,
            dates,
            values,
        }
    }

    pub fn fund_ids(&self) -> &[FundId] {
        &self.fund_ids
    }

    pub fn dates(&self) -> &[StoreTimestamp] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<Decimal>] {
        &self.values
    }

    pub fn row(&self, fund: usize) -> &[Decimal] {
        &self.values[fund]
    }

    pub fn fund_count(&self) -> usize {
        self.fund_ids.len()
    }

    pub fn date_count(&self) -> usize {
        self.dates.len()
    }
}

/// Extracts [`NavMatrix`] windows from a [`TimeSeriesStore`].
pub struct NavMatrixBuilder<'a> {
    store: &'a dyn TimeSeriesStore,
    policy: FillPolicy,
}

impl<'a> NavMatrixBuilder<'a> {
    pub fn new(store: &'a dyn TimeSeriesStore) -> Self {
        Self {
            store,
            policy: FillPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FillPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the NAV matrix for `fund_ids` over `range`.
    ///
    /// Fails with [`AnalysisError::EmptyWindow`] when nothing traded in range,
    /// and with [`AnalysisError::DataGap`] when a fund has no observation in
    /// range (or misses a day under [`FillPolicy::Strict`]).
    pub fn build(&self, fund_ids: &[FundId], range: &StoreRange) -> Result<NavMatrix> {
        let mut dates = self.store.observation_dates(None, range)?;
        dates.sort_unstable();
        dates.dedup();
        if dates.is_empty() && !fund_ids.is_empty() {
            return Err(AnalysisError::EmptyWindow { range: *range }.into());
        }

        let mut values = Vec::with_capacity(fund_ids.len());
        for fund_id in fund_ids {
            let history = self.store.nav_history(fund_id, range)?;
            let Some(first) = history.first() else {
                return Err(AnalysisError::DataGap {
                    fund_id: fund_id.to_string(),
                    range: *range,
                }
                .into());
            };
            let seed = first.nav;
            let observed: HashMap<StoreTimestamp, Decimal> =
                history.iter().map(|o| (o.timestamp, o.nav)).collect();

            let row = fill_row(&dates, &observed, seed, self.policy).ok_or_else(|| {
                AnalysisError::DataGap {
                    fund_id: fund_id.to_string(),
                    range: *range,
                }
            })?;
            values.push(row);
        }

        debug!(
            "Built NAV matrix of {} funds x {} days for {}",
            fund_ids.len(),
            dates.len(),
            range
        );
        Ok(NavMatrix::from_rows(fund_ids.to_vec(), dates, values))
    }
}

/// Completes one fund row on the shared index. `None` signals a gap the
/// policy refuses to fill.
fn fill_row(
    dates: &[StoreTimestamp],
    observed: &HashMap<StoreTimestamp, Decimal>,
    seed: Decimal,
    policy: FillPolicy,
) -> Option<Vec<Decimal>> {
    let mut row: Vec<Decimal> = Vec::with_capacity(dates.len());
    for (t, date) in dates.iter().enumerate() {
        let value = match (observed.get(date), policy) {
            (Some(nav), _) => *nav,
            (None, FillPolicy::Strict) => return None,
            (None, FillPolicy::ForwardFill) if t == 0 => seed,
            (None, FillPolicy::ForwardFill) => row[t - 1],
        };
        row.push(value);
    }
    Some(row)
}

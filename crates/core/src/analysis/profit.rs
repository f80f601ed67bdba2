//! Blended cumulative profit of the chosen representatives.

use log::{debug, info};
use rust_decimal::Decimal;

use super::analysis_model::{ProfitPoint, ProfitSeries, RepresentativeSet};
use super::errors::AnalysisError;
use super::nav_matrix::{NavMatrix, NavMatrixBuilder};
use super::returns::{mean, period_returns};
use crate::constants::PERCENT_SCALE;
use crate::errors::Result;
use crate::funds::{StoreRange, TimeSeriesStore};

/// Profit curve of an equal-unit basket holding one unit of every fund row.
///
/// The basis is the sum of the opening NAVs. Each day reports
/// `(sum(nav) - basis) / basis * 100`; `distributions` are realized on the
/// final day only, adding `distributions / basis * 100` to that point.
/// Point dates are rendered by `store`, the owner of the timestamps.
pub fn profit_series(
    store: &dyn TimeSeriesStore,
    nav: &NavMatrix,
    distributions: Decimal,
) -> Result<ProfitSeries> {
    let scale = Decimal::from(PERCENT_SCALE);
    let column_sum = |t: usize| -> Decimal { nav.rows().iter().map(|row| row[t]).sum() };

    if nav.date_count() == 0 || nav.fund_count() == 0 {
        return Ok(ProfitSeries {
            points: Vec::new(),
            basis: Decimal::ZERO,
            distributions,
        });
    }

    let basis = column_sum(0);
    if basis <= Decimal::ZERO {
        let fund_id = nav
            .fund_ids()
            .iter()
            .zip(nav.rows())
            .find(|(_, row)| row[0] <= Decimal::ZERO)
            .map(|(id, _)| id.to_string())
            .unwrap_or_default();
        return Err(AnalysisError::InvalidNav {
            fund_id,
            timestamp: nav.dates()[0],
            nav: basis,
        }
        .into());
    }

    let last = nav.date_count() - 1;
    let points = nav
        .dates()
        .iter()
        .enumerate()
        .map(|(t, timestamp)| {
            let mut profit = (column_sum(t) - basis) / basis * scale;
            if t == last {
                profit += distributions / basis * scale;
            }
            Ok(ProfitPoint {
                date: store.to_date(*timestamp)?,
                timestamp: *timestamp,
                profit,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ProfitSeries {
        points,
        basis,
        distributions,
    })
}

/// Equal-weighted mean of the rows' daily returns.
pub fn average_returns(nav: &NavMatrix) -> Result<Vec<f64>> {
    let returns = period_returns(nav)?;
    let days = nav.date_count().saturating_sub(1);
    Ok((0..days)
        .map(|t| {
            let day: Vec<f64> = returns.rows().iter().map(|row| row[t]).collect();
            mean(&day)
        })
        .collect())
}

/// Rebuilds the representatives' NAVs over the full range and folds them
/// into a profit curve.
pub struct ProfitAggregator<'a> {
    store: &'a dyn TimeSeriesStore,
    builder: NavMatrixBuilder<'a>,
}

impl<'a> ProfitAggregator<'a> {
    pub fn new(store: &'a dyn TimeSeriesStore, builder: NavMatrixBuilder<'a>) -> Self {
        Self { store, builder }
    }

    /// Returns the profit curve and the diagnostic average return series.
    pub fn aggregate(
        &self,
        representatives: &RepresentativeSet,
        range: &StoreRange,
    ) -> Result<(ProfitSeries, Vec<f64>)> {
        let nav = self.builder.build(&representatives.funds, range)?;
        let averages = average_returns(&nav)?;
        let distributions = self
            .store
            .distribution_total(&representatives.funds, range)?;
        debug!("Distributions over {}: {}", range, distributions);

        let series = profit_series(self.store, &nav, distributions)?;
        if let Some(profit) = series.final_profit() {
            info!(
                "Profit over {} trading days: {}%",
                series.len(),
                profit.round_dp(4)
            );
        }
        Ok((series, averages))
    }
}

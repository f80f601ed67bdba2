//! Correlation-based dissimilarity between fund return series.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use super::analysis_model::month_store_range;
use super::nav_matrix::NavMatrixBuilder;
use super::returns::{compute_returns, mean, ReturnMatrix};
use crate::errors::Result;
use crate::funds::{FundId, TimeSeriesStore};

/// Square, symmetric distance matrix.
///
/// `d(i, j) = 1 - (corr(i, j) * 0.5 + 0.5)`: identical movement is 0,
/// uncorrelated is 0.5 and opposite movement is 1, well inside `[0, 2]`.
/// The diagonal is always exactly 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DissimilarityMatrix {
    fund_ids: Vec<FundId>,
    values: Vec<Vec<f64>>,
}

impl DissimilarityMatrix {
    pub fn from_rows(fund_ids: Vec<FundId>, values: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(fund_ids.len(), values.len());
        Self { fund_ids, values }
    }

    pub fn fund_ids(&self) -> &[FundId] {
        &self.fund_ids
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn len(&self) -> usize {
        self.fund_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fund_ids.is_empty()
    }
}

/// Pearson correlation of two equally long series.
///
/// Returns `None` when either series has no spread.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    debug_assert_eq!(a.len(), b.len());
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - ma, y - mb);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(cov / denom)
}

/// Maps a correlation to dissimilarity, clamping rounding overshoot.
pub fn correlation_to_dissimilarity(corr: f64) -> f64 {
    1.0 - (corr.clamp(-1.0, 1.0) * 0.5 + 0.5)
}

/// Builds the dissimilarity matrix of the (already filtered) return rows.
///
/// Only the upper triangle is computed and mirrored, so the result is exactly
/// symmetric. A pair without defined correlation is treated as uncorrelated.
pub fn dissimilarity_matrix(returns: &ReturnMatrix) -> DissimilarityMatrix {
    let n = returns.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let corr = pearson_correlation(returns.row(i), returns.row(j)).unwrap_or(0.0);
            let d = correlation_to_dissimilarity(corr);
            values[i][j] = d;
            values[j][i] = d;
        }
        values[i][i] = 0.0;
    }
    DissimilarityMatrix::from_rows(returns.fund_ids().to_vec(), values)
}

/// Dissimilarity of one calendar month plus the funds the variance filter removed.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthWindow {
    pub month: NaiveDate,
    pub dissimilarity: DissimilarityMatrix,
    pub dropped: Vec<FundId>,
}

/// Runs NAV extraction, return computation and the correlation transform for
/// a single calendar month.
pub struct SimilarityEngine<'a> {
    store: &'a dyn TimeSeriesStore,
    builder: NavMatrixBuilder<'a>,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(store: &'a dyn TimeSeriesStore, builder: NavMatrixBuilder<'a>) -> Self {
        Self { store, builder }
    }

    /// Builds the window for the month containing `month`.
    pub fn month_window(&self, fund_ids: &[FundId], month: NaiveDate) -> Result<MonthWindow> {
        let range = month_store_range(self.store, month)?;
        let nav = self.builder.build(fund_ids, &range)?;
        let (returns, dropped) = compute_returns(&nav)?;
        let dissimilarity = dissimilarity_matrix(&returns);
        debug!(
            "Month {}: {} of {} funds survive the variance filter",
            month.format("%Y-%m"),
            dissimilarity.len(),
            fund_ids.len()
        );
        Ok(MonthWindow {
            month,
            dissimilarity,
            dropped,
        })
    }
}

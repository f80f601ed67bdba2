//! Period-over-period returns and the zero-variance filter.

use log::debug;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use super::errors::AnalysisError;
use super::nav_matrix::NavMatrix;
use crate::errors::{Error, Result};
use crate::funds::FundId;

/// Funds × (days − 1) grid of simple returns, rows parallel to `fund_ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    fund_ids: Vec<FundId>,
    rows: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    pub fn from_rows(fund_ids: Vec<FundId>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(fund_ids.len(), rows.len());
        Self { fund_ids, rows }
    }

    pub fn fund_ids(&self) -> &[FundId] {
        &self.fund_ids
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, fund: usize) -> &[f64] {
        &self.rows[fund]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes rows whose variance is exactly zero, keeping `fund_ids`
    /// aligned and in order. Returns the surviving matrix and the dropped ids.
    pub fn drop_zero_variance(self) -> (ReturnMatrix, Vec<FundId>) {
        let mut kept_ids = Vec::with_capacity(self.fund_ids.len());
        let mut kept_rows = Vec::with_capacity(self.rows.len());
        let mut dropped = Vec::new();

        for (fund_id, row) in self.fund_ids.into_iter().zip(self.rows) {
            if variance(&row) == 0.0 {
                dropped.push(fund_id);
            } else {
                kept_ids.push(fund_id);
                kept_rows.push(row);
            }
        }

        if !dropped.is_empty() {
            debug!("Dropped {} zero-variance return series", dropped.len());
        }
        (ReturnMatrix::from_rows(kept_ids, kept_rows), dropped)
    }
}

/// Converts NAVs into simple returns `(nav[t+1] - nav[t]) / nav[t]`.
///
/// A zero or negative NAV in a denominator position fails with
/// [`AnalysisError::InvalidNav`] instead of producing NaN or infinity.
pub fn period_returns(nav: &NavMatrix) -> Result<ReturnMatrix> {
    let mut rows = Vec::with_capacity(nav.fund_count());
    for (fund, fund_id) in nav.fund_ids().iter().enumerate() {
        let values = nav.row(fund);
        let mut row = Vec::with_capacity(values.len().saturating_sub(1));
        for t in 0..values.len().saturating_sub(1) {
            let prev = values[t];
            if prev <= Decimal::ZERO {
                return Err(AnalysisError::InvalidNav {
                    fund_id: fund_id.to_string(),
                    timestamp: nav.dates()[t],
                    nav: prev,
                }
                .into());
            }
            let ratio = (values[t + 1] - prev) / prev;
            row.push(ratio.to_f64().ok_or_else(|| {
                Error::Unexpected(format!("Return {} of fund {} is not representable", ratio, fund_id))
            })?);
        }
        rows.push(row);
    }
    Ok(ReturnMatrix::from_rows(nav.fund_ids().to_vec(), rows))
}

/// Period returns with degenerate (constant) series removed.
pub fn compute_returns(nav: &NavMatrix) -> Result<(ReturnMatrix, Vec<FundId>)> {
    Ok(period_returns(nav)?.drop_zero_variance())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance. Empty and single-value series have zero variance.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

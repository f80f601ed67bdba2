//! Analysis input and result models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::clustering::ClusterAssignment;
use super::errors::AnalysisError;
use crate::errors::{Error, Result, ValidationError};
use crate::funds::{FundId, StoreRange, StoreTimestamp, TimeSeriesStore};
use crate::utils::time_utils::{month_count, month_end, month_offset, month_start, parse_date, shift_months};

// =============================================================================
// DateRange
// =============================================================================

/// Inclusive calendar range of an analysis invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Analysis start {} is after end {}",
                start, end
            ))));
        }
        Ok(Self { start, end })
    }

    /// Builds a range from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar months the range touches.
    pub fn month_count(&self) -> usize {
        month_count(self.start, self.end)
    }

    /// First day of every month in range, ascending.
    pub fn months(&self) -> Vec<NaiveDate> {
        let first = month_start(self.start);
        (0..self.month_count() as i32)
            .filter_map(|k| shift_months(first, k).ok())
            .collect()
    }

    /// First day of the month before `start`; its window drives clustering.
    pub fn lookback_month(&self) -> Result<NaiveDate> {
        shift_months(month_start(self.start), -1)
    }

    pub fn to_store_range(&self, store: &dyn TimeSeriesStore) -> Result<StoreRange> {
        Ok(StoreRange::new(
            store.to_timestamp(self.start)?,
            store.to_timestamp(self.end)?,
        ))
    }
}

/// Store range covering the whole calendar month containing `month`.
pub fn month_store_range(store: &dyn TimeSeriesStore, month: NaiveDate) -> Result<StoreRange> {
    Ok(StoreRange::new(
        store.to_timestamp(month_start(month))?,
        store.to_timestamp(month_end(month))?,
    ))
}

// =============================================================================
// Representatives
// =============================================================================

/// One fund per cluster label, ordered by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeSet {
    pub funds: Vec<FundId>,
}

impl RepresentativeSet {
    pub fn contains(&self, fund_id: &FundId) -> bool {
        self.funds.contains(fund_id)
    }

    pub fn len(&self) -> usize {
        self.funds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FundId> {
        self.funds.iter()
    }
}

// =============================================================================
// Profit
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitPoint {
    pub date: NaiveDate,
    pub timestamp: StoreTimestamp,
    /// Cumulative profit in percent of the basis.
    pub profit: Decimal,
}

/// Blended profit curve of the representatives, one point per trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSeries {
    pub points: Vec<ProfitPoint>,
    /// Sum of the representatives' opening NAVs.
    pub basis: Decimal,
    /// Distributions paid over the range, realized on the final point.
    pub distributions: Decimal,
}

impl ProfitSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn final_profit(&self) -> Option<Decimal> {
        self.points.last().map(|p| p.profit)
    }
}

// =============================================================================
// Embeddings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Highlight {
    Chosen,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingPoint {
    pub fund_id: FundId,
    pub x: f64,
    pub y: f64,
    pub highlight: Highlight,
}

/// 2D layout of one month's surviving funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEmbedding {
    /// First day of the embedded month.
    pub month: NaiveDate,
    pub points: Vec<EmbeddingPoint>,
    /// Cohort funds removed by this month's zero-variance filter.
    pub dropped: Vec<FundId>,
    /// Final SMACOF stress of the chosen layout.
    pub stress: f64,
}

impl MonthlyEmbedding {
    pub fn point(&self, fund_id: &FundId) -> Option<&EmbeddingPoint> {
        self.points.iter().find(|p| &p.fund_id == fund_id)
    }
}

/// Per-month embeddings indexed by month offset from the analysis start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSet {
    pub start: NaiveDate,
    pub months: Vec<MonthlyEmbedding>,
}

impl EmbeddingSet {
    pub fn month_count(&self) -> usize {
        self.months.len()
    }

    /// Embedding at `offset` months after the start month.
    pub fn get(&self, offset: i64) -> Result<&MonthlyEmbedding> {
        usize::try_from(offset)
            .ok()
            .and_then(|idx| self.months.get(idx))
            .ok_or_else(|| {
                Error::Analysis(AnalysisError::IndexOutOfRange {
                    offset,
                    month_count: self.months.len(),
                })
            })
    }

    /// Embedding for the month of `month`, counted from `start`'s month.
    pub fn lookup(&self, start: NaiveDate, month: NaiveDate) -> Result<&MonthlyEmbedding> {
        self.get(month_offset(start, month))
    }
}

// =============================================================================
// Full result
// =============================================================================

/// Everything one analysis invocation produces. Owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAnalysis {
    pub range: DateRange,
    /// Funds observed in the lookback month before sampling.
    pub universe_size: usize,
    pub cohort: Vec<FundId>,
    pub assignment: ClusterAssignment,
    pub representatives: RepresentativeSet,
    /// Equal-weighted daily return of the representatives.
    pub average_returns: Vec<f64>,
    pub profit: ProfitSeries,
    pub embeddings: EmbeddingSet,
}

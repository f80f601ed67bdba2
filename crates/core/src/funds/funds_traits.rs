//! Storage traits for fund NAV and distribution data.
//!
//! These traits abstract the persistence layer. The analysis pipeline only
//! reads through [`TimeSeriesStore`]; ingestion goes through [`FundDataWriter`].

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::funds_model::{
    DistributionRecord, FundId, NavObservation, NavRecord, StoreRange, StoreTimestamp,
};
use crate::errors::Result;

/// Read-only query surface over per-fund NAV and distribution history.
///
/// # Method Naming Convention
///
/// - `to_*` - Conversions owned by the store
/// - `*_history` - Ordered series for a single fund
/// - `*_total` - Aggregates over several funds
pub trait TimeSeriesStore: Send + Sync {
    /// Converts a calendar date into the store's native timestamp using the
    /// store's own local-time rule.
    ///
    /// Callers must use this instead of converting dates themselves.
    fn to_timestamp(&self, date: NaiveDate) -> Result<StoreTimestamp>;

    /// Calendar date of a timestamp produced by
    /// [`to_timestamp`](Self::to_timestamp). Round-trips on any host offset.
    fn to_date(&self, timestamp: StoreTimestamp) -> Result<NaiveDate>;

    /// Distinct observation timestamps in `range`, ascending.
    ///
    /// With `fund_id` set only that fund's dates are returned; with `None`
    /// the dates observed for any fund in the store.
    fn observation_dates(
        &self,
        fund_id: Option<&FundId>,
        range: &StoreRange,
    ) -> Result<Vec<StoreTimestamp>>;

    /// NAV observations of one fund in `range`, ordered by timestamp.
    fn nav_history(&self, fund_id: &FundId, range: &StoreRange) -> Result<Vec<NavObservation>>;

    /// Sum of distribution amounts paid by `fund_ids` within `range`.
    ///
    /// Returns zero when no distribution was paid.
    fn distribution_total(&self, fund_ids: &[FundId], range: &StoreRange) -> Result<Decimal>;

    /// Distinct funds with at least one NAV observation in `range`, sorted.
    fn fund_ids(&self, range: &StoreRange) -> Result<Vec<FundId>>;
}

/// Write interface used by ingestion.
#[async_trait]
pub trait FundDataWriter: Send + Sync {
    /// Inserts or replaces NAV rows keyed by `(fund_id, timestamp)`.
    ///
    /// Returns the number of rows written.
    async fn upsert_navs(&self, records: &[NavRecord]) -> Result<usize>;

    /// Inserts or replaces distribution rows keyed by `(fund_id, timestamp)`.
    ///
    /// Records of one call that share a key are summed into a single row.
    async fn upsert_distributions(&self, records: &[DistributionRecord]) -> Result<usize>;
}

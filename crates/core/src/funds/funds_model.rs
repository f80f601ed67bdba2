//! Fund time-series domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FundId
// =============================================================================

/// Opaque fund identifier as recorded in the time-series store.
///
/// No two funds share an identifier within one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct FundId(pub String);

impl FundId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FundId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FundId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for FundId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// StoreTimestamp
// =============================================================================

/// Store-native timestamp (unix seconds).
///
/// Values are produced by the store's own calendar conversion
/// ([`TimeSeriesStore::to_timestamp`](super::TimeSeriesStore::to_timestamp)).
/// Never build one from an independently converted date: the store shifts
/// calendar dates by its local offset and a mismatch drops or duplicates a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreTimestamp(pub i64);

impl StoreTimestamp {
    pub fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn seconds(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for StoreTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Inclusive store-native query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRange {
    pub start: StoreTimestamp,
    pub end: StoreTimestamp,
}

impl StoreRange {
    pub fn new(start: StoreTimestamp, end: StoreTimestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: StoreTimestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}

impl fmt::Display for StoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// =============================================================================
// Records
// =============================================================================

/// One daily NAV observation for a single fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavObservation {
    pub timestamp: StoreTimestamp,
    pub nav: Decimal,
}

/// A NAV row as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavRecord {
    pub fund_id: FundId,
    pub timestamp: StoreTimestamp,
    pub nav: Decimal,
}

/// An interest/distribution payment as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecord {
    pub fund_id: FundId,
    pub timestamp: StoreTimestamp,
    pub amount: Decimal,
}

//! Analysis pipeline error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::funds::{StoreRange, StoreTimestamp};

/// Errors raised by the analysis stages.
///
/// None of these are recovered locally; each aborts the current invocation.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A fund has no NAV observation in a required window, so its row cannot
    /// be seeded.
    #[error("Fund {fund_id} has no NAV observations in {range}")]
    DataGap { fund_id: String, range: StoreRange },

    /// A zero or negative NAV was about to be used as a ratio denominator.
    #[error("Invalid NAV {nav} for fund {fund_id} at {timestamp}")]
    InvalidNav {
        fund_id: String,
        timestamp: StoreTimestamp,
        nav: Decimal,
    },

    /// Fewer non-empty clusters than required, usually because the
    /// zero-variance filter left too few funds.
    #[error("Expected {required} non-empty clusters but only {available} could be formed")]
    InsufficientCluster { required: usize, available: usize },

    /// A window contains no trading days at all.
    #[error("No observations in {range}")]
    EmptyWindow { range: StoreRange },

    /// Embedding lookup outside the computed months.
    #[error("Month offset {offset} is outside the computed range of {month_count} months")]
    IndexOutOfRange { offset: i64, month_count: usize },
}

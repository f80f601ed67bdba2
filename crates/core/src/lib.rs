//! Fundscope Core - Fund time-series models, store traits, and the
//! similarity analysis pipeline.
//!
//! This crate is database-agnostic. It defines [`funds::TimeSeriesStore`]
//! and [`funds::FundDataWriter`], which are implemented by the
//! `storage-sqlite` crate.

pub mod analysis;
pub mod constants;
pub mod errors;
pub mod funds;
pub mod utils;

// Re-export the most used entry points
pub use analysis::{AnalysisConfig, FundAnalysis, FundAnalysisService, FundAnalysisServiceTrait};
pub use funds::{FundId, StoreRange, StoreTimestamp, TimeSeriesStore};

// Re-export error types
pub use errors::Error;
pub use errors::Result;

//! Fund time-series module - NAV/distribution models, store traits, and CSV import.

pub mod funds_import;
pub mod funds_model;
pub mod funds_traits;

pub use funds_import::{
    parse_distribution_csv, parse_nav_csv, CsvFundRow, FundImportService,
    FundImportServiceTrait, ImportSummary,
};
pub use funds_model::{
    DistributionRecord, FundId, NavObservation, NavRecord, StoreRange, StoreTimestamp,
};
pub use funds_traits::{FundDataWriter, TimeSeriesStore};

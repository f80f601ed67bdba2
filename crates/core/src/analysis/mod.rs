//! Fund similarity analysis.
//!
//! Samples a cohort from the month before the analysis range, clusters it by
//! return correlation, picks one representative per cluster and reports the
//! representatives' blended profit together with monthly 2D layouts.

mod analysis_config;
mod analysis_model;
mod analysis_service;
mod clustering;
mod embedding;
mod errors;
mod nav_matrix;
mod profit;
mod returns;
mod similarity;

pub use analysis_config::*;
pub use analysis_model::*;
pub use analysis_service::*;
pub use clustering::*;
pub use embedding::*;
pub use errors::*;
pub use nav_matrix::*;
pub use profit::*;
pub use returns::*;
pub use similarity::*;

#[cfg(test)]
mod analysis_service_tests;

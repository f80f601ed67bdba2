//! SQLite-backed fund NAV and distribution storage.

mod model;
mod repository;

pub use model::{InterestDB, PriceDB};
pub use repository::FundRepository;

//! SQLite storage implementation for Fundscope.
//!
//! This crate is the only place where Diesel dependencies exist. It implements
//! the `TimeSeriesStore` and `FundDataWriter` traits from `fundscope-core` and
//! contains:
//! - Database connection pooling and management
//! - Embedded Diesel migrations for the `price` and `interest` tables
//! - The single-writer actor used for ingestion
//!
//! ```text
//!      core (analysis pipeline)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod funds;
pub mod schema;
pub mod utils;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use funds::FundRepository;

// Re-export from fundscope-core for convenience
pub use fundscope_core::errors::{DatabaseError, Error, Result};

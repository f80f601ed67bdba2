//! Utility functions for SQLite storage operations.
//!
//! Chunking helpers that keep `IN (...)` lists and multi-row inserts under
//! SQLite's bound-parameter limit.

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite has a compile-time limit on the number of parameters in a SQL statement,
/// typically around 999 (SQLITE_MAX_VARIABLE_NUMBER). To stay safely under this limit
/// and leave room for other parameters in the query, we use 500 as our chunk size.
///
/// Fund lists for distribution totals go through `chunk_for_sqlite`; multi-row
/// inserts use `chunk_rows_for_sqlite`.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite queries.
///
/// This function splits a slice into chunks of size `SQLITE_MAX_PARAMS_CHUNK` (500),
/// which can be used to safely execute multiple queries with `IN (...)` clauses
/// without exceeding SQLite's parameter limits.
///
/// # Example
///
/// ```ignore
/// let mut total = Decimal::ZERO;
/// for chunk in chunk_for_sqlite(&fund_ids) {
///     total += sum_distributions_in(chunk)?;
/// }
/// ```
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Chunk rows for a multi-row `INSERT`, where every row binds `columns`
/// parameters, so each statement stays under `SQLITE_MAX_PARAMS_CHUNK`.
pub fn chunk_rows_for_sqlite<T>(items: &[T], columns: usize) -> impl Iterator<Item = &[T]> {
    items.chunks((SQLITE_MAX_PARAMS_CHUNK / columns.max(1)).max(1))
}

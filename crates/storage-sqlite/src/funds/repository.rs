use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel::sqlite::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::model::{InterestDB, PriceDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::interest::dsl as interest_dsl;
use crate::schema::price::dsl as price_dsl;
use crate::utils::{chunk_for_sqlite, chunk_rows_for_sqlite};
use fundscope_core::errors::{Error, ValidationError};
use fundscope_core::funds::{
    DistributionRecord, FundDataWriter, FundId, NavObservation, NavRecord, StoreRange,
    StoreTimestamp, TimeSeriesStore,
};
use fundscope_core::utils::time_utils::parse_date;
use fundscope_core::Result;

/// Bound parameters per `price` / `interest` row.
const ROW_COLUMNS: usize = 3;

#[derive(QueryableByName)]
struct TimestampRow {
    #[diesel(sql_type = Nullable<BigInt>)]
    ts: Option<i64>,
}

#[derive(QueryableByName)]
struct DateRow {
    #[diesel(sql_type = Nullable<Text>)]
    day: Option<String>,
}

pub struct FundRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl FundRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

// =============================================================================
// TimeSeriesStore Implementation
// =============================================================================

impl TimeSeriesStore for FundRepository {
    /// Same rule the rows were written with: SQLite's `localtime` modifier
    /// applied to the date, read back as unix seconds.
    fn to_timestamp(&self, date: NaiveDate) -> Result<StoreTimestamp> {
        let mut conn = get_connection(&self.pool)?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let row = sql_query("SELECT CAST(strftime('%s', ?, 'localtime') AS INTEGER) AS ts")
            .bind::<Text, _>(&date_str)
            .get_result::<TimestampRow>(&mut conn)
            .into_core()?;

        row.ts.map(StoreTimestamp).ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "SQLite cannot convert date {}",
                date_str
            )))
        })
    }

    /// Inverse of [`to_timestamp`](Self::to_timestamp): `utc` undoes the
    /// `localtime` shift before the day is rendered.
    fn to_date(&self, timestamp: StoreTimestamp) -> Result<NaiveDate> {
        let mut conn = get_connection(&self.pool)?;

        let row = sql_query("SELECT date(?, 'unixepoch', 'utc') AS day")
            .bind::<BigInt, _>(timestamp.seconds())
            .get_result::<DateRow>(&mut conn)
            .into_core()?;

        let day = row.day.ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "SQLite cannot render timestamp {}",
                timestamp
            )))
        })?;
        parse_date(&day)
    }

    fn observation_dates(
        &self,
        fund_id: Option<&FundId>,
        range: &StoreRange,
    ) -> Result<Vec<StoreTimestamp>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = price_dsl::price
            .filter(price_dsl::date.ge(range.start.seconds()))
            .filter(price_dsl::date.le(range.end.seconds()))
            .into_boxed();
        if let Some(fund_id) = fund_id {
            query = query.filter(price_dsl::fund_id.eq(fund_id.as_str().to_string()));
        }

        let dates = query
            .select(price_dsl::date)
            .distinct()
            .order(price_dsl::date.asc())
            .load::<i64>(&mut conn)
            .into_core()?;

        Ok(dates.into_iter().map(StoreTimestamp).collect())
    }

    fn nav_history(&self, fund_id: &FundId, range: &StoreRange) -> Result<Vec<NavObservation>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = price_dsl::price
            .filter(price_dsl::fund_id.eq(fund_id.as_str()))
            .filter(price_dsl::date.ge(range.start.seconds()))
            .filter(price_dsl::date.le(range.end.seconds()))
            .order(price_dsl::date.asc())
            .select(PriceDB::as_select())
            .load::<PriceDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| NavObservation::try_from(row).map_err(Error::from))
            .collect()
    }

    fn distribution_total(&self, fund_ids: &[FundId], range: &StoreRange) -> Result<Decimal> {
        if fund_ids.is_empty() {
            return Ok(Decimal::ZERO);
        }
        let mut conn = get_connection(&self.pool)?;
        let ids: Vec<String> = fund_ids.iter().map(|f| f.as_str().to_string()).collect();

        let mut total = Decimal::ZERO;
        for chunk in chunk_for_sqlite(&ids) {
            let rows = interest_dsl::interest
                .filter(interest_dsl::fund_id.eq_any(chunk))
                .filter(interest_dsl::date.ge(range.start.seconds()))
                .filter(interest_dsl::date.le(range.end.seconds()))
                .select(InterestDB::as_select())
                .load::<InterestDB>(&mut conn)
                .into_core()?;

            for row in rows {
                total += DistributionRecord::try_from(row)?.amount;
            }
        }
        Ok(total)
    }

    fn fund_ids(&self, range: &StoreRange) -> Result<Vec<FundId>> {
        let mut conn = get_connection(&self.pool)?;

        let ids = price_dsl::price
            .filter(price_dsl::date.ge(range.start.seconds()))
            .filter(price_dsl::date.le(range.end.seconds()))
            .select(price_dsl::fund_id)
            .distinct()
            .order(price_dsl::fund_id.asc())
            .load::<String>(&mut conn)
            .into_core()?;

        Ok(ids.into_iter().map(FundId::new).collect())
    }
}

// =============================================================================
// FundDataWriter Implementation
// =============================================================================

#[async_trait]
impl FundDataWriter for FundRepository {
    async fn upsert_navs(&self, records: &[NavRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let rows: Vec<PriceDB> = records.iter().map(PriceDB::from).collect();

        let written = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut total = 0;
                for chunk in chunk_rows_for_sqlite(&rows, ROW_COLUMNS) {
                    total += diesel::replace_into(price_dsl::price)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                Ok(total)
            })
            .await?;
        debug!("Upserted {} NAV rows", written);
        Ok(written)
    }

    async fn upsert_distributions(&self, records: &[DistributionRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        // Same-day payments of one fund share a key, so they are summed
        // before the replace.
        let mut merged: BTreeMap<(FundId, StoreTimestamp), DistributionRecord> = BTreeMap::new();
        for record in records {
            merged
                .entry((record.fund_id.clone(), record.timestamp))
                .and_modify(|existing| existing.amount += record.amount)
                .or_insert_with(|| record.clone());
        }
        let rows: Vec<InterestDB> = merged.values().map(InterestDB::from).collect();

        let written = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut total = 0;
                for chunk in chunk_rows_for_sqlite(&rows, ROW_COLUMNS) {
                    total += diesel::replace_into(interest_dsl::interest)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                Ok(total)
            })
            .await?;
        debug!("Upserted {} distribution rows", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn create_test_repository() -> (FundRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_pool(db_path.to_str().unwrap()).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        (FundRepository::new(pool, writer), dir)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn nav(repo: &FundRepository, fund: &str, date: NaiveDate, value: Decimal) -> NavRecord {
        NavRecord {
            fund_id: FundId::new(fund),
            timestamp: repo.to_timestamp(date).unwrap(),
            nav: value,
        }
    }

    fn range(repo: &FundRepository, start: NaiveDate, end: NaiveDate) -> StoreRange {
        StoreRange::new(
            repo.to_timestamp(start).unwrap(),
            repo.to_timestamp(end).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_to_timestamp_is_one_day_apart() {
        let (repo, _dir) = create_test_repository();
        let a = repo.to_timestamp(d(2024, 1, 1)).unwrap();
        let b = repo.to_timestamp(d(2024, 1, 2)).unwrap();
        assert_eq!(b.seconds() - a.seconds(), 86_400);
    }

    #[tokio::test]
    async fn test_to_date_inverts_to_timestamp() {
        let (repo, _dir) = create_test_repository();
        for day in [d(2024, 1, 1), d(2024, 1, 2), d(2024, 2, 29), d(2024, 12, 31)] {
            let ts = repo.to_timestamp(day).unwrap();
            assert_eq!(repo.to_date(ts).unwrap(), day);
        }
    }

    #[tokio::test]
    async fn test_nav_round_trip_and_range_filter() {
        let (repo, _dir) = create_test_repository();
        let records = vec![
            nav(&repo, "A", d(2024, 1, 2), dec!(1.0100)),
            nav(&repo, "A", d(2024, 1, 3), dec!(1.0200)),
            nav(&repo, "A", d(2024, 2, 1), dec!(1.0300)),
            nav(&repo, "B", d(2024, 1, 3), dec!(2.5)),
        ];
        assert_eq!(repo.upsert_navs(&records).await.unwrap(), 4);

        let january = range(&repo, d(2024, 1, 1), d(2024, 1, 31));
        let history = repo.nav_history(&FundId::new("A"), &january).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].nav, dec!(1.0100));
        assert!(history[0].timestamp < history[1].timestamp);

        let all_dates = repo.observation_dates(None, &january).unwrap();
        assert_eq!(all_dates.len(), 2);
        let b_dates = repo
            .observation_dates(Some(&FundId::new("B")), &january)
            .unwrap();
        assert_eq!(b_dates, vec![records[3].timestamp]);

        assert_eq!(
            repo.fund_ids(&january).unwrap(),
            vec![FundId::new("A"), FundId::new("B")]
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_day() {
        let (repo, _dir) = create_test_repository();
        repo.upsert_navs(&[nav(&repo, "A", d(2024, 1, 2), dec!(1))])
            .await
            .unwrap();
        repo.upsert_navs(&[nav(&repo, "A", d(2024, 1, 2), dec!(2))])
            .await
            .unwrap();

        let history = repo
            .nav_history(&FundId::new("A"), &range(&repo, d(2024, 1, 1), d(2024, 1, 31)))
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].nav, dec!(2));
    }

    #[tokio::test]
    async fn test_distribution_total_filters_funds_and_dates() {
        let (repo, _dir) = create_test_repository();
        let dist = |fund: &str, date: NaiveDate, amount: Decimal| DistributionRecord {
            fund_id: FundId::new(fund),
            timestamp: repo.to_timestamp(date).unwrap(),
            amount,
        };
        let records = vec![
            dist("A", d(2024, 1, 10), dec!(0.25)),
            dist("A", d(2024, 3, 10), dec!(5)),
            dist("B", d(2024, 1, 20), dec!(0.50)),
            dist("C", d(2024, 1, 20), dec!(9)),
        ];
        repo.upsert_distributions(&records).await.unwrap();

        let january = range(&repo, d(2024, 1, 1), d(2024, 1, 31));
        let total = repo
            .distribution_total(&[FundId::new("A"), FundId::new("B")], &january)
            .unwrap();
        assert_eq!(total, dec!(0.75));
        assert_eq!(repo.distribution_total(&[], &january).unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_same_day_distributions_are_summed() {
        let (repo, _dir) = create_test_repository();
        let paid = repo.to_timestamp(d(2024, 1, 10)).unwrap();
        let dist = |amount: Decimal| DistributionRecord {
            fund_id: FundId::new("A"),
            timestamp: paid,
            amount,
        };
        let written = repo
            .upsert_distributions(&[dist(dec!(0.10)), dist(dec!(0.15))])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let january = range(&repo, d(2024, 1, 1), d(2024, 1, 31));
        let total = repo
            .distribution_total(&[FundId::new("A")], &january)
            .unwrap();
        assert_eq!(total, dec!(0.25));
    }
}

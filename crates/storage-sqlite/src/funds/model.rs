//! Database models for the `price` and `interest` tables.

use diesel::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;
use fundscope_core::funds::{
    DistributionRecord, FundId, NavObservation, NavRecord, StoreTimestamp,
};

/// One NAV row. Decimals are stored as text to keep their exact scale.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::price)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceDB {
    pub fund_id: String,
    pub date: i64,
    pub nav: String,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::interest)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InterestDB {
    pub fund_id: String,
    pub date: i64,
    /// Stored in the `interest` column.
    pub amount: String,
}

pub(crate) fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(value).map_err(|_| StorageError::CorruptValue {
        column,
        value: value.to_string(),
    })
}

impl From<&NavRecord> for PriceDB {
    fn from(record: &NavRecord) -> Self {
        Self {
            fund_id: record.fund_id.as_str().to_string(),
            date: record.timestamp.seconds(),
            nav: record.nav.to_string(),
        }
    }
}

impl TryFrom<PriceDB> for NavObservation {
    type Error = StorageError;

    fn try_from(row: PriceDB) -> Result<Self, Self::Error> {
        Ok(NavObservation {
            timestamp: StoreTimestamp(row.date),
            nav: parse_decimal("price.nav", &row.nav)?,
        })
    }
}

impl From<&DistributionRecord> for InterestDB {
    fn from(record: &DistributionRecord) -> Self {
        Self {
            fund_id: record.fund_id.as_str().to_string(),
            date: record.timestamp.seconds(),
            amount: record.amount.to_string(),
        }
    }
}

impl TryFrom<InterestDB> for DistributionRecord {
    type Error = StorageError;

    fn try_from(row: InterestDB) -> Result<Self, Self::Error> {
        Ok(DistributionRecord {
            amount: parse_decimal("interest.interest", &row.amount)?,
            fund_id: FundId::new(row.fund_id),
            timestamp: StoreTimestamp(row.date),
        })
    }
}

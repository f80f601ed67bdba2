//! CSV ingestion of NAV and distribution history.
//!
//! Accepted layouts (header row required, column order free):
//!
//! ```text
//! fund_id,date,nav          fund_id,date,interest
//! F001,2024-01-02,1.0234    F001,2024-03-29,0.05
//! ```
//!
//! Dates are converted through the store so imported rows line up with the
//! timestamps the analysis later queries with.

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use super::funds_model::{DistributionRecord, FundId, NavRecord, StoreTimestamp};
use super::funds_traits::{FundDataWriter, TimeSeriesStore};
use crate::errors::{Error, Result};
use crate::utils::time_utils::parse_date;

const FUND_ID_COLUMN: &str = "fund_id";
const DATE_COLUMN: &str = "date";
const NAV_COLUMN: &str = "nav";
const INTEREST_COLUMN: &str = "interest";

/// One parsed CSV row before timestamp conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvFundRow {
    pub fund_id: FundId,
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub rows_read: usize,
    pub rows_written: usize,
}

/// Parses a `fund_id,date,nav` CSV.
pub fn parse_nav_csv(content: &[u8]) -> Result<Vec<CsvFundRow>> {
    parse_fund_csv(content, NAV_COLUMN)
}

/// Parses a `fund_id,date,interest` CSV.
pub fn parse_distribution_csv(content: &[u8]) -> Result<Vec<CsvFundRow>> {
    parse_fund_csv(content, INTEREST_COLUMN)
}

fn parse_fund_csv(content: &[u8], value_column: &str) -> Result<Vec<CsvFundRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(false)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    let fund_idx = column_index(&headers, FUND_ID_COLUMN)?;
    let date_idx = column_index(&headers, DATE_COLUMN)?;
    let value_idx = column_index(&headers, value_column)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let fund_id = record.get(fund_idx).unwrap_or_default();
        if fund_id.is_empty() {
            return Err(Error::Import(format!("line {}: empty {}", line, FUND_ID_COLUMN)));
        }
        let date = parse_date(record.get(date_idx).unwrap_or_default())
            .map_err(|e| Error::Import(format!("line {}: {}", line, e)))?;
        let raw_value = record.get(value_idx).unwrap_or_default();
        let value = Decimal::from_str(raw_value).map_err(|e| {
            Error::Import(format!(
                "line {}: invalid {} '{}': {}",
                line, value_column, raw_value, e
            ))
        })?;

        rows.push(CsvFundRow {
            fund_id: FundId::new(fund_id),
            date,
            value,
        });
    }

    debug!("Parsed {} {} rows from CSV", rows.len(), value_column);
    Ok(rows)
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::Import(format!("missing '{}' column", name)))
}

/// Imports CSV history into the store.
#[async_trait]
pub trait FundImportServiceTrait: Send + Sync {
    async fn import_navs_csv(&self, content: &[u8]) -> Result<ImportSummary>;
    async fn import_distributions_csv(&self, content: &[u8]) -> Result<ImportSummary>;
}

pub struct FundImportService {
    store: Arc<dyn TimeSeriesStore>,
    writer: Arc<dyn FundDataWriter>,
}

impl FundImportService {
    pub fn new(store: Arc<dyn TimeSeriesStore>, writer: Arc<dyn FundDataWriter>) -> Self {
        Self { store, writer }
    }

    /// Converts each distinct date once through the store.
    fn convert_dates(&self, rows: &[CsvFundRow]) -> Result<HashMap<NaiveDate, StoreTimestamp>> {
        let mut converted = HashMap::new();
        for row in rows {
            if !converted.contains_key(&row.date) {
                converted.insert(row.date, self.store.to_timestamp(row.date)?);
            }
        }
        Ok(converted)
    }
}

#[async_trait]
impl FundImportServiceTrait for FundImportService {
    async fn import_navs_csv(&self, content: &[u8]) -> Result<ImportSummary> {
        let rows = parse_nav_csv(content)?;
        let timestamps = self.convert_dates(&rows)?;
        let records: Vec<NavRecord> = rows
            .iter()
            .map(|row| NavRecord {
                fund_id: row.fund_id.clone(),
                timestamp: timestamps[&row.date],
                nav: row.value,
            })
            .collect();

        let rows_written = self.writer.upsert_navs(&records).await?;
        info!("Imported {} NAV rows ({} written)", records.len(), rows_written);
        Ok(ImportSummary {
            rows_read: records.len(),
            rows_written,
        })
    }

    async fn import_distributions_csv(&self, content: &[u8]) -> Result<ImportSummary> {
        let rows = parse_distribution_csv(content)?;
        let timestamps = self.convert_dates(&rows)?;
        let records: Vec<DistributionRecord> = rows
            .iter()
            .map(|row| DistributionRecord {
                fund_id: row.fund_id.clone(),
                timestamp: timestamps[&row.date],
                amount: row.value,
            })
            .collect();

        let rows_written = self.writer.upsert_distributions(&records).await?;
        info!(
            "Imported {} distribution rows ({} written)",
            records.len(),
            rows_written
        );
        Ok(ImportSummary {
            rows_read: records.len(),
            rows_written,
        })
    }
}

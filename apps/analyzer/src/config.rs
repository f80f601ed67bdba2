//! Environment-based configuration for the analyzer binary.

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use fundscope_core::analysis::{AnalysisConfig, Linkage};
use fundscope_core::utils::time_utils::parse_date;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `funds.db`; `DATABASE_URL` overrides the file path.
    pub db_path: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub analysis: AnalysisConfig,
    /// `fund_id,date,nav` CSV loaded before the analysis runs.
    pub import_prices: Option<PathBuf>,
    /// `fund_id,date,interest` CSV loaded before the analysis runs.
    pub import_distributions: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = AnalysisConfig::default();

        let analysis = AnalysisConfig {
            seed: env_parse("FUNDSCOPE_SEED", defaults.seed)?,
            cohort_size: env_parse("FUNDSCOPE_COHORT_SIZE", defaults.cohort_size)?,
            linkage: match std::env::var("FUNDSCOPE_LINKAGE") {
                Ok(raw) => Linkage::from_str(&raw).map_err(|e| anyhow!(e))?,
                Err(_) => defaults.linkage,
            },
            ..defaults
        };

        Ok(Self {
            db_path: std::env::var("FUNDSCOPE_DB_PATH").unwrap_or_else(|_| "./db".to_string()),
            start: env_date("FUNDSCOPE_START")?,
            end: env_date("FUNDSCOPE_END")?,
            analysis,
            import_prices: std::env::var("FUNDSCOPE_IMPORT_PRICES").ok().map(PathBuf::from),
            import_distributions: std::env::var("FUNDSCOPE_IMPORT_DISTRIBUTIONS")
                .ok()
                .map(PathBuf::from),
        })
    }
}

fn env_date(key: &str) -> anyhow::Result<NaiveDate> {
    let raw = std::env::var(key).with_context(|| format!("{} is not set", key))?;
    parse_date(&raw).with_context(|| format!("{} must be YYYY-MM-DD, got '{}'", key, raw))
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

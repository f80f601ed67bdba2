use std::sync::Arc;

use crate::config::Config;
use fundscope_core::analysis::{FundAnalysis, FundAnalysisService, FundAnalysisServiceTrait};
use fundscope_core::funds::{FundImportService, FundImportServiceTrait};
use fundscope_storage_sqlite::{db, FundRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing() {
    let log_format = std::env::var("FUNDSCOPE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Opens (and migrates) the database and wires the repository.
pub fn build_repository(config: &Config) -> anyhow::Result<Arc<FundRepository>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());
    Ok(Arc::new(FundRepository::new(pool, writer)))
}

async fn run_imports(config: &Config, repository: Arc<FundRepository>) -> anyhow::Result<()> {
    let importer = FundImportService::new(repository.clone(), repository);

    if let Some(path) = &config.import_prices {
        let content = tokio::fs::read(path).await?;
        let summary = importer.import_navs_csv(&content).await?;
        tracing::info!(
            "Imported {} of {} NAV rows from {}",
            summary.rows_written,
            summary.rows_read,
            path.display()
        );
    }
    if let Some(path) = &config.import_distributions {
        let content = tokio::fs::read(path).await?;
        let summary = importer.import_distributions_csv(&content).await?;
        tracing::info!(
            "Imported {} of {} distribution rows from {}",
            summary.rows_written,
            summary.rows_read,
            path.display()
        );
    }
    Ok(())
}

/// Imports any configured CSV files, then analyzes the configured range.
pub async fn run(config: &Config) -> anyhow::Result<FundAnalysis> {
    let repository = build_repository(config)?;
    run_imports(config, repository.clone()).await?;

    let service = FundAnalysisService::new(repository, config.analysis);
    let (start, end) = (config.start, config.end);
    let analysis = tokio::task::spawn_blocking(move || service.analyze(start, end)).await??;

    tracing::info!(
        "Representatives: {}",
        analysis
            .representatives
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(analysis)
}

use chrono::NaiveDate;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;

use super::analysis_config::AnalysisConfig;
use super::analysis_model::{
    month_store_range, DateRange, EmbeddingSet, FundAnalysis, MonthlyEmbedding, ProfitSeries,
    RepresentativeSet,
};
use super::clustering::{ClusterAssignment, ClusterSelector};
use super::embedding::EmbeddingProjector;
use super::errors::AnalysisError;
use super::nav_matrix::NavMatrixBuilder;
use super::profit::ProfitAggregator;
use super::similarity::{MonthWindow, SimilarityEngine};
use crate::errors::Result;
use crate::funds::{FundId, TimeSeriesStore};

/// Entry points of the fund analysis pipeline.
pub trait FundAnalysisServiceTrait: Send + Sync {
    /// Runs the whole pipeline for `[start, end]`.
    fn analyze(&self, start: NaiveDate, end: NaiveDate) -> Result<FundAnalysis>;

    /// Profit curve of the representatives chosen for `[start, end]`.
    fn compute_profit(&self, start: NaiveDate, end: NaiveDate) -> Result<ProfitSeries>;

    /// Per-month layouts for every month touched by `[start, end]`.
    fn compute_embeddings(&self, start: NaiveDate, end: NaiveDate) -> Result<EmbeddingSet>;
}

/// Outcome of cohort sampling and clustering on the lookback month.
struct Selection {
    universe_size: usize,
    cohort: Vec<FundId>,
    assignment: ClusterAssignment,
    representatives: RepresentativeSet,
}

pub struct FundAnalysisService {
    store: Arc<dyn TimeSeriesStore>,
    config: AnalysisConfig,
}

impl FundAnalysisService {
    pub fn new(store: Arc<dyn TimeSeriesStore>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn builder(&self) -> NavMatrixBuilder<'_> {
        NavMatrixBuilder::new(self.store.as_ref()).with_policy(self.config.fill_policy)
    }

    fn prepare(&self, start: NaiveDate, end: NaiveDate) -> Result<DateRange> {
        self.config.validate()?;
        DateRange::new(start, end)
    }

    /// Samples the cohort from the month before `start` and clusters it.
    ///
    /// Every call reseeds, so the three entry points agree on the selection.
    fn select(&self, range: &DateRange) -> Result<Selection> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let store = self.store.as_ref();

        let lookback = range.lookback_month()?;
        let lookback_range = month_store_range(store, lookback)?;
        let mut universe = store.fund_ids(&lookback_range)?;
        universe.sort();
        universe.dedup();
        if universe.is_empty() {
            return Err(AnalysisError::EmptyWindow {
                range: lookback_range,
            }
            .into());
        }

        let cohort: Vec<FundId> = if universe.len() > self.config.cohort_size {
            universe
                .choose_multiple(&mut rng, self.config.cohort_size)
                .cloned()
                .collect()
        } else {
            universe.clone()
        };
        info!(
            "Sampled {} of {} funds from lookback month {}",
            cohort.len(),
            universe.len(),
            lookback.format("%Y-%m")
        );

        let window = SimilarityEngine::new(store, self.builder()).month_window(&cohort, lookback)?;
        let selector = ClusterSelector::new(self.config.cluster_count, self.config.linkage);
        let (assignment, representatives) = selector.select(&window.dissimilarity, &mut rng)?;

        Ok(Selection {
            universe_size: universe.len(),
            cohort,
            assignment,
            representatives,
        })
    }

    fn profit(
        &self,
        range: &DateRange,
        representatives: &RepresentativeSet,
    ) -> Result<(ProfitSeries, Vec<f64>)> {
        let store_range = range.to_store_range(self.store.as_ref())?;
        ProfitAggregator::new(self.store.as_ref(), self.builder()).aggregate(representatives, &store_range)
    }

    /// Builds one window per month over the whole cohort, then projects the
    /// windows. A cohort fund without observations in a month aborts with
    /// `DataGap`.
    fn embeddings(
        &self,
        range: &DateRange,
        cohort: &[FundId],
        representatives: &RepresentativeSet,
    ) -> Result<EmbeddingSet> {
        let engine = SimilarityEngine::new(self.store.as_ref(), self.builder());
        let windows = range
            .months()
            .into_iter()
            .map(|month| engine.month_window(cohort, month))
            .collect::<Result<Vec<MonthWindow>>>()?;

        let projector = EmbeddingProjector::new(self.config.embedding, self.config.seed);
        let months: Vec<MonthlyEmbedding> = if self.config.parallel_embeddings {
            windows
                .par_iter()
                .map(|w| projector.project(w, representatives))
                .collect()
        } else {
            windows
                .iter()
                .map(|w| projector.project(w, representatives))
                .collect()
        };

        Ok(EmbeddingSet {
            start: range.start(),
            months,
        })
    }
}

impl FundAnalysisServiceTrait for FundAnalysisService {
    fn analyze(&self, start: NaiveDate, end: NaiveDate) -> Result<FundAnalysis> {
        let range = self.prepare(start, end)?;
        info!("Analyzing funds from {} to {}", start, end);

        let selection = self.select(&range)?;
        let (profit, average_returns) = self.profit(&range, &selection.representatives)?;
        let embeddings = self.embeddings(&range, &selection.cohort, &selection.representatives)?;

        Ok(FundAnalysis {
            range,
            universe_size: selection.universe_size,
            cohort: selection.cohort,
            assignment: selection.assignment,
            representatives: selection.representatives,
            average_returns,
            profit,
            embeddings,
        })
    }

    fn compute_profit(&self, start: NaiveDate, end: NaiveDate) -> Result<ProfitSeries> {
        let range = self.prepare(start, end)?;
        let selection = self.select(&range)?;
        let (profit, _) = self.profit(&range, &selection.representatives)?;
        Ok(profit)
    }

    fn compute_embeddings(&self, start: NaiveDate, end: NaiveDate) -> Result<EmbeddingSet> {
        let range = self.prepare(start, end)?;
        let selection = self.select(&range)?;
        self.embeddings(&range, &selection.cohort, &selection.representatives)
    }
}

//! Tunables of an analysis run.

use serde::{Deserialize, Serialize};

use super::clustering::Linkage;
use super::embedding::EmbeddingConfig;
use super::nav_matrix::FillPolicy;
use crate::constants::{DEFAULT_CLUSTER_COUNT, DEFAULT_COHORT_SIZE, DEFAULT_SEED};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Funds sampled from the lookback month's universe.
    pub cohort_size: usize,
    pub cluster_count: usize,
    /// Drives cohort sampling, representative sampling and MDS starts.
    pub seed: u64,
    pub linkage: Linkage,
    pub fill_policy: FillPolicy,
    pub embedding: EmbeddingConfig,
    /// Project months on the rayon pool instead of sequentially.
    pub parallel_embeddings: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cohort_size: DEFAULT_COHORT_SIZE,
            cluster_count: DEFAULT_CLUSTER_COUNT,
            seed: DEFAULT_SEED,
            linkage: Linkage::default(),
            fill_policy: FillPolicy::default(),
            embedding: EmbeddingConfig::default(),
            parallel_embeddings: true,
        }
    }
}

impl AnalysisConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 {
            return Err(Error::InvalidConfigValue(
                "cluster_count must be at least 1".to_string(),
            ));
        }
        if self.cohort_size < self.cluster_count {
            return Err(Error::InvalidConfigValue(format!(
                "cohort_size {} is smaller than cluster_count {}",
                self.cohort_size, self.cluster_count
            )));
        }
        if self.embedding.n_init == 0 || self.embedding.max_iter == 0 {
            return Err(Error::InvalidConfigValue(
                "embedding n_init and max_iter must be positive".to_string(),
            ));
        }
        if !(self.embedding.eps.is_finite() && self.embedding.eps > 0.0) {
            return Err(Error::InvalidConfigValue(format!(
                "embedding eps must be a positive number, got {}",
                self.embedding.eps
            )));
        }
        Ok(())
    }
}

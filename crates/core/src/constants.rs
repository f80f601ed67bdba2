/// Number of clusters (and therefore representatives) per analysis
pub const DEFAULT_CLUSTER_COUNT: usize = 4;

/// Number of funds sampled from the lookback month's universe
pub const DEFAULT_COHORT_SIZE: usize = 300;

/// Seed used when the caller does not supply one
pub const DEFAULT_SEED: u64 = 1;

/// Output dimensionality of the fund embedding
pub const EMBEDDING_DIMENSIONS: usize = 2;

/// SMACOF restarts per embedding; the lowest-stress layout wins
pub const DEFAULT_MDS_N_INIT: usize = 4;

/// SMACOF iteration cap per restart
pub const DEFAULT_MDS_MAX_ITER: usize = 300;

/// Relative stress improvement below which SMACOF stops
pub const DEFAULT_MDS_EPS: f64 = 1e-3;

/// Percent scale applied to profit ratios
pub const PERCENT_SCALE: i64 = 100;

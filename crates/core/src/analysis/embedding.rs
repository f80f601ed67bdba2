//! Metric multidimensional scaling of monthly dissimilarity matrices.
//!
//! Layouts are found with SMACOF (majorization of stress) from several
//! random starts. All randomness comes from a `StdRng` seeded per call, so
//! the same matrix and seed always give the same coordinates.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::analysis_model::{EmbeddingPoint, Highlight, MonthlyEmbedding, RepresentativeSet};
use super::similarity::{DissimilarityMatrix, MonthWindow};
use crate::constants::{
    DEFAULT_MDS_EPS, DEFAULT_MDS_MAX_ITER, DEFAULT_MDS_N_INIT, EMBEDDING_DIMENSIONS,
};

/// Distances smaller than this are bumped before dividing.
const MIN_DISTANCE: f64 = 1e-5;

type Coordinates = Vec<[f64; EMBEDDING_DIMENSIONS]>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Number of random starts.
    pub n_init: usize,
    pub max_iter: usize,
    /// Stop once the relative stress improvement drops below this.
    pub eps: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            n_init: DEFAULT_MDS_N_INIT,
            max_iter: DEFAULT_MDS_MAX_ITER,
            eps: DEFAULT_MDS_EPS,
        }
    }
}

/// Runs SMACOF `config.n_init` times and keeps the lowest-stress layout.
///
/// Returns the coordinates (parallel to the matrix rows) and their stress.
pub fn smacof(
    matrix: &DissimilarityMatrix,
    config: &EmbeddingConfig,
    seed: u64,
) -> (Coordinates, f64) {
    let n = matrix.len();
    if n == 0 {
        return (Vec::new(), 0.0);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<(Coordinates, f64)> = None;
    for _ in 0..config.n_init.max(1) {
        let init: Coordinates = (0..n)
            .map(|_| {
                let mut point = [0.0; EMBEDDING_DIMENSIONS];
                for c in point.iter_mut() {
                    *c = rng.gen::<f64>();
                }
                point
            })
            .collect();
        let (coords, stress) = smacof_single(matrix.rows(), init, config);
        if best.as_ref().map_or(true, |(_, s)| stress < *s) {
            best = Some((coords, stress));
        }
    }
    best.unwrap_or_default()
}

fn smacof_single(delta: &[Vec<f64>], init: Coordinates, config: &EmbeddingConfig) -> (Coordinates, f64) {
    let n = delta.len();
    let mut x = init;
    let mut stress = 0.0;
    let mut old_stress: Option<f64> = None;

    for _ in 0..config.max_iter {
        let dis = pairwise_distances(&x);

        stress = 0.0;
        for i in 0..n {
            for j in 0..n {
                let diff = dis[i][j] - delta[i][j];
                stress += diff * diff;
            }
        }
        stress /= 2.0;

        // Guttman transform: X <- B(X) X / n
        let mut b = vec![vec![0.0; n]; n];
        for i in 0..n {
            let mut row_sum = 0.0;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = if dis[i][j] == 0.0 { MIN_DISTANCE } else { dis[i][j] };
                let ratio = delta[i][j] / d;
                b[i][j] = -ratio;
                row_sum += ratio;
            }
            b[i][i] = row_sum;
        }

        let mut next: Coordinates = vec![[0.0; EMBEDDING_DIMENSIONS]; n];
        for i in 0..n {
            for (j, xj) in x.iter().enumerate() {
                for c in 0..EMBEDDING_DIMENSIONS {
                    next[i][c] += b[i][j] * xj[c];
                }
            }
            for c in next[i].iter_mut() {
                *c /= n as f64;
            }
        }
        x = next;

        let scale: f64 = x.iter().map(|p| p.iter().map(|c| c * c).sum::<f64>().sqrt()).sum();
        if scale == 0.0 {
            break;
        }
        let relative = stress / scale;
        if let Some(old) = old_stress {
            if old - relative < config.eps {
                break;
            }
        }
        old_stress = Some(relative);
    }

    (x, stress)
}

fn pairwise_distances(x: &Coordinates) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut dis = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = x[i]
                .iter()
                .zip(&x[j])
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            dis[i][j] = d;
            dis[j][i] = d;
        }
    }
    dis
}

/// Projects monthly windows to 2D and tags the representatives.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingProjector {
    config: EmbeddingConfig,
    seed: u64,
}

impl EmbeddingProjector {
    pub fn new(config: EmbeddingConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    pub fn project(&self, window: &MonthWindow, representatives: &RepresentativeSet) -> MonthlyEmbedding {
        let (coords, stress) = smacof(&window.dissimilarity, &self.config, self.seed);
        let points = window
            .dissimilarity
            .fund_ids()
            .iter()
            .zip(coords)
            .map(|(fund_id, [x, y])| EmbeddingPoint {
                fund_id: fund_id.clone(),
                x,
                y,
                highlight: if representatives.contains(fund_id) {
                    Highlight::Chosen
                } else {
                    Highlight::Other
                },
            })
            .collect::<Vec<_>>();

        debug!(
            "Embedded {} funds for {} (stress {:.6})",
            points.len(),
            window.month.format("%Y-%m"),
            stress
        );
        MonthlyEmbedding {
            month: window.month,
            points,
            dropped: window.dropped.clone(),
            stress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funds::FundId;
    use chrono::NaiveDate;

    /// Distances between the corners of a unit square.
    fn square() -> DissimilarityMatrix {
        let diag = 2f64.sqrt();
        DissimilarityMatrix::from_rows(
            ["A", "B", "C", "D"].iter().map(|s| FundId::new(*s)).collect(),
            vec![
                vec![0.0, 1.0, diag, 1.0],
                vec![1.0, 0.0, 1.0, diag],
                vec![diag, 1.0, 0.0, 1.0],
                vec![1.0, diag, 1.0, 0.0],
            ],
        )
    }

    fn window() -> MonthWindow {
        MonthWindow {
            month: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            dissimilarity: square(),
            dropped: vec![FundId::new("FLAT")],
        }
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let config = EmbeddingConfig::default();
        let (a, sa) = smacof(&square(), &config, 1);
        let (b, sb) = smacof(&square(), &config, 1);
        assert_eq!(a, b);
        assert_eq!(sa.to_bits(), sb.to_bits());
    }

    #[test]
    fn test_square_is_recovered() {
        let config = EmbeddingConfig {
            n_init: 4,
            max_iter: 1000,
            eps: 1e-9,
        };
        let (coords, stress) = smacof(&square(), &config, 3);
        assert!(stress < 1e-2, "stress {}", stress);

        let dis = pairwise_distances(&coords);
        assert!((dis[0][1] - 1.0).abs() < 0.1);
        assert!((dis[0][2] - 2f64.sqrt()).abs() < 0.1);
    }

    #[test]
    fn test_empty_matrix_has_empty_layout() {
        let empty = DissimilarityMatrix::from_rows(Vec::new(), Vec::new());
        let (coords, stress) = smacof(&empty, &EmbeddingConfig::default(), 1);
        assert!(coords.is_empty());
        assert_eq!(stress, 0.0);
    }

    #[test]
    fn test_projector_tags_representatives() {
        let reps = RepresentativeSet {
            funds: vec![FundId::new("B")],
        };
        let embedding = EmbeddingProjector::new(EmbeddingConfig::default(), 1).project(&window(), &reps);

        assert_eq!(embedding.points.len(), 4);
        assert_eq!(embedding.point(&FundId::new("B")).unwrap().highlight, Highlight::Chosen);
        assert_eq!(embedding.point(&FundId::new("A")).unwrap().highlight, Highlight::Other);
        assert_eq!(embedding.dropped, vec![FundId::new("FLAT")]);
    }
}

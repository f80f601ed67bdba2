//! Agglomerative clustering on a precomputed dissimilarity matrix and
//! per-cluster representative sampling.
//!
//! Distances are taken from the matrix as-is; nothing is re-derived from
//! coordinates. Inter-cluster distances are updated with the Lance-Williams
//! rule of the selected [`Linkage`].

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::analysis_model::RepresentativeSet;
use super::errors::AnalysisError;
use super::similarity::DissimilarityMatrix;
use crate::errors::Result;
use crate::funds::FundId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Linkage {
    /// Mean pairwise distance between members (UPGMA).
    #[default]
    Average,
    /// Largest pairwise distance between members.
    Complete,
    /// Smallest pairwise distance between members.
    Single,
}

impl Linkage {
    fn merged_distance(&self, d_ai: f64, d_aj: f64, size_i: usize, size_j: usize) -> f64 {
        match self {
            Linkage::Average => {
                (size_i as f64 * d_ai + size_j as f64 * d_aj) / (size_i + size_j) as f64
            }
            Linkage::Complete => d_ai.max(d_aj),
            Linkage::Single => d_ai.min(d_aj),
        }
    }
}

impl std::str::FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average" => Ok(Linkage::Average),
            "complete" => Ok(Linkage::Complete),
            "single" => Ok(Linkage::Single),
            other => Err(format!("unknown linkage '{}'", other)),
        }
    }
}

/// Cluster label of every surviving fund.
///
/// Labels run from 0 to `cluster_count - 1`, numbered by the position of each
/// cluster's first member in the input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    fund_ids: Vec<FundId>,
    labels: Vec<usize>,
    cluster_count: usize,
}

impl ClusterAssignment {
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn fund_ids(&self) -> &[FundId] {
        &self.fund_ids
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label_of(&self, fund_id: &FundId) -> Option<usize> {
        self.fund_ids
            .iter()
            .position(|f| f == fund_id)
            .map(|idx| self.labels[idx])
    }

    /// Members of `label` in input order.
    pub fn members(&self, label: usize) -> Vec<&FundId> {
        self.fund_ids
            .iter()
            .zip(&self.labels)
            .filter(|(_, l)| **l == label)
            .map(|(f, _)| f)
            .collect()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count];
        for label in &self.labels {
            sizes[*label] += 1;
        }
        sizes
    }
}

/// Bottom-up clustering: start with singletons and repeatedly merge the two
/// nearest clusters until `cluster_count` remain.
///
/// Ties are broken by the lowest index pair, so the result is deterministic.
pub fn agglomerative(
    matrix: &DissimilarityMatrix,
    cluster_count: usize,
    linkage: Linkage,
) -> Result<ClusterAssignment> {
    let n = matrix.len();
    if cluster_count == 0 || n < cluster_count {
        return Err(AnalysisError::InsufficientCluster {
            required: cluster_count,
            available: n,
        }
        .into());
    }

    let mut distance: Vec<Vec<f64>> = matrix.rows().to_vec();
    let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
    let mut active = n;

    while active > cluster_count {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if members[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if members[j].is_none() {
                    continue;
                }
                let d = distance[i][j];
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((i, j, d));
                }
            }
        }
        let Some((i, j, _)) = best else {
            break;
        };

        let size_i = members[i].as_ref().map_or(0, Vec::len);
        let size_j = members[j].as_ref().map_or(0, Vec::len);
        for a in 0..n {
            if a == i || a == j || members[a].is_none() {
                continue;
            }
            let merged = linkage.merged_distance(distance[a][i], distance[a][j], size_i, size_j);
            distance[a][i] = merged;
            distance[i][a] = merged;
        }

        let absorbed = members[j].take().unwrap_or_default();
        if let Some(target) = members[i].as_mut() {
            target.extend(absorbed);
        }
        active -= 1;
    }

    // Surviving slots are visited in index order and each slot keeps its
    // smallest input index, so labels follow first appearance.
    let mut labels = vec![0; n];
    for (label, group) in members.iter().flatten().enumerate() {
        for &idx in group {
            labels[idx] = label;
        }
    }

    let assignment = ClusterAssignment {
        fund_ids: matrix.fund_ids().to_vec(),
        labels,
        cluster_count,
    };
    debug!("Cluster sizes: {:?}", assignment.cluster_sizes());
    Ok(assignment)
}

/// Uniformly samples one member of every cluster.
///
/// Fails with [`AnalysisError::InsufficientCluster`] if any label is empty.
pub fn sample_representatives<R: Rng + ?Sized>(
    assignment: &ClusterAssignment,
    rng: &mut R,
) -> Result<RepresentativeSet> {
    let mut funds = Vec::with_capacity(assignment.cluster_count());
    for label in 0..assignment.cluster_count() {
        let members = assignment.members(label);
        let Some(chosen) = members.choose(rng) else {
            let available = assignment
                .cluster_sizes()
                .iter()
                .filter(|size| **size > 0)
                .count();
            return Err(AnalysisError::InsufficientCluster {
                required: assignment.cluster_count(),
                available,
            }
            .into());
        };
        funds.push((*chosen).clone());
    }
    Ok(RepresentativeSet { funds })
}

/// Partitions funds and picks one representative per cluster.
#[derive(Debug, Clone, Copy)]
pub struct ClusterSelector {
    pub cluster_count: usize,
    pub linkage: Linkage,
}

impl ClusterSelector {
    pub fn new(cluster_count: usize, linkage: Linkage) -> Self {
        Self {
            cluster_count,
            linkage,
        }
    }

    pub fn select<R: Rng + ?Sized>(
        &self,
        matrix: &DissimilarityMatrix,
        rng: &mut R,
    ) -> Result<(ClusterAssignment, RepresentativeSet)> {
        let assignment = agglomerative(matrix, self.cluster_count, self.linkage)?;
        let representatives = sample_representatives(&assignment, rng)?;
        info!(
            "Selected representatives {:?} from {} funds",
            representatives.funds.iter().map(FundId::as_str).collect::<Vec<_>>(),
            matrix.len()
        );
        Ok((assignment, representatives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Four well separated pairs: (A0,A1) (B0,B1) (C0,C1) (D0,D1).
    fn paired_matrix() -> DissimilarityMatrix {
        let names = ["A0", "A1", "B0", "B1", "C0", "C1", "D0", "D1"];
        let n = names.len();
        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                values[i][j] = if i / 2 == j / 2 {
                    0.05
                } else {
                    0.6 + 0.01 * ((i / 2) + (j / 2)) as f64
                };
            }
        }
        DissimilarityMatrix::from_rows(names.iter().map(|s| FundId::new(*s)).collect(), values)
    }

    #[test]
    fn test_agglomerative_recovers_pairs() {
        for linkage in [Linkage::Average, Linkage::Complete, Linkage::Single] {
            let assignment = agglomerative(&paired_matrix(), 4, linkage).unwrap();
            assert_eq!(assignment.labels(), &[0, 0, 1, 1, 2, 2, 3, 3]);
            assert_eq!(assignment.cluster_sizes(), vec![2, 2, 2, 2]);
        }
    }

    #[test]
    fn test_representatives_one_per_label() {
        let mut rng = StdRng::seed_from_u64(7);
        let selector = ClusterSelector::new(4, Linkage::Average);
        let (assignment, reps) = selector.select(&paired_matrix(), &mut rng).unwrap();

        assert_eq!(reps.len(), 4);
        let mut labels: Vec<usize> = reps
            .iter()
            .map(|f| assignment.label_of(f).unwrap())
            .collect();
        labels.sort();
        assert_eq!(labels, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_same_seed_same_representatives() {
        let selector = ClusterSelector::new(4, Linkage::Average);
        let (_, first) = selector
            .select(&paired_matrix(), &mut StdRng::seed_from_u64(42))
            .unwrap();
        let (_, second) = selector
            .select(&paired_matrix(), &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_few_funds_is_insufficient() {
        let m = DissimilarityMatrix::from_rows(
            vec![FundId::new("A"), FundId::new("B"), FundId::new("C")],
            vec![vec![0.0, 0.1, 0.2], vec![0.1, 0.0, 0.3], vec![0.2, 0.3, 0.0]],
        );
        let err = agglomerative(&m, 4, Linkage::Average).unwrap_err();
        assert!(matches!(
            err,
            Error::Analysis(AnalysisError::InsufficientCluster {
                required: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_exactly_k_funds_are_singletons() {
        let m = DissimilarityMatrix::from_rows(
            (0..4).map(|i| FundId::new(format!("F{}", i))).collect(),
            vec![vec![0.0; 4]; 4],
        );
        let assignment = agglomerative(&m, 4, Linkage::Average).unwrap();
        assert_eq!(assignment.labels(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_label_is_reported() {
        let assignment = ClusterAssignment {
            fund_ids: vec![FundId::new("A"), FundId::new("B")],
            labels: vec![0, 0],
            cluster_count: 2,
        };
        let err = sample_representatives(&assignment, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(
            err,
            Error::Analysis(AnalysisError::InsufficientCluster {
                required: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_linkage_from_str() {
        assert_eq!("Complete".parse::<Linkage>().unwrap(), Linkage::Complete);
        assert!("ward".parse::<Linkage>().is_err());
    }
}

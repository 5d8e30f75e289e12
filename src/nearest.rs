//! Nearest-centroid search.
//!
//! Three scans share one result type:
//! - [`nearest_centroid`]: exact scan of every cluster
//! - [`nearest_centroid_from_subset`]: scan of a particle's candidate list only
//! - [`nearest_centroid_and_build_list`]: exact scan that also rebuilds the
//!   candidate list from the `k_prime` closest clusters it passes
//!
//! The loop never calls these directly. The options are resolved once per run
//! into a [`CentroidSearch`] strategy, and the loop is monomorphised over it.

use crate::buffers::{Candidate, NearestCentroid};
use crate::cluster::Cluster;
use crate::point::Point;

/// Exact nearest centroid; ties go to the lowest cluster index.
#[inline]
pub fn nearest_centroid<const D: usize>(
    position: &Point<D>,
    clusters: &[Cluster<D>],
) -> NearestCentroid {
    let mut best = NearestCentroid::UNASSIGNED;

    for (idx, cluster) in clusters.iter().enumerate() {
        let distance = position.distance_squared(&cluster.centroid);
        if distance < best.distance {
            best = NearestCentroid { idx, distance };
        }
    }

    best
}

/// Nearest centroid among the clusters of `subset`.
///
/// Matches [`nearest_centroid`] whenever the true nearest cluster is in the
/// list. Ties go to the lowest cluster index regardless of list order.
#[inline]
pub fn nearest_centroid_from_subset<const D: usize>(
    position: &Point<D>,
    clusters: &[Cluster<D>],
    subset: &[Candidate],
) -> NearestCentroid {
    let mut best = NearestCentroid::UNASSIGNED;

    for candidate in subset {
        let idx = candidate.idx as usize;
        let distance = position.distance_squared(&clusters[idx].centroid);
        if distance < best.distance || (distance == best.distance && idx < best.idx) {
            best = NearestCentroid { idx, distance };
        }
    }

    best
}

/// Exact nearest centroid, rebuilding `subset` along the way.
///
/// `subset` ends up holding the `subset.len()` closest clusters in ascending
/// order of distance, ties by index. `subset` must be non-empty and no longer
/// than `clusters`.
#[inline]
pub fn nearest_centroid_and_build_list<const D: usize>(
    position: &Point<D>,
    clusters: &[Cluster<D>],
    subset: &mut [Candidate],
) -> NearestCentroid {
    let capacity = subset.len();
    let mut filled = 0;

    for (idx, cluster) in clusters.iter().enumerate() {
        let distance = position.distance_squared(&cluster.centroid);

        if filled == capacity {
            // Clusters arrive in index order, so an equal distance loses
            if distance >= subset[capacity - 1].distance {
                continue;
            }
            filled -= 1;
        }

        let mut slot = filled;
        while slot > 0 && subset[slot - 1].distance > distance {
            subset[slot] = subset[slot - 1];
            slot -= 1;
        }
        subset[slot] = Candidate {
            idx: idx as u32,
            distance,
        };
        filled += 1;
    }

    NearestCentroid {
        idx: subset[0].idx as usize,
        distance: subset[0].distance,
    }
}

/// A nearest-centroid strategy resolved from the run's options.
///
/// `candidates` is the particle's own candidate list, empty for strategies
/// that keep none.
pub(crate) trait CentroidSearch: Sync {
    /// Search with no usable prior assignment. Always exact; builds the
    /// candidate list where the strategy keeps one.
    fn search_fresh<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        candidates: &mut [Candidate],
    ) -> NearestCentroid;

    /// Search given the particle's assignment from the previous pass
    fn search<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        previous: NearestCentroid,
        candidates: &mut [Candidate],
    ) -> NearestCentroid;
}

/// Full scan every time
pub(crate) struct ExactSearch;

impl CentroidSearch for ExactSearch {
    #[inline]
    fn search_fresh<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        _candidates: &mut [Candidate],
    ) -> NearestCentroid {
        nearest_centroid(position, clusters)
    }

    #[inline]
    fn search<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        _previous: NearestCentroid,
        _candidates: &mut [Candidate],
    ) -> NearestCentroid {
        nearest_centroid(position, clusters)
    }
}

/// Candidate-list search.
///
/// Lists are built by the fresh search. With `REBUILD`, a particle that the
/// restricted search moves to another cluster gets a full scan and a new list
/// in the same pass; without it lists stay as first built.
pub(crate) struct SubsetSearch<const REBUILD: bool>;

impl<const REBUILD: bool> CentroidSearch for SubsetSearch<REBUILD> {
    #[inline]
    fn search_fresh<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        candidates: &mut [Candidate],
    ) -> NearestCentroid {
        nearest_centroid_and_build_list(position, clusters, candidates)
    }

    #[inline]
    fn search<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        previous: NearestCentroid,
        candidates: &mut [Candidate],
    ) -> NearestCentroid {
        let nearest = nearest_centroid_from_subset(position, clusters, candidates);

        if REBUILD && nearest.idx != previous.idx {
            return nearest_centroid_and_build_list(position, clusters, candidates);
        }

        nearest
    }
}

/// Approaching-centroid shortcut around another strategy.
///
/// If the particle is no farther from its previous cluster's centroid than it
/// was at the last search, the assignment is kept without consulting `inner`.
/// This is an approximation: a different centroid may have moved closer.
/// Kept particles leave their candidate lists untouched.
pub(crate) struct ApproachingSearch<S>(pub S);

impl<S: CentroidSearch> CentroidSearch for ApproachingSearch<S> {
    #[inline]
    fn search_fresh<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        candidates: &mut [Candidate],
    ) -> NearestCentroid {
        self.0.search_fresh(position, clusters, candidates)
    }

    #[inline]
    fn search<const D: usize>(
        &self,
        position: &Point<D>,
        clusters: &[Cluster<D>],
        previous: NearestCentroid,
        candidates: &mut [Candidate],
    ) -> NearestCentroid {
        let distance = position.distance_squared(&clusters[previous.idx].centroid);
        if distance <= previous.distance {
            return NearestCentroid {
                idx: previous.idx,
                distance,
            };
        }

        self.0.search(position, clusters, previous, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clusters(centroids: &[[f32; 2]]) -> Vec<Cluster<2>> {
        centroids
            .iter()
            .map(|&c| Cluster::new(Point::new(c)))
            .collect()
    }

    #[test]
    fn test_nearest_centroid() {
        let clusters = clusters(&[[0.0, 0.0], [10.0, 10.0], [5.0, 0.0]]);

        let nearest = nearest_centroid(&Point::new([6.0, 1.0]), &clusters);
        assert_eq!(nearest.idx, 2);
        assert_relative_eq!(nearest.distance, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nearest_centroid_tie_breaks_low_index() {
        let clusters = clusters(&[[0.0, 0.0], [10.0, 10.0]]);

        // (5,5) is equidistant
        let nearest = nearest_centroid(&Point::new([5.0, 5.0]), &clusters);
        assert_eq!(nearest.idx, 0);
    }

    #[test]
    fn test_subset_search_restricted() {
        let clusters = clusters(&[[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]]);
        let subset = [
            Candidate { idx: 2, distance: 0.0 },
            Candidate { idx: 1, distance: 0.0 },
        ];

        // True nearest (0) is not in the list
        let nearest = nearest_centroid_from_subset(&Point::new([1.0, 0.0]), &clusters, &subset);
        assert_eq!(nearest.idx, 1);
        assert_relative_eq!(nearest.distance, 81.0, epsilon = 1e-4);
    }

    #[test]
    fn test_subset_search_tie_breaks_low_index() {
        let clusters = clusters(&[[0.0, 0.0], [10.0, 10.0]]);
        let subset = [
            Candidate { idx: 1, distance: 0.0 },
            Candidate { idx: 0, distance: 0.0 },
        ];

        let nearest = nearest_centroid_from_subset(&Point::new([5.0, 5.0]), &clusters, &subset);
        assert_eq!(nearest.idx, 0);
    }

    #[test]
    fn test_build_list_keeps_closest_sorted() {
        let clusters = clusters(&[[9.0, 0.0], [1.0, 0.0], [4.0, 0.0], [2.0, 0.0], [7.0, 0.0]]);
        let mut subset = [Candidate::EMPTY; 3];

        let nearest =
            nearest_centroid_and_build_list(&Point::new([0.0, 0.0]), &clusters, &mut subset);

        assert_eq!(nearest.idx, 1);
        assert_relative_eq!(nearest.distance, 1.0, epsilon = 1e-6);
        let indices: Vec<u32> = subset.iter().map(|c| c.idx).collect();
        assert_eq!(indices, vec![1, 3, 2]);
    }

    #[test]
    fn test_build_list_ties_keep_index_order() {
        let clusters = clusters(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, 3.0]]);
        let mut subset = [Candidate::EMPTY; 2];

        let nearest =
            nearest_centroid_and_build_list(&Point::new([0.0, 0.0]), &clusters, &mut subset);

        assert_eq!(nearest.idx, 0);
        assert_eq!(subset[0].idx, 0);
        assert_eq!(subset[1].idx, 1);
    }

    #[test]
    fn test_build_list_matches_exact_search() {
        let clusters = clusters(&[[3.0, 3.0], [-2.0, 1.0], [0.5, -4.0], [8.0, 0.0]]);
        let position = Point::new([0.0, 0.0]);
        let mut subset = [Candidate::EMPTY; 4];

        let built = nearest_centroid_and_build_list(&position, &clusters, &mut subset);
        assert_eq!(built, nearest_centroid(&position, &clusters));
    }

    #[test]
    fn test_subset_rebuild_on_move() {
        let clusters = clusters(&[[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]]);
        let position = Point::new([1.0, 0.0]);
        let previous = NearestCentroid { idx: 2, distance: 0.0 };

        let mut frozen = [
            Candidate { idx: 2, distance: 0.0 },
            Candidate { idx: 1, distance: 0.0 },
        ];
        let nearest = SubsetSearch::<false>.search(&position, &clusters, previous, &mut frozen);
        assert_eq!(nearest.idx, 1);
        assert_eq!(frozen[0].idx, 2);

        let mut rebuilt = [
            Candidate { idx: 2, distance: 0.0 },
            Candidate { idx: 1, distance: 0.0 },
        ];
        let nearest = SubsetSearch::<true>.search(&position, &clusters, previous, &mut rebuilt);
        assert_eq!(nearest.idx, 0);
        assert_eq!(rebuilt[0].idx, 0);
        assert_eq!(rebuilt[1].idx, 1);
    }

    #[test]
    fn test_approaching_keeps_previous_when_not_receding() {
        let clusters = clusters(&[[0.0, 0.0], [3.0, 0.0]]);
        let position = Point::new([2.0, 0.0]);

        // Cluster 0 sits at distance 4, no farther than last time: kept even
        // though cluster 1 is closer
        let previous = NearestCentroid { idx: 0, distance: 4.0 };
        let nearest = ApproachingSearch(ExactSearch).search(&position, &clusters, previous, &mut []);
        assert_eq!(nearest.idx, 0);
        assert_relative_eq!(nearest.distance, 4.0, epsilon = 1e-6);

        // Cluster 0 receded: full search
        let previous = NearestCentroid { idx: 0, distance: 1.0 };
        let nearest = ApproachingSearch(ExactSearch).search(&position, &clusters, previous, &mut []);
        assert_eq!(nearest.idx, 1);
    }
}

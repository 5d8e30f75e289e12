use crate::error::{KMeansError, Result};
use crate::point::Point;
use ndarray::Array2;
use std::ops::Range;

/// A cluster: its centroid plus the contiguous range of the particle array it owns.
///
/// After a completed iteration the ranges of all clusters in one array are
/// disjoint and together cover the whole particle array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster<const D: usize> {
    pub centroid: Point<D>,
    pub particle_offset: usize,
    pub particle_count: usize,
}

impl<const D: usize> Cluster<D> {
    /// A cluster at `centroid` owning no particles
    pub fn new(centroid: Point<D>) -> Self {
        Self {
            centroid,
            particle_offset: 0,
            particle_count: 0,
        }
    }

    /// A cluster at `centroid` owning every one of `particle_count` particles.
    ///
    /// This is the single initial cluster of a front-loaded run.
    pub fn front_loaded(centroid: Point<D>, particle_count: usize) -> Self {
        Self {
            centroid,
            particle_offset: 0,
            particle_count,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.particle_offset..self.particle_offset + self.particle_count
    }

    pub fn is_empty(&self) -> bool {
        self.particle_count == 0
    }

    /// The particles this cluster owns in a partitioned particle array
    pub fn particles<'a, P>(&self, particles: &'a [P]) -> &'a [P] {
        &particles[self.range()]
    }
}

impl<const D: usize> Default for Cluster<D> {
    fn default() -> Self {
        Self::new(Point::origin())
    }
}

/// Split a `2 * cluster_count` cluster array into its initial and final halves.
///
/// The initial half holds seed output for the loop to consume; the final half
/// receives the loop's result.
///
/// # Errors
///
/// Returns [`KMeansError::InsufficientCapacity`] if the array is too short.
pub fn split_clusters<const D: usize>(
    clusters: &mut [Cluster<D>],
    cluster_count: usize,
) -> Result<(&mut [Cluster<D>], &mut [Cluster<D>])> {
    if clusters.len() < 2 * cluster_count {
        return Err(KMeansError::InsufficientCapacity(format!(
            "Cluster array holds {} clusters, {} required",
            clusters.len(),
            2 * cluster_count
        )));
    }

    let (initial, rest) = clusters.split_at_mut(cluster_count);
    Ok((initial, &mut rest[..cluster_count]))
}

/// Check the partition invariant: the ranges are disjoint and together cover
/// exactly `0..particle_count`.
pub fn is_partition<const D: usize>(clusters: &[Cluster<D>], particle_count: usize) -> bool {
    let mut ranges: Vec<Range<usize>> = clusters
        .iter()
        .filter(|cluster| !cluster.is_empty())
        .map(Cluster::range)
        .collect();
    ranges.sort_unstable_by_key(|range| range.start);

    let mut expected_start = 0;
    for range in ranges {
        if range.start != expected_start {
            return false;
        }
        expected_start = range.end;
    }

    expected_start == particle_count
}

/// Collect cluster centroids into a `(n_clusters, D)` array
pub fn centroids_to_array<const D: usize>(clusters: &[Cluster<D>]) -> Array2<f32> {
    let mut centroids = Array2::zeros((clusters.len(), D));
    for (i, cluster) in clusters.iter().enumerate() {
        for axis in 0..D {
            centroids[[i, axis]] = cluster.centroid[axis];
        }
    }
    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(offset: usize, count: usize) -> Cluster<2> {
        Cluster {
            centroid: Point::origin(),
            particle_offset: offset,
            particle_count: count,
        }
    }

    #[test]
    fn test_is_partition() {
        assert!(is_partition(&[cluster(3, 2), cluster(0, 3)], 5));
        assert!(is_partition(&[cluster(0, 5), cluster(0, 0)], 5));

        // Gap
        assert!(!is_partition(&[cluster(0, 2), cluster(3, 2)], 5));
        // Overlap
        assert!(!is_partition(&[cluster(0, 3), cluster(2, 3)], 5));
        // Short
        assert!(!is_partition(&[cluster(0, 4)], 5));
    }

    #[test]
    fn test_split_clusters() {
        let mut clusters = vec![Cluster::<2>::default(); 6];
        clusters[3].particle_count = 9;

        let (initial, final_clusters) = split_clusters(&mut clusters, 3).unwrap();
        assert_eq!(initial.len(), 3);
        assert_eq!(final_clusters.len(), 3);
        assert_eq!(final_clusters[0].particle_count, 9);
    }

    #[test]
    fn test_split_clusters_capacity() {
        let mut clusters = vec![Cluster::<2>::default(); 5];
        let result = split_clusters(&mut clusters, 3);
        assert!(matches!(result, Err(KMeansError::InsufficientCapacity(_))));
    }

    #[test]
    fn test_cluster_particles_view() {
        let particles = [10, 11, 12, 13, 14];
        let c = cluster(1, 3);
        assert_eq!(c.particles(&particles), &[11, 12, 13]);
        assert_eq!(c.range(), 1..4);
    }

    #[test]
    fn test_centroids_to_array() {
        let clusters = [
            Cluster::new(Point::new([1.0f32, 2.0])),
            Cluster::new(Point::new([3.0f32, 4.0])),
        ];
        let array = centroids_to_array(&clusters);
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array[[1, 0]], 3.0);
    }
}

//! Read-only clustering quality statistics.

use crate::cluster::Cluster;
use crate::distance::{sum_distances, sum_squared_distances};
use crate::particle::ClusteredParticle;
use crate::point::Point;
use rayon::prelude::*;

/// Mean distance from each particle to its own cluster's centroid.
///
/// `particles` must be partitioned by `clusters`, as left by a k-means run.
/// Returns 0 when the clusters own no particles.
pub fn average_cluster_distance<const D: usize, P: ClusteredParticle<D>>(
    particles: &[P],
    clusters: &[Cluster<D>],
) -> f32 {
    average_over_clusters(particles, clusters, sum_distances::<D, P>)
}

/// Mean squared distance from each particle to its own cluster's centroid
pub fn average_cluster_distance_squared<const D: usize, P: ClusteredParticle<D>>(
    particles: &[P],
    clusters: &[Cluster<D>],
) -> f32 {
    average_over_clusters(particles, clusters, sum_squared_distances::<D, P>)
}

fn average_over_clusters<const D: usize, P, F>(
    particles: &[P],
    clusters: &[Cluster<D>],
    sum: F,
) -> f32
where
    P: ClusteredParticle<D>,
    F: Fn(&[P], &Point<D>) -> f64 + Sync,
{
    let (total, count) = clusters
        .par_iter()
        .map(|cluster| {
            (
                sum(cluster.particles(particles), &cluster.centroid),
                cluster.particle_count,
            )
        })
        .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    if count == 0 {
        return 0.0;
    }
    (total / count as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use approx::assert_relative_eq;

    #[test]
    fn test_average_cluster_distance() {
        let particles = [
            Particle::new([3.0f32, 4.0]),
            Particle::new([-3.0, -4.0]),
            Particle::new([10.0, 1.0]),
        ];
        let clusters = [
            Cluster {
                centroid: Point::new([0.0, 0.0]),
                particle_offset: 0,
                particle_count: 2,
            },
            Cluster {
                centroid: Point::new([10.0, 0.0]),
                particle_offset: 2,
                particle_count: 1,
            },
        ];

        assert_relative_eq!(
            average_cluster_distance(&particles, &clusters),
            11.0 / 3.0,
            epsilon = 1e-5
        );
        assert_relative_eq!(
            average_cluster_distance_squared(&particles, &clusters),
            51.0 / 3.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_average_cluster_distance_empty() {
        let particles: [Particle<2>; 0] = [];
        let clusters = [Cluster::<2>::default()];
        assert_eq!(average_cluster_distance(&particles, &clusters), 0.0);
    }
}

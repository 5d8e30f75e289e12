use crate::cluster::Cluster;
use crate::config::KMeansOptions;
use crate::error::{KMeansError, Result};
use crate::particle::ClusteredParticle;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Choose initial centroids with k-means++.
///
/// The first centroid is a uniformly random particle; each following one is
/// drawn with probability proportional to its squared distance to the nearest
/// centroid chosen so far. Particles already sitting on a centroid have zero
/// weight, so a position is only picked twice once every remaining particle
/// coincides with a centroid.
///
/// `clusters` must hold `2 * cluster_count` entries. The first half receives
/// the seeds with empty ranges; the second half, reserved for the loop's
/// output, is reset to empty clusters at the origin.
///
/// # Arguments
///
/// * `particles` - At least `options.particle_count` particles
/// * `clusters` - Cluster array of at least `2 * options.cluster_count`
/// * `options` - Particle and cluster counts
/// * `seed` - Explicit seed for reproducible seeding; `None` draws one
///
/// # Returns
///
/// The seed that was used, so that a run can be repeated.
pub fn kpp<const D: usize, P: ClusteredParticle<D>>(
    particles: &[P],
    clusters: &mut [Cluster<D>],
    options: &KMeansOptions,
    seed: Option<u64>,
) -> Result<u64> {
    let mut min_distances = vec![0.0; particles.len().min(options.particle_count)];
    kpp_with_scratch(particles, clusters, options, seed, &mut min_distances)
}

/// [`kpp`] with caller-provided scratch of at least `particle_count` entries
pub(crate) fn kpp_with_scratch<const D: usize, P: ClusteredParticle<D>>(
    particles: &[P],
    clusters: &mut [Cluster<D>],
    options: &KMeansOptions,
    seed: Option<u64>,
    min_distances: &mut [f32],
) -> Result<u64> {
    options.validate()?;

    let n = options.particle_count;
    let k = options.cluster_count;

    if particles.len() < n {
        return Err(KMeansError::InsufficientCapacity(format!(
            "Particle array holds {} particles, {} required",
            particles.len(),
            n
        )));
    }

    if clusters.len() < 2 * k {
        return Err(KMeansError::InsufficientCapacity(format!(
            "Cluster array holds {} clusters, {} required",
            clusters.len(),
            2 * k
        )));
    }

    if min_distances.len() < n {
        return Err(KMeansError::InsufficientCapacity(format!(
            "Seeding scratch holds {} distances, {} required",
            min_distances.len(),
            n
        )));
    }

    let particles = &particles[..n];
    let min_distances = &mut min_distances[..n];
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    debug!("k-means++: {} particles, {} clusters, seed {}", n, k, seed);

    let first = rng.gen_range(0..n);
    clusters[0] = Cluster::new(*particles[first].position());

    // Squared distance of each particle to its nearest chosen centroid
    for (particle, min_distance) in particles.iter().zip(min_distances.iter_mut()) {
        *min_distance = particle.position().distance_squared(&clusters[0].centroid);
    }

    for cluster_idx in 1..k {
        let total: f64 = min_distances.iter().map(|&d| d as f64).sum();

        let chosen = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            weighted_pick(min_distances, threshold)
        } else {
            // Every particle already lies on a centroid
            rng.gen_range(0..n)
        };

        let centroid = *particles[chosen].position();
        clusters[cluster_idx] = Cluster::new(centroid);

        for (particle, min_distance) in particles.iter().zip(min_distances.iter_mut()) {
            let d = particle.position().distance_squared(&centroid);
            if d < *min_distance {
                *min_distance = d;
            }
        }
    }

    for cluster in &mut clusters[k..2 * k] {
        *cluster = Cluster::default();
    }

    Ok(seed)
}

/// Index at which the running sum of `weights` reaches `threshold`, skipping
/// zero weights. `weights` must contain a positive entry.
fn weighted_pick(weights: &[f32], threshold: f64) -> usize {
    let mut cumulative = 0.0f64;
    let mut last_positive = 0;

    for (i, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        last_positive = i;
        cumulative += weight as f64;
        if cumulative >= threshold {
            return i;
        }
    }

    // Rounding left the threshold just past the total
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::point::Point;

    fn grid(n: usize) -> Vec<Particle<2>> {
        (0..n)
            .map(|i| Particle::new([(i % 10) as f32, (i / 10) as f32]))
            .collect()
    }

    #[test]
    fn test_kpp_fills_initial_half() {
        let particles = grid(100);
        let options = KMeansOptions::new(100, 5);
        let mut clusters = vec![Cluster::new(Point::new([9.0, 9.0])); 10];

        kpp(&particles, &mut clusters, &options, Some(42)).unwrap();

        for cluster in &clusters[..5] {
            assert!(particles.iter().any(|p| p.position == cluster.centroid));
            assert_eq!(cluster.particle_count, 0);
        }
        for cluster in &clusters[5..] {
            assert_eq!(*cluster, Cluster::default());
        }
    }

    #[test]
    fn test_kpp_reproducible_with_seed() {
        let particles = grid(100);
        let options = KMeansOptions::new(100, 8);
        let mut first = vec![Cluster::default(); 16];
        let mut second = vec![Cluster::default(); 16];

        kpp(&particles, &mut first, &options, Some(7)).unwrap();
        kpp(&particles, &mut second, &options, Some(7)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_kpp_returns_drawn_seed() {
        let particles = grid(50);
        let options = KMeansOptions::new(50, 4);
        let mut first = vec![Cluster::default(); 8];
        let mut second = vec![Cluster::default(); 8];

        let seed = kpp(&particles, &mut first, &options, None).unwrap();
        kpp(&particles, &mut second, &options, Some(seed)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_kpp_no_duplicate_centroids() {
        // Only 4 distinct positions among 40 particles
        let particles: Vec<Particle<2>> = (0..40)
            .map(|i| Particle::new([(i % 4) as f32 * 10.0, 0.0]))
            .collect();
        let options = KMeansOptions::new(40, 4);
        let mut clusters = vec![Cluster::default(); 8];

        kpp(&particles, &mut clusters, &options, Some(3)).unwrap();

        for a in 0..4 {
            for b in (a + 1)..4 {
                assert_ne!(clusters[a].centroid, clusters[b].centroid);
            }
        }
    }

    #[test]
    fn test_kpp_all_particles_identical() {
        let particles = vec![Particle::new([1.0f32, 1.0]); 6];
        let options = KMeansOptions::new(6, 3);
        let mut clusters = vec![Cluster::default(); 6];

        kpp(&particles, &mut clusters, &options, Some(1)).unwrap();

        for cluster in &clusters[..3] {
            assert_eq!(cluster.centroid, Point::new([1.0, 1.0]));
        }
    }

    #[test]
    fn test_kpp_capacity_errors() {
        let particles = grid(10);
        let options = KMeansOptions::new(10, 3);

        let mut short_clusters = vec![Cluster::default(); 5];
        assert!(matches!(
            kpp(&particles, &mut short_clusters, &options, Some(1)),
            Err(KMeansError::InsufficientCapacity(_))
        ));

        let mut clusters = vec![Cluster::default(); 6];
        assert!(matches!(
            kpp(&particles[..9], &mut clusters, &options, Some(1)),
            Err(KMeansError::InsufficientCapacity(_))
        ));
    }

    #[test]
    fn test_kpp_with_scratch_matches_kpp() {
        let particles = grid(60);
        let options = KMeansOptions::new(60, 5);
        let mut allocated = vec![Cluster::default(); 10];
        let mut reused = vec![Cluster::default(); 10];
        let mut scratch = vec![f32::NAN; 60];

        kpp(&particles, &mut allocated, &options, Some(5)).unwrap();
        kpp_with_scratch(&particles, &mut reused, &options, Some(5), &mut scratch).unwrap();
        assert_eq!(allocated, reused);

        let mut short = vec![0.0; 59];
        assert!(matches!(
            kpp_with_scratch(&particles, &mut reused, &options, Some(5), &mut short),
            Err(KMeansError::InsufficientCapacity(_))
        ));
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let weights = [0.0f32, 1.0, 0.0, 3.0];
        assert_eq!(weighted_pick(&weights, 0.0), 1);
        assert_eq!(weighted_pick(&weights, 1.0), 1);
        assert_eq!(weighted_pick(&weights, 1.5), 3);
        assert_eq!(weighted_pick(&weights, 10.0), 3);
    }
}

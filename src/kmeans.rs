use crate::algorithm::{k_means, KMeansReport};
use crate::buffers::KMeansBuffers;
use crate::cluster::{centroids_to_array, split_clusters, Cluster};
use crate::config::KMeansOptions;
use crate::error::{KMeansError, Result};
use crate::kpp::kpp_with_scratch;
use crate::nearest::nearest_centroid;
use crate::particle::ClusteredParticle;
use crate::point::Point;
use log::info;
use ndarray::Array2;

/// Reusable k-means clusterer for particle sets.
///
/// Owns the options, the scratch buffers (seeding distances included) and the
/// `2 * cluster_count` cluster array, all allocated once. Neither
/// [`cluster`](Self::cluster) nor [`recluster`](Self::recluster) allocates.
///
/// # Example
///
/// ```
/// use particle_kmeans::{Particle, ParticleClusterer};
///
/// let mut particles: Vec<Particle<2>> = (0..100)
///     .map(|i| Particle::new([(i % 10) as f32, (i / 10) as f32]))
///     .collect();
///
/// let mut clusterer = ParticleClusterer::<2>::new(100, 4).unwrap();
/// clusterer.cluster(&mut particles).unwrap();
///
/// let clusters = clusterer.clusters().unwrap();
/// let total: usize = clusters.iter().map(|c| c.particle_count).sum();
/// assert_eq!(total, 100);
/// ```
pub struct ParticleClusterer<const D: usize> {
    /// Run configuration
    options: KMeansOptions,

    buffers: KMeansBuffers,

    /// Initial half followed by final half
    clusters: Vec<Cluster<D>>,

    /// Seed used by the last k-means++ initialisation
    last_seed: Option<u64>,

    last_report: Option<KMeansReport>,
}

impl<const D: usize> ParticleClusterer<D> {
    /// Create a clusterer with default options for the given counts.
    ///
    /// # Errors
    ///
    /// Returns an error if `cluster_count` is 0 or exceeds `particle_count`.
    pub fn new(particle_count: usize, cluster_count: usize) -> Result<Self> {
        Self::with_options(KMeansOptions::new(particle_count, cluster_count))
    }

    /// Create a clusterer with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid; nothing is allocated then.
    pub fn with_options(options: KMeansOptions) -> Result<Self> {
        let buffers = KMeansBuffers::new(&options)?;
        let clusters = vec![Cluster::default(); 2 * options.cluster_count];

        Ok(Self {
            options,
            buffers,
            clusters,
            last_seed: None,
            last_report: None,
        })
    }

    /// Seed with k-means++ and cluster `particles`.
    ///
    /// The first `particle_count` particles are reordered so every cluster
    /// owns a contiguous range. With `front_loaded` set, every particle
    /// starts in the first seeded cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if `particles` holds fewer than `particle_count` particles.
    pub fn cluster<P: ClusteredParticle<D>>(&mut self, particles: &mut [P]) -> Result<KMeansReport> {
        let seed = kpp_with_scratch(
            particles,
            &mut self.clusters,
            &self.options,
            self.options.seed,
            &mut self.buffers.seeding_distances,
        )?;
        self.last_seed = Some(seed);

        let k = self.options.cluster_count;
        let (initial, final_clusters) = split_clusters(&mut self.clusters, k)?;

        if self.options.front_loaded {
            initial[0] = Cluster::front_loaded(initial[0].centroid, self.options.particle_count);
        }

        let report = k_means(particles, initial, final_clusters, &mut self.buffers, &self.options)?;
        self.log_report(&report);
        self.last_report = Some(report);
        Ok(report)
    }

    /// Cluster again, starting from the centroids of the previous run.
    ///
    /// Meant for particles that moved a little since the last call, such as
    /// one simulation step later. Falls back to [`cluster`](Self::cluster)
    /// when there is no previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if `particles` holds fewer than `particle_count` particles.
    pub fn recluster<P: ClusteredParticle<D>>(
        &mut self,
        particles: &mut [P],
    ) -> Result<KMeansReport> {
        if self.last_report.is_none() {
            return self.cluster(particles);
        }

        let k = self.options.cluster_count;
        let (initial, final_clusters) = split_clusters(&mut self.clusters, k)?;
        initial.copy_from_slice(final_clusters);

        // Previous centroids are good seeds; front-loading would discard them
        let options = KMeansOptions {
            front_loaded: false,
            ..self.options.clone()
        };

        let report = k_means(particles, initial, final_clusters, &mut self.buffers, &options)?;
        self.log_report(&report);
        self.last_report = Some(report);
        Ok(report)
    }

    /// Index of the final cluster whose centroid is nearest to `position`.
    ///
    /// # Errors
    ///
    /// Returns [`KMeansError::NotFitted`] before the first run.
    pub fn predict(&self, position: &Point<D>) -> Result<usize> {
        let clusters = self.clusters().ok_or(KMeansError::NotFitted)?;
        Ok(nearest_centroid(position, clusters).idx)
    }

    /// Final clusters of the last run, or `None` before the first run
    pub fn clusters(&self) -> Option<&[Cluster<D>]> {
        if self.last_report.is_none() {
            return None;
        }
        let k = self.options.cluster_count;
        Some(&self.clusters[k..2 * k])
    }

    /// Final centroids as a `(cluster_count, D)` array
    pub fn centroids(&self) -> Option<Array2<f32>> {
        self.clusters().map(centroids_to_array)
    }

    /// Report of the last run
    pub fn last_report(&self) -> Option<&KMeansReport> {
        self.last_report.as_ref()
    }

    /// Seed used by the last k-means++ initialisation
    pub fn last_seed(&self) -> Option<u64> {
        self.last_seed
    }

    /// Scratch buffers, holding the assignment records of the last run
    pub fn buffers(&self) -> &KMeansBuffers {
        &self.buffers
    }

    pub fn options(&self) -> &KMeansOptions {
        &self.options
    }

    pub fn particle_count(&self) -> usize {
        self.options.particle_count
    }

    pub fn cluster_count(&self) -> usize {
        self.options.cluster_count
    }

    fn log_report(&self, report: &KMeansReport) {
        if self.options.verbose {
            info!(
                "Clustered {} particles into {} clusters: {:?} after {} iterations",
                self.options.particle_count,
                self.options.cluster_count,
                report.termination,
                report.iterations
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::is_partition;
    use crate::particle::Particle;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn random_particles(n: usize) -> Vec<Particle<3>> {
        let data = Array2::random((n, 3), Uniform::new(-1.0f32, 1.0));
        crate::particle::particles_from_array::<3>(&data.view()).unwrap()
    }

    #[test]
    fn test_clusterer_new() {
        let clusterer = ParticleClusterer::<3>::new(100, 10).unwrap();
        assert_eq!(clusterer.cluster_count(), 10);
        assert_eq!(clusterer.particle_count(), 100);
        assert!(clusterer.clusters().is_none());
        assert!(clusterer.centroids().is_none());
        assert!(clusterer.last_seed().is_none());
    }

    #[test]
    fn test_clusterer_invalid_options() {
        assert!(matches!(
            ParticleClusterer::<3>::new(100, 0),
            Err(KMeansError::InvalidClusterCount(_))
        ));
        assert!(matches!(
            ParticleClusterer::<3>::new(5, 10),
            Err(KMeansError::InsufficientParticles(_))
        ));
    }

    #[test]
    fn test_clusterer_cluster() {
        let mut particles = random_particles(500);
        let mut clusterer = ParticleClusterer::<3>::new(500, 8).unwrap();

        let report = clusterer.cluster(&mut particles).unwrap();

        assert!(report.iterations <= clusterer.options().max_iterations);
        assert!(clusterer.last_seed().is_some());
        assert!(is_partition(clusterer.clusters().unwrap(), 500));

        let centroids = clusterer.centroids().unwrap();
        assert_eq!(centroids.nrows(), 8);
        assert_eq!(centroids.ncols(), 3);
    }

    #[test]
    fn test_clusterer_recluster_after_motion() {
        let mut particles = random_particles(400);
        let options = KMeansOptions::new(400, 6).with_seed(3);
        let mut clusterer = ParticleClusterer::<3>::with_options(options).unwrap();
        clusterer.cluster(&mut particles).unwrap();

        // Small drift, as after a simulation step
        for particle in particles.iter_mut() {
            particle.position[0] += 0.01;
        }

        let report = clusterer.recluster(&mut particles).unwrap();
        assert!(report.iterations >= 1);
        assert!(is_partition(clusterer.clusters().unwrap(), 400));
    }

    #[test]
    fn test_clusterer_recluster_without_previous_run() {
        let mut particles = random_particles(50);
        let mut clusterer = ParticleClusterer::<3>::new(50, 3).unwrap();

        clusterer.recluster(&mut particles).unwrap();
        assert!(clusterer.clusters().is_some());
        assert!(clusterer.last_seed().is_some());
    }

    #[test]
    fn test_clusterer_front_loaded() {
        let mut particles = random_particles(300);
        let options = KMeansOptions::new(300, 5)
            .with_front_loaded(true)
            .with_seed(11);
        let mut clusterer = ParticleClusterer::<3>::with_options(options).unwrap();

        clusterer.cluster(&mut particles).unwrap();
        assert!(is_partition(clusterer.clusters().unwrap(), 300));
    }

    #[test]
    fn test_clusterer_predict() {
        let mut particles = random_particles(200);
        let mut clusterer = ParticleClusterer::<3>::new(200, 4).unwrap();

        assert!(matches!(
            clusterer.predict(&Point::origin()),
            Err(KMeansError::NotFitted)
        ));

        clusterer.cluster(&mut particles).unwrap();
        let clusters = clusterer.clusters().unwrap().to_vec();
        for (idx, cluster) in clusters.iter().enumerate() {
            assert_eq!(clusterer.predict(&cluster.centroid).unwrap(), idx);
        }
    }

    #[test]
    fn test_clusterer_seeding_matches_kpp() {
        let mut particles = random_particles(120);
        let options = KMeansOptions::new(120, 5).with_seed(17).with_max_iterations(0);
        let mut clusterer = ParticleClusterer::<3>::with_options(options.clone()).unwrap();

        let mut expected = vec![Cluster::default(); 10];
        crate::kpp::kpp(&particles, &mut expected, &options, Some(17)).unwrap();

        clusterer.cluster(&mut particles).unwrap();
        assert_eq!(clusterer.last_seed(), Some(17));
        assert_eq!(clusterer.buffers().seeding_distances.len(), 120);
        assert_eq!(&clusterer.clusters[..5], &expected[..5]);
    }

    #[test]
    fn test_clusterer_too_few_particles() {
        let mut particles = random_particles(40);
        let mut clusterer = ParticleClusterer::<3>::new(50, 4).unwrap();

        let result = clusterer.cluster(&mut particles);
        assert!(matches!(result, Err(KMeansError::InsufficientCapacity(_))));
    }
}

use crate::error::{KMeansError, Result};

/// What happens to a cluster that loses all of its particles during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Keep the centroid where it is until particles return to it
    #[default]
    Freeze,

    /// Move the centroid onto the particle lying farthest from its own
    /// centroid, and force at least one more iteration
    ReseedFarthest,
}

/// Configuration of the candidate subset optimisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentroidSubsetOptions {
    /// Number of nearest-known clusters remembered per particle
    pub k_prime: usize,

    /// Rebuild a particle's candidate list with a full scan whenever the
    /// restricted search moves it to another cluster. When false, lists are
    /// built once at the start of a run and then frozen.
    pub do_rebuild: bool,
}

impl Default for CentroidSubsetOptions {
    fn default() -> Self {
        Self {
            k_prime: 30,
            do_rebuild: true,
        }
    }
}

/// Configuration for a k-means clustering run
///
/// Immutable for the duration of a run; buffers are sized from it.
#[derive(Debug, Clone)]
pub struct KMeansOptions {
    /// Number of particles clustered per run
    pub particle_count: usize,

    /// Number of clusters
    pub cluster_count: usize,

    /// Maximum number of assignment/update iterations
    pub max_iterations: usize,

    /// The run converges once an iteration moves at most this many particles
    pub acceptable_changes_per_iteration: usize,

    /// Skip the seed-based initial assignment; the caller places every
    /// particle in a single initial cluster's range instead.
    pub front_loaded: bool,

    /// Re-test only the previous centroid first and keep the assignment if
    /// the particle did not get farther from it. Approximate.
    pub approaching_centroid_optimisation: bool,

    /// Restrict per-particle searches to a candidate list of nearby clusters.
    /// Approximate.
    pub centroid_subset_optimisation: bool,

    pub centroid_subset: CentroidSubsetOptions,

    pub empty_cluster_policy: EmptyClusterPolicy,

    /// Seed for k-means++ initialisation; `None` draws one from entropy
    pub seed: Option<u64>,

    /// Log per-iteration progress at info level instead of debug
    pub verbose: bool,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            particle_count: 1000,
            cluster_count: 10,
            max_iterations: 100,
            acceptable_changes_per_iteration: 0,
            front_loaded: false,
            approaching_centroid_optimisation: true,
            centroid_subset_optimisation: false,
            centroid_subset: CentroidSubsetOptions::default(),
            empty_cluster_policy: EmptyClusterPolicy::Freeze,
            seed: None,
            verbose: false,
        }
    }
}

impl KMeansOptions {
    /// Create a new configuration for the given particle and cluster counts
    pub fn new(particle_count: usize, cluster_count: usize) -> Self {
        Self {
            particle_count,
            cluster_count,
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set how many particle moves an iteration may make and still converge
    pub fn with_acceptable_changes(mut self, changes: usize) -> Self {
        self.acceptable_changes_per_iteration = changes;
        self
    }

    /// Set front-loaded initialisation
    pub fn with_front_loaded(mut self, front_loaded: bool) -> Self {
        self.front_loaded = front_loaded;
        self
    }

    /// Enable or disable the approaching-centroid shortcut
    pub fn with_approaching_centroid(mut self, enabled: bool) -> Self {
        self.approaching_centroid_optimisation = enabled;
        self
    }

    /// Enable the candidate subset optimisation with `k_prime` candidates
    pub fn with_centroid_subset(mut self, k_prime: usize, do_rebuild: bool) -> Self {
        self.centroid_subset_optimisation = true;
        self.centroid_subset = CentroidSubsetOptions {
            k_prime,
            do_rebuild,
        };
        self
    }

    /// Set the empty cluster policy
    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster_policy = policy;
        self
    }

    /// Set the random seed used by k-means++
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set verbose mode
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check the invariants every run relies on.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `cluster_count` is 0
    /// - `particle_count` is less than `cluster_count`
    /// - the subset optimisation is enabled and `centroid_subset.k_prime`
    ///   exceeds `cluster_count`
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 {
            return Err(KMeansError::InvalidClusterCount(
                "cluster_count must be greater than 0".to_string(),
            ));
        }

        if self.particle_count < self.cluster_count {
            return Err(KMeansError::InsufficientParticles(format!(
                "Number of particles ({}) is less than cluster_count ({})",
                self.particle_count, self.cluster_count
            )));
        }

        if self.centroid_subset_optimisation && self.centroid_subset.k_prime > self.cluster_count
        {
            return Err(KMeansError::InvalidKPrime(format!(
                "k_prime ({}) is greater than cluster_count ({})",
                self.centroid_subset.k_prime, self.cluster_count
            )));
        }

        Ok(())
    }

    /// Candidate list length per particle, or 0 when no lists are kept.
    ///
    /// A zero `k_prime` leaves nothing to restrict the search to, so the
    /// subset optimisation degrades to exact search.
    pub(crate) fn candidate_list_len(&self) -> usize {
        if self.centroid_subset_optimisation {
            self.centroid_subset.k_prime
        } else {
            0
        }
    }
}

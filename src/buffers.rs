use crate::config::KMeansOptions;
use crate::error::{KMeansError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Assignment record of one particle: its nearest cluster as of the last search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestCentroid {
    pub idx: usize,
    pub distance: f32,
}

impl NearestCentroid {
    pub(crate) const UNASSIGNED: Self = Self {
        idx: 0,
        distance: f32::INFINITY,
    };
}

/// One entry of a particle's candidate list.
///
/// `distance` is the squared distance measured when the list was last built;
/// it orders the list and is not kept current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub idx: u32,
    pub distance: f32,
}

impl Candidate {
    pub(crate) const EMPTY: Self = Self {
        idx: 0,
        distance: f32::INFINITY,
    };
}

/// Per-cluster flags, set when a particle joins or leaves the cluster during
/// the current iteration
#[derive(Debug)]
pub(crate) struct ModifiedFlags(Vec<AtomicBool>);

impl ModifiedFlags {
    fn new(cluster_count: usize) -> Self {
        Self((0..cluster_count).map(|_| AtomicBool::new(false)).collect())
    }

    pub(crate) fn reset(&self) {
        for flag in &self.0 {
            flag.store(false, Ordering::Relaxed);
        }
    }

    /// Flags only ever go from false to true within an iteration, so
    /// concurrent setters need no stronger ordering.
    #[inline]
    pub(crate) fn mark(&self, cluster_idx: usize) {
        self.0[cluster_idx].store(true, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn is_modified(&self, cluster_idx: usize) -> bool {
        self.0[cluster_idx].load(Ordering::Relaxed)
    }

    pub(crate) fn count(&self, cluster_count: usize) -> usize {
        self.0[..cluster_count]
            .iter()
            .filter(|flag| flag.load(Ordering::Relaxed))
            .count()
    }
}

/// Scratch memory for k-means runs.
///
/// Sized once from [`KMeansOptions`] and reused by every run with matching
/// options; the loop only overwrites it. Memory is released when the value is
/// dropped, on every exit path.
#[derive(Debug)]
pub struct KMeansBuffers {
    /// Per-particle assignment records, indexed by particle position
    pub(crate) particle_nearest_centroid: Vec<NearestCentroid>,

    pub(crate) cluster_modified_in_iteration: ModifiedFlags,

    /// `k_prime` candidates per particle, flattened; empty when the subset
    /// optimisation is off
    pub(crate) nearest_centroid_lists: Vec<Candidate>,

    pub(crate) k_prime: usize,

    /// Particles whose next search must be a full scan that rebuilds their
    /// candidate list, indexed by particle position
    pub(crate) needs_fresh_search: Vec<bool>,

    /// Squared distance of each particle to its nearest seed during k-means++
    pub(crate) seeding_distances: Vec<f32>,

    /// Per-cluster write cursors for the in-place partition
    pub(crate) partition_cursors: Vec<usize>,
}

impl KMeansBuffers {
    /// Allocate buffers for runs with `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid; nothing is allocated then.
    pub fn new(options: &KMeansOptions) -> Result<Self> {
        options.validate()?;

        let particle_count = options.particle_count;
        let cluster_count = options.cluster_count;
        let k_prime = options.candidate_list_len();

        Ok(Self {
            particle_nearest_centroid: vec![NearestCentroid::UNASSIGNED; particle_count],
            cluster_modified_in_iteration: ModifiedFlags::new(cluster_count),
            nearest_centroid_lists: vec![Candidate::EMPTY; particle_count * k_prime],
            k_prime,
            needs_fresh_search: vec![false; particle_count],
            seeding_distances: vec![0.0; particle_count],
            partition_cursors: vec![0; cluster_count],
        })
    }

    /// Check that these buffers can serve a run with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`KMeansError::InsufficientCapacity`] if the buffers hold fewer
    /// particles or clusters than required, or were built for another `k_prime`.
    pub fn check_capacity(&self, options: &KMeansOptions) -> Result<()> {
        if self.particle_nearest_centroid.len() < options.particle_count {
            return Err(KMeansError::InsufficientCapacity(format!(
                "Buffers hold {} particles, {} required",
                self.particle_nearest_centroid.len(),
                options.particle_count
            )));
        }

        if self.partition_cursors.len() < options.cluster_count {
            return Err(KMeansError::InsufficientCapacity(format!(
                "Buffers hold {} clusters, {} required",
                self.partition_cursors.len(),
                options.cluster_count
            )));
        }

        if self.k_prime != options.candidate_list_len() {
            return Err(KMeansError::InsufficientCapacity(format!(
                "Buffers hold candidate lists of {}, {} required",
                self.k_prime,
                options.candidate_list_len()
            )));
        }

        Ok(())
    }

    /// Assignment records of the last run, in current particle order
    pub fn nearest_centroids(&self) -> &[NearestCentroid] {
        &self.particle_nearest_centroid
    }

    /// Candidate list of the particle at `position`; empty when the subset
    /// optimisation is off
    pub fn candidate_list(&self, position: usize) -> &[Candidate] {
        let start = position * self.k_prime;
        &self.nearest_centroid_lists[start..start + self.k_prime]
    }

    pub fn k_prime(&self) -> usize {
        self.k_prime
    }

    /// Swap the per-particle state of positions `a` and `b`
    #[inline]
    pub(crate) fn swap_particle_state(&mut self, a: usize, b: usize) {
        self.particle_nearest_centroid.swap(a, b);
        self.needs_fresh_search.swap(a, b);
        for slot in 0..self.k_prime {
            self.nearest_centroid_lists
                .swap(a * self.k_prime + slot, b * self.k_prime + slot);
        }
    }
}

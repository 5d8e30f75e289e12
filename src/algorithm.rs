use crate::buffers::{Candidate, KMeansBuffers, NearestCentroid};
use crate::cluster::Cluster;
use crate::config::{EmptyClusterPolicy, KMeansOptions};
use crate::distance::mean_position;
use crate::error::{KMeansError, Result};
use crate::nearest::{ApproachingSearch, CentroidSearch, ExactSearch, SubsetSearch};
use crate::particle::ClusteredParticle;
use log::{debug, log, Level};
use rayon::prelude::*;
use std::time::Instant;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// An iteration moved no more particles than the configured tolerance
    Converged,

    /// The iteration cap was hit first; the clusters are usable but not
    /// necessarily locally optimal
    MaxIterationsReached,
}

/// Summary of a k-means run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansReport {
    /// Assignment/update iterations performed after the initial assignment
    pub iterations: usize,

    /// Particles that changed cluster in the last iteration
    pub changes_in_last_iteration: usize,

    /// Whether the run converged or stopped at `max_iterations`
    pub termination: Termination,

    /// Empty clusters moved onto a new particle over the whole run
    pub reseeded_clusters: usize,
}

impl KMeansReport {
    /// True when the run stopped because an iteration moved few enough particles
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Run k-means over `particles`, starting from `initial_clusters`.
///
/// The first `options.cluster_count` initial clusters supply the starting
/// centroids (typically from [`kpp`](crate::kpp())); in front-loaded mode
/// one of them must also own the whole particle range. The result is written
/// to the first `cluster_count` entries of `final_clusters`, and the first
/// `particle_count` particles are reordered so that each final cluster owns a
/// contiguous range. Each particle's back-reference ends up equal to its index.
///
/// No memory is allocated between iterations; all per-iteration state lives in
/// `buffers`.
///
/// # Errors
///
/// Returns an error if:
/// - The options are invalid
/// - `particles`, either cluster slice, or `buffers` is too small for `options`
/// - A front-loaded run has no initial cluster covering every particle
pub fn k_means<const D: usize, P: ClusteredParticle<D>>(
    particles: &mut [P],
    initial_clusters: &[Cluster<D>],
    final_clusters: &mut [Cluster<D>],
    buffers: &mut KMeansBuffers,
    options: &KMeansOptions,
) -> Result<KMeansReport> {
    options.validate()?;
    buffers.check_capacity(options)?;

    let n = options.particle_count;
    let k = options.cluster_count;

    if particles.len() < n {
        return Err(KMeansError::InsufficientCapacity(format!(
            "Particle array holds {} particles, {} required",
            particles.len(),
            n
        )));
    }

    if initial_clusters.len() < k || final_clusters.len() < k {
        return Err(KMeansError::InsufficientCapacity(format!(
            "Cluster arrays hold {} initial and {} final clusters, {} each required",
            initial_clusters.len(),
            final_clusters.len(),
            k
        )));
    }

    let run = Run {
        particles: &mut particles[..n],
        initial: &initial_clusters[..k],
        clusters: &mut final_clusters[..k],
        buffers,
        options,
    };

    // Resolve the optimisations once so the hot loop never branches on them
    let approaching = options.approaching_centroid_optimisation;
    let subset = options.candidate_list_len() > 0;
    let rebuild = options.centroid_subset.do_rebuild;

    match (approaching, subset, rebuild) {
        (false, false, _) => run.execute(&ExactSearch),
        (false, true, true) => run.execute(&SubsetSearch::<true>),
        (false, true, false) => run.execute(&SubsetSearch::<false>),
        (true, false, _) => run.execute(&ApproachingSearch(ExactSearch)),
        (true, true, true) => run.execute(&ApproachingSearch(SubsetSearch::<true>)),
        (true, true, false) => run.execute(&ApproachingSearch(SubsetSearch::<false>)),
    }
}

/// Exclusive borrows of everything one run touches
struct Run<'a, const D: usize, P> {
    particles: &'a mut [P],
    initial: &'a [Cluster<D>],
    clusters: &'a mut [Cluster<D>],
    buffers: &'a mut KMeansBuffers,
    options: &'a KMeansOptions,
}

impl<const D: usize, P: ClusteredParticle<D>> Run<'_, D, P> {
    fn execute<S: CentroidSearch>(mut self, search: &S) -> Result<KMeansReport> {
        let n = self.particles.len();
        let k = self.clusters.len();
        let level = if self.options.verbose {
            Level::Info
        } else {
            Level::Debug
        };

        for (cluster, seed) in self.clusters.iter_mut().zip(self.initial) {
            *cluster = Cluster::new(seed.centroid);
        }

        // The first real pass must search from scratch when front-loaded
        let mut fresh_pass_pending = if self.options.front_loaded {
            self.front_load()?;
            true
        } else {
            self.assignment_pass(search, true);
            false
        };

        self.partition();
        self.update_centroids(true);
        let mut reseeded_clusters = self.handle_empty_clusters();

        debug!(
            "k-means: {} particles, {} clusters, front_loaded = {}",
            n, k, self.options.front_loaded
        );

        let mut iterations = 0;
        let mut changes = 0;
        let mut termination = Termination::MaxIterationsReached;

        for iteration in 0..self.options.max_iterations {
            let iter_start = Instant::now();
            iterations = iteration + 1;

            self.buffers.cluster_modified_in_iteration.reset();
            changes = self.assignment_pass(search, fresh_pass_pending);
            fresh_pass_pending = false;

            self.partition();
            let shift = self.update_centroids(false);
            let reseeded = self.handle_empty_clusters();
            reseeded_clusters += reseeded;

            log!(
                level,
                "  Iteration {}/{}: changes = {}, modified clusters = {}, shift = {:.6}, time = {:.4}s",
                iterations,
                self.options.max_iterations,
                changes,
                self.buffers.cluster_modified_in_iteration.count(k),
                shift,
                iter_start.elapsed().as_secs_f64()
            );

            if changes <= self.options.acceptable_changes_per_iteration && reseeded == 0 {
                termination = Termination::Converged;
                break;
            }
        }

        match termination {
            Termination::Converged => log!(
                level,
                "  Converged after {} iterations ({} changes <= {})",
                iterations,
                changes,
                self.options.acceptable_changes_per_iteration
            ),
            Termination::MaxIterationsReached => log!(
                level,
                "  Stopped at max_iterations = {} with {} changes in the last iteration",
                self.options.max_iterations,
                changes
            ),
        }

        debug_assert!(crate::cluster::is_partition(self.clusters, n));

        Ok(KMeansReport {
            iterations,
            changes_in_last_iteration: changes,
            termination,
            reseeded_clusters,
        })
    }

    /// Record every particle as belonging to the initial cluster that owns
    /// the whole range, without searching.
    fn front_load(&mut self) -> Result<()> {
        let n = self.particles.len();
        let front = self
            .initial
            .iter()
            .position(|cluster| cluster.particle_offset == 0 && cluster.particle_count == n)
            .ok_or(KMeansError::FrontLoadedClusterMissing(n))?;
        let centroid = self.initial[front].centroid;

        for (particle, record) in self
            .particles
            .iter()
            .zip(self.buffers.particle_nearest_centroid.iter_mut())
        {
            *record = NearestCentroid {
                idx: front,
                distance: particle.position().distance_squared(&centroid),
            };
        }

        Ok(())
    }

    /// Find every particle's nearest centroid and update its record.
    ///
    /// Runs in parallel; each particle writes only its own record, flag and
    /// candidate list. Particles flagged by a reseed get a full scan even
    /// when `fresh` is false. Returns the number of particles that changed
    /// cluster.
    fn assignment_pass<S: CentroidSearch>(&mut self, search: &S, fresh: bool) -> usize {
        let n = self.particles.len();
        let k_prime = self.buffers.k_prime;
        let clusters: &[Cluster<D>] = self.clusters;
        let flags = &self.buffers.cluster_modified_in_iteration;
        let records = &mut self.buffers.particle_nearest_centroid[..n];
        let pending = &mut self.buffers.needs_fresh_search[..n];

        let assign = |particle: &P,
                      record: &mut NearestCentroid,
                      needs_fresh: &mut bool,
                      candidates: &mut [Candidate]| {
            let previous = *record;
            let nearest = if fresh || *needs_fresh {
                search.search_fresh(particle.position(), clusters, candidates)
            } else {
                search.search(particle.position(), clusters, previous, candidates)
            };
            *record = nearest;
            *needs_fresh = false;

            if nearest.idx == previous.idx {
                return 0usize;
            }
            flags.mark(previous.idx);
            flags.mark(nearest.idx);
            1
        };

        if k_prime > 0 {
            let lists = &mut self.buffers.nearest_centroid_lists[..n * k_prime];
            self.particles
                .par_iter()
                .zip(records.par_iter_mut())
                .zip(pending.par_iter_mut())
                .zip(lists.par_chunks_mut(k_prime))
                .map(|(((particle, record), needs_fresh), candidates)| {
                    assign(particle, record, needs_fresh, candidates)
                })
                .sum()
        } else {
            self.particles
                .par_iter()
                .zip(records.par_iter_mut())
                .zip(pending.par_iter_mut())
                .map(|((particle, record), needs_fresh)| {
                    assign(particle, record, needs_fresh, &mut [])
                })
                .sum()
        }
    }

    /// Reorder particles in place so each cluster owns one contiguous range.
    ///
    /// Counting pass, then a cycle-following swap pass. Each swap moves the
    /// particle's record and candidate list with it, and a particle's
    /// back-reference is written when it reaches its final slot.
    fn partition(&mut self) {
        let n = self.particles.len();
        let records = &self.buffers.particle_nearest_centroid[..n];

        for cluster in self.clusters.iter_mut() {
            cluster.particle_count = 0;
        }
        for record in records {
            self.clusters[record.idx].particle_count += 1;
        }

        let mut offset = 0;
        for (cluster, cursor) in self
            .clusters
            .iter_mut()
            .zip(self.buffers.partition_cursors.iter_mut())
        {
            cluster.particle_offset = offset;
            *cursor = offset;
            offset += cluster.particle_count;
        }

        for cluster_idx in 0..self.clusters.len() {
            let end = self.clusters[cluster_idx].range().end;

            while self.buffers.partition_cursors[cluster_idx] < end {
                let i = self.buffers.partition_cursors[cluster_idx];
                let target = self.buffers.particle_nearest_centroid[i].idx;

                if target == cluster_idx {
                    self.particles[i].set_cluster_metadata_idx(i);
                    self.buffers.partition_cursors[cluster_idx] += 1;
                } else {
                    let j = self.buffers.partition_cursors[target];
                    self.particles.swap(i, j);
                    self.buffers.swap_particle_state(i, j);
                    self.particles[j].set_cluster_metadata_idx(j);
                    self.buffers.partition_cursors[target] += 1;
                }
            }
        }
    }

    /// Recompute centroids as the mean of each cluster's range.
    ///
    /// Only clusters flagged as modified are recomputed unless `all` is set.
    /// Empty clusters keep their centroid. Returns the summed centroid movement.
    fn update_centroids(&mut self, all: bool) -> f64 {
        let particles: &[P] = self.particles;
        let flags = &self.buffers.cluster_modified_in_iteration;

        self.clusters
            .par_iter_mut()
            .enumerate()
            .map(|(cluster_idx, cluster)| {
                if !all && !flags.is_modified(cluster_idx) {
                    return 0.0;
                }
                match mean_position(cluster.particles(particles)) {
                    Some(mean) => {
                        let shift = cluster.centroid.distance(&mean) as f64;
                        cluster.centroid = mean;
                        shift
                    }
                    None => 0.0,
                }
            })
            .sum()
    }

    /// Apply the empty cluster policy; returns how many clusters were reseeded
    fn handle_empty_clusters(&mut self) -> usize {
        if self.options.empty_cluster_policy != EmptyClusterPolicy::ReseedFarthest {
            return 0;
        }

        let mut reseeded = 0;
        for cluster_idx in 0..self.clusters.len() {
            if !self.clusters[cluster_idx].is_empty() {
                continue;
            }

            let records = &mut self.buffers.particle_nearest_centroid[..self.particles.len()];
            let farthest = records
                .iter()
                .enumerate()
                .filter(|(_, record)| record.distance > 0.0)
                .max_by(|(_, a), (_, b)| a.distance.total_cmp(&b.distance))
                .map(|(i, _)| i);

            // Every particle already sits on its centroid
            let Some(i) = farthest else {
                break;
            };

            self.clusters[cluster_idx].centroid = *self.particles[i].position();
            // Not eligible again. Its candidate list cannot name the new
            // centroid, so the next search must rebuild it.
            records[i].distance = 0.0;
            self.buffers.needs_fresh_search[i] = true;
            reseeded += 1;

            debug!(
                "  Reseeded empty cluster {} on particle {}",
                cluster_idx, i
            );
        }

        reseeded
    }
}

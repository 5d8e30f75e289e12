//! # particle-kmeans
//!
//! Optimized k-means partitioning of particle sets, built for N-body style
//! simulations that approximate long-range interactions by treating each
//! cluster as a single body.
//!
//! ## Features
//!
//! - **k-means++ seeding** with an optional explicit seed for reproducible runs
//! - **Contiguous clusters**: the particle array is reordered in place so each
//!   cluster owns one `(particle_offset, particle_count)` range
//! - **Allocation-free iterations**: all per-iteration state lives in
//!   preallocated [`KMeansBuffers`], so re-clustering every simulation step is cheap
//! - **Optional heuristics**: the approaching-centroid shortcut and the
//!   candidate subset search, both approximations, freely combinable
//! - **Parallel assignment** with rayon
//!
//! ## Example
//!
//! ```rust
//! use particle_kmeans::{KMeansOptions, Particle, ParticleClusterer};
//!
//! let mut particles: Vec<Particle<3>> = (0..1000)
//!     .map(|i| Particle::new([(i % 10) as f32, ((i / 10) % 10) as f32, (i / 100) as f32]))
//!     .collect();
//!
//! let options = KMeansOptions::new(1000, 10)
//!     .with_max_iterations(50)
//!     .with_seed(42);
//!
//! let mut clusterer = ParticleClusterer::<3>::with_options(options).unwrap();
//! clusterer.cluster(&mut particles).unwrap();
//!
//! for cluster in clusterer.clusters().unwrap() {
//!     let members = cluster.particles(&particles);
//!     assert_eq!(members.len(), cluster.particle_count);
//! }
//! ```
//!
//! ## Lower-level API
//!
//! Callers that manage their own memory can drive the steps directly:
//!
//! ```rust
//! use particle_kmeans::{k_means, kpp, split_clusters, Cluster, KMeansBuffers, KMeansOptions, Particle};
//!
//! let mut particles: Vec<Particle<2>> = (0..64)
//!     .map(|i| Particle::new([(i % 8) as f32, (i / 8) as f32]))
//!     .collect();
//! let options = KMeansOptions::new(64, 4).with_centroid_subset(2, true);
//!
//! let mut clusters = vec![Cluster::default(); 8];
//! let mut buffers = KMeansBuffers::new(&options).unwrap();
//!
//! kpp(&particles, &mut clusters, &options, Some(7)).unwrap();
//! let (initial, final_clusters) = split_clusters(&mut clusters, 4).unwrap();
//! let report = k_means(&mut particles, initial, final_clusters, &mut buffers, &options).unwrap();
//! assert!(report.iterations <= options.max_iterations);
//! ```

mod algorithm;
mod buffers;
mod cluster;
mod config;
mod distance;
mod error;
mod kmeans;
mod kpp;
mod nearest;
mod particle;
mod point;
pub mod statistics;

pub use algorithm::{k_means, KMeansReport, Termination};
pub use buffers::{Candidate, KMeansBuffers, NearestCentroid};
pub use cluster::{centroids_to_array, is_partition, split_clusters, Cluster};
pub use config::{CentroidSubsetOptions, EmptyClusterPolicy, KMeansOptions};
pub use distance::mean_position;
pub use error::{KMeansError, Result};
pub use kmeans::ParticleClusterer;
pub use kpp::kpp;
pub use nearest::{nearest_centroid, nearest_centroid_and_build_list, nearest_centroid_from_subset};
pub use particle::{particles_from_array, positions_to_array, ClusteredParticle, Particle};
pub use point::Point;

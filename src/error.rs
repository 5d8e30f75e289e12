use thiserror::Error;

/// Error types for the particle k-means library
#[derive(Error, Debug)]
pub enum KMeansError {
    /// The number of clusters is invalid (must be > 0)
    #[error("Invalid cluster count: {0}")]
    InvalidClusterCount(String),

    /// Not enough particles for the requested number of clusters
    #[error("Insufficient particles: {0}")]
    InsufficientParticles(String),

    /// The candidate subset size is larger than the cluster count
    #[error("Invalid k_prime: {0}")]
    InvalidKPrime(String),

    /// A caller-provided particle slice, cluster slice or buffer set is too small
    #[error("Insufficient capacity: {0}")]
    InsufficientCapacity(String),

    /// Front-loaded run without an initial cluster owning every particle
    #[error("Front-loaded run requires one initial cluster covering all {0} particles")]
    FrontLoadedClusterMissing(usize),

    /// Clusterer has not run yet
    #[error("Clusterer has not run. Call cluster() first.")]
    NotFitted,

    /// Dimension mismatch between input data and the particle type
    #[error("Dimension mismatch: {0}")]
    InvalidDimensions(String),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, KMeansError>;

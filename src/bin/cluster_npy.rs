//! Cluster particle positions stored in a .npy file.
//!
//! Reads an `(n_particles, D)` f32 array with D = 2 or 3, runs k-means, and
//! writes the resulting centroids as a `(k, D)` array.
//!
//! Usage: `cluster-npy <input.npy> <output.npy> <k> [seed] [max_iterations]`

use ndarray::{Array2, ArrayView2};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use particle_kmeans::statistics::average_cluster_distance;
use particle_kmeans::{particles_from_array, KMeansOptions, ParticleClusterer};
use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

fn run<const D: usize>(
    data: &ArrayView2<f32>,
    options: KMeansOptions,
) -> Result<Array2<f32>, Box<dyn Error>> {
    let mut particles = particles_from_array::<D>(data)?;
    let mut clusterer = ParticleClusterer::<D>::with_options(options)?;

    let report = clusterer.cluster(&mut particles)?;
    let clusters = clusterer.clusters().ok_or("No clusters after clustering")?;

    eprintln!(
        "{:?} after {} iterations ({} changes in the last), seed {}",
        report.termination,
        report.iterations,
        report.changes_in_last_iteration,
        clusterer.last_seed().unwrap_or_default()
    );
    for (i, cluster) in clusters.iter().enumerate() {
        eprintln!("  Cluster {}: {} particles", i, cluster.particle_count);
    }
    eprintln!(
        "Average distance to centroid: {:.6}",
        average_cluster_distance(&particles, clusters)
    );

    clusterer
        .centroids()
        .ok_or_else(|| "No centroids after clustering".into())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();

    if !(4..=6).contains(&args.len()) {
        eprintln!(
            "Usage: {} <input.npy> <output.npy> <k> [seed] [max_iterations]",
            args[0]
        );
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];
    let k: usize = args[3].parse()?;

    let reader = BufReader::new(File::open(input_path)?);
    let data: Array2<f32> = Array2::read_npy(reader)?;

    eprintln!(
        "Loaded {} particles in {} dimensions",
        data.nrows(),
        data.ncols()
    );

    let mut options = KMeansOptions::new(data.nrows(), k);
    if let Some(seed) = args.get(4) {
        options = options.with_seed(seed.parse()?);
    }
    if let Some(max_iterations) = args.get(5) {
        options = options.with_max_iterations(max_iterations.parse()?);
    }

    let centroids = match data.ncols() {
        2 => run::<2>(&data.view(), options)?,
        3 => run::<3>(&data.view(), options)?,
        d => return Err(format!("Unsupported dimension {}, expected 2 or 3", d).into()),
    };

    let writer = File::create(output_path)?;
    centroids.write_npy(writer)?;

    eprintln!("Saved centroids to {}", output_path);

    Ok(())
}

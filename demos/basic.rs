//! Basic example demonstrating particle-kmeans usage
//!
//! Run with: cargo run --example basic --release

use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use particle_kmeans::statistics::average_cluster_distance;
use particle_kmeans::{KMeansOptions, Particle, ParticleClusterer};

fn main() {
    println!("=== particle-kmeans example ===\n");

    // Three clumps of particles in 2D for easy visualization
    let n_particles = 300;
    let n_clusters = 3;
    let centers = [[-5.0f32, -5.0], [0.0, 5.0], [5.0, -5.0]];

    println!("Generating {} particles around {} centers...", n_particles, n_clusters);

    let noise = Array2::random((n_particles, 2), Uniform::new(-1.0f32, 1.0));
    let mut particles: Vec<Particle<2>> = (0..n_particles)
        .map(|i| {
            let center = centers[i % n_clusters];
            Particle::new([center[0] + noise[[i, 0]], center[1] + noise[[i, 1]]])
        })
        .collect();

    println!("True cluster centers:");
    for (i, center) in centers.iter().enumerate() {
        println!("  Cluster {}: ({:.2}, {:.2})", i, center[0], center[1]);
    }
    println!();

    let options = KMeansOptions::new(n_particles, n_clusters)
        .with_max_iterations(100)
        .with_seed(42);

    println!("Running k-means with k={}...\n", n_clusters);

    let mut clusterer =
        ParticleClusterer::<2>::with_options(options).expect("Invalid options");
    let report = clusterer.cluster(&mut particles).expect("Clustering failed");

    println!(
        "{:?} after {} iterations\n",
        report.termination, report.iterations
    );

    // Every cluster owns a contiguous slice of the reordered particles
    let clusters = clusterer.clusters().expect("No clusters");
    println!("Learned clusters:");
    for (i, cluster) in clusters.iter().enumerate() {
        println!(
            "  Cluster {}: centroid ({:.4}, {:.4}), particles {}..{} ({:.1}%)",
            i,
            cluster.centroid[0],
            cluster.centroid[1],
            cluster.particle_offset,
            cluster.particle_offset + cluster.particle_count,
            (cluster.particle_count as f64 / n_particles as f64) * 100.0
        );
    }
    println!();

    println!(
        "Average distance to centroid: {:.4}\n",
        average_cluster_distance(&particles, clusters)
    );

    // Simulate one step of motion and re-cluster from the previous centroids
    for particle in particles.iter_mut() {
        particle.position[0] += 0.05;
    }
    let report = clusterer.recluster(&mut particles).expect("Re-clustering failed");
    println!(
        "After a small drift: {:?} after {} iterations",
        report.termination, report.iterations
    );

    println!("\n=== Done! ===");
}

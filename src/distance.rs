use crate::particle::ClusteredParticle;
use crate::point::Point;

/// Coordinate-wise mean of the given particles' positions.
///
/// Sums in f64 so large clusters keep precision. Returns `None` for an empty slice.
#[inline]
pub fn mean_position<const D: usize, P: ClusteredParticle<D>>(particles: &[P]) -> Option<Point<D>> {
    if particles.is_empty() {
        return None;
    }

    let mut sums = [0.0f64; D];
    for particle in particles {
        let position = particle.position();
        for axis in 0..D {
            sums[axis] += position[axis] as f64;
        }
    }

    let count = particles.len() as f64;
    let mut mean = Point::origin();
    for axis in 0..D {
        mean[axis] = (sums[axis] / count) as f32;
    }
    Some(mean)
}

/// Sum of squared distances from each particle to `centroid`
pub fn sum_squared_distances<const D: usize, P: ClusteredParticle<D>>(
    particles: &[P],
    centroid: &Point<D>,
) -> f64 {
    particles
        .iter()
        .map(|particle| particle.position().distance_squared(centroid) as f64)
        .sum()
}

/// Sum of distances from each particle to `centroid`
pub fn sum_distances<const D: usize, P: ClusteredParticle<D>>(
    particles: &[P],
    centroid: &Point<D>,
) -> f64 {
    particles
        .iter()
        .map(|particle| particle.position().distance(centroid) as f64)
        .sum()
}

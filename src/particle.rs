use crate::error::{KMeansError, Result};
use crate::point::Point;
use ndarray::{Array2, ArrayView2};

/// A particle the clustering engine can partition.
///
/// Besides its position, a particle carries a back-reference slot naming the
/// assignment record that currently describes it. The engine rewrites the
/// slot whenever it moves the particle, so a particle type embedding extra
/// simulation state (velocity, force, mass) only has to expose the two.
pub trait ClusteredParticle<const D: usize>: Send + Sync {
    fn position(&self) -> &Point<D>;

    fn cluster_metadata_idx(&self) -> usize;

    fn set_cluster_metadata_idx(&mut self, idx: usize);
}

/// A bare particle: a position and its back-reference slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle<const D: usize> {
    pub position: Point<D>,
    pub cluster_metadata_idx: usize,
}

impl<const D: usize> Particle<D> {
    pub fn new(coords: [f32; D]) -> Self {
        Self {
            position: Point::new(coords),
            cluster_metadata_idx: 0,
        }
    }
}

impl<const D: usize> From<Point<D>> for Particle<D> {
    fn from(position: Point<D>) -> Self {
        Self {
            position,
            cluster_metadata_idx: 0,
        }
    }
}

impl<const D: usize> ClusteredParticle<D> for Particle<D> {
    #[inline]
    fn position(&self) -> &Point<D> {
        &self.position
    }

    #[inline]
    fn cluster_metadata_idx(&self) -> usize {
        self.cluster_metadata_idx
    }

    #[inline]
    fn set_cluster_metadata_idx(&mut self, idx: usize) {
        self.cluster_metadata_idx = idx;
    }
}

/// Build particles from the rows of an `(n_particles, D)` array.
///
/// Each particle's back-reference starts out as its row index.
///
/// # Errors
///
/// Returns [`KMeansError::InvalidDimensions`] if the array does not have `D` columns.
pub fn particles_from_array<const D: usize>(data: &ArrayView2<f32>) -> Result<Vec<Particle<D>>> {
    if data.ncols() != D {
        return Err(KMeansError::InvalidDimensions(format!(
            "Expected {} features, got {}",
            D,
            data.ncols()
        )));
    }

    let particles = data
        .outer_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut coords = [0.0f32; D];
            for (axis, &value) in row.iter().enumerate() {
                coords[axis] = value;
            }
            Particle {
                position: Point::new(coords),
                cluster_metadata_idx: i,
            }
        })
        .collect();

    Ok(particles)
}

/// Collect particle positions into an `(n_particles, D)` array
pub fn positions_to_array<const D: usize, P: ClusteredParticle<D>>(particles: &[P]) -> Array2<f32> {
    let mut data = Array2::zeros((particles.len(), D));
    for (i, particle) in particles.iter().enumerate() {
        for axis in 0..D {
            data[[i, axis]] = particle.position()[axis];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_particles_from_array() {
        let data = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let particles = particles_from_array::<2>(&data.view()).unwrap();

        assert_eq!(particles.len(), 3);
        assert_eq!(particles[1].position.coords, [3.0, 4.0]);
        assert_eq!(particles[2].cluster_metadata_idx, 2);
    }

    #[test]
    fn test_particles_from_array_dimension_mismatch() {
        let data = array![[1.0f32, 2.0, 3.0]];
        let result = particles_from_array::<2>(&data.view());
        assert!(matches!(result, Err(KMeansError::InvalidDimensions(_))));
    }

    #[test]
    fn test_positions_to_array() {
        let particles = vec![Particle::new([1.0f32, -1.0]), Particle::new([0.5, 2.0])];
        let data = positions_to_array::<2, _>(&particles);

        assert_eq!(data.shape(), &[2, 2]);
        assert_eq!(data[[1, 1]], 2.0);
    }

    #[test]
    fn test_back_reference_slot() {
        let mut particle = Particle::new([0.0f32, 0.0, 0.0]);
        particle.set_cluster_metadata_idx(17);
        assert_eq!(particle.cluster_metadata_idx(), 17);
    }
}

use std::ops::{Index, IndexMut};

/// A position in `D`-dimensional space.
///
/// Points carry no identity beyond their coordinates. `D` is fixed at compile
/// time, typically 2 or 3 for particle simulations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const D: usize> {
    pub coords: [f32; D],
}

impl<const D: usize> Point<D> {
    /// Create a point from its coordinates
    pub const fn new(coords: [f32; D]) -> Self {
        Self { coords }
    }

    /// The point with every coordinate at zero
    pub const fn origin() -> Self {
        Self { coords: [0.0; D] }
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// Never negative; preserves the ordering of true distances, so nearest
    /// comparisons never need the square root.
    #[inline]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let mut sum = 0.0f32;
        for axis in 0..D {
            let diff = self.coords[axis] - other.coords[axis];
            sum += diff * diff;
        }
        sum
    }

    /// Euclidean distance to `other`
    #[inline]
    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coords
    }
}

impl<const D: usize> From<[f32; D]> for Point<D> {
    fn from(coords: [f32; D]) -> Self {
        Self::new(coords)
    }
}

impl<const D: usize> Index<usize> for Point<D> {
    type Output = f32;

    fn index(&self, axis: usize) -> &f32 {
        &self.coords[axis]
    }
}

impl<const D: usize> IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, axis: usize) -> &mut f32 {
        &mut self.coords[axis]
    }
}

use glam::DMat3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::linalg;

/// Error types for point set construction.
#[derive(Debug, Error, PartialEq)]
pub enum PointSetError {
    /// The flat coordinate buffer does not hold whole 3D points.
    #[error("Flat coordinate buffer of length {0} is not a multiple of 3")]
    InvalidLength(usize),
}

/// An ordered set of labeled 3D points.
///
/// The label of a point is its position in the set; permutations act on these labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    // The points in the set, indexed by label.
    points: Vec<[f64; 3]>,
}

impl PointSet {
    /// Create a new point set from a list of points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self { points }
    }

    /// Create a new point set from a flat `[x0, y0, z0, x1, y1, z1, ...]` buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PointSetError::InvalidLength`] if the buffer length is not a multiple of 3.
    pub fn from_flat(coords: &[f64]) -> Result<Self, PointSetError> {
        if coords.len() % 3 != 0 {
            return Err(PointSetError::InvalidLength(coords.len()));
        }
        let points = coords
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self { points })
    }

    /// Get the number of points in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the set.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Flatten the set into a `3N` coordinate buffer.
    pub fn to_flat(&self) -> Vec<f64> {
        self.points.iter().flatten().copied().collect()
    }

    /// Compute the centroid of the set. The centroid of an empty set is the origin.
    pub fn centroid(&self) -> [f64; 3] {
        if self.points.is_empty() {
            return [0.0; 3];
        }
        let mut centroid = [0.0; 3];
        for p in self.points.iter() {
            centroid[0] += p[0];
            centroid[1] += p[1];
            centroid[2] += p[2];
        }
        let n = self.points.len() as f64;
        [centroid[0] / n, centroid[1] / n, centroid[2] / n]
    }

    /// Return a copy of the set shifted by `offset`.
    pub fn translated(&self, offset: &[f64; 3]) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]])
            .collect();
        Self { points }
    }

    /// Return a copy of the set with its centroid moved to the origin.
    pub fn centered(&self) -> Self {
        let c = self.centroid();
        self.translated(&[-c[0], -c[1], -c[2]])
    }

    /// Return a copy of the set rigidly rotated about the origin.
    pub fn rotated(&self, rotation: &DMat3) -> Self {
        let mut points = vec![[0.0; 3]; self.points.len()];
        linalg::rotate_points(&self.points, rotation, &mut points);
        Self { points }
    }

    /// Return a relabeled copy of the set where label `i` holds the point `self[permutation[i]]`.
    ///
    /// PRECONDITION: `permutation` is a bijection over `0..self.len()`.
    pub fn permuted(&self, permutation: &[usize]) -> Self {
        assert_eq!(permutation.len(), self.points.len());
        let points = permutation.iter().map(|&j| self.points[j]).collect();
        Self { points }
    }

    /// Euclidean norm of the difference between the two flattened coordinate buffers.
    ///
    /// PRECONDITION: both sets have the same number of points.
    pub fn distance(&self, other: &PointSet) -> f64 {
        assert_eq!(self.len(), other.len());
        self.points
            .iter()
            .zip(other.points.iter())
            .map(|(a, b)| linalg::squared_distance(a, b))
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<[f64; 3]>> for PointSet {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_pointset() {
        let pointset = PointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert_eq!(pointset.len(), 2);
        assert!(!pointset.is_empty());
        assert_eq!(pointset.points()[1], [1.0, 0.0, 0.0]);
        assert_eq!(pointset.to_flat(), vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_flat() -> Result<(), PointSetError> {
        let pointset = PointSet::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        assert_eq!(pointset.points(), &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

        let err = PointSet::from_flat(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(err, Err(PointSetError::InvalidLength(4)));
        Ok(())
    }

    #[test]
    fn test_centroid() {
        let pointset = PointSet::new(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(pointset.centroid(), [2.5, 3.5, 4.5]);
        assert_eq!(PointSet::default().centroid(), [0.0; 3]);
    }

    #[test]
    fn test_centered_sums_to_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        for num_points in [1, 2, 5, 40] {
            let points = (0..num_points)
                .map(|_| {
                    [
                        rng.random_range(-10.0..10.0),
                        rng.random_range(-10.0..10.0),
                        rng.random_range(-10.0..10.0),
                    ]
                })
                .collect::<Vec<_>>();
            let centered = PointSet::new(points).centered();

            let mut sum = [0.0; 3];
            for p in centered.points() {
                sum[0] += p[0];
                sum[1] += p[1];
                sum[2] += p[2];
            }
            for s in sum {
                assert_abs_diff_eq!(s, 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_permuted() {
        let pointset = PointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let permuted = pointset.permuted(&[2, 0, 1]);
        assert_eq!(
            permuted.points(),
            &[[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_distance() {
        let a = PointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let b = PointSet::new(vec![[0.0, 3.0, 0.0], [1.0, 0.0, 4.0]]);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance(&a), 0.0);
    }
}

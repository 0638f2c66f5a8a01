use mindist_3d::rotation::RotationVector;

use crate::basin_hopping::Recorder;

/// An archived local minimum: its energy and the rotation reaching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    energy: f64,
    rotation: RotationVector,
}

impl Candidate {
    /// Create a new candidate.
    pub fn new(energy: f64, rotation: RotationVector) -> Self {
        Self { energy, rotation }
    }

    /// The energy of the candidate.
    #[inline]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// The rotation of the candidate.
    #[inline]
    pub fn rotation(&self) -> &RotationVector {
        &self.rotation
    }
}

/// A bounded archive keeping the `capacity` lowest energy candidates.
///
/// Candidates are kept in ascending energy order; equal energies keep their insertion order.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    capacity: usize,
    duplicate_angle: f64,
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    /// Create an empty pool holding at most `capacity` candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            duplicate_angle: 0.0,
            candidates: Vec::with_capacity(capacity),
        }
    }

    /// Treat rotations closer than `angle` radians to a kept candidate as revisits of it.
    ///
    /// A revisit only replaces the kept candidate when its energy is strictly lower.
    /// An angle of zero disables the check.
    pub fn with_duplicate_angle(mut self, angle: f64) -> Self {
        self.duplicate_angle = angle.max(0.0);
        self
    }

    /// Maximum number of candidates.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of kept candidates.
    #[inline]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Insert a candidate, returning whether it was kept.
    pub fn insert(&mut self, energy: f64, rotation: RotationVector) -> bool {
        if energy.is_nan() || self.capacity == 0 {
            return false;
        }

        if self.duplicate_angle > 0.0 {
            let duplicate = self
                .candidates
                .iter()
                .position(|c| c.rotation.geodesic_angle(&rotation) < self.duplicate_angle);
            if let Some(index) = duplicate {
                if energy >= self.candidates[index].energy {
                    return false;
                }
                self.candidates.remove(index);
            }
        }

        if self.candidates.len() >= self.capacity {
            match self.candidates.last() {
                Some(worst) if energy >= worst.energy => return false,
                _ => {}
            }
        }

        let index = self.candidates.partition_point(|c| c.energy <= energy);
        self.candidates.insert(index, Candidate::new(energy, rotation));
        self.candidates.truncate(self.capacity);
        true
    }

    /// The lowest energy candidate, if any.
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// All kept candidates in ascending energy order.
    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl Recorder for CandidatePool {
    fn record(&mut self, energy: f64, rotation: &RotationVector) {
        if !self.insert(energy, *rotation) {
            log::trace!("discarded candidate with energy {energy:.8}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn rot(z: f64) -> RotationVector {
        RotationVector::new(0.0, 0.0, z)
    }

    #[test]
    fn test_pool_orders_and_bounds() {
        let mut pool = CandidatePool::new(3);
        assert!(pool.best().is_none());

        assert!(pool.insert(2.0, rot(0.1)));
        assert!(pool.insert(-1.0, rot(0.2)));
        assert!(pool.insert(0.5, rot(0.3)));
        assert!(pool.insert(0.0, rot(0.4)));
        assert_eq!(pool.len(), 3);

        let energies = pool.all().iter().map(|c| c.energy()).collect::<Vec<_>>();
        assert_eq!(energies, vec![-1.0, 0.0, 0.5]);
        assert_eq!(pool.best().map(|c| c.energy()), Some(-1.0));

        // no better than the worst kept entry
        assert!(!pool.insert(0.5, rot(0.5)));
        assert!(!pool.insert(3.0, rot(0.6)));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_pool_ties_keep_insertion_order() {
        let mut pool = CandidatePool::new(4);
        pool.insert(1.0, rot(0.1));
        pool.insert(1.0, rot(0.2));
        pool.insert(0.0, rot(0.3));
        pool.insert(1.0, rot(0.4));

        let rotations = pool
            .all()
            .iter()
            .map(|c| c.rotation().as_array()[2])
            .collect::<Vec<_>>();
        assert_eq!(rotations, vec![0.3, 0.1, 0.2, 0.4]);
    }

    #[test]
    fn test_pool_invariants_under_random_inserts() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut pool = CandidatePool::new(20);
        for _ in 0..500 {
            let energy = rng.random_range(-5.0..5.0);
            pool.insert(energy, RotationVector::random(&mut rng));
            assert!(pool.len() <= pool.capacity());
            assert!(pool.all().windows(2).all(|w| w[0].energy() <= w[1].energy()));
        }
        assert_eq!(pool.len(), 20);
    }

    #[test]
    fn test_pool_rejects_nan_and_zero_capacity() {
        let mut pool = CandidatePool::new(2);
        assert!(!pool.insert(f64::NAN, rot(0.1)));
        assert!(pool.is_empty());

        let mut empty = CandidatePool::new(0);
        assert!(!empty.insert(0.0, rot(0.1)));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_pool_duplicate_suppression() {
        let mut pool = CandidatePool::new(5).with_duplicate_angle(1e-3);
        assert!(pool.insert(-1.0, rot(0.5)));
        // same minimum, worse energy
        assert!(!pool.insert(-0.9, rot(0.5 + 1e-5)));
        assert_eq!(pool.len(), 1);

        // same minimum, better energy replaces it
        assert!(pool.insert(-1.1, rot(0.5 - 1e-5)));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.best().map(|c| c.energy()), Some(-1.1));

        // a distinct minimum with the same energy is kept
        assert!(pool.insert(-1.1, rot(2.0)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_records() {
        let mut pool = CandidatePool::new(2);
        pool.record(1.0, &rot(0.1));
        pool.record(0.0, &rot(0.2));
        pool.record(2.0, &rot(0.3));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.best().map(|c| *c.rotation()), Some(rot(0.2)));
    }
}

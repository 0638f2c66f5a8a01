//! Optimal bipartite matching (Hungarian algorithm).
//!
//! Solves the assignment problem: given a square cost matrix, find the bijection between rows
//! and columns with minimum total cost.

use faer::Mat;
use thiserror::Error;

/// Error types for the assignment solvers.
#[derive(Debug, Error, PartialEq)]
pub enum AssignmentError {
    /// The cost matrix is empty or not square.
    #[error("Cost matrix must be square and non-empty, got {rows}x{cols}")]
    InvalidInput {
        /// Number of rows of the cost matrix.
        rows: usize,
        /// Number of columns of the cost matrix.
        cols: usize,
    },

    /// The cost matrix holds a NaN or infinite entry.
    #[error("Cost matrix entry ({row}, {col}) is not finite")]
    NonFiniteCost {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },
}

/// Result of an optimal assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// `permutation[i]` is the column assigned to row `i`.
    pub permutation: Vec<usize>,
    /// Sum of the assigned costs.
    pub total_cost: f64,
    /// Square root of the total cost, i.e. the Euclidean distance for squared distance costs.
    pub distance: f64,
}

/// An optimal assignment routine: cost matrix in, permutation out.
pub trait AssignmentSolver {
    /// Find the permutation minimizing the sum of `cost[(i, permutation[i])]`.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::InvalidInput`] if the matrix is empty or not square.
    fn solve(&self, cost: &Mat<f64>) -> Result<Assignment, AssignmentError>;
}

/// Hungarian algorithm in its shortest augmenting path form with row and column potentials.
///
/// Runs in `O(n^3)`. Ties are broken towards the lowest column index.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hungarian;

impl AssignmentSolver for Hungarian {
    fn solve(&self, cost: &Mat<f64>) -> Result<Assignment, AssignmentError> {
        let (rows, cols) = (cost.nrows(), cost.ncols());
        if rows == 0 || rows != cols {
            return Err(AssignmentError::InvalidInput { rows, cols });
        }
        for col in 0..cols {
            for row in 0..rows {
                if !cost[(row, col)].is_finite() {
                    return Err(AssignmentError::NonFiniteCost { row, col });
                }
            }
        }

        let n = rows;

        // 1-based bookkeeping, index 0 is the virtual unmatched column
        let mut u = vec![0.0; n + 1];
        let mut v = vec![0.0; n + 1];
        // row matched to each column
        let mut p = vec![0usize; n + 1];
        // predecessor column on the alternating path
        let mut way = vec![0usize; n + 1];

        for i in 1..=n {
            p[0] = i;
            let mut j0 = 0;
            let mut minv = vec![f64::INFINITY; n + 1];
            let mut used = vec![false; n + 1];

            loop {
                used[j0] = true;
                let i0 = p[j0];
                let mut delta = f64::INFINITY;
                let mut j1 = 0;

                for j in 1..=n {
                    if used[j] {
                        continue;
                    }
                    let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                    if reduced < minv[j] {
                        minv[j] = reduced;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }

                for j in 0..=n {
                    if used[j] {
                        u[p[j]] += delta;
                        v[j] -= delta;
                    } else {
                        minv[j] -= delta;
                    }
                }

                j0 = j1;
                if p[j0] == 0 {
                    break;
                }
            }

            // augment along the alternating path
            loop {
                let j1 = way[j0];
                p[j0] = p[j1];
                j0 = j1;
                if j0 == 0 {
                    break;
                }
            }
        }

        let mut permutation = vec![0usize; n];
        for j in 1..=n {
            permutation[p[j] - 1] = j - 1;
        }

        let total_cost = permutation
            .iter()
            .enumerate()
            .map(|(i, &j)| cost[(i, j)])
            .sum::<f64>();

        Ok(Assignment {
            permutation,
            total_cost,
            distance: total_cost.max(0.0).sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn brute_force_min(cost: &Mat<f64>) -> f64 {
        fn recurse(cost: &Mat<f64>, row: usize, used: &mut [bool], acc: f64, best: &mut f64) {
            let n = cost.nrows();
            if row == n {
                *best = best.min(acc);
                return;
            }
            for col in 0..n {
                if !used[col] {
                    used[col] = true;
                    recurse(cost, row + 1, used, acc + cost[(row, col)], best);
                    used[col] = false;
                }
            }
        }
        let mut best = f64::INFINITY;
        recurse(cost, 0, &mut vec![false; cost.nrows()], 0.0, &mut best);
        best
    }

    #[test]
    fn test_hungarian_simple() -> Result<(), AssignmentError> {
        let data = [[4.0, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let cost = Mat::from_fn(3, 3, |i, j| data[i][j]);
        let assignment = Hungarian.solve(&cost)?;
        assert_eq!(assignment.permutation, vec![1, 0, 2]);
        assert_eq!(assignment.total_cost, 5.0);
        assert_relative_eq!(assignment.distance, 5.0f64.sqrt());
        Ok(())
    }

    #[test]
    fn test_diagonal_optimum_is_identity() -> Result<(), AssignmentError> {
        let cost = Mat::from_fn(5, 5, |i, j| {
            if i == j {
                0.0
            } else {
                1.0 + (i * 5 + j) as f64
            }
        });
        let assignment = Hungarian.solve(&cost)?;
        assert_eq!(assignment.permutation, vec![0, 1, 2, 3, 4]);
        assert_eq!(assignment.total_cost, 0.0);
        Ok(())
    }

    #[test]
    fn test_ties_prefer_lowest_index() -> Result<(), AssignmentError> {
        let cost = Mat::from_fn(4, 4, |_, _| 1.0);
        let assignment = Hungarian.solve(&cost)?;
        assert_eq!(assignment.permutation, vec![0, 1, 2, 3]);
        assert_eq!(assignment.total_cost, 4.0);
        Ok(())
    }

    #[test]
    fn test_matches_brute_force() -> Result<(), AssignmentError> {
        let mut rng = StdRng::seed_from_u64(12345);
        for n in 1..=6 {
            let values = (0..n * n)
                .map(|_| rng.random_range(0.0..10.0))
                .collect::<Vec<_>>();
            let cost = Mat::from_fn(n, n, |i, j| values[i * n + j]);
            let assignment = Hungarian.solve(&cost)?;

            let mut seen = vec![false; n];
            for &j in assignment.permutation.iter() {
                assert!(!seen[j]);
                seen[j] = true;
            }
            assert_relative_eq!(
                assignment.total_cost,
                brute_force_min(&cost),
                epsilon = 1e-9
            );
        }
        Ok(())
    }

    #[test]
    fn test_resolve_permuted_matrix_is_identity() -> Result<(), AssignmentError> {
        let data = [
            [7.0, 2.0, 9.0, 4.0],
            [3.0, 8.0, 1.0, 6.0],
            [5.0, 4.0, 8.0, 0.5],
            [1.0, 9.0, 6.0, 7.0],
        ];
        let cost = Mat::from_fn(4, 4, |i, j| data[i][j]);
        let first = Hungarian.solve(&cost)?;

        let permuted = Mat::from_fn(4, 4, |i, j| cost[(i, first.permutation[j])]);
        let second = Hungarian.solve(&permuted)?;

        assert_eq!(second.permutation, vec![0, 1, 2, 3]);
        assert_eq!(second.total_cost, first.total_cost);
        assert_eq!(second.distance, first.distance);
        Ok(())
    }

    #[test]
    fn test_invalid_input() {
        let empty = Mat::<f64>::zeros(0, 0);
        assert_eq!(
            Hungarian.solve(&empty),
            Err(AssignmentError::InvalidInput { rows: 0, cols: 0 })
        );

        let rect = Mat::<f64>::zeros(2, 3);
        assert_eq!(
            Hungarian.solve(&rect),
            Err(AssignmentError::InvalidInput { rows: 2, cols: 3 })
        );

        let mut nan = Mat::<f64>::zeros(2, 2);
        nan[(1, 0)] = f64::NAN;
        assert_eq!(
            Hungarian.solve(&nan),
            Err(AssignmentError::NonFiniteCost { row: 1, col: 0 })
        );
    }
}

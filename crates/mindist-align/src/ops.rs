use faer::Mat;
use mindist_3d::{linalg::squared_distance, pointset::PointSet, rotation::RotationVector};
use mindist_optim::{Assignment, AssignmentError, AssignmentSolver};

/// Build the cost matrix `cost[(i, j)] = |reference_i - moving_j|^2`.
///
/// # Arguments
///
/// * `reference` - Point set indexing the rows.
/// * `moving` - Point set indexing the columns.
///
/// # Returns
///
/// A `reference.len() x moving.len()` matrix.
pub fn squared_distance_matrix(reference: &PointSet, moving: &PointSet) -> Mat<f64> {
    let (a, b) = (reference.points(), moving.points());
    Mat::from_fn(a.len(), b.len(), |i, j| squared_distance(&a[i], &b[j]))
}

/// Rotate `moving` by `rotation` and find its optimal labeling against `reference`.
///
/// The returned distance is the exact minimum over permutations for this rotation.
pub fn assign_rotated<S: AssignmentSolver + ?Sized>(
    reference: &PointSet,
    moving: &PointSet,
    rotation: &RotationVector,
    solver: &S,
) -> Result<Assignment, AssignmentError> {
    let rotated = moving.rotated(&rotation.to_matrix());
    solver.solve(&squared_distance_matrix(reference, &rotated))
}

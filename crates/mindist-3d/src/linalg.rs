use glam::{DMat3, DVec3};

/// Rotate a set of points about the origin.
///
/// # Arguments
///
/// * `src_points` - A set of points to be rotated.
/// * `rotation` - A rotation matrix.
/// * `dst_points` - A pre-allocated vector to store the rotated points.
///
/// PRECONDITION: dst_points is a pre-allocated vector of the same size as source.
///
/// Example:
///
/// ```
/// use glam::DMat3;
/// use mindist_3d::linalg::rotate_points;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// rotate_points(&src_points, &DMat3::IDENTITY, &mut dst_points);
/// assert_eq!(dst_points, src_points);
/// ```
pub fn rotate_points(src_points: &[[f64; 3]], rotation: &DMat3, dst_points: &mut [[f64; 3]]) {
    assert_eq!(src_points.len(), dst_points.len());

    for (point_dst, point_src) in dst_points.iter_mut().zip(src_points.iter()) {
        *point_dst = (*rotation * DVec3::from_array(*point_src)).to_array();
    }
}

/// Compute the squared Euclidean distance between two points.
pub fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Build the skew-symmetric cross-product matrix `[v]x` so that `[v]x * w = v x w`.
pub fn skew(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

use crate::utils;

/// The 4x4 identity transformation.
pub const IDENTITY: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Transform a set of points by a homogeneous rigid transformation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `transformation` - A row-major 4x4 SE(3) matrix.
/// * `dst_points` - A pre-allocated buffer for the transformed points.
///
/// PRECONDITION: dst_points has the same length as src_points.
///
/// Example:
///
/// ```
/// use cloudalign_3d::linalg::{transform_points3d, IDENTITY};
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points3d(&src_points, &IDENTITY, &mut dst_points);
/// assert_eq!(dst_points, src_points);
/// ```
pub fn transform_points3d(
    src_points: &[[f64; 3]],
    transformation: &[[f64; 4]; 4],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());
    if src_points.is_empty() {
        return;
    }

    let (rotation, translation) = rotation_translation(transformation);

    // create views of the rotation and translation
    let rotation_mat = utils::array33_to_faer_mat33(&rotation);

    // create view of the source points
    let points_in_src = {
        let src_points_slice = unsafe {
            std::slice::from_raw_parts(src_points.as_ptr() as *const f64, src_points.len() * 3)
        };
        // SAFETY: src_points_slice is an Nx3 matrix where each row is a 3D point
        faer::mat::from_row_major_slice(src_points_slice, src_points.len(), 3)
    };

    // create a mutable view of the destination points
    let mut points_in_dst = {
        let dst_points_slice = unsafe {
            std::slice::from_raw_parts_mut(
                dst_points.as_mut_ptr() as *mut f64,
                dst_points.len() * 3,
            )
        };
        // SAFETY: dst_points_slice is a 3xN matrix where each column is a 3D point
        faer::mat::from_column_major_slice_mut(dst_points_slice, 3, dst_points.len())
    };

    // rotate all points at once
    faer::linalg::matmul::matmul(
        &mut points_in_dst,
        rotation_mat,
        points_in_src.transpose(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    let [tx, ty, tz] = translation;

    // SAFETY: each column of points_in_dst has exactly 3 entries
    for mut col in points_in_dst.col_iter_mut() {
        unsafe {
            col.write_unchecked(0, col.read_unchecked(0) + tx);
            col.write_unchecked(1, col.read_unchecked(1) + ty);
            col.write_unchecked(2, col.read_unchecked(2) + tz);
        }
    }
}

/// Transform a single point by a homogeneous rigid transformation.
pub fn transform_point3d(point: &[f64; 3], transformation: &[[f64; 4]; 4]) -> [f64; 3] {
    let t = transformation;
    [
        t[0][0] * point[0] + t[0][1] * point[1] + t[0][2] * point[2] + t[0][3],
        t[1][0] * point[0] + t[1][1] * point[1] + t[1][2] * point[2] + t[1][3],
        t[2][0] * point[0] + t[2][1] * point[1] + t[2][2] * point[2] + t[2][3],
    ]
}

/// Compose two transformations as `update * base`.
///
/// The update is expressed in the frame the base transformation maps into,
/// so applying the result equals applying `base` first and `update` second.
pub fn compose_transforms(update: &[[f64; 4]; 4], base: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += update[i][k] * base[k][j];
            }
            *val = sum;
        }
    }
    out
}

/// Check whether a transformation is exactly the identity.
pub fn is_identity(transformation: &[[f64; 4]; 4]) -> bool {
    *transformation == IDENTITY
}

/// Split a homogeneous transformation into its rotation and translation.
pub fn rotation_translation(transformation: &[[f64; 4]; 4]) -> ([[f64; 3]; 3], [f64; 3]) {
    let t = transformation;
    (
        [
            [t[0][0], t[0][1], t[0][2]],
            [t[1][0], t[1][1], t[1][2]],
            [t[2][0], t[2][1], t[2][2]],
        ],
        [t[0][3], t[1][3], t[2][3]],
    )
}

/// Build a homogeneous transformation from a rotation and a translation.
pub fn make_transform(rotation: &[[f64; 3]; 3], translation: &[f64; 3]) -> [[f64; 4]; 4] {
    let r = rotation;
    [
        [r[0][0], r[0][1], r[0][2], translation[0]],
        [r[1][0], r[1][1], r[1][2], translation[1]],
        [r[2][0], r[2][1], r[2][2], translation[2]],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// The same transformation with its translation zeroed.
pub fn rotation_only(transformation: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut out = *transformation;
    out[0][3] = 0.0;
    out[1][3] = 0.0;
    out[2][3] = 0.0;
    out
}

use cloudalign_3d::linalg::{make_transform, IDENTITY};
use cloudalign_3d::ops::{cross3, dot3};
use cloudalign_3d::pointcloud::PointCloud;
use cloudalign_3d::transforms::euler_angles_to_rotation_matrix;
use cloudalign_3d::utils::array3_to_faer_col;

use crate::ops::{compute_centroids, solve_6x6_cholesky};

/// A rigid transformation estimator over matched point pairs.
///
/// Implementations are pure functions of their inputs: given the same
/// clouds and correspondences they return the same 4x4 transformation.
/// Degenerate inputs (fewer than three pairs, singular systems) yield the
/// identity.
pub trait TransformationEstimation: Send + Sync {
    /// The transformation minimizing this estimator's objective over the
    /// matched pairs.
    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
    ) -> [[f64; 4]; 4];
}

/// Point-to-point estimation by the Kabsch/Umeyama method.
///
/// Minimizes the sum of squared distances between matched points. With
/// `with_scaling` the fit additionally solves for a uniform scale, which
/// makes the result a similarity rather than a rigid transform; most
/// registration pipelines leave it off.
#[derive(Debug, Clone, Default)]
pub struct PointToPoint {
    /// Also estimate a uniform scale factor.
    pub with_scaling: bool,
}

impl TransformationEstimation for PointToPoint {
    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
    ) -> [[f64; 4]; 4] {
        if corres.len() < 3 {
            return IDENTITY;
        }

        let source_points = source.points();
        let target_points = target.points();

        let (source_centroid, target_centroid) =
            compute_centroids(source_points, target_points, corres);

        // compute the covariance of the centered pairs
        let mut hh = faer::Mat::<f64>::zeros(3, 3);
        for &(i, j) in corres {
            let p_src = array3_to_faer_col(&source_points[i]) - &source_centroid;
            let p_dst = array3_to_faer_col(&target_points[j]) - &target_centroid;
            hh += p_src * p_dst.transpose();
        }

        let svd = hh.svd();
        let (u_t, v) = (svd.u().transpose(), svd.v());

        // rotation R = V * U^T
        let mut rotation = [[0.0; 3]; 3];
        matmul_into(&mut rotation, v, u_t);

        // fix the determinant in case the solution is a reflection
        if det3(&rotation) < 0.0 {
            log::warn!("det(R) < 0.0, fixing it...");
            let v_neg = {
                let mut v_neg = v.to_owned();
                v_neg.col_mut(2).copy_from(-v.col(2));
                v_neg
            };
            matmul_into(&mut rotation, v_neg.as_ref(), u_t);
        }

        let source_mean = [
            source_centroid.read(0),
            source_centroid.read(1),
            source_centroid.read(2),
        ];
        let target_mean = [
            target_centroid.read(0),
            target_centroid.read(1),
            target_centroid.read(2),
        ];

        let scale = if self.with_scaling {
            // least-squares scale over the centered pairs
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for &(i, j) in corres {
                let s = sub3(&source_points[i], &source_mean);
                let d = sub3(&target_points[j], &target_mean);
                numerator += dot3(&d, &mat3_mul_vec3(&rotation, &s));
                denominator += dot3(&s, &s);
            }
            if denominator > 0.0 {
                numerator / denominator
            } else {
                1.0
            }
        } else {
            1.0
        };

        for row in rotation.iter_mut() {
            for val in row.iter_mut() {
                *val *= scale;
            }
        }

        // t = target_mean - scale * R * source_mean
        let rotated_mean = mat3_mul_vec3(&rotation, &source_mean);
        let translation = sub3(&target_mean, &rotated_mean);

        make_transform(&rotation, &translation)
    }
}

/// Point-to-plane estimation by Gauss-Newton normal equations.
///
/// Minimizes the sum of squared distances between each transformed source
/// point and the tangent plane of its matched target point. The target
/// cloud must carry normals; without them the estimator degrades to the
/// identity.
#[derive(Debug, Clone, Default)]
pub struct PointToPlane;

impl TransformationEstimation for PointToPlane {
    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
    ) -> [[f64; 4]; 4] {
        let Some(normals) = target.normals() else {
            log::warn!("point-to-plane estimation requires target normals");
            return IDENTITY;
        };
        if corres.len() < 3 {
            return IDENTITY;
        }

        let source_points = source.points();
        let target_points = target.points();

        // accumulate the normal equations J^T J x = -J^T r with
        // x = (alpha, beta, gamma, tx, ty, tz)
        let mut ata = [[0.0; 6]; 6];
        let mut atb = [0.0; 6];
        for &(i, j) in corres {
            let p = &source_points[i];
            let q = &target_points[j];
            let n = &normals[j];

            let residual = dot3(&sub3(p, q), n);
            let p_cross_n = cross3(p, n);
            let jac = [p_cross_n[0], p_cross_n[1], p_cross_n[2], n[0], n[1], n[2]];

            for a in 0..6 {
                for b in 0..6 {
                    ata[a][b] += jac[a] * jac[b];
                }
                atb[a] -= jac[a] * residual;
            }
        }

        match solve_6x6_cholesky(&ata, &atb) {
            Some(x) => {
                let rotation = euler_angles_to_rotation_matrix(x[0], x[1], x[2]);
                make_transform(&rotation, &[x[3], x[4], x[5]])
            }
            None => {
                log::debug!("point-to-plane normal equations are singular");
                IDENTITY
            }
        }
    }
}

fn matmul_into(out: &mut [[f64; 3]; 3], lhs: faer::MatRef<'_, f64>, rhs: faer::MatRef<'_, f64>) {
    let mut view = {
        let array_slice =
            unsafe { std::slice::from_raw_parts_mut(out.as_mut_ptr() as *mut f64, 9) };
        // SAFETY: out is a contiguous 3x3 row-major array
        faer::mat::from_row_major_slice_mut(array_slice, 3, 3)
    };
    faer::linalg::matmul::matmul(&mut view, lhs, rhs, None, 1.0, faer::Parallelism::None);
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[inline]
fn sub3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn mat3_mul_vec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [dot3(&m[0], v), dot3(&m[1], v), dot3(&m[2], v)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudalign_3d::linalg::{make_transform, transform_points3d};
    use cloudalign_3d::transforms::axis_angle_to_rotation_matrix;

    fn create_random_points(num_points: usize) -> Vec<[f64; 3]> {
        (0..num_points)
            .map(|_| {
                [
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                ]
            })
            .collect()
    }

    fn identity_corres(n: usize) -> Vec<(usize, usize)> {
        (0..n).map(|i| (i, i)).collect()
    }

    fn assert_transform_eq(got: &[[f64; 4]; 4], want: &[[f64; 4]; 4], epsilon: f64) {
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(got[i][j], want[i][j], epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_point_to_point_identity() {
        let points = create_random_points(30);
        let source = PointCloud::from_points(points.clone());
        let target = PointCloud::from_points(points);

        let estimation = PointToPoint::default();
        let transformation =
            estimation.compute_transformation(&source, &target, &identity_corres(30));
        assert_transform_eq(&transformation, &IDENTITY, 1e-6);
    }

    #[test]
    fn test_point_to_point_known_rigid() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(30);
        let rotation = axis_angle_to_rotation_matrix(&[0.3, -1.0, 0.5], 0.4)?;
        let expected = make_transform(&rotation, &[0.1, -0.2, 0.3]);

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points3d(&points_src, &expected, &mut points_dst);

        let source = PointCloud::from_points(points_src);
        let target = PointCloud::from_points(points_dst);

        let estimation = PointToPoint::default();
        let transformation =
            estimation.compute_transformation(&source, &target, &identity_corres(30));
        assert_transform_eq(&transformation, &expected, 1e-6);
        Ok(())
    }

    #[test]
    fn test_point_to_point_with_scaling() {
        let points_src = create_random_points(30);
        let scale = 2.5;
        let points_dst = points_src
            .iter()
            .map(|p| [p[0] * scale, p[1] * scale, p[2] * scale])
            .collect::<Vec<_>>();

        let source = PointCloud::from_points(points_src);
        let target = PointCloud::from_points(points_dst);

        let estimation = PointToPoint { with_scaling: true };
        let transformation =
            estimation.compute_transformation(&source, &target, &identity_corres(30));
        for i in 0..3 {
            assert_relative_eq!(transformation[i][i], scale, epsilon = 1e-6);
            assert_relative_eq!(transformation[i][3], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_point_to_point_too_few_pairs() {
        let source = PointCloud::from_points(create_random_points(2));
        let target = PointCloud::from_points(create_random_points(2));
        let estimation = PointToPoint::default();
        let transformation =
            estimation.compute_transformation(&source, &target, &identity_corres(2));
        assert_eq!(transformation, IDENTITY);
    }

    fn corner_cloud_with_normals() -> PointCloud {
        // grids on three orthogonal planes so all six degrees of freedom
        // are constrained
        let mut points = Vec::new();
        let mut normals = Vec::new();
        for a in 0..5 {
            for b in 0..5 {
                let (u, v) = (a as f64 * 0.2, b as f64 * 0.2);
                points.push([u, v, 0.0]);
                normals.push([0.0, 0.0, 1.0]);
                points.push([0.0, u, v]);
                normals.push([1.0, 0.0, 0.0]);
                points.push([u, 0.0, v]);
                normals.push([0.0, 1.0, 0.0]);
            }
        }
        PointCloud::new(points, None, Some(normals)).expect("valid cloud")
    }

    #[test]
    fn test_point_to_plane_small_transform() -> Result<(), Box<dyn std::error::Error>> {
        let source = corner_cloud_with_normals();
        let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 0.01)?;
        let expected = make_transform(&rotation, &[0.005, -0.002, 0.003]);

        let mut target = source.clone();
        target.transform(&expected);

        let estimation = PointToPlane;
        let transformation = estimation.compute_transformation(
            &source,
            &target,
            &identity_corres(source.len()),
        );
        // the solve linearizes the rotation, so the tolerance is loose
        assert_transform_eq(&transformation, &expected, 1e-3);
        Ok(())
    }

    #[test]
    fn test_point_to_plane_requires_normals() {
        let source = PointCloud::from_points(create_random_points(10));
        let target = PointCloud::from_points(create_random_points(10));
        let estimation = PointToPlane;
        let transformation =
            estimation.compute_transformation(&source, &target, &identity_corres(10));
        assert_eq!(transformation, IDENTITY);
    }
}

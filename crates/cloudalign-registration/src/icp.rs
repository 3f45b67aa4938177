use cloudalign_3d::linalg::{compose_transforms, is_identity};
use cloudalign_3d::pointcloud::PointCloud;

use crate::estimation::TransformationEstimation;
use crate::evaluation::evaluate_with_search;
use crate::result::{ICPConvergenceCriteria, RegistrationResult};
use crate::search::KdTreeSearch;

/// Iterative Closest Point registration.
///
/// Starting from `init`, alternates between scoring the current alignment
/// (which assigns each source point its nearest target neighbor within
/// `max_correspondence_distance`) and refining the transformation with
/// `estimation` over the assigned pairs. Each refinement is composed on the
/// left of the cumulative transformation, since the estimator works in the
/// already-transformed frame.
///
/// The loop stops when the fitness change AND the RMSE change between two
/// consecutive iterations both fall below the criteria thresholds, or after
/// `criteria.max_iteration` iterations.
///
/// A non-positive `max_correspondence_distance` yields an unscored result
/// carrying `init`.
pub fn registration_icp(
    source: &PointCloud,
    target: &PointCloud,
    max_correspondence_distance: f64,
    init: &[[f64; 4]; 4],
    estimation: &dyn TransformationEstimation,
    criteria: &ICPConvergenceCriteria,
) -> RegistrationResult {
    if max_correspondence_distance <= 0.0 {
        return RegistrationResult::with_transformation(*init);
    }

    let target_search = KdTreeSearch::from_points(target.points());

    let mut transformation = *init;
    let mut pcd = source.clone();
    if !is_identity(init) {
        pcd.transform(init);
    }

    let mut result = evaluate_with_search(
        &pcd,
        &target_search,
        max_correspondence_distance,
        transformation,
    );

    for i in 0..criteria.max_iteration {
        log::debug!(
            "ICP iteration #{}: fitness {:.4}, RMSE {:.4}",
            i,
            result.fitness,
            result.inlier_rmse
        );

        let update = estimation.compute_transformation(&pcd, target, &result.correspondence_set);
        transformation = compose_transforms(&update, &transformation);
        pcd.transform(&update);

        let backup = result;
        result = evaluate_with_search(
            &pcd,
            &target_search,
            max_correspondence_distance,
            transformation,
        );

        if (backup.fitness - result.fitness).abs() < criteria.relative_fitness
            && (backup.inlier_rmse - result.inlier_rmse).abs() < criteria.relative_rmse
        {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudalign_3d::linalg::IDENTITY;
    use crate::estimation::PointToPoint;

    fn tetrahedron() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn test_icp_self_alignment_terminates_immediately() {
        let cloud = PointCloud::from_points(tetrahedron());
        let result = registration_icp(
            &cloud,
            &cloud,
            1.0,
            &IDENTITY,
            &PointToPoint::default(),
            &ICPConvergenceCriteria::default(),
        );

        assert_eq!(result.fitness, 1.0);
        assert_eq!(result.inlier_rmse, 0.0);
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(result.transformation[i][j], IDENTITY[i][j], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_icp_recovers_translation() {
        let source = PointCloud::from_points(tetrahedron());
        let shifted = tetrahedron()
            .into_iter()
            .map(|p| [p[0] + 0.5, p[1], p[2]])
            .collect();
        let target = PointCloud::from_points(shifted);

        let result = registration_icp(
            &source,
            &target,
            2.0,
            &IDENTITY,
            &PointToPoint::default(),
            &ICPConvergenceCriteria {
                max_iteration: 30,
                ..Default::default()
            },
        );

        assert_eq!(result.fitness, 1.0);
        assert!(result.inlier_rmse <= 1e-6);
        assert_relative_eq!(result.transformation[0][3], 0.5, epsilon = 1e-6);
        assert_relative_eq!(result.transformation[1][3], 0.0, epsilon = 1e-6);
        assert_relative_eq!(result.transformation[2][3], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_icp_non_positive_distance_returns_init() {
        let cloud = PointCloud::from_points(tetrahedron());
        let init = [
            [1.0, 0.0, 0.0, 0.25],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let result = registration_icp(
            &cloud,
            &cloud,
            0.0,
            &init,
            &PointToPoint::default(),
            &ICPConvergenceCriteria::default(),
        );
        assert_eq!(result.transformation, init);
        assert!(result.correspondence_set.is_empty());
        assert_eq!(result.fitness, 0.0);
    }
}

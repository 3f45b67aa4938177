use rayon::prelude::*;

use cloudalign_3d::linalg::is_identity;
use cloudalign_3d::pointcloud::PointCloud;

use crate::result::RegistrationResult;
use crate::search::{KdTreeSearch, PointSearch};

/// Score an already-transformed source cloud against a target index.
///
/// For each source point a hybrid radius-kNN(1) query finds its nearest
/// target neighbor; pairs within `max_correspondence_distance` become the
/// correspondence set. Per-thread buffers and error sums are merged once at
/// the join, so the set's internal order is unspecified.
pub(crate) fn evaluate_with_search<S: PointSearch>(
    source: &PointCloud,
    target_search: &S,
    max_correspondence_distance: f64,
    transformation: [[f64; 4]; 4],
) -> RegistrationResult {
    let mut result = RegistrationResult::with_transformation(transformation);
    if max_correspondence_distance <= 0.0 {
        return result;
    }

    let (correspondence_set, error2) = source
        .points()
        .par_iter()
        .enumerate()
        .fold(
            || (Vec::new(), 0.0),
            |(mut set, mut error2), (i, point)| {
                if let Some(nn) = target_search
                    .search_hybrid(point, max_correspondence_distance, 1)
                    .first()
                {
                    error2 += nn.distance_sq;
                    set.push((i, nn.index));
                }
                (set, error2)
            },
        )
        .reduce(
            || (Vec::new(), 0.0),
            |(mut set, error2), (other_set, other_error2)| {
                set.extend(other_set);
                (set, error2 + other_error2)
            },
        );

    if !correspondence_set.is_empty() {
        let corres_number = correspondence_set.len();
        result.fitness = corres_number as f64 / source.len() as f64;
        result.inlier_rmse = (error2 / corres_number as f64).sqrt();
        result.correspondence_set = correspondence_set;
    }
    result
}

/// Evaluate how well `transformation` aligns `source` onto `target`.
///
/// Builds a kd-tree over the target, applies the transformation to a local
/// copy of the source (skipped when it is the identity), and scores the
/// alignment: fitness is the fraction of source points with a target
/// neighbor within `max_correspondence_distance`, inlier RMSE the root mean
/// square of those neighbor distances.
///
/// A non-positive `max_correspondence_distance` yields an unscored result
/// carrying the input transformation.
pub fn evaluate_registration(
    source: &PointCloud,
    target: &PointCloud,
    max_correspondence_distance: f64,
    transformation: &[[f64; 4]; 4],
) -> RegistrationResult {
    let target_search = KdTreeSearch::from_points(target.points());
    let mut pcd = source.clone();
    if !is_identity(transformation) {
        pcd.transform(transformation);
    }
    evaluate_with_search(
        &pcd,
        &target_search,
        max_correspondence_distance,
        *transformation,
    )
}

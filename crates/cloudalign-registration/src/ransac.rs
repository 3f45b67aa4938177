use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use cloudalign_3d::feature::Feature;
use cloudalign_3d::linalg::IDENTITY;
use cloudalign_3d::ops::squared_euclidean_distance;
use cloudalign_3d::pointcloud::PointCloud;

use crate::checker::CorrespondenceChecker;
use crate::estimation::TransformationEstimation;
use crate::evaluation::evaluate_with_search;
use crate::result::{RANSACConvergenceCriteria, RegistrationResult};
use crate::search::{FeatureSearch, KdTreeSearch};

// 64-bit golden ratio increment, keeps worker seeds distinct
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

fn make_base_rng(criteria: &RANSACConvergenceCriteria) -> StdRng {
    match criteria.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn worker_seed(base_seed: u64, worker: u64) -> u64 {
    base_seed ^ worker.wrapping_mul(SEED_MIX)
}

/// Score a hypothesis restricted to a caller-provided correspondence set.
///
/// `pcd` is the source already transformed by the hypothesis. Fitness is
/// the fraction of pairs whose post-transform squared distance is strictly
/// below the squared threshold.
fn evaluate_over_correspondences(
    pcd: &PointCloud,
    target: &PointCloud,
    corres: &[(usize, usize)],
    max_correspondence_distance: f64,
    transformation: [[f64; 4]; 4],
) -> RegistrationResult {
    let mut result = RegistrationResult::with_transformation(transformation);
    let max_dist2 = max_correspondence_distance * max_correspondence_distance;

    let mut error2 = 0.0;
    let mut inliers = Vec::new();
    for &(i, j) in corres {
        let dist2 = squared_euclidean_distance(&pcd.points()[i], &target.points()[j]);
        if dist2 < max_dist2 {
            error2 += dist2;
            inliers.push((i, j));
        }
    }

    if !inliers.is_empty() {
        result.fitness = inliers.len() as f64 / corres.len() as f64;
        result.inlier_rmse = (error2 / inliers.len() as f64).sqrt();
        result.correspondence_set = inliers;
    }
    result
}

/// RANSAC registration over a caller-provided correspondence set.
///
/// Each iteration samples `ransac_n` pairs uniformly with replacement from
/// `corres`, fits a transformation with `estimation`, and scores it against
/// the whole set; the best hypothesis wins (higher fitness, ties broken by
/// lower RMSE). The loop runs `min(max_iteration, max_validation)`
/// iterations.
///
/// `ransac_n` is typically 6. Invalid arguments (`ransac_n < 3`, fewer
/// correspondences than `ransac_n`, non-positive distance) yield the
/// default unscored result.
pub fn registration_ransac_from_correspondences(
    source: &PointCloud,
    target: &PointCloud,
    corres: &[(usize, usize)],
    max_correspondence_distance: f64,
    estimation: &dyn TransformationEstimation,
    ransac_n: usize,
    criteria: &RANSACConvergenceCriteria,
) -> RegistrationResult {
    if ransac_n < 3 || corres.len() < ransac_n || max_correspondence_distance <= 0.0 {
        return RegistrationResult::default();
    }

    let mut rng = make_base_rng(criteria);
    let mut result = RegistrationResult::default();
    let mut ransac_corres = vec![(0, 0); ransac_n];

    let num_iterations = criteria.max_iteration.min(criteria.max_validation);
    for _ in 0..num_iterations {
        for slot in &mut ransac_corres {
            *slot = corres[rng.gen_range(0..corres.len())];
        }

        let transformation = estimation.compute_transformation(source, target, &ransac_corres);
        let mut pcd = source.clone();
        pcd.transform(&transformation);

        let this_result = evaluate_over_correspondences(
            &pcd,
            target,
            corres,
            max_correspondence_distance,
            transformation,
        );
        if this_result.improves_over(&result) {
            result = this_result;
        }
    }

    log::debug!(
        "RANSAC: fitness {:.4}, RMSE {:.4}",
        result.fitness,
        result.inlier_rmse
    );
    result
}

/// RANSAC registration mining correspondences from feature matches.
///
/// Each iteration samples `ransac_n` source indices uniformly and matches
/// each to its nearest target descriptor (a descriptor without neighbors
/// matches target index 0 and is reported at debug level). Checkers that do
/// not require alignment run before the fit, the rest after it; a failed
/// check aborts the iteration without consuming the validation budget.
/// Surviving hypotheses are scored with the full evaluator against the
/// target kd-tree.
///
/// Iterations are scheduled in parallel up to `criteria.max_iteration`;
/// scoring stops once `criteria.max_validation` validations completed
/// (workers may overshoot the budget by at most one each). Worker-local
/// bests are reduced with the best-of-N rule after the join.
///
/// `ransac_n` is typically 4. Invalid arguments (`ransac_n < 3`,
/// non-positive distance, empty source) yield the default unscored result.
pub fn registration_ransac_from_features(
    source: &PointCloud,
    target: &PointCloud,
    source_feature: &Feature,
    target_feature: &Feature,
    max_correspondence_distance: f64,
    estimation: &dyn TransformationEstimation,
    ransac_n: usize,
    checkers: &[&dyn CorrespondenceChecker],
    criteria: &RANSACConvergenceCriteria,
) -> RegistrationResult {
    if ransac_n < 3 || max_correspondence_distance <= 0.0 || source.is_empty() {
        return RegistrationResult::default();
    }

    // read-only indices shared across the worker pool
    let target_search = KdTreeSearch::from_points(target.points());
    let feature_search = FeatureSearch::new(target_feature);

    let base_seed = criteria.random_seed.unwrap_or_else(rand::random);
    let worker_counter = AtomicU64::new(0);
    let total_validation = AtomicUsize::new(0);
    let finished_validation = AtomicBool::new(false);

    let result = (0..criteria.max_iteration)
        .into_par_iter()
        .fold(
            || {
                let worker = worker_counter.fetch_add(1, Ordering::Relaxed);
                (
                    StdRng::seed_from_u64(worker_seed(base_seed, worker)),
                    RegistrationResult::default(),
                )
            },
            |(mut rng, mut best), _itr| {
                if finished_validation.load(Ordering::Acquire) {
                    return (rng, best);
                }

                // sample source indices and match them in feature space
                let mut ransac_corres = Vec::with_capacity(ransac_n);
                for _ in 0..ransac_n {
                    let source_idx = rng.gen_range(0..source.len());
                    let target_idx = match feature_search
                        .search_knn(source_feature.col(source_idx), 1)
                        .first()
                    {
                        Some(nn) => nn.index,
                        None => {
                            log::debug!("sampled a feature without neighbors");
                            0
                        }
                    };
                    ransac_corres.push((source_idx, target_idx));
                }

                // cheap checks before fitting
                let mut check = true;
                for checker in checkers {
                    if !checker.require_pointcloud_alignment()
                        && !checker.check(source, target, &ransac_corres, &IDENTITY)
                    {
                        check = false;
                        break;
                    }
                }
                if !check {
                    return (rng, best);
                }

                let transformation =
                    estimation.compute_transformation(source, target, &ransac_corres);

                for checker in checkers {
                    if checker.require_pointcloud_alignment()
                        && !checker.check(source, target, &ransac_corres, &transformation)
                    {
                        check = false;
                        break;
                    }
                }
                if !check {
                    return (rng, best);
                }

                let mut pcd = source.clone();
                pcd.transform(&transformation);
                let this_result = evaluate_with_search(
                    &pcd,
                    &target_search,
                    max_correspondence_distance,
                    transformation,
                );
                if this_result.improves_over(&best) {
                    best = this_result;
                }

                if total_validation.fetch_add(1, Ordering::AcqRel) + 1 >= criteria.max_validation {
                    finished_validation.store(true, Ordering::Release);
                }
                (rng, best)
            },
        )
        .map(|(_, best)| best)
        .reduce(RegistrationResult::default, |best, candidate| {
            if candidate.improves_over(&best) {
                candidate
            } else {
                best
            }
        });

    log::debug!(
        "RANSAC: fitness {:.4}, RMSE {:.4}",
        result.fitness,
        result.inlier_rmse
    );
    result
}

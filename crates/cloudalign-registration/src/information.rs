use rayon::prelude::*;

use cloudalign_3d::pointcloud::PointCloud;

use crate::result::RegistrationResult;

/// The 6x6 Gauss-Newton information matrix of the registered pose about the
/// target cloud.
///
/// For each correspondence the jacobian of the matched target point's
/// residual with respect to the pose parameters `(tx, ty, tz, alpha, beta,
/// gamma)` is accumulated as `J^T J`; small rotations enter with a factor
/// of 2. The accumulator is seeded with the identity, which keeps the
/// result positive definite even for an empty correspondence set. Used
/// downstream as the edge weight of pose-graph optimization.
///
/// `source` is unused by the derivation and kept for interface symmetry
/// with the other operations.
pub fn information_matrix_from_result(
    _source: &PointCloud,
    target: &PointCloud,
    result: &RegistrationResult,
) -> [[f64; 6]; 6] {
    let accumulated = result
        .correspondence_set
        .par_iter()
        .fold(
            || [[0.0; 6]; 6],
            |mut gtg, &(_, t)| {
                let [x, y, z] = target.points()[t];
                let rows = [
                    [1.0, 0.0, 0.0, 0.0, 2.0 * z, -2.0 * y],
                    [0.0, 1.0, 0.0, -2.0 * z, 0.0, 2.0 * x],
                    [0.0, 0.0, 1.0, 2.0 * y, -2.0 * x, 0.0],
                ];
                for g in &rows {
                    for a in 0..6 {
                        for b in 0..6 {
                            gtg[a][b] += g[a] * g[b];
                        }
                    }
                }
                gtg
            },
        )
        .reduce(
            || [[0.0; 6]; 6],
            |mut gtg, other| {
                for (row, other_row) in gtg.iter_mut().zip(other.iter()) {
                    for (val, other_val) in row.iter_mut().zip(other_row.iter()) {
                        *val += other_val;
                    }
                }
                gtg
            },
        );

    // identity seed applied once to the merged sum
    let mut gtg = accumulated;
    for (i, row) in gtg.iter_mut().enumerate() {
        row[i] += 1.0;
    }
    gtg
}

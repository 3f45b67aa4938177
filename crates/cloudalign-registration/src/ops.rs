use cloudalign_3d::utils::array3_to_faer_col;

/// Compute the centroids of the matched source and target points.
///
/// # Arguments
///
/// * `source_points` - All source points.
/// * `target_points` - All target points.
/// * `corres` - Index pairs selecting the matched points.
///
/// # Returns
///
/// The centroids of the selected source and target points.
///
/// PRECONDITION: corres is non-empty and all indices are in bounds.
pub(crate) fn compute_centroids(
    source_points: &[[f64; 3]],
    target_points: &[[f64; 3]],
    corres: &[(usize, usize)],
) -> (faer::Col<f64>, faer::Col<f64>) {
    let mut source_centroid = faer::Col::zeros(3);
    let mut target_centroid = faer::Col::zeros(3);

    for &(i, j) in corres {
        source_centroid += array3_to_faer_col(&source_points[i]);
        target_centroid += array3_to_faer_col(&target_points[j]);
    }

    source_centroid /= corres.len() as f64;
    target_centroid /= corres.len() as f64;

    (source_centroid, target_centroid)
}

/// Solve the symmetric positive definite system `a * x = b` by Cholesky
/// decomposition.
///
/// Returns `None` when `a` is not positive definite.
pub(crate) fn solve_6x6_cholesky(a: &[[f64; 6]; 6], b: &[f64; 6]) -> Option<[f64; 6]> {
    // decompose a = l * l^T
    let mut l = [[0.0; 6]; 6];
    for i in 0..6 {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 1e-12 {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // forward substitution: l * y = b
    let mut y = [0.0; 6];
    for i in 0..6 {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * y[k];
        }
        y[i] = sum / l[i][i];
    }

    // back substitution: l^T * x = y
    let mut x = [0.0; 6];
    for i in (0..6).rev() {
        let mut sum = y[i];
        for k in i + 1..6 {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compute_centroids() {
        let source = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [100.0, 100.0, 100.0]];
        let target = vec![[7.0, 8.0, 9.0], [10.0, 11.0, 12.0]];
        // the third source point is not referenced
        let corres = vec![(0, 0), (1, 1)];

        let (source_centroid, target_centroid) = compute_centroids(&source, &target, &corres);
        assert_eq!(source_centroid.read(0), 2.5);
        assert_eq!(source_centroid.read(1), 3.5);
        assert_eq!(source_centroid.read(2), 4.5);
        assert_eq!(target_centroid.read(0), 8.5);
        assert_eq!(target_centroid.read(1), 9.5);
        assert_eq!(target_centroid.read(2), 10.5);
    }

    #[test]
    fn test_solve_6x6_cholesky_diagonal() {
        let mut a = [[0.0; 6]; 6];
        for (i, row) in a.iter_mut().enumerate() {
            row[i] = (i + 1) as f64;
        }
        let b = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = solve_6x6_cholesky(&a, &b).expect("diagonal system is SPD");
        for v in x {
            assert_relative_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solve_6x6_cholesky_roundtrip() {
        // build an SPD matrix as m^T m + I
        let m = [
            [2.0, 1.0, 0.0, 0.5, 0.0, 0.0],
            [1.0, 3.0, 0.2, 0.0, 0.0, 0.1],
            [0.0, 0.2, 1.0, 0.0, 0.4, 0.0],
            [0.5, 0.0, 0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 0.4, 0.0, 1.5, 0.3],
            [0.0, 0.1, 0.0, 0.0, 0.3, 1.0],
        ];
        let mut a = [[0.0; 6]; 6];
        for i in 0..6 {
            for j in 0..6 {
                for k in 0..6 {
                    a[i][j] += m[k][i] * m[k][j];
                }
            }
            a[i][i] += 1.0;
        }

        let expected = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        let mut b = [0.0; 6];
        for i in 0..6 {
            for j in 0..6 {
                b[i] += a[i][j] * expected[j];
            }
        }

        let x = solve_6x6_cholesky(&a, &b).expect("SPD by construction");
        for (got, want) in x.iter().zip(expected.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_solve_6x6_cholesky_singular() {
        let a = [[0.0; 6]; 6];
        let b = [1.0; 6];
        assert!(solve_6x6_cholesky(&a, &b).is_none());
    }
}

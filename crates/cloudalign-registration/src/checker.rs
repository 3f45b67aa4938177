use cloudalign_3d::linalg::{rotation_only, transform_point3d};
use cloudalign_3d::ops::{dot3, euclidean_distance};
use cloudalign_3d::pointcloud::PointCloud;

/// A cheap geometric validity test applied to a sampled correspondence set
/// before a hypothesis is fully scored.
///
/// Checkers that do not require alignment run before the transformation is
/// fitted (the transformation argument is a placeholder there); checkers
/// that do require alignment run after the fit with the fitted
/// transformation.
pub trait CorrespondenceChecker: Send + Sync {
    /// Whether [`check`](Self::check) needs the fitted transformation.
    fn require_pointcloud_alignment(&self) -> bool;

    /// Accept or reject the sampled correspondences.
    fn check(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
        transformation: &[[f64; 4]; 4],
    ) -> bool;
}

/// Rejects samples whose polygons differ in edge length between source and
/// target.
///
/// For every pair of correspondences the two edge lengths must satisfy
/// `similarity_threshold * other <= length` in both directions. Runs
/// pre-fit.
#[derive(Debug, Clone)]
pub struct EdgeLengthChecker {
    /// Lower bound on the mutual edge-length ratio, in `(0, 1)`.
    pub similarity_threshold: f64,
}

impl Default for EdgeLengthChecker {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.9,
        }
    }
}

impl CorrespondenceChecker for EdgeLengthChecker {
    fn require_pointcloud_alignment(&self) -> bool {
        false
    }

    fn check(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
        _transformation: &[[f64; 4]; 4],
    ) -> bool {
        for (idx, &(si, ti)) in corres.iter().enumerate() {
            for &(sj, tj) in &corres[..idx] {
                let source_edge = euclidean_distance(&source.points()[si], &source.points()[sj]);
                let target_edge = euclidean_distance(&target.points()[ti], &target.points()[tj]);
                if source_edge < self.similarity_threshold * target_edge
                    || target_edge < self.similarity_threshold * source_edge
                {
                    return false;
                }
            }
        }
        true
    }
}

/// Rejects hypotheses leaving any matched pair farther apart than a
/// threshold after alignment. Runs post-fit.
#[derive(Debug, Clone)]
pub struct DistanceChecker {
    /// Maximum allowed distance between aligned pairs.
    pub distance_threshold: f64,
}

impl CorrespondenceChecker for DistanceChecker {
    fn require_pointcloud_alignment(&self) -> bool {
        true
    }

    fn check(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
        transformation: &[[f64; 4]; 4],
    ) -> bool {
        corres.iter().all(|&(i, j)| {
            let aligned = transform_point3d(&source.points()[i], transformation);
            euclidean_distance(&aligned, &target.points()[j]) <= self.distance_threshold
        })
    }
}

/// Rejects hypotheses whose matched normals disagree in direction.
///
/// The angle between the rotated source normal and the target normal must
/// not exceed the threshold. Clouds without normals pass with a warning.
/// Runs post-fit.
#[derive(Debug, Clone)]
pub struct NormalChecker {
    /// Maximum allowed angle between matched normals, in radians.
    pub normal_angle_threshold: f64,
}

impl CorrespondenceChecker for NormalChecker {
    fn require_pointcloud_alignment(&self) -> bool {
        true
    }

    fn check(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        corres: &[(usize, usize)],
        transformation: &[[f64; 4]; 4],
    ) -> bool {
        let (Some(source_normals), Some(target_normals)) = (source.normals(), target.normals())
        else {
            log::warn!("normal check skipped: point cloud has no normals");
            return true;
        };

        let rotation = rotation_only(transformation);
        let cos_threshold = self.normal_angle_threshold.cos();
        corres.iter().all(|&(i, j)| {
            let rotated = transform_point3d(&source_normals[i], &rotation);
            dot3(&rotated, &target_normals[j]) >= cos_threshold
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudalign_3d::linalg::IDENTITY;

    fn unit_triangle() -> Vec<[f64; 3]> {
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
    }

    #[test]
    fn test_edge_length_checker() {
        let source = PointCloud::from_points(unit_triangle());
        let same = PointCloud::from_points(unit_triangle());
        let stretched = PointCloud::from_points(vec![
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        let corres = vec![(0, 0), (1, 1), (2, 2)];

        let checker = EdgeLengthChecker::default();
        assert!(!checker.require_pointcloud_alignment());
        assert!(checker.check(&source, &same, &corres, &IDENTITY));
        assert!(!checker.check(&source, &stretched, &corres, &IDENTITY));
    }

    #[test]
    fn test_distance_checker() {
        let source = PointCloud::from_points(unit_triangle());
        let mut shifted_points = unit_triangle();
        for p in &mut shifted_points {
            p[0] += 0.5;
        }
        let target = PointCloud::from_points(shifted_points);
        let corres = vec![(0, 0), (1, 1), (2, 2)];

        let checker = DistanceChecker {
            distance_threshold: 0.1,
        };
        assert!(checker.require_pointcloud_alignment());
        // untransformed pairs are half a unit apart
        assert!(!checker.check(&source, &target, &corres, &IDENTITY));

        // the aligning translation brings them within range
        let aligning = [
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        assert!(checker.check(&source, &target, &corres, &aligning));
    }

    #[test]
    fn test_normal_checker() {
        let up = vec![[0.0, 0.0, 1.0]; 3];
        let sideways = vec![[1.0, 0.0, 0.0]; 3];
        let source = PointCloud::new(unit_triangle(), None, Some(up.clone())).unwrap();
        let aligned = PointCloud::new(unit_triangle(), None, Some(up)).unwrap();
        let orthogonal = PointCloud::new(unit_triangle(), None, Some(sideways)).unwrap();
        let corres = vec![(0, 0), (1, 1), (2, 2)];

        let checker = NormalChecker {
            normal_angle_threshold: 0.5,
        };
        assert!(checker.check(&source, &aligned, &corres, &IDENTITY));
        assert!(!checker.check(&source, &orthogonal, &corres, &IDENTITY));

        // clouds without normals pass
        let bare = PointCloud::from_points(unit_triangle());
        assert!(checker.check(&bare, &bare, &corres, &IDENTITY));
    }
}

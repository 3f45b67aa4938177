use crate::linalg::{rotation_only, transform_points3d};

/// Errors produced when constructing a point cloud.
#[derive(thiserror::Error, Debug)]
pub enum PointCloudError {
    /// A per-point attribute does not have one entry per point.
    #[error("attribute `{name}` has {actual} entries for {expected} points")]
    AttributeLengthMismatch {
        /// Name of the offending attribute.
        name: &'static str,
        /// Number of entries the attribute holds.
        actual: usize,
        /// Number of points in the cloud.
        expected: usize,
    },
}

/// A point cloud with points and optional per-point colors and normals.
///
/// Point order is stable; indices into the cloud are used as correspondence
/// keys by the registration algorithms.
#[derive(Debug, Clone)]
pub struct PointCloud {
    points: Vec<[f64; 3]>,
    colors: Option<Vec<[f64; 3]>>,
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    ///
    /// # Errors
    ///
    /// Returns [`PointCloudError::AttributeLengthMismatch`] if a provided
    /// attribute does not have exactly one entry per point.
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[f64; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Result<Self, PointCloudError> {
        if let Some(colors) = &colors {
            if colors.len() != points.len() {
                return Err(PointCloudError::AttributeLengthMismatch {
                    name: "colors",
                    actual: colors.len(),
                    expected: points.len(),
                });
            }
        }
        if let Some(normals) = &normals {
            if normals.len() != points.len() {
                return Err(PointCloudError::AttributeLengthMismatch {
                    name: "normals",
                    actual: normals.len(),
                    expected: points.len(),
                });
            }
        }
        Ok(Self {
            points,
            colors,
            normals,
        })
    }

    /// Create a point cloud holding only points.
    pub fn from_points(points: Vec<[f64; 3]>) -> Self {
        Self {
            points,
            colors: None,
            normals: None,
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&[[f64; 3]]> {
        self.colors.as_deref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Apply a rigid transformation to the cloud in place.
    ///
    /// Points are mapped through the full homogeneous matrix; normals are
    /// rotated only.
    pub fn transform(&mut self, transformation: &[[f64; 4]; 4]) {
        let mut transformed = vec![[0.0; 3]; self.points.len()];
        transform_points3d(&self.points, transformation, &mut transformed);
        self.points = transformed;

        if let Some(normals) = &mut self.normals {
            let rotation = rotation_only(transformation);
            let mut rotated = vec![[0.0; 3]; normals.len()];
            transform_points3d(normals, &rotation, &mut rotated);
            *normals = rotated;
        }
    }
}

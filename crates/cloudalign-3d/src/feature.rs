/// Errors produced when constructing a feature matrix.
#[derive(thiserror::Error, Debug)]
pub enum FeatureError {
    /// The flat buffer length is not a multiple of the descriptor dimension.
    #[error("data length {len} is not a multiple of descriptor dimension {dim}")]
    InvalidShape {
        /// Length of the flat data buffer.
        len: usize,
        /// Descriptor dimensionality.
        dim: usize,
    },

    /// The descriptor dimension is zero.
    #[error("descriptor dimension must be non-zero")]
    ZeroDimension,
}

/// A descriptor matrix with one column per point.
///
/// Column `i` is the descriptor of point `i` of the cloud the feature was
/// computed from. Stored column-major in a flat buffer so a column is a
/// contiguous slice.
#[derive(Debug, Clone)]
pub struct Feature {
    dim: usize,
    data: Vec<f64>,
}

impl Feature {
    /// Create a feature matrix from a column-major flat buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if `dim` is zero or `data.len()` is not a
    /// multiple of `dim`.
    pub fn from_vec(dim: usize, data: Vec<f64>) -> Result<Self, FeatureError> {
        if dim == 0 {
            return Err(FeatureError::ZeroDimension);
        }
        if data.len() % dim != 0 {
            return Err(FeatureError::InvalidShape {
                len: data.len(),
                dim,
            });
        }
        Ok(Self { dim, data })
    }

    /// Descriptor dimensionality (number of rows).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of descriptors (number of columns).
    #[inline]
    pub fn num(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Check if the feature matrix has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The descriptor of point `i`.
    #[inline]
    pub fn col(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
}

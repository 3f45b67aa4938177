#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # CloudAlign 3D
//!
//! Data model and geometry kernel shared by the registration crates:
//! point cloud containers, feature descriptor matrices, and rigid
//! SE(3) transform operations.
//!
//! ## Example: Transforming a Point Cloud
//!
//! ```rust
//! use cloudalign_3d::pointcloud::PointCloud;
//!
//! let mut cloud = PointCloud::from_points(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
//!
//! // translate by (0.5, 0, 0)
//! let transform = [
//!     [1.0, 0.0, 0.0, 0.5],
//!     [0.0, 1.0, 0.0, 0.0],
//!     [0.0, 0.0, 1.0, 0.0],
//!     [0.0, 0.0, 0.0, 1.0],
//! ];
//! cloud.transform(&transform);
//! assert_eq!(cloud.points()[0], [1.5, 0.0, 0.0]);
//! ```

/// Feature descriptor matrices attached to point clouds.
pub mod feature;

/// Linear algebra for homogeneous SE(3) transforms.
pub mod linalg;

/// Small numeric helpers on 3D vectors.
pub mod ops;

/// Point cloud container and in-place rigid transforms.
pub mod pointcloud;

/// Rotation matrix constructions.
pub mod transforms;

/// Interop helpers between fixed-size arrays and faer views.
pub mod utils;

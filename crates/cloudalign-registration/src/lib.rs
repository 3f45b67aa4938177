#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # CloudAlign Registration
//!
//! Rigid registration of 3D point clouds: estimate the SE(3) transformation
//! aligning a source cloud onto a target cloud.
//!
//! The crate exposes five operations:
//!
//! - [`evaluate_registration`] - score a candidate transformation,
//! - [`registration_icp`] - Iterative Closest Point refinement,
//! - [`registration_ransac_from_correspondences`] - RANSAC over a supplied
//!   correspondence set,
//! - [`registration_ransac_from_features`] - RANSAC mining correspondences
//!   from feature-space nearest neighbors,
//! - [`information_matrix_from_result`] - the 6x6 Gauss-Newton information
//!   matrix of the pose about the target.
//!
//! None of them fail: invalid arguments and degenerate geometry are encoded
//! in the returned [`RegistrationResult`] (empty correspondences, zero
//! fitness and RMSE).
//!
//! ## Example
//!
//! ```
//! use cloudalign_3d::pointcloud::PointCloud;
//! use cloudalign_3d::linalg::IDENTITY;
//! use cloudalign_registration::evaluate_registration;
//!
//! let cloud = PointCloud::from_points(vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//! ]);
//! let result = evaluate_registration(&cloud, &cloud, 0.5, &IDENTITY);
//! assert_eq!(result.fitness, 1.0);
//! assert_eq!(result.inlier_rmse, 0.0);
//! ```

/// Geometric validity checks applied to sampled correspondences.
pub mod checker;

/// Rigid transformation estimators over matched point pairs.
pub mod estimation;

/// Correspondence discovery and scoring of candidate transformations.
pub mod evaluation;

/// Iterative Closest Point refinement.
pub mod icp;

/// Pose information matrix about the target cloud.
pub mod information;

/// Internal small-matrix kernels shared by the estimators.
mod ops;

/// RANSAC drivers over correspondences and feature matches.
pub mod ransac;

/// Registration results and convergence criteria.
pub mod result;

/// Nearest-neighbor search over points and feature descriptors.
pub mod search;

pub use evaluation::evaluate_registration;
pub use icp::registration_icp;
pub use information::information_matrix_from_result;
pub use ransac::{registration_ransac_from_correspondences, registration_ransac_from_features};
pub use result::{
    CorrespondenceSet, ICPConvergenceCriteria, RANSACConvergenceCriteria, RegistrationResult,
};

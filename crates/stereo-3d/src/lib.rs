#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera projection matrices and point projection.
pub mod camera;

/// Small dense linear algebra helpers on fixed-size arrays.
pub mod linalg;

/// Two-view pose estimation algorithms.
pub mod pose;

/// Triangulation of 3D points from two views.
pub mod triangulate;

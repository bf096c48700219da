//! # Pose estimation
//!
//! Two-view geometry: recovering the relative camera pose from 2D
//! correspondences.
//!
//! - [`fundamental`] — normalized 8-point fundamental matrix solver and
//!   epipolar distances (pixel space)
//! - [`ransac`] — robust fundamental estimation over minimal samples
//! - [`essential`] — essential matrix derivation, decomposition, and
//!   cheirality-based hypothesis selection

mod fundamental;
pub use fundamental::*;

mod ransac;
pub use ransac::*;

mod essential;
pub use essential::*;

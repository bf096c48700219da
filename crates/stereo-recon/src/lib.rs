#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Calibration file parsing and intrinsic estimation.
pub mod calib;

/// Correspondence discovery between a stereo image pair.
pub mod correspond;

/// Pipeline error taxonomy.
pub mod error;

/// Reconstruction quality metrics.
pub mod metrics;

/// The reconstruction pipeline.
pub mod pipeline;

pub use crate::calib::{estimate_intrinsics, parse_calibration, CalibrationError};
pub use crate::correspond::{
    find_correspondences, find_correspondences_with, Correspondences, FeatureBackend, OrbBackend,
};
pub use crate::error::ReconstructionError;
pub use crate::metrics::{compute_metrics, ReconstructionMetrics};
pub use crate::pipeline::{
    reconstruct, reconstruct_with, recover_pose, PoseSelection, Reconstruction,
    ReconstructionConfig, RecoveredPose,
};

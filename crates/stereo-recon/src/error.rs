use stereo_image::ImageError;

/// Errors raised by the reconstruction pipeline.
///
/// Every variant except [`ReconstructionError::Image`] is caused by the
/// client's input (untextured images, degenerate geometry); the boundary
/// layer maps those to a client-error status and everything else to an
/// internal error.
#[derive(thiserror::Error, Debug)]
pub enum ReconstructionError {
    /// Fewer than 8 keypoints detected in either image.
    #[error("Insufficient keypoints detected. Ensure images have clear texture.")]
    InsufficientKeypoints,

    /// Fewer than 8 correspondences survived the ratio test.
    #[error("Too few good matches ({found}). Need at least 8 for fundamental matrix estimation.")]
    TooFewMatches {
        /// Number of matches that survived the ratio test.
        found: usize,
    },

    /// Robust fundamental estimation or pose recovery failed.
    #[error("Fundamental matrix estimation failed: {0}")]
    EstimationFailed(String),

    /// An internal image buffer operation failed.
    #[error(transparent)]
    Image(#[from] ImageError),
}

impl ReconstructionError {
    /// Whether the failure is attributable to the client's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Image(_))
    }
}

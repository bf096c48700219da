use serde::Serialize;
use stereo_3d::camera::{normalize_points, projection_canonical, projection_from_krt};
use stereo_3d::pose::{
    decompose_essential, essential_from_fundamental, ransac_fundamental,
    select_pose_by_cheirality, RansacParams,
};
use stereo_3d::triangulate::triangulate_points;
use stereo_image::Image;

use crate::correspond::{
    find_correspondences_with, Correspondences, FeatureBackend, OrbBackend, DEFAULT_RATIO,
};
use crate::error::ReconstructionError;
use crate::metrics::{compute_metrics, ReconstructionMetrics};

/// How the (R, t) hypothesis is chosen from the essential decomposition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoseSelection {
    /// Commit to the second rotation candidate and the translation as-is,
    /// matching a known-rig assumption.
    #[default]
    SecondRotation,
    /// Pick the hypothesis under which the most points triangulate with
    /// positive depth in both cameras (cheirality check); the general
    /// solution when the rig configuration is unknown.
    Cheirality,
}

/// Configuration of a reconstruction run.
#[derive(Clone, Copy, Debug)]
pub struct ReconstructionConfig {
    /// RANSAC settings for the fundamental matrix fit.
    pub ransac: RansacParams,
    /// Lowe's ratio test threshold for accepting matches.
    pub ratio: f32,
    /// Pose hypothesis selection strategy.
    pub pose_selection: PoseSelection,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            ransac: RansacParams::default(),
            ratio: DEFAULT_RATIO,
            pose_selection: PoseSelection::default(),
        }
    }
}

/// Relative pose and projection matrices of the stereo pair.
#[derive(Clone, Copy, Debug)]
pub struct RecoveredPose {
    /// Projection matrix of camera 1 (`K1 · [I | 0]`).
    pub p1: [[f64; 4]; 3],
    /// Projection matrix of camera 2 (`K2 · [R | t]`).
    pub p2: [[f64; 4]; 3],
    /// Relative rotation of camera 2.
    pub rotation: [[f64; 3]; 3],
    /// Relative translation direction of camera 2.
    pub translation: [f64; 3],
}

/// Result of a successful reconstruction run.
#[derive(Clone, Debug, Serialize)]
pub struct Reconstruction {
    /// Triangulated 3D points, one per inlier correspondence.
    pub points: Vec<[f64; 3]>,
    /// Per-point RGB color in [0, 1], sampled from image 1.
    pub colors: Vec<[f64; 3]>,
    /// Quality metrics of the run.
    pub metrics: ReconstructionMetrics,
}

/// Run the full reconstruction pipeline with the default backend and
/// configuration.
///
/// # Arguments
///
/// * `img1` - Left stereo image (RGB8).
/// * `img2` - Right stereo image (RGB8).
/// * `k1` - Intrinsic matrix of camera 1.
/// * `k2` - Intrinsic matrix of camera 2.
pub fn reconstruct(
    img1: &Image<u8, 3>,
    img2: &Image<u8, 3>,
    k1: &[[f64; 3]; 3],
    k2: &[[f64; 3]; 3],
) -> Result<Reconstruction, ReconstructionError> {
    reconstruct_with(
        &OrbBackend::default(),
        img1,
        img2,
        k1,
        k2,
        &ReconstructionConfig::default(),
    )
}

/// Run the full reconstruction pipeline.
///
/// The pipeline is a chain of pure stages, each consuming the previous
/// stage's output: correspondence discovery, RANSAC fundamental estimation,
/// inlier filtering, pose recovery, pixel normalization, DLT triangulation
/// and metrics. The first failing stage propagates immediately; no partial
/// results are returned and nothing is retried.
pub fn reconstruct_with<B: FeatureBackend>(
    backend: &B,
    img1: &Image<u8, 3>,
    img2: &Image<u8, 3>,
    k1: &[[f64; 3]; 3],
    k2: &[[f64; 3]; 3],
    config: &ReconstructionConfig,
) -> Result<Reconstruction, ReconstructionError> {
    let correspondences = find_correspondences_with(backend, img1, img2, config.ratio)?;

    let ransac = ransac_fundamental(
        &correspondences.points1,
        &correspondences.points2,
        &config.ransac,
    )
    .map_err(|e| ReconstructionError::EstimationFailed(e.to_string()))?;
    log::info!(
        "Inliers after RANSAC: {} / {}",
        ransac.inlier_count,
        correspondences.raw_match_count
    );

    let (pixel_pts1, pixel_pts2, colors) = filter_inliers(&correspondences, &ransac.inliers);

    let norm_pts1 = normalize_points(&pixel_pts1, k1)
        .map_err(|e| ReconstructionError::EstimationFailed(e.to_string()))?;
    let norm_pts2 = normalize_points(&pixel_pts2, k2)
        .map_err(|e| ReconstructionError::EstimationFailed(e.to_string()))?;

    let pose = recover_pose(
        &ransac.model,
        k1,
        k2,
        &norm_pts1,
        &norm_pts2,
        config.pose_selection,
    )?;

    let points = triangulate_points(&norm_pts1, &norm_pts2, &pose.p1, &pose.p2);
    debug_assert_eq!(points.len(), colors.len());

    let metrics = compute_metrics(
        &points,
        k2,
        &pose.rotation,
        &pose.translation,
        &pixel_pts2,
        correspondences.raw_match_count,
        ransac.inlier_count,
    );

    Ok(Reconstruction {
        points,
        colors,
        metrics,
    })
}

/// Recover the relative pose and projection matrices from a fundamental
/// matrix.
///
/// Derives `E = K1ᵀ · F · K2`, decomposes it and selects an (R, t)
/// hypothesis per `selection`. Camera 1 is fixed at the world origin with
/// canonical orientation.
pub fn recover_pose(
    f: &[[f64; 3]; 3],
    k1: &[[f64; 3]; 3],
    k2: &[[f64; 3]; 3],
    norm_pts1: &[[f64; 2]],
    norm_pts2: &[[f64; 2]],
    selection: PoseSelection,
) -> Result<RecoveredPose, ReconstructionError> {
    let e = essential_from_fundamental(f, k1, k2);
    let decomposition = decompose_essential(&e)
        .map_err(|e| ReconstructionError::EstimationFailed(e.to_string()))?;

    let (rotation, translation) = match selection {
        PoseSelection::SecondRotation => (decomposition.r2, decomposition.t),
        PoseSelection::Cheirality => {
            select_pose_by_cheirality(norm_pts1, norm_pts2, &decomposition)
        }
    };

    Ok(RecoveredPose {
        p1: projection_canonical(k1),
        p2: projection_from_krt(k2, &rotation, &translation),
        rotation,
        translation,
    })
}

fn filter_inliers(
    correspondences: &Correspondences,
    inliers: &[bool],
) -> (Vec<[f64; 2]>, Vec<[f64; 2]>, Vec<[f64; 3]>) {
    let mut pts1 = Vec::new();
    let mut pts2 = Vec::new();
    let mut colors = Vec::new();
    for (i, &keep) in inliers.iter().enumerate() {
        if keep {
            pts1.push(correspondences.points1[i]);
            pts2.push(correspondences.points2[i]);
            colors.push(correspondences.colors[i]);
        }
    }
    (pts1, pts2, colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_inliers_keeps_mask_order() {
        let correspondences = Correspondences {
            points1: vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
            points2: vec![[0.1, 0.0], [1.1, 1.0], [2.1, 2.0]],
            colors: vec![[0.0; 3], [0.5; 3], [1.0; 3]],
            raw_match_count: 3,
        };
        let (p1, p2, c) = filter_inliers(&correspondences, &[true, false, true]);
        assert_eq!(p1, vec![[0.0, 0.0], [2.0, 2.0]]);
        assert_eq!(p2, vec![[0.1, 0.0], [2.1, 2.0]]);
        assert_eq!(c, vec![[0.0; 3], [1.0; 3]]);
    }
}

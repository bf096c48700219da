use serde::Serialize;
use stereo_3d::camera::project_points;
use stereo_3d::linalg::norm3;

/// Quality metrics of a reconstruction run.
#[derive(Clone, Debug, Serialize)]
pub struct ReconstructionMetrics {
    /// Mean reprojection error onto the camera-2 image plane, in pixels.
    pub reprojection_rmse: f64,
    /// Number of matches that survived the ratio test.
    pub num_keypoints_matched: usize,
    /// Number of inlier correspondences after RANSAC filtering.
    pub num_inliers: usize,
    /// Fraction of matches that survived RANSAC filtering, in [0, 1].
    pub inlier_ratio: f64,
    /// Number of triangulated 3D points.
    pub num_3d_points: usize,
    /// Magnitude of the camera-to-camera translation vector.
    pub baseline_length: f64,
    /// Mean Z coordinate of the point cloud.
    pub mean_depth: f64,
    /// Max Z minus min Z of the point cloud.
    pub depth_range: f64,
}

/// Compute the metrics record for a completed reconstruction.
///
/// Every 3D point is reprojected through camera 2 (rotate, translate, apply
/// intrinsics, perspective-divide) and compared with the originally observed
/// pixel position in image 2.
///
/// Precondition: `points` and `observed_px2` are non-empty and of equal
/// length (guaranteed upstream by the 8-inlier minimum).
pub fn compute_metrics(
    points: &[[f64; 3]],
    k2: &[[f64; 3]; 3],
    r2: &[[f64; 3]; 3],
    t2: &[f64; 3],
    observed_px2: &[[f64; 2]],
    raw_match_count: usize,
    inlier_count: usize,
) -> ReconstructionMetrics {
    let projected = project_points(points, r2, t2, k2);

    let n = points.len() as f64;
    let reprojection_rmse = projected
        .iter()
        .zip(observed_px2.iter())
        .map(|(p, o)| {
            let dx = p[0] - o[0];
            let dy = p[1] - o[1];
            (dx * dx + dy * dy).sqrt()
        })
        .sum::<f64>()
        / n;

    let depths: Vec<f64> = points.iter().map(|p| p[2]).collect();
    let mean_depth = depths.iter().sum::<f64>() / n;
    let max_depth = depths.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_depth = depths.iter().cloned().fold(f64::INFINITY, f64::min);

    ReconstructionMetrics {
        reprojection_rmse,
        num_keypoints_matched: raw_match_count,
        num_inliers: inlier_count,
        inlier_ratio: round4(inlier_count as f64 / raw_match_count.max(1) as f64),
        num_3d_points: points.len(),
        baseline_length: norm3(t2),
        mean_depth,
        depth_range: max_depth - min_depth,
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[test]
    fn perfect_reprojection_has_zero_rmse() {
        let t = [0.0, 0.0, 0.0];
        let points = vec![[0.2, 0.4, 2.0], [-0.3, 0.1, 5.0]];
        let observed: Vec<[f64; 2]> = points
            .iter()
            .map(|p| [p[0] / p[2], p[1] / p[2]])
            .collect();

        let m = compute_metrics(&points, &IDENTITY, &IDENTITY, &t, &observed, 10, 2);
        assert_relative_eq!(m.reprojection_rmse, 0.0);
        assert_eq!(m.num_3d_points, 2);
        assert_relative_eq!(m.inlier_ratio, 0.2);
        assert_relative_eq!(m.mean_depth, 3.5);
        assert_relative_eq!(m.depth_range, 3.0);
        assert_relative_eq!(m.baseline_length, 0.0);
    }

    #[test]
    fn ratio_is_rounded_to_four_decimals() {
        let points = vec![[0.0, 0.0, 1.0]];
        let observed = vec![[0.0, 0.0]];
        let m = compute_metrics(
            &points,
            &IDENTITY,
            &IDENTITY,
            &[0.0, 0.0, 0.0],
            &observed,
            3,
            1,
        );
        assert_relative_eq!(m.inlier_ratio, 0.3333);
    }

    #[test]
    fn ratio_guard_against_zero_matches() {
        let points = vec![[0.0, 0.0, 1.0]];
        let observed = vec![[0.0, 0.0]];
        let m = compute_metrics(
            &points,
            &IDENTITY,
            &IDENTITY,
            &[1.0, 0.0, 0.0],
            &observed,
            0,
            0,
        );
        assert_relative_eq!(m.inlier_ratio, 0.0);
        assert_relative_eq!(m.baseline_length, 1.0);
    }
}

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::pose::fundamental::{epipolar_distance, fundamental_8point};

/// Minimal sample size of the 8-point fundamental solver.
const SAMPLE_SIZE: usize = 8;

/// Errors returned by the robust estimator.
#[derive(thiserror::Error, Debug)]
pub enum RansacError {
    /// Input correspondences are invalid or insufficient.
    #[error("Need at least {required} correspondences and equal lengths")]
    InvalidInput {
        /// Minimum required correspondences for the model.
        required: usize,
    },
    /// No model reached the minimum inlier support.
    #[error("RANSAC failed to find a valid model")]
    NoConsensus,
}

/// Parameters for RANSAC fundamental matrix estimation.
#[derive(Clone, Copy, Debug)]
pub struct RansacParams {
    /// Upper bound on the number of iterations.
    pub max_iterations: usize,
    /// Inlier threshold on the symmetric epipolar distance, in pixels.
    pub threshold: f64,
    /// Desired confidence that at least one all-inlier sample was drawn.
    pub confidence: f64,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            threshold: 3.0,
            confidence: 0.99,
            random_seed: Some(0),
        }
    }
}

/// Result of a RANSAC fundamental matrix fit.
#[derive(Clone, Debug)]
pub struct RansacResult {
    /// Estimated fundamental matrix.
    pub model: [[f64; 3]; 3],
    /// Per-correspondence inlier mask.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Sum of inlier distances (lower is better).
    pub score: f64,
}

/// Estimate a fundamental matrix with RANSAC using the 8-point solver.
///
/// Repeatedly samples minimal subsets, scores every correspondence by its
/// symmetric epipolar distance against `params.threshold` and keeps the
/// candidate with the largest support. The iteration budget shrinks
/// adaptively once a model with a high inlier ratio is found, following
/// `N = log(1 - confidence) / log(1 - w^8)`.
pub fn ransac_fundamental(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    params: &RansacParams,
) -> Result<RansacResult, RansacError> {
    if x1.len() != x2.len() || x1.len() < SAMPLE_SIZE {
        return Err(RansacError::InvalidInput {
            required: SAMPLE_SIZE,
        });
    }

    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    };

    let n = x1.len();
    let mut best_model = None;
    let mut best_inliers = Vec::new();
    let mut best_count = 0usize;
    let mut best_score = f64::INFINITY;

    let mut required_iterations = params.max_iterations;
    let mut iteration = 0usize;
    while iteration < required_iterations {
        iteration += 1;

        let sample = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        let mut s1 = Vec::with_capacity(SAMPLE_SIZE);
        let mut s2 = Vec::with_capacity(SAMPLE_SIZE);
        for idx in sample.iter() {
            s1.push(x1[idx]);
            s2.push(x2[idx]);
        }
        let f = match fundamental_8point(&s1, &s2) {
            Ok(f) => f,
            Err(_) => continue,
        };

        let mut inliers = vec![false; n];
        let mut count = 0usize;
        let mut score = 0.0f64;
        for i in 0..n {
            let d = epipolar_distance(&f, &x1[i], &x2[i]);
            if d <= params.threshold {
                inliers[i] = true;
                count += 1;
                score += d;
            }
        }

        if count > best_count || (count == best_count && score < best_score) {
            best_model = Some(f);
            best_inliers = inliers;
            best_count = count;
            best_score = score;

            if let Some(required) = required_iterations_for(
                params.confidence,
                best_count as f64 / n as f64,
                SAMPLE_SIZE,
            ) {
                required_iterations = required_iterations.min(required.max(iteration));
            }
        }
    }

    let model = match best_model {
        Some(m) if best_count >= SAMPLE_SIZE => m,
        _ => return Err(RansacError::NoConsensus),
    };

    Ok(RansacResult {
        model,
        inliers: best_inliers,
        inlier_count: best_count,
        score: best_score,
    })
}

/// Number of iterations needed to draw one all-inlier sample with the given
/// confidence, or `None` when the ratio gives no finite bound.
fn required_iterations_for(confidence: f64, inlier_ratio: f64, sample_size: usize) -> Option<usize> {
    if !(0.0..1.0).contains(&inlier_ratio) || inlier_ratio == 0.0 {
        // all-inlier: a single sample suffices for any confidence
        if inlier_ratio >= 1.0 {
            return Some(1);
        }
        return None;
    }

    let p_good_sample = inlier_ratio.powi(sample_size as i32);
    if p_good_sample <= 0.0 || p_good_sample >= 1.0 {
        return None;
    }

    let log_one_minus_conf = (1.0 - confidence).ln();
    let log_one_minus_p = (1.0 - p_good_sample).ln();
    if !log_one_minus_conf.is_finite() || !log_one_minus_p.is_finite() {
        return None;
    }

    Some((log_one_minus_conf / log_one_minus_p).ceil().max(1.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::mat33_vec3;

    fn synthetic_correspondences(n: usize) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
        let f_true = [
            [0.0, -0.001, 0.01],
            [0.0015, 0.0, -0.02],
            [-0.01, 0.02, 1.0],
        ];
        // scattered (non-collinear) first-image points; second-image points
        // sampled on the epipolar line at a varying height
        let mut x1 = Vec::new();
        let mut x2 = Vec::new();
        for i in 0..n {
            let xi = i as f64 * 1.2 - 10.0 + 3.1 * ((7 * i) % 5) as f64;
            let yi = i as f64 * -0.8 + 5.0 + 2.3 * ((3 * i) % 4) as f64;
            let l = mat33_vec3(&f_true, &[xi, yi, 1.0]);
            let yp = (i as f64 * 0.37) % 9.0 - 4.0;
            let xp = -(l[1] * yp + l[2]) / l[0];
            x1.push([xi, yi]);
            x2.push([xp, yp]);
        }
        (x1, x2)
    }

    #[test]
    fn all_inliers_on_perfect_data() -> Result<(), RansacError> {
        let (x1, x2) = synthetic_correspondences(50);
        let params = RansacParams::default();
        let res = ransac_fundamental(&x1, &x2, &params)?;
        assert_eq!(res.inlier_count, 50);
        assert!(res.inliers.iter().all(|&b| b));
        Ok(())
    }

    #[test]
    fn outliers_are_rejected() -> Result<(), RansacError> {
        let (mut x1, mut x2) = synthetic_correspondences(40);
        // corrupt a minority of correspondences
        for i in 0..8 {
            x2[i * 5] = [500.0 + i as f64 * 13.0, 700.0 - i as f64 * 29.0];
            x1[i * 5] = [-300.0 + i as f64 * 7.0, 200.0 + i as f64 * 11.0];
        }
        let params = RansacParams::default();
        let res = ransac_fundamental(&x1, &x2, &params)?;
        assert!(res.inlier_count >= 30);
        assert!(res.inlier_count < 40);
        Ok(())
    }

    #[test]
    fn fixed_seed_is_deterministic() -> Result<(), RansacError> {
        let (x1, x2) = synthetic_correspondences(30);
        let params = RansacParams::default();
        let a = ransac_fundamental(&x1, &x2, &params)?;
        let b = ransac_fundamental(&x1, &x2, &params)?;
        assert_eq!(a.inliers, b.inliers);
        assert_eq!(a.model, b.model);
        Ok(())
    }

    #[test]
    fn too_few_points_rejected() {
        let pts = vec![[0.0, 0.0]; 5];
        let err = ransac_fundamental(&pts, &pts, &RansacParams::default());
        assert!(matches!(err, Err(RansacError::InvalidInput { .. })));
    }
}

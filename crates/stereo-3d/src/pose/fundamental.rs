use crate::linalg::{faer_to_mat33, mat33_to_faer, mat33_vec3, transpose33};

/// Errors returned by the fundamental matrix solver.
#[derive(thiserror::Error, Debug)]
pub enum FundamentalError {
    /// Input correspondences are invalid or insufficient.
    #[error("Need at least {required} correspondences and equal lengths")]
    InvalidInput {
        /// Minimum required correspondences.
        required: usize,
    },
}

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// - `x1`: points in image 1 as `&[[f64; 2]]` (length >= 8)
/// - `x2`: corresponding points in image 2 as `&[[f64; 2]]` (same length)
///
/// The solution satisfies `x2ᵀ · F · x1 ≈ 0` for noise-free correspondences
/// and is rank-2 by construction.
pub fn fundamental_8point(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
) -> Result<[[f64; 3]; 3], FundamentalError> {
    if x1.len() != x2.len() || x1.len() < 8 {
        return Err(FundamentalError::InvalidInput { required: 8 });
    }

    // Normalize points with similarity transforms T1, T2 so coordinates have
    // zero mean and unit average distance.
    let (x1n, t1) = normalize_points_2d(x1);
    let (x2n, t2) = normalize_points_2d(x2);

    // Build design matrix A (N x 9) for x2' * F * x1 = 0
    let n = x1n.len();
    let mut a = faer::Mat::<f64>::zeros(n, 9);
    for i in 0..n {
        let (x, y) = (x1n[i][0], x1n[i][1]);
        let (xp, yp) = (x2n[i][0], x2n[i][1]);
        a.write(i, 0, xp * x);
        a.write(i, 1, xp * y);
        a.write(i, 2, xp);
        a.write(i, 3, yp * x);
        a.write(i, 4, yp * y);
        a.write(i, 5, yp);
        a.write(i, 6, x);
        a.write(i, 7, y);
        a.write(i, 8, 1.0);
    }

    // Solve Af = 0 via SVD: take last column of V
    let svd = a.svd();
    let fvec = svd.v().col(8);
    let f = faer::mat![
        [fvec[0], fvec[1], fvec[2]],
        [fvec[3], fvec[4], fvec[5]],
        [fvec[6], fvec[7], fvec[8]]
    ];

    // Enforce the rank-2 constraint by removing the smallest singular
    // component: F - σ₃·u₃·v₃ᵀ, with σ₃ = u₃ᵀ·F·v₃.
    let fsvd = f.svd();
    let u3 = fsvd.u().col(2);
    let v3 = fsvd.v().col(2);
    let mut sigma3 = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            sigma3 += u3[i] * f.read(i, j) * v3[j];
        }
    }
    let mut f_rank2 = faer::Mat::<f64>::zeros(3, 3);
    for i in 0..3 {
        for j in 0..3 {
            f_rank2.write(i, j, f.read(i, j) - sigma3 * u3[i] * v3[j]);
        }
    }

    // Denormalize: F = T2ᵀ * F * T1
    let t1_m = mat33_to_faer(&t1);
    let t2_m = mat33_to_faer(&t2);
    let f_denorm = t2_m.transpose() * f_rank2 * t1_m;
    Ok(faer_to_mat33(f_denorm.as_ref()))
}

/// Symmetric epipolar distance of a correspondence to a fundamental matrix,
/// in pixels.
///
/// Returns the larger of the two point-to-epipolar-line distances, or
/// infinity when an epipolar line degenerates.
pub fn epipolar_distance(f: &[[f64; 3]; 3], p1: &[f64; 2], p2: &[f64; 2]) -> f64 {
    let x1 = [p1[0], p1[1], 1.0];
    let x2 = [p2[0], p2[1], 1.0];

    // line in image 2 for p1, line in image 1 for p2
    let l2 = mat33_vec3(f, &x1);
    let l1 = mat33_vec3(&transpose33(f), &x2);

    // x2ᵀ·F·x1 is the shared residual of both line equations
    let residual = (x2[0] * l2[0] + x2[1] * l2[1] + l2[2]).abs();

    let n2 = (l2[0] * l2[0] + l2[1] * l2[1]).sqrt();
    let n1 = (l1[0] * l1[0] + l1[1] * l1[1]).sqrt();
    if n1 < 1e-12 || n2 < 1e-12 {
        return f64::INFINITY;
    }

    (residual / n1).max(residual / n2)
}

fn normalize_points_2d(x: &[[f64; 2]]) -> (Vec<[f64; 2]>, [[f64; 3]; 3]) {
    let n = x.len();
    let (mut mx, mut my) = (0.0, 0.0);
    for p in x {
        mx += p[0];
        my += p[1];
    }
    mx /= n as f64;
    my /= n as f64;

    let mut mean_dist = 0.0;
    for p in x {
        let dx = p[0] - mx;
        let dy = p[1] - my;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n as f64;
    let scale = if mean_dist > 0.0 {
        (2.0f64).sqrt() / mean_dist
    } else {
        1.0
    };

    let mut xn = Vec::with_capacity(n);
    for p in x {
        xn.push([(p[0] - mx) * scale, (p[1] - my) * scale]);
    }

    // Similarity transform T = [[s,0,-s*mx],[0,s,-s*my],[0,0,1]]
    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    (xn, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_from_known_f(f_true: &[[f64; 3]; 3], x1: &[[f64; 2]]) -> Vec<[f64; 2]> {
        // For each x1, compute the epipolar line l2 = F x1 and pick the
        // point on it with y = 0.
        x1.iter()
            .map(|p| {
                let l = mat33_vec3(f_true, &[p[0], p[1], 1.0]);
                let xp = if l[0].abs() > 1e-12 { -l[2] / l[0] } else { 0.0 };
                [xp, 0.0]
            })
            .collect()
    }

    #[test]
    fn epipolar_constraint_holds() -> Result<(), FundamentalError> {
        let f_true = [
            [0.0, -0.001, 0.01],
            [0.0015, 0.0, -0.02],
            [-0.01, 0.02, 1.0],
        ];
        let x1 = vec![
            [10.0, 20.0],
            [30.0, -5.0],
            [-15.0, 12.0],
            [7.0, 8.0],
            [100.0, 50.0],
            [-40.0, 70.0],
            [60.0, -30.0],
            [15.0, 15.0],
        ];
        let x2 = points_from_known_f(&f_true, &x1);

        let f_est = fundamental_8point(&x1, &x2)?;

        for (p1, p2) in x1.iter().zip(x2.iter()) {
            let l = mat33_vec3(&f_est, &[p1[0], p1[1], 1.0]);
            let val = l[0] * p2[0] + l[1] * p2[1] + l[2];
            assert!(val.abs() < 1e-6, "residual {val}");
        }
        Ok(())
    }

    #[test]
    fn too_few_points_rejected() {
        let pts = vec![[0.0, 0.0]; 7];
        assert!(fundamental_8point(&pts, &pts).is_err());
    }

    #[test]
    fn distance_zero_for_perfect_correspondence() {
        let f_true = [
            [0.0, -0.001, 0.01],
            [0.0015, 0.0, -0.02],
            [-0.01, 0.02, 1.0],
        ];
        let x1 = [12.0, 34.0];
        let x2 = points_from_known_f(&f_true, &[x1])[0];
        let d = epipolar_distance(&f_true, &x1, &x2);
        assert!(d < 1e-9, "distance {d}");
    }
}

use crate::linalg::{det33, faer_to_mat33, mat33_to_faer, matmul33, transpose33};
use crate::triangulate::triangulate_point_dlt;

/// Errors returned when deriving or decomposing an essential matrix.
#[derive(thiserror::Error, Debug)]
pub enum EssentialError {
    /// The matrix has rank below 2 and cannot encode a relative pose.
    #[error("Essential matrix is rank deficient")]
    RankDeficient,
}

/// The two rotation candidates and translation direction of an essential
/// matrix decomposition.
///
/// The translation is recovered up to sign and scale; together with the two
/// rotations this spans the four classic (R, t) hypotheses, see
/// [`pose_candidates`].
#[derive(Clone, Copy, Debug)]
pub struct EssentialDecomposition {
    /// First rotation candidate.
    pub r1: [[f64; 3]; 3],
    /// Second rotation candidate.
    pub r2: [[f64; 3]; 3],
    /// Unit translation direction.
    pub t: [f64; 3],
}

/// Build an essential matrix from a fundamental matrix and camera
/// intrinsics.
///
/// This pipeline fixes the convention `E = K1ᵀ · F · K2`.
pub fn essential_from_fundamental(
    f: &[[f64; 3]; 3],
    k1: &[[f64; 3]; 3],
    k2: &[[f64; 3]; 3],
) -> [[f64; 3]; 3] {
    matmul33(&matmul33(&transpose33(k1), f), k2)
}

/// Decompose an essential matrix into two rotations and a translation
/// direction.
///
/// SVD-based decomposition with `det(U)`/`det(V)` sign correction, so both
/// returned rotations are proper (`det = +1`). Fails when the second
/// singular value vanishes (rank below 2).
pub fn decompose_essential(e: &[[f64; 3]; 3]) -> Result<EssentialDecomposition, EssentialError> {
    let e_m = mat33_to_faer(e);
    let svd = e_m.svd();

    // σₖ = uₖᵀ·E·vₖ recovers the k-th singular value from the factors
    let sigma = |k: usize| -> f64 {
        let uk = svd.u().col(k);
        let vk = svd.v().col(k);
        let mut s = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                s += uk[i] * e_m.read(i, j) * vk[j];
            }
        }
        s
    };
    if sigma(0) <= 0.0 || sigma(1) < 1e-9 * sigma(0) {
        return Err(EssentialError::RankDeficient);
    }

    let mut u = faer_to_mat33(svd.u());
    let mut v = faer_to_mat33(svd.v());

    if det33(&u) < 0.0 {
        for row in u.iter_mut() {
            row[2] = -row[2];
        }
    }
    if det33(&v) < 0.0 {
        for row in v.iter_mut() {
            row[2] = -row[2];
        }
    }

    let w = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    let vt = transpose33(&v);

    let r1 = matmul33(&matmul33(&u, &w), &vt);
    let r2 = matmul33(&matmul33(&u, &transpose33(&w)), &vt);
    let t = [u[0][2], u[1][2], u[2][2]];

    Ok(EssentialDecomposition { r1, r2, t })
}

/// The four (R, t) hypotheses spanned by a decomposition.
pub fn pose_candidates(dec: &EssentialDecomposition) -> [([[f64; 3]; 3], [f64; 3]); 4] {
    let t = dec.t;
    let t_neg = [-t[0], -t[1], -t[2]];
    [
        (dec.r2, t),
        (dec.r2, t_neg),
        (dec.r1, t),
        (dec.r1, t_neg),
    ]
}

/// Select the (R, t) hypothesis under which the most correspondences
/// triangulate with positive depth in both cameras (cheirality check).
///
/// Points must be in normalized camera coordinates. When no hypothesis
/// yields a positive-depth point, the committed default `(r2, t)` is
/// returned unchanged.
pub fn select_pose_by_cheirality(
    x1n: &[[f64; 2]],
    x2n: &[[f64; 2]],
    dec: &EssentialDecomposition,
) -> ([[f64; 3]; 3], [f64; 3]) {
    let p1 = identity_projection();

    let mut best = (dec.r2, dec.t);
    let mut best_count = 0usize;

    for (r, t) in pose_candidates(dec) {
        let p2 = extrinsic_projection(&r, &t);
        let mut count = 0usize;
        for (pt1, pt2) in x1n.iter().zip(x2n.iter()) {
            let x = triangulate_point_dlt(pt1, pt2, &p1, &p2);
            if !x.iter().all(|c| c.is_finite()) {
                continue;
            }
            let z1 = x[2];
            let z2 = r[2][0] * x[0] + r[2][1] * x[1] + r[2][2] * x[2] + t[2];
            if z1 > 0.0 && z2 > 0.0 {
                count += 1;
            }
        }
        if count > best_count {
            best_count = count;
            best = (r, t);
        }
    }

    best
}

fn identity_projection() -> [[f64; 4]; 3] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ]
}

fn extrinsic_projection(r: &[[f64; 3]; 3], t: &[f64; 3]) -> [[f64; 4]; 3] {
    [
        [r[0][0], r[0][1], r[0][2], t[0]],
        [r[1][0], r[1][1], r[1][2], t[1]],
        [r[2][0], r[2][1], r[2][2], t[2]],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::norm3;

    fn skew(t: &[f64; 3]) -> [[f64; 3]; 3] {
        [
            [0.0, -t[2], t[1]],
            [t[2], 0.0, -t[0]],
            [-t[1], t[0], 0.0],
        ]
    }

    fn rotation_distance(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> f64 {
        let mut diff = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                diff += (a[i][j] - b[i][j]).abs();
            }
        }
        diff
    }

    #[test]
    fn decompose_identity_rotation() -> Result<(), EssentialError> {
        let r = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let t = [1.0, 0.0, 0.0];
        let e = matmul33(&skew(&t), &r);

        let dec = decompose_essential(&e)?;

        let mut found = false;
        for (rc, tc) in pose_candidates(&dec) {
            assert!((det33(&rc) - 1.0).abs() < 1e-6);
            let dot = (tc[0] * t[0] + tc[1] * t[1] + tc[2] * t[2]).abs();
            if dot > 0.9 && rotation_distance(&rc, &r) < 1e-6 {
                found = true;
            }
        }
        assert!(found);
        Ok(())
    }

    #[test]
    fn translation_is_unit_length() -> Result<(), EssentialError> {
        let t = [0.3, -0.2, 0.9];
        let r = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let e = matmul33(&skew(&t), &r);
        let dec = decompose_essential(&e)?;
        assert!((norm3(&dec.t) - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn zero_matrix_is_rank_deficient() {
        let e = [[0.0; 3]; 3];
        assert!(decompose_essential(&e).is_err());
    }

    #[test]
    fn cheirality_selects_forward_scene() -> Result<(), EssentialError> {
        // Scene in front of both cameras; camera 2 shifted along +x, so the
        // relative transform maps X2 = X1 + t with t = (-0.5, 0, 0).
        let r = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let t = [-0.5, 0.0, 0.0];

        let mut x1n = Vec::new();
        let mut x2n = Vec::new();
        for i in 0..10 {
            let x = [
                -0.6 + 0.13 * i as f64,
                0.4 - 0.09 * i as f64,
                2.0 + 0.21 * i as f64,
            ];
            let x2c = [x[0] + t[0], x[1] + t[1], x[2] + t[2]];
            x1n.push([x[0] / x[2], x[1] / x[2]]);
            x2n.push([x2c[0] / x2c[2], x2c[1] / x2c[2]]);
        }

        let e = matmul33(&skew(&t), &r);
        let dec = decompose_essential(&e)?;
        let (r_sel, t_sel) = select_pose_by_cheirality(&x1n, &x2n, &dec);

        assert!(rotation_distance(&r_sel, &r) < 1e-6);
        // selected translation points the same way as the true direction
        let dot = t_sel[0] * t[0] + t_sel[1] * t[1] + t_sel[2] * t[2];
        assert!(dot > 0.0);
        Ok(())
    }
}

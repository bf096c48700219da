use crate::linalg::{inverse33, mat33_vec3};

/// Errors raised when manipulating camera matrices.
#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    /// The intrinsic matrix is singular and cannot be inverted.
    #[error("Intrinsic matrix is singular")]
    SingularIntrinsics,
}

/// Build a 3x4 projection matrix `P = K * [R | t]`.
pub fn projection_from_krt(
    k: &[[f64; 3]; 3],
    r: &[[f64; 3]; 3],
    t: &[f64; 3],
) -> [[f64; 4]; 3] {
    let mut p = [[0.0; 4]; 3];
    for (i, row) in p.iter_mut().enumerate() {
        for j in 0..3 {
            row[j] = k[i][0] * r[0][j] + k[i][1] * r[1][j] + k[i][2] * r[2][j];
        }
        row[3] = k[i][0] * t[0] + k[i][1] * t[1] + k[i][2] * t[2];
    }
    p
}

/// Build the canonical first-camera projection `P = K * [I | 0]`.
pub fn projection_canonical(k: &[[f64; 3]; 3]) -> [[f64; 4]; 3] {
    let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    projection_from_krt(k, &identity, &[0.0, 0.0, 0.0])
}

/// Convert pixel coordinates to normalized camera coordinates.
///
/// Each point is lifted to homogeneous coordinates, multiplied by `K⁻¹` and
/// dehomogenized: `p_norm = dehomog(K⁻¹ · [x, y, 1]ᵀ)`.
pub fn normalize_points(
    points: &[[f64; 2]],
    k: &[[f64; 3]; 3],
) -> Result<Vec<[f64; 2]>, CameraError> {
    let k_inv = inverse33(k).ok_or(CameraError::SingularIntrinsics)?;
    Ok(points
        .iter()
        .map(|p| {
            let pn = mat33_vec3(&k_inv, &[p[0], p[1], 1.0]);
            [pn[0] / pn[2], pn[1] / pn[2]]
        })
        .collect())
}

/// Project 3D points into a camera's image plane.
///
/// Each point is transformed into the camera frame (`X_c = R·X + t`),
/// multiplied by the intrinsics and perspective-divided.
pub fn project_points(
    points: &[[f64; 3]],
    r: &[[f64; 3]; 3],
    t: &[f64; 3],
    k: &[[f64; 3]; 3],
) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|x| {
            let xc = mat33_vec3(r, x);
            let xc = [xc[0] + t[0], xc[1] + t[1], xc[2] + t[2]];
            let uvw = mat33_vec3(k, &xc);
            [uvw[0] / uvw[2], uvw[1] / uvw[2]]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const K: [[f64; 3]; 3] = [
        [800.0, 0.0, 320.0],
        [0.0, 800.0, 240.0],
        [0.0, 0.0, 1.0],
    ];

    #[test]
    fn canonical_projection_drops_translation() {
        let p = projection_canonical(&K);
        for (i, row) in p.iter().enumerate() {
            assert_eq!(row[3], 0.0);
            for j in 0..3 {
                assert_eq!(row[j], K[i][j]);
            }
        }
    }

    #[test]
    fn normalize_then_project_roundtrip() -> Result<(), CameraError> {
        let pixels = vec![[100.0, 50.0], [320.0, 240.0], [611.5, 403.25]];
        let normalized = normalize_points(&pixels, &K)?;

        // re-apply K manually
        for (px, pn) in pixels.iter().zip(normalized.iter()) {
            let u = K[0][0] * pn[0] + K[0][2];
            let v = K[1][1] * pn[1] + K[1][2];
            assert_relative_eq!(u, px[0], epsilon = 1e-9);
            assert_relative_eq!(v, px[1], epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn project_point_on_axis() {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let projected = project_points(&[[0.0, 0.0, 2.0]], &identity, &[0.0, 0.0, 0.0], &K);
        assert_relative_eq!(projected[0][0], 320.0);
        assert_relative_eq!(projected[0][1], 240.0);
    }

    #[test]
    fn singular_intrinsics_rejected() {
        let k_bad = [[0.0; 3]; 3];
        assert!(normalize_points(&[[1.0, 1.0]], &k_bad).is_err());
    }
}

/// Triangulate a single 3D point from two views via DLT.
///
/// Builds the 4x4 DLT system from the two projection matrices, forms
/// `B = AᵀA` and takes the last right-singular vector of B, dehomogenized.
///
/// Degenerate configurations (near-parallel rays) are not rejected here;
/// they surface as very large or non-finite coordinates and are reported
/// through depth metrics downstream.
///
/// # Arguments
///
/// * `pt1` - 2D point observed by camera 1.
/// * `pt2` - 2D point observed by camera 2.
/// * `p1` - 3x4 projection matrix of camera 1.
/// * `p2` - 3x4 projection matrix of camera 2.
pub fn triangulate_point_dlt(
    pt1: &[f64; 2],
    pt2: &[f64; 2],
    p1: &[[f64; 4]; 3],
    p2: &[[f64; 4]; 3],
) -> [f64; 3] {
    let mut a = [[0.0f64; 4]; 4];
    for j in 0..4 {
        a[0][j] = pt1[1] * p1[2][j] - p1[1][j];
        a[1][j] = p1[0][j] - pt1[0] * p1[2][j];
        a[2][j] = pt2[1] * p2[2][j] - p2[1][j];
        a[3][j] = p2[0][j] - pt2[0] * p2[2][j];
    }

    // B = AᵀA
    let mut b = faer::Mat::<f64>::zeros(4, 4);
    for i in 0..4 {
        for j in 0..4 {
            let mut sum = 0.0;
            for row in &a {
                sum += row[i] * row[j];
            }
            b.write(i, j, sum);
        }
    }

    let svd = b.svd();
    let xh = svd.v().col(3);
    let w = xh[3];
    [xh[0] / w, xh[1] / w, xh[2] / w]
}

/// Triangulate one 3D point per correspondence.
///
/// Cardinality invariant: the output has exactly one point per input pair.
pub fn triangulate_points(
    pts1: &[[f64; 2]],
    pts2: &[[f64; 2]],
    p1: &[[f64; 4]; 3],
    p2: &[[f64; 4]; 3],
) -> Vec<[f64; 3]> {
    pts1.iter()
        .zip(pts2.iter())
        .map(|(pt1, pt2)| triangulate_point_dlt(pt1, pt2, p1, p2))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{projection_canonical, projection_from_krt};
    use approx::assert_relative_eq;

    const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[test]
    fn recovers_known_points_normalized() {
        let r = IDENTITY;
        let t = [-1.0, 0.0, 0.0];
        let p1 = projection_canonical(&IDENTITY);
        let p2 = projection_from_krt(&IDENTITY, &r, &t);

        let points = [[0.5, -0.3, 4.0], [-1.0, 0.8, 6.5], [0.1, 0.1, 3.0]];
        for x in points {
            let x2c = [x[0] + t[0], x[1] + t[1], x[2] + t[2]];
            let pt1 = [x[0] / x[2], x[1] / x[2]];
            let pt2 = [x2c[0] / x2c[2], x2c[1] / x2c[2]];

            let est = triangulate_point_dlt(&pt1, &pt2, &p1, &p2);
            for (e, g) in est.iter().zip(x.iter()) {
                assert_relative_eq!(e, g, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn recovers_known_points_with_intrinsics() {
        let k = [
            [600.0, 0.0, 320.0],
            [0.0, 600.0, 240.0],
            [0.0, 0.0, 1.0],
        ];
        // small rotation about y plus a baseline
        let angle = 0.05f64;
        let (s, c) = angle.sin_cos();
        let r = [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]];
        let t = [-0.8, 0.1, 0.05];

        let p1 = projection_canonical(&k);
        let p2 = projection_from_krt(&k, &r, &t);

        let x = [0.4, -0.2, 5.0];
        let project = |p: &[[f64; 4]; 3], x: &[f64; 3]| -> [f64; 2] {
            let xh = [x[0], x[1], x[2], 1.0];
            let mut uvw = [0.0; 3];
            for (i, row) in p.iter().enumerate() {
                uvw[i] = row[0] * xh[0] + row[1] * xh[1] + row[2] * xh[2] + row[3] * xh[3];
            }
            [uvw[0] / uvw[2], uvw[1] / uvw[2]]
        };

        let pt1 = project(&p1, &x);
        let pt2 = project(&p2, &x);

        let est = triangulate_point_dlt(&pt1, &pt2, &p1, &p2);
        for (e, g) in est.iter().zip(x.iter()) {
            assert_relative_eq!(e, g, epsilon = 1e-6);
        }
    }

    #[test]
    fn one_point_per_correspondence() {
        let p1 = projection_canonical(&IDENTITY);
        let p2 = projection_from_krt(&IDENTITY, &IDENTITY, &[-1.0, 0.0, 0.0]);
        let pts1 = vec![[0.1, 0.1], [0.2, -0.1], [0.0, 0.3], [-0.2, 0.2]];
        let pts2 = vec![[0.05, 0.1], [0.15, -0.1], [-0.04, 0.3], [-0.25, 0.2]];
        let out = triangulate_points(&pts1, &pts2, &p1, &p2);
        assert_eq!(out.len(), pts1.len());
    }
}

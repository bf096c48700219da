use stereo_image::{Image, ImageError, ImageSize};

use crate::features::{
    fast_corner_score, fast_feature_detector, steered_brief_descriptor, BriefPattern, Descriptor,
};

/// Radius of the circular window used for the intensity-centroid orientation.
const ORIENTATION_RADIUS: i32 = 7;

/// A detected image keypoint in level-0 pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Keypoint {
    /// Column coordinate in pixels.
    pub x: f32,
    /// Row coordinate in pixels.
    pub y: f32,
    /// Corner response used for ranking.
    pub response: f32,
    /// Patch orientation in radians.
    pub angle: f32,
    /// Pyramid level the keypoint was detected on.
    pub octave: usize,
}

/// Multiscale oriented FAST detector with steered BRIEF descriptors.
///
/// Keypoints are detected on a dyadic image pyramid (scale invariance), each
/// keypoint gets an intensity-centroid orientation, and descriptors sample
/// the pattern rotated by that orientation (rotation invariance).
pub struct OrbDetector {
    /// Maximum number of keypoints to keep, ranked by corner response.
    pub n_keypoints: usize,
    /// FAST segment test intensity threshold.
    pub fast_threshold: u8,
    /// FAST segment test arc length.
    pub arc_length: u8,
    /// Number of pyramid levels.
    pub n_levels: usize,
    pattern: BriefPattern,
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self {
            n_keypoints: 1500,
            fast_threshold: 20,
            arc_length: 9,
            n_levels: 4,
            pattern: BriefPattern::default(),
        }
    }
}

impl OrbDetector {
    /// Create a detector with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect keypoints and extract their descriptors.
    ///
    /// # Arguments
    ///
    /// * `src` - The source image as Gray8 image.
    ///
    /// # Returns
    ///
    /// Keypoints in level-0 pixel coordinates and one descriptor per
    /// keypoint, ranked by corner response when more than `n_keypoints`
    /// candidates survive.
    pub fn detect(&self, src: &Image<u8, 1>) -> Result<(Vec<Keypoint>, Vec<Descriptor>), ImageError> {
        let margin = self.margin();
        let pyramid = self.build_pyramid(src, margin)?;

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();

        for (level, octave_image) in pyramid.iter().enumerate() {
            let scale = (1usize << level) as f32;
            let (level_kps, level_descs) = self.detect_octave(octave_image, margin)?;
            for (kp, desc) in level_kps.into_iter().zip(level_descs) {
                keypoints.push(Keypoint {
                    x: kp.x * scale,
                    y: kp.y * scale,
                    response: kp.response,
                    angle: kp.angle,
                    octave: level,
                });
                descriptors.push(desc);
            }
        }

        if keypoints.len() > self.n_keypoints {
            let mut indices: Vec<usize> = (0..keypoints.len()).collect();
            indices.sort_unstable_by(|&i, &j| {
                keypoints[j]
                    .response
                    .partial_cmp(&keypoints[i].response)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            indices.truncate(self.n_keypoints);

            let mut best_kps = Vec::with_capacity(self.n_keypoints);
            let mut best_descs = Vec::with_capacity(self.n_keypoints);
            for idx in indices {
                best_kps.push(keypoints[idx]);
                best_descs.push(descriptors[idx]);
            }
            keypoints = best_kps;
            descriptors = best_descs;
        }

        Ok((keypoints, descriptors))
    }

    fn margin(&self) -> i32 {
        (self.pattern.margin() as i32).max(ORIENTATION_RADIUS + 1)
    }

    fn build_pyramid(
        &self,
        src: &Image<u8, 1>,
        margin: i32,
    ) -> Result<Vec<Image<u8, 1>>, ImageError> {
        let min_dim = (2 * margin + 8) as usize;

        let mut pyramid = Vec::with_capacity(self.n_levels);
        let mut current = src.clone();
        pyramid.push(current.clone());

        for _ in 1..self.n_levels {
            if current.cols() / 2 < min_dim || current.rows() / 2 < min_dim {
                break;
            }
            let next = half_reduce(&current)?;
            pyramid.push(next.clone());
            current = next;
        }

        Ok(pyramid)
    }

    fn detect_octave(
        &self,
        octave_image: &Image<u8, 1>,
        margin: i32,
    ) -> Result<(Vec<Keypoint>, Vec<Descriptor>), ImageError> {
        let (cols, rows) = (octave_image.cols() as i32, octave_image.rows() as i32);
        let corners = fast_feature_detector(octave_image, self.fast_threshold, self.arc_length)?;

        // Score all corners so non-maximum suppression can rank neighbors.
        let mut score_map = vec![0.0f32; (cols * rows) as usize];
        let mut candidates = Vec::new();
        for [x, y] in corners {
            if x < margin || y < margin || x >= cols - margin || y >= rows - margin {
                continue;
            }
            let score = fast_corner_score(octave_image, x, y, self.fast_threshold);
            score_map[(y * cols + x) as usize] = score;
            candidates.push(([x, y], score));
        }

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        for ([x, y], score) in candidates {
            if !is_local_maximum(&score_map, cols, x, y, score) {
                continue;
            }
            let angle = intensity_centroid_angle(octave_image, x, y);
            let desc = steered_brief_descriptor(octave_image, x, y, angle, &self.pattern);
            keypoints.push(Keypoint {
                x: x as f32,
                y: y as f32,
                response: score,
                angle,
                octave: 0,
            });
            descriptors.push(desc);
        }

        Ok((keypoints, descriptors))
    }
}

/// Patch orientation from the intensity centroid of a circular window.
///
/// The angle points from the keypoint towards the centroid of the local
/// intensity mass, which follows the dominant gradient of the patch.
pub fn intensity_centroid_angle(src: &Image<u8, 1>, x: i32, y: i32) -> f32 {
    let cols = src.cols() as i32;
    let data = src.as_slice();

    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
            if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
                continue;
            }
            let v = data[((y + dy) * cols + (x + dx)) as usize] as i64;
            m10 += dx as i64 * v;
            m01 += dy as i64 * v;
        }
    }

    if m10 == 0 && m01 == 0 {
        return 0.0;
    }
    (m01 as f32).atan2(m10 as f32)
}

fn is_local_maximum(score_map: &[f32], cols: i32, x: i32, y: i32, score: f32) -> bool {
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            if score_map[((y + dy) * cols + (x + dx)) as usize] > score {
                return false;
            }
        }
    }
    true
}

fn half_reduce(src: &Image<u8, 1>) -> Result<Image<u8, 1>, ImageError> {
    let new_size = ImageSize {
        width: src.cols() / 2,
        height: src.rows() / 2,
    };
    let cols = src.cols();
    let data = src.as_slice();

    let mut out = Vec::with_capacity(new_size.width * new_size.height);
    for y in 0..new_size.height {
        for x in 0..new_size.width {
            let i = 2 * y * cols + 2 * x;
            let sum = data[i] as u16
                + data[i + 1] as u16
                + data[i + cols] as u16
                + data[i + cols + 1] as u16;
            out.push((sum / 4) as u8);
        }
    }

    Image::new(new_size, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_image(seed: u64, width: usize, height: usize) -> Image<u8, 1> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..width * height).map(|_| rng.random::<u8>()).collect();
        Image::new(ImageSize { width, height }, data).unwrap()
    }

    #[test]
    fn detect_is_deterministic() -> Result<(), ImageError> {
        let img = noise_image(3, 160, 120);
        let orb = OrbDetector::new();
        let (kps1, descs1) = orb.detect(&img)?;
        let (kps2, descs2) = orb.detect(&img)?;
        assert_eq!(kps1.len(), kps2.len());
        assert_eq!(descs1, descs2);
        Ok(())
    }

    #[test]
    fn keypoints_carry_descriptors() -> Result<(), ImageError> {
        let img = noise_image(4, 160, 120);
        let orb = OrbDetector::new();
        let (kps, descs) = orb.detect(&img)?;
        assert_eq!(kps.len(), descs.len());
        assert!(!kps.is_empty());
        for kp in &kps {
            assert!(kp.x >= 0.0 && kp.x < 160.0);
            assert!(kp.y >= 0.0 && kp.y < 120.0);
        }
        Ok(())
    }

    #[test]
    fn half_reduce_halves_dimensions() -> Result<(), ImageError> {
        let img = noise_image(5, 64, 48);
        let reduced = half_reduce(&img)?;
        assert_eq!(reduced.cols(), 32);
        assert_eq!(reduced.rows(), 24);
        Ok(())
    }
}

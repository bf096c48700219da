use stereo_image::{Image, ImageError};
use stereo_imgproc::color::gray_from_rgb_u8;
use stereo_imgproc::features::{
    knn_match_hamming, Descriptor, DescriptorMatch, Keypoint, OrbDetector,
};

use crate::error::ReconstructionError;

/// Minimum keypoints/matches required for fundamental matrix estimation.
pub const MIN_CORRESPONDENCES: usize = 8;

/// Default Lowe's ratio test threshold.
pub const DEFAULT_RATIO: f32 = 0.7;

/// Keypoints and descriptors detected in one image.
pub struct Features {
    /// Detected keypoints in pixel coordinates.
    pub keypoints: Vec<Keypoint>,
    /// One descriptor per keypoint.
    pub descriptors: Vec<Descriptor>,
}

/// Pluggable keypoint detection and matching capability.
///
/// The geometry stages only consume pixel-coordinate point pairs, so any
/// scale/rotation-invariant descriptor with a k-nearest-neighbor matcher can
/// be substituted here without touching them.
pub trait FeatureBackend {
    /// Detect keypoints and extract descriptors from an intensity image.
    fn detect(&self, image: &Image<u8, 1>) -> Result<Features, ImageError>;

    /// For every query descriptor, its `k` nearest train descriptors in
    /// ascending distance order.
    fn knn_match(&self, query: &Features, train: &Features, k: usize)
        -> Vec<Vec<DescriptorMatch>>;
}

/// Default backend: multiscale oriented FAST with steered BRIEF descriptors
/// and brute-force Hamming search.
#[derive(Default)]
pub struct OrbBackend {
    detector: OrbDetector,
}

impl FeatureBackend for OrbBackend {
    fn detect(&self, image: &Image<u8, 1>) -> Result<Features, ImageError> {
        let (keypoints, descriptors) = self.detector.detect(image)?;
        Ok(Features {
            keypoints,
            descriptors,
        })
    }

    fn knn_match(
        &self,
        query: &Features,
        train: &Features,
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>> {
        knn_match_hamming(&query.descriptors, &train.descriptors, k)
    }
}

/// Pixel-coordinate point pairs believed to depict the same scene points.
///
/// Produced once per run; downstream stages only ever filter it, never
/// extend it.
pub struct Correspondences {
    /// Matched points in image 1, pixel coordinates.
    pub points1: Vec<[f64; 2]>,
    /// Matched points in image 2, pixel coordinates.
    pub points2: Vec<[f64; 2]>,
    /// RGB color in [0, 1] sampled from image 1 at each match.
    pub colors: Vec<[f64; 3]>,
    /// Number of matches that survived the ratio test.
    pub raw_match_count: usize,
}

/// Find correspondences between a stereo pair with the default backend.
pub fn find_correspondences(
    img1: &Image<u8, 3>,
    img2: &Image<u8, 3>,
) -> Result<Correspondences, ReconstructionError> {
    find_correspondences_with(&OrbBackend::default(), img1, img2, DEFAULT_RATIO)
}

/// Find correspondences between a stereo pair.
///
/// Both images are converted to intensity, features are detected and matched
/// with a k=2 nearest-neighbor search, and a match is accepted only when its
/// best distance is below `ratio` times the second-best distance.
///
/// # Errors
///
/// [`ReconstructionError::InsufficientKeypoints`] when either image yields
/// fewer than 8 keypoints or no descriptors,
/// [`ReconstructionError::TooFewMatches`] when fewer than 8 matches survive
/// the ratio test.
pub fn find_correspondences_with<B: FeatureBackend>(
    backend: &B,
    img1: &Image<u8, 3>,
    img2: &Image<u8, 3>,
    ratio: f32,
) -> Result<Correspondences, ReconstructionError> {
    let mut gray1 = Image::from_size_val(img1.size(), 0u8)?;
    let mut gray2 = Image::from_size_val(img2.size(), 0u8)?;
    gray_from_rgb_u8(img1, &mut gray1)?;
    gray_from_rgb_u8(img2, &mut gray2)?;

    let features1 = backend.detect(&gray1)?;
    let features2 = backend.detect(&gray2)?;

    if features1.keypoints.len() < MIN_CORRESPONDENCES
        || features2.keypoints.len() < MIN_CORRESPONDENCES
        || features1.descriptors.is_empty()
        || features2.descriptors.is_empty()
    {
        return Err(ReconstructionError::InsufficientKeypoints);
    }

    let knn = backend.knn_match(&features1, &features2, 2);

    let (width, height) = (img1.cols(), img1.rows());
    let mut points1 = Vec::new();
    let mut points2 = Vec::new();
    let mut colors = Vec::new();

    for neighbors in &knn {
        let [best, second] = neighbors.as_slice() else {
            continue;
        };
        if (best.distance as f32) >= ratio * (second.distance as f32) {
            continue;
        }

        let kp1 = features1.keypoints[best.query];
        let kp2 = features2.keypoints[best.train];
        points1.push([kp1.x as f64, kp1.y as f64]);
        points2.push([kp2.x as f64, kp2.y as f64]);

        // sample image 1's color at the match, clamped to bounds
        let x = (kp1.x.max(0.0) as usize).min(width - 1);
        let y = (kp1.y.max(0.0) as usize).min(height - 1);
        let r = img1.get_pixel(x, y, 0)? as f64 / 255.0;
        let g = img1.get_pixel(x, y, 1)? as f64 / 255.0;
        let b = img1.get_pixel(x, y, 2)? as f64 / 255.0;
        colors.push([r, g, b]);
    }

    let raw_match_count = points1.len();
    log::info!("Good matches after ratio test: {raw_match_count}");

    if raw_match_count < MIN_CORRESPONDENCES {
        return Err(ReconstructionError::TooFewMatches {
            found: raw_match_count,
        });
    }

    Ok(Correspondences {
        points1,
        points2,
        colors,
        raw_match_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_image::ImageSize;

    #[test]
    fn uniform_images_lack_keypoints() {
        let size = ImageSize {
            width: 128,
            height: 96,
        };
        let img1 = Image::from_size_val(size, 90u8).unwrap();
        let img2 = Image::from_size_val(size, 90u8).unwrap();

        let err = find_correspondences(&img1, &img2);
        assert!(matches!(
            err,
            Err(ReconstructionError::InsufficientKeypoints)
        ));
    }
}

use rayon::prelude::*;
use stereo_image::{Image, ImageError};

/// Offsets of the 16-pixel Bresenham circle of radius 3, clockwise from the
/// top, as (dx, dy) pairs.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// FAST feature detector
///
/// # Arguments
///
/// * `src` - The source image as Gray8 image.
/// * `threshold` - Intensity difference threshold for the segment test.
/// * `arc_length` - Number of consecutive circle pixels that must all be
///   brighter or darker than the center pixel.
///
/// # Returns
///
/// A vector containing the `[x, y]` coordinates of the detected corners.
pub fn fast_feature_detector(
    src: &Image<u8, 1>,
    threshold: u8,
    arc_length: u8,
) -> Result<Vec<[i32; 2]>, ImageError> {
    let (cols, rows) = (src.cols() as i32, src.rows() as i32);
    if cols < 7 || rows < 7 {
        return Ok(vec![]);
    }

    let offsets = circle_offsets(cols);
    let data = src.as_slice();

    let keypoints = (3..rows - 3)
        .into_par_iter()
        .flat_map(|y| {
            let row_start = y * cols;
            let mut row_keypoints = Vec::new();
            for x in 3..cols - 3 {
                if is_fast_corner(data, row_start + x, &offsets, threshold, arc_length) {
                    row_keypoints.push([x, y]);
                }
            }
            row_keypoints
        })
        .collect();

    Ok(keypoints)
}

/// FAST corner score: sum of absolute intensity differences between the
/// center pixel and the circle pixels that exceed the threshold.
pub fn fast_corner_score(src: &Image<u8, 1>, x: i32, y: i32, threshold: u8) -> f32 {
    let cols = src.cols() as i32;
    let data = src.as_slice();
    let center = data[(y * cols + x) as usize] as i32;
    let t = threshold as i32;

    let mut score = 0i32;
    for (dx, dy) in CIRCLE {
        let p = data[((y + dy) * cols + (x + dx)) as usize] as i32;
        let d = (p - center).abs();
        if d > t {
            score += d - t;
        }
    }
    score as f32
}

fn circle_offsets(cols: i32) -> [i32; 16] {
    let mut offsets = [0i32; 16];
    for (i, (dx, dy)) in CIRCLE.iter().enumerate() {
        offsets[i] = dy * cols + dx;
    }
    offsets
}

fn is_fast_corner(
    src: &[u8],
    pixel_idx: i32,
    offsets: &[i32; 16],
    threshold: u8,
    arc_length: u8,
) -> bool {
    let center = src[pixel_idx as usize];
    let lower = center.saturating_sub(threshold);
    let upper = center.saturating_add(threshold);

    let pixel_at = |i: usize| src[(pixel_idx + offsets[i]) as usize];

    // High-speed rejection test on the four compass points.
    let p0 = pixel_at(0);
    let p4 = pixel_at(4);
    let p8 = pixel_at(8);
    let p12 = pixel_at(12);

    let brighter = [p0, p4, p8, p12].iter().filter(|&&p| p > upper).count();
    let darker = [p0, p4, p8, p12].iter().filter(|&&p| p < lower).count();
    if brighter < 3 && darker < 3 {
        return false;
    }

    // Full segment test with circular wraparound: scan the circle twice so
    // an arc spanning the seam is still counted.
    let mut consecutive_brighter = 0u8;
    let mut consecutive_darker = 0u8;
    for i in 0..(16 + arc_length as usize) {
        let p = pixel_at(i % 16);
        if p > upper {
            consecutive_brighter += 1;
            consecutive_darker = 0;
        } else if p < lower {
            consecutive_darker += 1;
            consecutive_brighter = 0;
        } else {
            consecutive_brighter = 0;
            consecutive_darker = 0;
        }
        if consecutive_brighter >= arc_length || consecutive_darker >= arc_length {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_image::ImageSize;

    fn image_with_bright_square() -> Image<u8, 1> {
        let size = ImageSize {
            width: 16,
            height: 16,
        };
        let mut data = vec![0u8; 16 * 16];
        for y in 6..10 {
            for x in 6..10 {
                data[y * 16 + x] = 255;
            }
        }
        Image::new(size, data).unwrap()
    }

    #[test]
    fn detects_square_corners() -> Result<(), ImageError> {
        let img = image_with_bright_square();
        let keypoints = fast_feature_detector(&img, 50, 9)?;
        assert!(!keypoints.is_empty());
        // all detections stay on or around the bright square
        for [x, y] in keypoints {
            assert!((5..=10).contains(&x), "x = {x}");
            assert!((5..=10).contains(&y), "y = {y}");
        }
        Ok(())
    }

    #[test]
    fn flat_image_has_no_corners() -> Result<(), ImageError> {
        let img = Image::from_size_val(
            ImageSize {
                width: 16,
                height: 16,
            },
            128,
        )?;
        let keypoints = fast_feature_detector(&img, 10, 9)?;
        assert!(keypoints.is_empty());
        Ok(())
    }

    #[test]
    fn corner_score_positive_on_corner() {
        let img = image_with_bright_square();
        let score = fast_corner_score(&img, 6, 6, 50);
        assert!(score > 0.0);
    }
}

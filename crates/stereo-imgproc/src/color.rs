use rayon::prelude::*;
use stereo_image::{Image, ImageError};

/// Convert an RGB8 image to grayscale using the formula:
///
/// Y = 77 * R + 150 * G + 29 * B
///
/// using fixed-point arithmetic (weights scaled by 256).
///
/// # Arguments
///
/// * `src` - The input RGB8 image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use stereo_image::{Image, ImageSize};
/// use stereo_imgproc::color::gray_from_rgb_u8;
///
/// let image = Image::<u8, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0u8; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// gray_from_rgb_u8(&image, &mut gray).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// ```
pub fn gray_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let cols = src.cols();

    // parallelize the conversion by rows
    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .zip(src.as_slice().par_chunks_exact(cols * 3))
        .for_each(|(gray_row, rgb_row)| {
            gray_row
                .iter_mut()
                .zip(rgb_row.chunks_exact(3))
                .for_each(|(gray, rgb)| {
                    let r = rgb[0] as u16;
                    let g = rgb[1] as u16;
                    let b = rgb[2] as u16;
                    *gray = ((77 * r + 150 * g + 29 * b) >> 8) as u8;
                });
        });

    Ok(())
}

use png::{BitDepth, ColorType, Decoder, Transformations};
use stereo_image::{Image, ImageSize};

use crate::error::IoError;

/// Decodes a PNG image from raw bytes into an RGB8 image.
///
/// Grayscale, grayscale+alpha, RGB and RGBA inputs (8-bit, or 16-bit/indexed
/// normalized down by the decoder) are all returned as three-channel RGB.
///
/// # Arguments
///
/// - `bytes` - Raw bytes of the png file
pub fn decode_image_png_rgb8(bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
    let mut decoder = Decoder::new(bytes);
    decoder.set_transformations(Transformations::normalize_to_color8());

    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    buf.truncate(info.buffer_size());

    if info.bit_depth != BitDepth::Eight {
        return Err(IoError::PngDecodeError(format!(
            "Unsupported bit depth: {:?}",
            info.bit_depth
        )));
    }

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };

    let rgb = match info.color_type {
        ColorType::Rgb => buf,
        ColorType::Rgba => buf.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect(),
        ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v]).collect(),
        ColorType::GrayscaleAlpha => buf.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0]]).collect(),
        other => {
            return Err(IoError::PngDecodeError(format!(
                "Unsupported color type: {other:?}"
            )))
        }
    };

    Ok(Image::new(size, rgb)?)
}

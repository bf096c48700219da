use stereo_image::Image;

use crate::error::IoError;
use crate::jpeg::decode_image_jpeg_rgb8;
use crate::png::decode_image_png_rgb8;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Decode raw image bytes (PNG or JPEG) into an RGB8 image.
///
/// The format is sniffed from the file signature; bytes that are neither a
/// PNG nor a JPEG fail with [`IoError::UnsupportedImageFormat`].
///
/// # Arguments
///
/// - `bytes` - Raw bytes of an image file.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        decode_image_png_rgb8(bytes)
    } else if bytes.starts_with(&JPEG_SIGNATURE) {
        decode_image_jpeg_rgb8(bytes)
    } else {
        Err(IoError::UnsupportedImageFormat)
    }
}

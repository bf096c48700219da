use stereo_image::{Image, ImageSize};
use zune_jpeg::errors::DecodeErrors;
use zune_jpeg::JpegDecoder;

use crate::error::IoError;

/// Decodes a JPEG image from raw bytes into an RGB8 image.
///
/// Grayscale JPEGs are expanded to three channels.
///
/// # Arguments
///
/// - `bytes` - Raw bytes of the jpeg file
pub fn decode_image_jpeg_rgb8(bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
    let mut decoder = JpegDecoder::new(bytes);
    decoder.decode_headers()?;

    let image_info = decoder.info().ok_or_else(|| {
        IoError::JpegDecodingError(DecodeErrors::Format(String::from(
            "Failed to find image info from its metadata",
        )))
    })?;

    let size = ImageSize {
        width: image_info.width as usize,
        height: image_info.height as usize,
    };

    let data = decoder.decode()?;
    let num_pixels = size.width * size.height;
    if num_pixels == 0 {
        return Err(IoError::JpegDecodingError(DecodeErrors::Format(
            String::from("Empty image"),
        )));
    }

    let rgb = match data.len() / num_pixels {
        3 => data,
        1 => data.iter().flat_map(|&v| [v, v, v]).collect(),
        channels => {
            return Err(IoError::JpegDecodingError(DecodeErrors::Format(format!(
                "Unsupported number of channels: {channels}"
            ))))
        }
    };

    Ok(Image::new(size, rgb)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_jpeg(width: u16, height: u16, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let encoder = jpeg_encoder::Encoder::new(&mut bytes, 95);
        encoder
            .encode(data, width, height, jpeg_encoder::ColorType::Rgb)
            .unwrap();
        bytes
    }

    #[test]
    fn rgb_dimensions_roundtrip() -> Result<(), IoError> {
        let (w, h) = (8usize, 6usize);
        let data: Vec<u8> = (0..w * h * 3).map(|i| (i * 7 % 251) as u8).collect();
        let bytes = encode_jpeg(w as u16, h as u16, &data);

        let image = decode_image_jpeg_rgb8(&bytes)?;
        assert_eq!(image.size().width, w);
        assert_eq!(image.size().height, h);
        assert_eq!(image.as_slice().len(), w * h * 3);
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_image_jpeg_rgb8(b"\xFF\xD8definitely not a jpeg").is_err());
    }
}

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// The bytes are not in a supported image format.
    #[error("Unsupported or unrecognized image format")]
    UnsupportedImageFormat,

    /// Error to decode the JPEG image.
    #[error("Error with Jpeg decoding. {0}")]
    JpegDecodingError(#[from] zune_jpeg::errors::DecodeErrors),

    /// Error to decode the PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(String),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] stereo_image::ImageError),
}

#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the io module.
pub mod error;

/// Format-sniffing decode entry points.
pub mod functional;

/// JPEG decoding.
pub mod jpeg;

/// PNG decoding.
pub mod png;

pub use crate::error::IoError;
pub use crate::functional::decode_image_bytes;

#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Image error types.
pub mod error;

/// Image types.
pub mod image;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};

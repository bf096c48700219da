#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Color space conversions.
pub mod color;

/// Feature detection, description and matching.
pub mod features;

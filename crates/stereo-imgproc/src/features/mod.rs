//! Feature detection, description and matching.
//!
//! - [`fast_feature_detector`] — FAST corner detection on intensity images
//! - [`BriefPattern`] / steered BRIEF descriptors — 256-bit binary patch codes
//! - [`OrbDetector`] — multiscale oriented detector + descriptor pipeline
//! - [`knn_match_hamming`] — brute-force k-nearest-neighbor descriptor search

mod fast;
pub use fast::*;

mod brief;
pub use brief::*;

mod matching;
pub use matching::*;

mod orb;
pub use orb::*;

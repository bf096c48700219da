use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stereo_image::Image;

/// Size of a binary descriptor in bytes (256 bits).
pub const DESCRIPTOR_BYTES: usize = 32;

/// A packed 256-bit binary patch descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// Seed for the default BRIEF sampling pattern. Fixed so every detector
/// instance produces comparable descriptors.
pub const PATTERN_SEED: u64 = 0x5eed_b41f;

/// A BRIEF sampling pattern: 256 point pairs inside a square patch.
///
/// The pattern is drawn once from a seeded RNG and then shared by all
/// descriptor extractions, so descriptors from different images are
/// comparable bit by bit.
pub struct BriefPattern {
    pairs: Vec<([f32; 2], [f32; 2])>,
    radius: i32,
}

impl BriefPattern {
    /// Generate a sampling pattern from the given seed.
    ///
    /// # Arguments
    ///
    /// * `seed` - RNG seed; use [`PATTERN_SEED`] for the shared default.
    /// * `radius` - Half-width of the sampling patch in pixels.
    pub fn new(seed: u64, radius: i32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pairs = (0..DESCRIPTOR_BYTES * 8)
            .map(|_| {
                let a = [
                    rng.random_range(-radius..=radius) as f32,
                    rng.random_range(-radius..=radius) as f32,
                ];
                let b = [
                    rng.random_range(-radius..=radius) as f32,
                    rng.random_range(-radius..=radius) as f32,
                ];
                (a, b)
            })
            .collect();
        Self { pairs, radius }
    }

    /// Border margin in pixels that keeps all rotated samples inside the
    /// image for a keypoint at least this far from every edge.
    pub fn margin(&self) -> usize {
        (self.radius as f32 * std::f32::consts::SQRT_2).ceil() as usize + 1
    }
}

impl Default for BriefPattern {
    fn default() -> Self {
        Self::new(PATTERN_SEED, 12)
    }
}

/// Extract a steered BRIEF descriptor for one keypoint.
///
/// The sampling pattern is rotated by the keypoint orientation before the
/// pairwise intensity comparisons, which makes the descriptor invariant to
/// in-plane rotation.
///
/// Precondition: the keypoint must be at least `pattern.margin()` pixels away
/// from every image border.
pub fn steered_brief_descriptor(
    src: &Image<u8, 1>,
    x: i32,
    y: i32,
    angle: f32,
    pattern: &BriefPattern,
) -> Descriptor {
    let (sin, cos) = angle.sin_cos();
    let cols = src.cols() as i32;
    let data = src.as_slice();

    let sample = |p: &[f32; 2]| -> u8 {
        let dx = (cos * p[0] - sin * p[1]).round() as i32;
        let dy = (sin * p[0] + cos * p[1]).round() as i32;
        data[((y + dy) * cols + x + dx) as usize]
    };

    let mut desc = [0u8; DESCRIPTOR_BYTES];
    for (i, (a, b)) in pattern.pairs.iter().enumerate() {
        if sample(a) < sample(b) {
            desc[i / 8] |= 1 << (i % 8);
        }
    }
    desc
}

use rayon::prelude::*;

use crate::features::Descriptor;

/// A single descriptor match between two descriptor sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorMatch {
    /// Index into the query descriptor set.
    pub query: usize,
    /// Index into the train descriptor set.
    pub train: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Hamming distance between two packed binary descriptors.
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum()
}

/// Brute-force k-nearest-neighbor search over binary descriptors.
///
/// For each descriptor in `query`, returns its `k` nearest neighbors in
/// `train` ordered by increasing Hamming distance. Queries with fewer than
/// `k` available neighbors return what exists; an empty train set yields
/// empty neighbor lists.
///
/// # Arguments
///
/// * `query` - Query descriptor set.
/// * `train` - Train descriptor set searched for neighbors.
/// * `k` - Number of neighbors per query.
pub fn knn_match_hamming(
    query: &[Descriptor],
    train: &[Descriptor],
    k: usize,
) -> Vec<Vec<DescriptorMatch>> {
    if k == 0 {
        return vec![Vec::new(); query.len()];
    }

    query
        .par_iter()
        .enumerate()
        .map(|(qi, q)| {
            let mut neighbors: Vec<DescriptorMatch> = train
                .iter()
                .enumerate()
                .map(|(ti, t)| DescriptorMatch {
                    query: qi,
                    train: ti,
                    distance: hamming_distance(q, t),
                })
                .collect();
            neighbors.sort_unstable_by_key(|m| m.distance);
            neighbors.truncate(k);
            neighbors
        })
        .collect()
}

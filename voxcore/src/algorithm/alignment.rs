//! Voxel alignment between independently rasterized tensors.
//!
//! All tensors are brought into lexicographic coordinate order (most
//! significant axis first) with duplicates removed, first occurrence wins.
//! Cross-referencing then happens by a linear merge of two sorted arrays.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::data::tensor::{Coord, SparseTensor};

/// A sorted, duplicate-free view of a coordinate array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignedVoxels {
    /// Surviving rows of the input, in sorted order.
    pub order: Vec<usize>,
    /// Coordinates of the surviving rows.
    pub coords: Vec<Coord>,
}

impl AlignedVoxels {
    pub fn new(coords: &[Coord]) -> Self {
        let order = lexsort_unique(coords);
        let coords = order.iter().map(|&i| coords[i]).collect();
        AlignedVoxels { order, coords }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Matched rows of a candidate and a reference set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrossIndex {
    pub candidate: Vec<usize>,
    pub reference: Vec<usize>,
}

impl CrossIndex {
    pub fn len(&self) -> usize {
        self.candidate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidate.is_empty()
    }
}

/// Returns the rows that survive sorting and deduplication, in sorted order.
///
/// The sort is stable, so among rows sharing a coordinate the one appearing
/// first in the input is kept.
pub fn lexsort_unique(coords: &[Coord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..coords.len()).collect();
    order.sort_by(|&a, &b| coords[a].cmp(&coords[b]));
    order.into_iter().dedup_by(|&a, &b| coords[a] == coords[b]).collect()
}

/// Merges two sorted, duplicate-free coordinate arrays and returns the
/// positions of the coordinates they share.
pub fn cross_index(candidate: &[Coord], reference: &[Coord]) -> CrossIndex {
    let mut out = CrossIndex::default();
    let (mut i, mut j) = (0usize, 0usize);
    while i < candidate.len() && j < reference.len() {
        match candidate[i].cmp(&reference[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.candidate.push(i);
                out.reference.push(j);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Rows of `candidate` whose coordinate also appears in `reference`.
///
/// Both inputs may be unsorted and contain duplicates. The result refers to
/// rows of `candidate`, sorted by coordinate and free of duplicates.
pub fn cross_filter(candidate: &[Coord], reference: &[Coord]) -> Vec<usize> {
    if candidate.is_empty() || reference.is_empty() {
        return Vec::new();
    }
    let cand = AlignedVoxels::new(candidate);
    let refs = AlignedVoxels::new(reference);
    cross_index(&cand.coords, &refs.coords)
        .candidate
        .into_iter()
        .map(|k| cand.order[k])
        .collect()
}

/// Aligns every input independently; an empty input empties all outputs.
pub fn align_all(sets: &[&[Coord]]) -> Vec<AlignedVoxels> {
    if sets.iter().any(|s| s.is_empty()) {
        return vec![AlignedVoxels::default(); sets.len()];
    }
    sets.iter().map(|s| AlignedVoxels::new(s)).collect()
}

/// Sorts and deduplicates a tensor, keeping the first value per coordinate.
pub fn align_tensor(tensor: &SparseTensor) -> SparseTensor {
    tensor.select(&lexsort_unique(tensor.coords()))
}

/// Coarsens coordinates by `2^level` and keeps the first row per coarse voxel.
///
/// Returns the coarse coordinates with the input rows they were taken from.
/// From level 32 on every coordinate collapses to 0 or -1.
pub fn downsample(coords: &[Coord], level: u32) -> AlignedVoxels {
    let factor = 1i64 << level.min(32);
    // quotients of i32 by a positive factor always fit in i32
    let coarsen = |x: i32| i64::from(x).div_euclid(factor) as i32;
    let coarse: Vec<Coord> = coords
        .iter()
        .map(|c| [coarsen(c[0]), coarsen(c[1]), coarsen(c[2])])
        .collect();
    AlignedVoxels::new(&coarse)
}

/// Multi-scale pyramid, level 0 (full resolution) first.
pub fn scales(coords: &[Coord], depth: u32) -> Vec<AlignedVoxels> {
    (0..depth).map(|d| downsample(coords, d)).collect()
}

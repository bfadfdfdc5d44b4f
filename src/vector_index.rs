use rayon::prelude::*;
use std::cmp::Ordering;

use crate::config::Number;
use crate::error::{RagError, Result};
use crate::vector_ops::squared_euclidean_simd;

/// Position of a vector in the index and of its document in the store.
pub type SlotId = usize;

/// Exact, append-only index over one dense buffer of `len * dimensions` floats.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<Number>,
}

impl FlatIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Rebuilds an index from a raw buffer, or `None` when the buffer does not
    /// divide into whole vectors of a non-zero dimension.
    pub fn from_raw(dimensions: usize, data: Vec<Number>) -> Option<Self> {
        if dimensions == 0 || data.len() % dimensions != 0 {
            return None;
        }
        Some(Self { dimensions, data })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.dimensions).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[Number] {
        &self.data
    }

    pub fn vector(&self, slot: SlotId) -> Option<&[Number]> {
        let start = slot.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    pub fn check_dimensions(&self, vector: &[Number]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    pub fn insert(&mut self, vector: &[Number]) -> Result<SlotId> {
        self.check_dimensions(vector)?;
        let slot = self.len();
        self.data.extend_from_slice(vector);
        Ok(slot)
    }

    /// Up to `k` slots ordered by ascending squared distance, lower slot first on ties.
    pub fn search_nearest(&self, query: &[Number], k: usize) -> Result<Vec<(SlotId, Number)>> {
        self.check_dimensions(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(SlotId, Number)> = self
            .data
            .par_chunks_exact(self.dimensions)
            .enumerate()
            .map(|(slot, vector)| (slot, squared_euclidean_simd(query, vector)))
            .collect();

        scored.sort_unstable_by(compare_hits);
        scored.truncate(k);
        Ok(scored)
    }
}

fn compare_hits(a: &(SlotId, Number), b: &(SlotId, Number)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, axis: usize) -> Vec<Number> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn insert_assigns_sequential_slots() {
        let mut index = FlatIndex::new(3);
        assert_eq!(index.insert(&unit(3, 0)).unwrap(), 0);
        assert_eq!(index.insert(&unit(3, 1)).unwrap(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.vector(1), Some(&[0.0, 1.0, 0.0][..]));
        assert_eq!(index.vector(2), None);
    }

    #[test]
    fn insert_rejects_wrong_length() {
        let mut index = FlatIndex::new(4);
        let err = index.insert(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn search_orders_by_distance() {
        let mut index = FlatIndex::new(2);
        index.insert(&[5.0, 5.0]).unwrap();
        index.insert(&[1.0, 0.0]).unwrap();
        index.insert(&[2.0, 0.0]).unwrap();

        let hits = index.search_nearest(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits, vec![(1, 1.0), (2, 4.0)]);
    }

    #[test]
    fn ties_prefer_lower_slot() {
        let mut index = FlatIndex::new(2);
        index.insert(&[0.0, 1.0]).unwrap();
        index.insert(&[1.0, 0.0]).unwrap();
        index.insert(&[0.0, 1.0]).unwrap();

        let hits = index.search_nearest(&[0.0, 0.0], 3).unwrap();
        let slots: Vec<SlotId> = hits.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = FlatIndex::new(2);
        assert!(index.search_nearest(&[0.0, 0.0], 1).unwrap().is_empty());
        assert!(index.search_nearest(&[0.0], 1).is_err());
    }

    #[test]
    fn zero_k_returns_no_hits() {
        let mut index = FlatIndex::new(1);
        index.insert(&[1.0]).unwrap();
        assert!(index.search_nearest(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn from_raw_requires_whole_vectors() {
        assert_eq!(FlatIndex::from_raw(3, vec![0.0; 6]).map(|index| index.len()), Some(2));
        assert!(FlatIndex::from_raw(3, vec![0.0; 7]).is_none());
        assert!(FlatIndex::from_raw(0, Vec::new()).is_none());
    }
}

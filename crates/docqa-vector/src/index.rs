//! Flat (exhaustive) L2 vector index.
//!
//! Vectors are stored back to back in one contiguous buffer and searched by
//! brute force. Positions are assigned in insertion order and never change;
//! the index has no knowledge of what the vectors stand for.

use std::cmp::Ordering;

use crate::error::RetrievalError;

/// One search result: a position in the index and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Append-only exhaustive index over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimension.
    ///
    /// A zero dimension is rejected: zero-length vectors would be accepted
    /// by `add` without ever counting towards `len`.
    pub fn new(dimensions: usize) -> Result<Self, RetrievalError> {
        if dimensions == 0 {
            return Err(RetrievalError::InvalidDimensions);
        }
        Ok(Self {
            dimensions,
            data: Vec::new(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of vectors stored.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a batch of vectors.
    ///
    /// The batch is validated before anything is written: one vector of the
    /// wrong dimension rejects the whole batch and leaves the index as it was.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), RetrievalError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimensions);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// The `k` nearest vectors to `query`, closest first.
    ///
    /// Returns `min(k, len)` neighbors ordered by ascending squared L2
    /// distance, ties going to the lower position. An empty index or `k == 0`
    /// gives an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RetrievalError> {
        if query.len() != self.dimensions {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, compare_neighbors);
            scored.truncate(k);
        }
        scored.sort_unstable_by(compare_neighbors);

        Ok(scored)
    }
}

/// Ascending distance, then ascending position.
fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.position.cmp(&b.position))
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[Vec<f32>]) -> VectorIndex {
        let mut index = VectorIndex::new(vectors[0].len()).unwrap();
        index.add(vectors).unwrap();
        index
    }

    #[test]
    fn test_new_index_is_empty() {
        let index = VectorIndex::new(384).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.dimensions(), 384);
    }

    #[test]
    fn test_add_assigns_positions_in_order() {
        let mut index = VectorIndex::new(2).unwrap();
        index.add(&[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        index.add(&[vec![2.0, 2.0]]).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.search(&[0.0, 0.0], 1).unwrap()[0].position, 0);
        assert_eq!(index.search(&[2.0, 2.0], 1).unwrap()[0].position, 2);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            VectorIndex::new(0),
            Err(RetrievalError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_add_rejects_whole_batch_on_dimension_mismatch() {
        let mut index = VectorIndex::new(3).unwrap();
        index.add(&[vec![1.0, 2.0, 3.0]]).unwrap();

        let result = index.add(&[vec![1.0, 1.0, 1.0], vec![1.0, 1.0]]);
        assert!(matches!(
            result,
            Err(RetrievalError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_add_empty_batch_is_noop() {
        let mut index = VectorIndex::new(4).unwrap();
        index.add(&[]).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(3).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_query_dimension_mismatch() {
        let index = index_with(&[vec![1.0, 0.0, 0.0]]);
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(RetrievalError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_search_orders_by_ascending_distance() {
        let index = index_with(&[
            vec![10.0, 0.0],
            vec![1.0, 0.0],
            vec![5.0, 0.0],
            vec![0.0, 0.0],
        ]);

        let hits = index.search(&[0.0, 0.0], 4).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![3, 1, 2, 0]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 1.0);
        assert_eq!(hits[2].distance, 25.0);
        assert_eq!(hits[3].distance, 100.0);
    }

    #[test]
    fn test_search_clamps_k_to_size() {
        let index = index_with(&[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]);
        let hits = index.search(&[0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_respects_k_limit() {
        let vectors: Vec<Vec<f32>> = (0..50).map(|i| vec![i as f32, 0.0]).collect();
        let index = index_with(&vectors);

        let hits = index.search(&[20.2, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![20, 21, 19]);
    }

    #[test]
    fn test_search_k_zero() {
        let index = index_with(&[vec![1.0]]);
        assert!(index.search(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_broken_by_lower_position() {
        let index = index_with(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ]);

        let hits = index.search(&[0.0, 0.0], 4).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);

        let top2 = index.search(&[0.0, 0.0], 2).unwrap();
        let positions: Vec<usize> = top2.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_distances_are_finite_and_non_negative() {
        let index = index_with(&[vec![0.3, -0.7, 0.2], vec![-0.1, 0.9, 0.4]]);
        for hit in index.search(&[0.5, 0.5, 0.5], 2).unwrap() {
            assert!(hit.distance.is_finite());
            assert!(hit.distance >= 0.0);
        }
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.5, -2.0], &[1.5, -2.0]), 0.0);
    }
}

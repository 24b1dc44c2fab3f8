//! Decomposition of an N-dimensional extent into sub-extents.

use coverage_common::{CoverageError, Result};

use crate::extent::GridExtent;

/// Iterates over sub-extents of an N-dimensional extent by stepping along
/// chosen axes.
///
/// The step vector has one entry per axis: `0` keeps the axis fixed (the
/// sub-extents span it entirely) and `k > 0` moves along it in windows of
/// `k` cells. The final window on a moving axis is clipped to the source
/// upper bound. The highest-index moving axis varies fastest.
///
/// Negative steps are rejected: reverse iteration is unsupported. The
/// sequence is finite and lazy; restart by constructing a new iterator.
#[derive(Debug, Clone)]
pub struct GridIterator {
    source: GridExtent,
    steps: Vec<i64>,
    cursor: Vec<i64>,
    done: bool,
}

impl GridIterator {
    /// Create an iterator over `source` with the given per-axis steps.
    pub fn new(source: GridExtent, steps: Vec<i64>) -> Result<Self> {
        if steps.len() != source.dimension() {
            return Err(CoverageError::mismatched_dimension(
                source.dimension(),
                steps.len(),
            ));
        }
        if let Some((axis, &step)) = steps.iter().enumerate().find(|(_, &s)| s < 0) {
            return Err(CoverageError::invalid_argument(format!(
                "negative step {step} on axis {axis}: reverse iteration is unsupported"
            )));
        }
        let cursor = source.low_ordinates().to_vec();
        Ok(Self {
            source,
            steps,
            cursor,
            done: false,
        })
    }

    /// The extent being decomposed.
    pub fn source(&self) -> &GridExtent {
        &self.source
    }

    fn current_sub_extent(&self) -> GridExtent {
        let dim = self.source.dimension();
        let mut low = Vec::with_capacity(dim);
        let mut high = Vec::with_capacity(dim);
        for i in 0..dim {
            if self.steps[i] == 0 {
                low.push(self.source.low(i));
                high.push(self.source.high(i));
            } else {
                low.push(self.cursor[i]);
                high.push((self.cursor[i] + self.steps[i] - 1).min(self.source.high(i)));
            }
        }
        // Bounds hold by construction of the cursor.
        GridExtent::new(low, high).expect("sub-extent bounds")
    }

    /// Advance the cursor like an odometer, highest-index axis first.
    /// Returns false once every moving axis has wrapped.
    fn advance(&mut self) -> bool {
        for i in (0..self.source.dimension()).rev() {
            if self.steps[i] == 0 {
                continue;
            }
            self.cursor[i] += self.steps[i];
            if self.cursor[i] <= self.source.high(i) {
                return true;
            }
            self.cursor[i] = self.source.low(i);
        }
        false
    }
}

impl Iterator for GridIterator {
    type Item = GridExtent;

    fn next(&mut self) -> Option<GridExtent> {
        if self.done {
            return None;
        }
        let sub = self.current_sub_extent();
        if !self.advance() {
            self.done = true;
        }
        Some(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_step() {
        let extent = GridExtent::new_2d(4, 4).unwrap();
        let err = GridIterator::new(extent, vec![1, -1]).unwrap_err();
        assert!(matches!(err, CoverageError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_mismatched_steps() {
        let extent = GridExtent::new_2d(4, 4).unwrap();
        assert!(GridIterator::new(extent, vec![1]).is_err());
    }

    #[test]
    fn test_all_fixed_yields_source_once() {
        let extent = GridExtent::new_2d(4, 4).unwrap();
        let slices: Vec<_> = GridIterator::new(extent.clone(), vec![0, 0])
            .unwrap()
            .collect();
        assert_eq!(slices, vec![extent]);
    }

    #[test]
    fn test_slices_along_last_axis() {
        // 3D extent [0,0,0]-[2,2,2], stepping only along z: 3 full-plane slices.
        let extent = GridExtent::new(vec![0, 0, 0], vec![2, 2, 2]).unwrap();
        let slices: Vec<_> = GridIterator::new(extent, vec![0, 0, 1]).unwrap().collect();
        assert_eq!(slices.len(), 3);
        for (z, slice) in slices.iter().enumerate() {
            assert_eq!(slice.low(0), 0);
            assert_eq!(slice.high(0), 2);
            assert_eq!(slice.low(1), 0);
            assert_eq!(slice.high(1), 2);
            assert_eq!(slice.low(2), z as i64);
            assert_eq!(slice.high(2), z as i64);
        }
    }

    #[test]
    fn test_partial_final_window_is_clipped() {
        let extent = GridExtent::new(vec![0], vec![6]).unwrap();
        let windows: Vec<_> = GridIterator::new(extent, vec![3]).unwrap().collect();
        assert_eq!(windows.len(), 3);
        assert_eq!((windows[0].low(0), windows[0].high(0)), (0, 2));
        assert_eq!((windows[1].low(0), windows[1].high(0)), (3, 5));
        assert_eq!((windows[2].low(0), windows[2].high(0)), (6, 6));
    }

    #[test]
    fn test_highest_axis_varies_fastest() {
        let extent = GridExtent::new(vec![0, 0], vec![1, 1]).unwrap();
        let cells: Vec<_> = GridIterator::new(extent, vec![1, 1])
            .unwrap()
            .map(|e| (e.low(0), e.low(1)))
            .collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}

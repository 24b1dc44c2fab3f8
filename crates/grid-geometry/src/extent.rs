//! Integer bounding boxes in grid-index space.

use serde::{Deserialize, Serialize};

use coverage_common::{CoverageError, Result};

/// A position in grid-index space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCoordinates {
    ordinates: Vec<i64>,
}

impl GridCoordinates {
    /// Create coordinates from per-axis ordinates.
    pub fn new(ordinates: Vec<i64>) -> Self {
        Self { ordinates }
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.ordinates.len()
    }

    /// Ordinate along the given axis.
    pub fn ordinate(&self, axis: usize) -> i64 {
        self.ordinates[axis]
    }

    /// All ordinates in axis order.
    pub fn ordinates(&self) -> &[i64] {
        &self.ordinates
    }
}

/// An immutable integer bounding box in grid-index space, with inclusive
/// bounds on every axis.
///
/// Created once at coverage construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExtent {
    low: Vec<i64>,
    high: Vec<i64>,
}

impl GridExtent {
    /// Create an extent from inclusive per-axis bounds.
    ///
    /// Fails if the vectors differ in length or `low > high` on any axis.
    pub fn new(low: Vec<i64>, high: Vec<i64>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(CoverageError::mismatched_dimension(low.len(), high.len()));
        }
        for (i, (lo, hi)) in low.iter().zip(&high).enumerate() {
            if lo > hi {
                return Err(CoverageError::invalid_argument(format!(
                    "grid extent axis {i} has low {lo} > high {hi}"
                )));
            }
        }
        Ok(Self { low, high })
    }

    /// Create a 2D extent of `width` x `height` cells starting at the origin.
    pub fn new_2d(width: i64, height: i64) -> Result<Self> {
        Self::new(vec![0, 0], vec![width - 1, height - 1])
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.low.len()
    }

    /// Inclusive lower bound along the given axis.
    pub fn low(&self, axis: usize) -> i64 {
        self.low[axis]
    }

    /// Inclusive upper bound along the given axis.
    pub fn high(&self, axis: usize) -> i64 {
        self.high[axis]
    }

    /// Number of cells along the given axis (`high - low + 1`).
    pub fn size(&self, axis: usize) -> i64 {
        self.high[axis] - self.low[axis] + 1
    }

    /// All lower bounds in axis order.
    pub fn low_ordinates(&self) -> &[i64] {
        &self.low
    }

    /// All upper bounds in axis order.
    pub fn high_ordinates(&self) -> &[i64] {
        &self.high
    }

    /// Lower corner as grid coordinates.
    pub fn lower_corner(&self) -> GridCoordinates {
        GridCoordinates::new(self.low.clone())
    }

    /// Check if the given coordinates fall inside this extent.
    pub fn contains(&self, coords: &GridCoordinates) -> bool {
        coords.dimension() == self.dimension()
            && coords
                .ordinates()
                .iter()
                .enumerate()
                .all(|(i, &v)| v >= self.low[i] && v <= self.high[i])
    }

    /// Indices of the axes spanning more than one cell, in ascending order.
    pub fn wide_axes(&self) -> Vec<usize> {
        (0..self.dimension()).filter(|&i| self.size(i) > 1).collect()
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> i64 {
        (0..self.dimension()).map(|i| self.size(i)).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_new_validates_bounds() {
        assert!(GridExtent::new(vec![0, 0], vec![4, -1]).is_err());
        assert!(GridExtent::new(vec![0], vec![4, 4]).is_err());
        assert!(GridExtent::new(vec![0, 0], vec![0, 0]).is_ok());
    }

    #[test]
    fn test_extent_size_is_inclusive() {
        let extent = GridExtent::new(vec![2, -3], vec![5, 3]).unwrap();
        assert_eq!(extent.size(0), 4);
        assert_eq!(extent.size(1), 7);
        assert_eq!(extent.num_cells(), 28);
    }

    #[test]
    fn test_extent_contains() {
        let extent = GridExtent::new_2d(10, 5).unwrap();
        assert!(extent.contains(&GridCoordinates::new(vec![0, 0])));
        assert!(extent.contains(&GridCoordinates::new(vec![9, 4])));
        assert!(!extent.contains(&GridCoordinates::new(vec![10, 0])));
        assert!(!extent.contains(&GridCoordinates::new(vec![0])));
    }

    #[test]
    fn test_wide_axes() {
        let extent = GridExtent::new(vec![0, 0, 5], vec![9, 9, 5]).unwrap();
        assert_eq!(extent.wide_axes(), vec![0, 1]);

        let flat = GridExtent::new(vec![0, 0, 0], vec![0, 9, 0]).unwrap();
        assert_eq!(flat.wide_axes(), vec![1]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let extent = GridExtent::new(vec![-2, 0], vec![7, 11]).unwrap();
        let json = serde_json::to_string(&extent).unwrap();
        let back: GridExtent = serde_json::from_str(&json).unwrap();
        assert_eq!(extent, back);
    }
}

//! Real-world axis-aligned envelopes.

use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};

/// An axis-aligned bounding box in CRS space, with any number of dimensions.
///
/// Spans are always non-negative; a zero span marks a degenerate axis (a
/// single slice along that dimension).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Envelope {
    /// Create an envelope from per-axis minimum and maximum ordinates.
    ///
    /// Fails if the vectors differ in length or any span is negative.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(CoverageError::mismatched_dimension(min.len(), max.len()));
        }
        for (i, (lo, hi)) in min.iter().zip(&max).enumerate() {
            if lo > hi {
                return Err(CoverageError::invalid_argument(format!(
                    "envelope axis {i} has negative span: [{lo}, {hi}]"
                )));
            }
        }
        Ok(Self { min, max })
    }

    /// Create a 2D envelope from (min_x, min_y, max_x, max_y).
    pub fn new_2d(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        Self::new(vec![min_x, min_y], vec![max_x, max_y])
    }

    /// Build the tightest envelope containing every given corner point.
    ///
    /// Fails if the corner list is empty or the corners disagree on
    /// dimensionality.
    pub fn from_corners(corners: &[Vec<f64>]) -> Result<Self> {
        let first = corners
            .first()
            .ok_or_else(|| CoverageError::invalid_argument("no corners given"))?;
        let dim = first.len();
        let mut min = vec![f64::INFINITY; dim];
        let mut max = vec![f64::NEG_INFINITY; dim];
        for corner in corners {
            if corner.len() != dim {
                return Err(CoverageError::mismatched_dimension(dim, corner.len()));
            }
            for (i, &v) in corner.iter().enumerate() {
                min[i] = min[i].min(v);
                max[i] = max[i].max(v);
            }
        }
        Self::new(min, max)
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.min.len()
    }

    /// Minimum ordinate along the given axis.
    pub fn min(&self, axis: usize) -> f64 {
        self.min[axis]
    }

    /// Maximum ordinate along the given axis.
    pub fn max(&self, axis: usize) -> f64 {
        self.max[axis]
    }

    /// Span (max - min) along the given axis.
    pub fn span(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// Midpoint along the given axis.
    pub fn center(&self, axis: usize) -> f64 {
        (self.min[axis] + self.max[axis]) / 2.0
    }

    /// All minimum ordinates.
    pub fn lower_corner(&self) -> &[f64] {
        &self.min
    }

    /// All maximum ordinates.
    pub fn upper_corner(&self) -> &[f64] {
        &self.max
    }

    /// Check if a point is contained within this envelope (inclusive bounds).
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dimension()
            && point
                .iter()
                .enumerate()
                .all(|(i, &v)| v >= self.min[i] && v <= self.max[i])
    }

    /// Check if this envelope intersects another of the same dimension.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.dimension() == other.dimension()
            && (0..self.dimension())
                .all(|i| self.max[i] >= other.min[i] && other.max[i] >= self.min[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_new_rejects_negative_span() {
        assert!(Envelope::new(vec![0.0, 5.0], vec![10.0, 4.0]).is_err());
        assert!(Envelope::new(vec![0.0, 5.0], vec![10.0, 5.0]).is_ok());
    }

    #[test]
    fn test_envelope_new_rejects_mismatched_dims() {
        assert!(Envelope::new(vec![0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_from_corners() {
        let env = Envelope::from_corners(&[
            vec![3.0, -1.0],
            vec![-2.0, 4.0],
            vec![0.0, 0.0],
        ])
        .unwrap();
        assert_eq!(env.lower_corner(), &[-2.0, -1.0]);
        assert_eq!(env.upper_corner(), &[3.0, 4.0]);
    }

    #[test]
    fn test_span_and_center() {
        let env = Envelope::new_2d(-10.0, 0.0, 10.0, 5.0).unwrap();
        assert!((env.span(0) - 20.0).abs() < f64::EPSILON);
        assert!((env.center(0) - 0.0).abs() < f64::EPSILON);
        assert!((env.center(1) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contains() {
        let env = Envelope::new_2d(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(env.contains(&[5.0, 5.0]));
        assert!(env.contains(&[0.0, 10.0]));
        assert!(!env.contains(&[-0.1, 5.0]));
        assert!(!env.contains(&[5.0]));
    }

    #[test]
    fn test_intersects() {
        let a = Envelope::new_2d(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Envelope::new_2d(5.0, 5.0, 15.0, 15.0).unwrap();
        let c = Envelope::new_2d(20.0, 20.0, 30.0, 30.0).unwrap();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_serde_roundtrip() {
        let env = Envelope::new_2d(-180.0, -90.0, 180.0, 90.0).unwrap();
        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env, back);
    }
}

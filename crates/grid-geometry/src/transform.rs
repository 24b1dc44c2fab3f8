//! Math transforms between grid-index space and CRS space.
//!
//! The coverage core consumes transforms through the [`MathTransform`]
//! trait; [`AffineTransform`] is the workhorse implementation backing every
//! derived geometry. Non-affine transforms can be plugged in by
//! implementing the trait, at the cost of the affine-only fast paths
//! (resolution from column norms, 2D block separation).

use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use coverage_common::{CoverageError, Envelope, Result};

/// A function from grid coordinates to CRS coordinates (or back).
///
/// Implementations must be pure: the same input always maps to the same
/// output, with no interior mutation.
pub trait MathTransform: fmt::Debug + Send + Sync {
    /// Number of input ordinates.
    fn source_dim(&self) -> usize;

    /// Number of output ordinates.
    fn target_dim(&self) -> usize;

    /// Map a source position to a target position.
    ///
    /// Fails with `MismatchedDimension` if `src.len() != source_dim()`.
    fn transform(&self, src: &[f64]) -> Result<Vec<f64>>;

    /// The inverse mapping, if one exists.
    fn inverse(&self) -> Result<Arc<dyn MathTransform>>;

    /// True if this transform maps every position to itself.
    fn is_identity(&self) -> bool {
        false
    }

    /// Downcast to the affine representation, when there is one.
    fn as_affine(&self) -> Option<&AffineTransform> {
        None
    }
}

/// Row-major serialized form of an affine transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffineCoefficients {
    pub target_dim: usize,
    pub source_dim: usize,
    /// The full homogeneous matrix, row-major, (target_dim + 1) rows of
    /// (source_dim + 1) entries.
    pub row_major: Vec<f64>,
}

/// An affine transform stored as a homogeneous matrix of shape
/// `(target_dim + 1) x (source_dim + 1)` whose last row is `[0, .., 0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AffineCoefficients", into = "AffineCoefficients")]
pub struct AffineTransform {
    matrix: DMatrix<f64>,
}

impl AffineTransform {
    /// Wrap a homogeneous matrix.
    ///
    /// Fails if the matrix is too small or its last row is not `[0,..,0,1]`.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        if matrix.nrows() < 2 || matrix.ncols() < 2 {
            return Err(CoverageError::invalid_argument(
                "affine matrix must be at least 2x2",
            ));
        }
        let last = matrix.nrows() - 1;
        for c in 0..matrix.ncols() {
            let expected = if c == matrix.ncols() - 1 { 1.0 } else { 0.0 };
            if matrix[(last, c)] != expected {
                return Err(CoverageError::invalid_argument(
                    "affine matrix last row must be [0, .., 0, 1]",
                ));
            }
        }
        Ok(Self { matrix })
    }

    /// The identity transform in `dim` dimensions.
    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: DMatrix::identity(dim + 1, dim + 1),
        }
    }

    /// A diagonal transform: `target[i] = source[i] * scales[i] + offsets[i]`.
    pub fn from_scale_offset(scales: &[f64], offsets: &[f64]) -> Result<Self> {
        if scales.len() != offsets.len() {
            return Err(CoverageError::mismatched_dimension(
                scales.len(),
                offsets.len(),
            ));
        }
        let dim = scales.len();
        let mut matrix = DMatrix::identity(dim + 1, dim + 1);
        for i in 0..dim {
            matrix[(i, i)] = scales[i];
            matrix[(i, dim)] = offsets[i];
        }
        Self::new(matrix)
    }

    /// A pure translation.
    pub fn translation(offsets: &[f64]) -> Self {
        let dim = offsets.len();
        let mut matrix = DMatrix::identity(dim + 1, dim + 1);
        for (i, &o) in offsets.iter().enumerate() {
            matrix[(i, dim)] = o;
        }
        Self { matrix }
    }

    /// The underlying homogeneous matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Matrix element at (row, col) of the homogeneous matrix.
    pub fn element(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    /// Concatenation `self ∘ other`: apply `other` first, then `self`.
    ///
    /// Fails if `other.target_dim() != self.source_dim()`.
    pub fn concat(&self, other: &AffineTransform) -> Result<AffineTransform> {
        if other.target_dim() != self.source_dim() {
            return Err(CoverageError::mismatched_dimension(
                self.source_dim(),
                other.target_dim(),
            ));
        }
        AffineTransform::new(&self.matrix * &other.matrix)
    }

    /// `self ∘ translate(deltas)`: shift source coordinates before applying.
    pub fn pre_translate(&self, deltas: &[f64]) -> Result<AffineTransform> {
        self.concat(&AffineTransform::translation(deltas))
    }

    /// `self ∘ translate(delta, .., delta)` over every source axis.
    pub fn pre_translate_all(&self, delta: f64) -> AffineTransform {
        let deltas = vec![delta; self.source_dim()];
        // Dimensions match by construction.
        self.pre_translate(&deltas).expect("uniform pre-translate")
    }

    /// Euclidean norm of each column of the linear part, one per source
    /// axis, ignoring the translation column.
    pub fn column_norms(&self) -> Vec<f64> {
        let rows = self.target_dim();
        (0..self.source_dim())
            .map(|c| {
                (0..rows)
                    .map(|r| self.matrix[(r, c)] * self.matrix[(r, c)])
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }

    fn apply(&self, src: &[f64]) -> Vec<f64> {
        let rows = self.target_dim();
        let cols = self.source_dim();
        let mut out = Vec::with_capacity(rows);
        for r in 0..rows {
            let mut acc = self.matrix[(r, cols)];
            for (c, &v) in src.iter().enumerate() {
                acc += self.matrix[(r, c)] * v;
            }
            out.push(acc);
        }
        out
    }
}

impl MathTransform for AffineTransform {
    fn source_dim(&self) -> usize {
        self.matrix.ncols() - 1
    }

    fn target_dim(&self) -> usize {
        self.matrix.nrows() - 1
    }

    fn transform(&self, src: &[f64]) -> Result<Vec<f64>> {
        if src.len() != self.source_dim() {
            return Err(CoverageError::mismatched_dimension(
                self.source_dim(),
                src.len(),
            ));
        }
        Ok(self.apply(src))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        if self.matrix.nrows() != self.matrix.ncols() {
            return Err(CoverageError::NonInvertibleTransform(format!(
                "non-square affine transform ({}D -> {}D)",
                self.source_dim(),
                self.target_dim()
            )));
        }
        let inverted = self
            .matrix
            .clone()
            .try_inverse()
            .ok_or_else(|| CoverageError::NonInvertibleTransform("singular matrix".into()))?;
        Ok(Arc::new(AffineTransform::new(inverted)?))
    }

    fn is_identity(&self) -> bool {
        self.matrix.is_square()
            && self.matrix == DMatrix::identity(self.matrix.nrows(), self.matrix.ncols())
    }

    fn as_affine(&self) -> Option<&AffineTransform> {
        Some(self)
    }
}

impl TryFrom<AffineCoefficients> for AffineTransform {
    type Error = CoverageError;

    fn try_from(c: AffineCoefficients) -> Result<Self> {
        let rows = c.target_dim + 1;
        let cols = c.source_dim + 1;
        if c.row_major.len() != rows * cols {
            return Err(CoverageError::invalid_argument(format!(
                "expected {} coefficients, got {}",
                rows * cols,
                c.row_major.len()
            )));
        }
        AffineTransform::new(DMatrix::from_row_slice(rows, cols, &c.row_major))
    }
}

impl From<AffineTransform> for AffineCoefficients {
    fn from(t: AffineTransform) -> Self {
        let row_major = t
            .matrix
            .row_iter()
            .flat_map(|r| r.iter().copied().collect::<Vec<_>>())
            .collect();
        AffineCoefficients {
            target_dim: t.target_dim(),
            source_dim: t.source_dim(),
            row_major,
        }
    }
}

/// Transform every corner of the box `[lows, highs]` and return the
/// envelope of the images.
///
/// For affine transforms this is exact; for general transforms it is the
/// usual corner approximation.
pub fn transform_box(
    transform: &dyn MathTransform,
    lows: &[f64],
    highs: &[f64],
) -> Result<Envelope> {
    if lows.len() != transform.source_dim() || highs.len() != transform.source_dim() {
        return Err(CoverageError::mismatched_dimension(
            transform.source_dim(),
            lows.len(),
        ));
    }
    let dim = lows.len();
    let mut corners = Vec::with_capacity(1 << dim);
    for bits in 0..(1usize << dim) {
        let corner: Vec<f64> = (0..dim)
            .map(|i| if bits & (1 << i) != 0 { highs[i] } else { lows[i] })
            .collect();
        corners.push(transform.transform(&corner)?);
    }
    Envelope::from_corners(&corners)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = AffineTransform::identity(3);
        assert!(t.is_identity());
        assert_eq!(t.transform(&[1.0, 2.0, 3.0]).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_scale_offset() {
        let t = AffineTransform::from_scale_offset(&[2.0, -1.0], &[10.0, 5.0]).unwrap();
        assert_eq!(t.transform(&[3.0, 4.0]).unwrap(), vec![16.0, 1.0]);
    }

    #[test]
    fn test_dimension_check() {
        let t = AffineTransform::identity(2);
        assert!(matches!(
            t.transform(&[1.0]),
            Err(CoverageError::MismatchedDimension { .. })
        ));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = AffineTransform::from_scale_offset(&[0.5, -0.25], &[100.0, 50.0]).unwrap();
        let inv = t.inverse().unwrap();
        let fwd = t.transform(&[7.0, 9.0]).unwrap();
        let back = inv.transform(&fwd).unwrap();
        assert!((back[0] - 7.0).abs() < 1e-9);
        assert!((back[1] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_is_not_invertible() {
        let t = AffineTransform::from_scale_offset(&[1.0, 0.0], &[0.0, 0.0]).unwrap();
        assert!(matches!(
            t.inverse(),
            Err(CoverageError::NonInvertibleTransform(_))
        ));
    }

    #[test]
    fn test_rejects_bad_last_row() {
        let matrix = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 1.0]);
        assert!(AffineTransform::new(matrix).is_err());
    }

    #[test]
    fn test_column_norms() {
        // Column norms are per source axis, translation ignored.
        let matrix = DMatrix::from_row_slice(3, 3, &[3.0, 0.0, 99.0, 4.0, 2.0, -7.0, 0.0, 0.0, 1.0]);
        let t = AffineTransform::new(matrix).unwrap();
        let norms = t.column_norms();
        assert!((norms[0] - 5.0).abs() < 1e-12);
        assert!((norms[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pre_translate() {
        let t = AffineTransform::from_scale_offset(&[2.0, 2.0], &[0.0, 0.0]).unwrap();
        let shifted = t.pre_translate_all(0.5);
        assert_eq!(shifted.transform(&[0.0, 0.0]).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_transform_box() {
        // A flip in y must still produce a min <= max envelope.
        let t = AffineTransform::from_scale_offset(&[1.0, -1.0], &[0.0, 0.0]).unwrap();
        let env = transform_box(&t, &[0.0, 0.0], &[2.0, 3.0]).unwrap();
        assert_eq!(env.lower_corner(), &[0.0, -3.0]);
        assert_eq!(env.upper_corner(), &[2.0, 0.0]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let t = AffineTransform::from_scale_offset(&[0.25, -0.25], &[-180.0, 90.0]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: AffineTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}

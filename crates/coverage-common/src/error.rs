//! Error types for the grid-coverage subsystem.

use thiserror::Error;

/// Result type alias using CoverageError.
pub type Result<T> = std::result::Result<T, CoverageError>;

/// Primary error type for grid-coverage operations.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// A query on a grid-geometry attribute that is not currently defined.
    ///
    /// Distinct from "defined but null": callers can always avoid this by
    /// checking `is_defined` first.
    #[error("grid geometry attribute not defined: {attribute}")]
    IncompleteGridGeometry { attribute: &'static str },

    /// A post-construction consistency check on a grid geometry failed.
    #[error("invalid grid geometry: {0}")]
    InvalidGridGeometry(String),

    /// Argument dimensionality does not match the expected dimensionality.
    #[error("mismatched dimension: expected {expected}, got {actual}")]
    MismatchedDimension { expected: usize, actual: usize },

    /// An evaluation coordinate fell outside the valid sample domain.
    ///
    /// Expected and common; callers catch it per point.
    #[error("point outside coverage: {coordinate:?}")]
    PointOutsideCoverage { coordinate: Vec<f64> },

    /// Generic evaluation failure carrying the original cause.
    #[error("cannot evaluate coverage: {message}")]
    CannotEvaluate {
        message: String,
        #[source]
        cause: Option<Box<CoverageError>>,
    },

    /// An argument was rejected before any work started.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A transform could not be inverted.
    #[error("transform is not invertible: {0}")]
    NonInvertibleTransform(String),
}

impl CoverageError {
    /// Create an IncompleteGridGeometry error for the named attribute.
    pub fn incomplete(attribute: &'static str) -> Self {
        Self::IncompleteGridGeometry { attribute }
    }

    /// Create an InvalidGridGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGridGeometry(msg.into())
    }

    /// Create a MismatchedDimension error.
    pub fn mismatched_dimension(expected: usize, actual: usize) -> Self {
        Self::MismatchedDimension { expected, actual }
    }

    /// Create a PointOutsideCoverage error for the given coordinate.
    pub fn point_outside(coordinate: &[f64]) -> Self {
        Self::PointOutsideCoverage {
            coordinate: coordinate.to_vec(),
        }
    }

    /// Create a CannotEvaluate error without an underlying cause.
    pub fn cannot_evaluate(msg: impl Into<String>) -> Self {
        Self::CannotEvaluate {
            message: msg.into(),
            cause: None,
        }
    }

    /// Create a CannotEvaluate error wrapping an underlying cause.
    pub fn cannot_evaluate_caused(msg: impl Into<String>, cause: CoverageError) -> Self {
        Self::CannotEvaluate {
            message: msg.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True if this error is the expected out-of-domain evaluation result.
    pub fn is_point_outside(&self) -> bool {
        matches!(self, Self::PointOutsideCoverage { .. })
    }
}

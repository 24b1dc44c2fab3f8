//! Grid geometry for multi-dimensional gridded coverages.
//!
//! This crate models the integer-index side of a raster (extents, slicing
//! iterators) and the transform between grid indices and real-world
//! coordinates. A [`GridGeometry`] can be built from any two of
//! {extent, transform, envelope} and derives the missing piece; a
//! [`GridGeometry2D`] isolates the two wide axes of an N-dimensional
//! geometry so a 2D raster can be addressed through it.
//!
//! # Example
//!
//! ```rust
//! use coverage_common::{Envelope, PixelAnchor};
//! use grid_geometry::{AffineTransform, GridExtent, GridGeometry};
//! use std::sync::Arc;
//!
//! let extent = GridExtent::new_2d(10, 10).unwrap();
//! let transform = AffineTransform::from_scale_offset(&[0.1, 0.1], &[0.0, 0.0]).unwrap();
//! let geometry = GridGeometry::from_extent_and_transform(
//!     extent,
//!     Arc::new(transform),
//!     PixelAnchor::Center,
//!     None,
//! ).unwrap();
//!
//! let envelope = geometry.envelope().unwrap();
//! assert!((envelope.span(0) - 1.0).abs() < 1e-9);
//! ```

pub mod extent;
pub mod geometry;
pub mod geometry2d;
pub mod geometry_iter;
pub mod iter;
pub mod mapper;
pub mod transform;

pub use extent::{GridCoordinates, GridExtent};
pub use geometry::{attributes, GridGeometry};
pub use geometry2d::GridGeometry2D;
pub use geometry_iter::GridGeometryIterator;
pub use iter::GridIterator;
pub use mapper::GridToEnvelopeMapper;
pub use transform::{AffineTransform, MathTransform};

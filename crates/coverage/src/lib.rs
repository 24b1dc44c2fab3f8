//! Grid coverage evaluation, interpolation and sample transcoding.
//!
//! A [`GridCoverage2D`] couples a raster with a [`GridGeometry2D`] and a
//! band model of [`SampleDimension`]s, answers point queries in CRS
//! coordinates, and materializes alternate presentations (packed,
//! geophysics, rendered) through a shared [`ViewsManager`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use coverage::{BandedRaster, GridCoverage2D, SampleDimension, SampleType};
//! use coverage_common::PixelAnchor;
//! use grid_geometry::{AffineTransform, GridExtent, GridGeometry2D, MathTransform};
//!
//! # fn main() -> coverage_common::Result<()> {
//! let raster = Arc::new(BandedRaster::filled(8, 8, 1, SampleType::Float64, 21.5)?);
//! let transform: Arc<dyn MathTransform> =
//!     Arc::new(AffineTransform::from_scale_offset(&[0.5, -0.5], &[0.25, 3.75])?);
//! let geometry = GridGeometry2D::from_extent_and_transform(
//!     GridExtent::new_2d(8, 8)?,
//!     transform,
//!     PixelAnchor::Center,
//!     None,
//! )?;
//! let coverage = GridCoverage2D::new(
//!     "temperature",
//!     raster,
//!     geometry,
//!     vec![SampleDimension::without_categories("t2m")],
//! )?;
//! assert_eq!(coverage.evaluate(&[1.25, 2.75])?, vec![21.5]);
//! # Ok(())
//! # }
//! ```

pub mod band;
pub mod coverage;
pub mod interpolate;
pub mod raster;
pub mod transcoder;
pub mod views;

pub use band::{Category, SampleDimension, SampleRange, TransferFunction};
pub use coverage::{CoverageVariant, DataForm, GridCoverage2D};
pub use interpolate::{Fallback, InterpolationKernel, Interpolator};
pub use raster::{BandedRaster, Raster, SampleType};
pub use transcoder::{default_strategies, SampleTranscoder, TranscoderStrategy};
pub use views::{ViewKind, ViewsManager};

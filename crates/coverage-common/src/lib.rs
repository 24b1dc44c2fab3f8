//! Shared leaf types for the grid-coverage subsystem.
//!
//! This crate holds the types every other coverage crate needs but none
//! owns: the error taxonomy, real-world envelopes, a minimal coordinate
//! reference system descriptor, and the pixel anchoring convention.

pub mod anchor;
pub mod crs;
pub mod envelope;
pub mod error;

pub use anchor::PixelAnchor;
pub use crs::{AxisDirection, CrsDescriptor};
pub use envelope::Envelope;
pub use error::{CoverageError, Result};

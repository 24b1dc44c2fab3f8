//! Pixel storage abstraction.
//!
//! The coverage core treats an image as an abstract 2D grid of numeric
//! samples with per-pixel access, not a specific platform image class.

use std::fmt;
use std::sync::Arc;

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use coverage_common::{CoverageError, Result};

/// Element type of stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    UInt8,
    UInt16,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl SampleType {
    /// True for the integral element types.
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }

    /// Representable value range for integral types.
    pub fn value_range(self) -> Option<(f64, f64)> {
        match self {
            Self::UInt8 => Some((0.0, u8::MAX as f64)),
            Self::UInt16 => Some((0.0, u16::MAX as f64)),
            Self::Int16 => Some((i16::MIN as f64, i16::MAX as f64)),
            Self::Int32 => Some((i32::MIN as f64, i32::MAX as f64)),
            Self::Float32 | Self::Float64 => None,
        }
    }
}

/// Random access to a rectangular multi-band raster.
///
/// Coordinates are raster-local: `(0, 0)` is the first cell regardless of
/// the grid extent's lower bounds. Callers bound-check before sampling.
pub trait Raster: fmt::Debug + Send + Sync {
    /// Number of columns.
    fn width(&self) -> usize;

    /// Number of rows.
    fn height(&self) -> usize;

    /// Number of bands.
    fn num_bands(&self) -> usize;

    /// Element type of the stored samples.
    fn sample_type(&self) -> SampleType;

    /// The sample at `(x, y)` in the given band.
    fn sample(&self, x: usize, y: usize, band: usize) -> f64;
}

/// In-memory raster with one contiguous row-major buffer per band.
#[derive(Debug, Clone)]
pub struct BandedRaster {
    width: usize,
    height: usize,
    sample_type: SampleType,
    bands: Vec<Vec<f64>>,
}

impl BandedRaster {
    /// Create a raster from per-band row-major sample buffers.
    ///
    /// Fails if any band's length differs from `width * height` or no
    /// band is given.
    pub fn new(
        width: usize,
        height: usize,
        sample_type: SampleType,
        bands: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if bands.is_empty() {
            return Err(CoverageError::invalid_argument("raster needs at least one band"));
        }
        for (i, band) in bands.iter().enumerate() {
            if band.len() != width * height {
                return Err(CoverageError::invalid_argument(format!(
                    "band {i} has {} samples, expected {}",
                    band.len(),
                    width * height
                )));
            }
        }
        Ok(Self {
            width,
            height,
            sample_type,
            bands,
        })
    }

    /// Create a raster from buffers of any numeric type.
    pub fn from_samples<T: ToPrimitive + Copy>(
        width: usize,
        height: usize,
        sample_type: SampleType,
        bands: &[Vec<T>],
    ) -> Result<Self> {
        let converted = bands
            .iter()
            .map(|band| {
                band.iter()
                    .map(|v| v.to_f64().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        Self::new(width, height, sample_type, converted)
    }

    /// Create a raster filled with a constant value.
    pub fn filled(
        width: usize,
        height: usize,
        num_bands: usize,
        sample_type: SampleType,
        value: f64,
    ) -> Result<Self> {
        Self::new(
            width,
            height,
            sample_type,
            vec![vec![value; width * height]; num_bands],
        )
    }

    /// Overwrite the sample at `(x, y)` in the given band.
    pub fn set_sample(&mut self, x: usize, y: usize, band: usize, value: f64) {
        let w = self.width;
        self.bands[band][y * w + x] = value;
    }

    /// Direct access to a band's buffer.
    pub fn band(&self, band: usize) -> &[f64] {
        &self.bands[band]
    }
}

impl Raster for BandedRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn num_bands(&self) -> usize {
        self.bands.len()
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn sample(&self, x: usize, y: usize, band: usize) -> f64 {
        self.bands[band][y * self.width + x]
    }
}

/// Stable identity of a raster allocation, used for view-sharing keys.
pub fn raster_id(raster: &Arc<dyn Raster>) -> usize {
    Arc::as_ptr(raster) as *const () as usize
}

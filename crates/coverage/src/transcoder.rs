//! Sample transcoding between packed and geophysics representations.
//!
//! Conversion strategies are tried cheapest-first from an explicit,
//! ordered table passed in at construction; there is no process-wide
//! registry. The general per-sample path is always applicable and always
//! the slowest.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use coverage_common::Result;

use crate::band::SampleDimension;
use crate::raster::{BandedRaster, Raster, SampleType};

/// Largest lookup table the `Lookup` strategy will build per band.
const MAX_LOOKUP_SIZE: i64 = 65_536;

/// A conversion strategy, in increasing cost order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscoderStrategy {
    /// All bands are identity: the source raster is reused unchanged.
    Identity,
    /// Every band is representable as a finite lookup table over an
    /// integral source type.
    Lookup,
    /// Every band is a single shared (scale, offset) over its whole range.
    Rescale,
    /// Every band is linear within each category, with continuous,
    /// monotonic breakpoints.
    Piecewise,
    /// Per-sample per-band evaluation. Always correct, always available.
    General,
}

/// The default strategy table, cheapest first.
pub fn default_strategies() -> Vec<TranscoderStrategy> {
    vec![
        TranscoderStrategy::Identity,
        TranscoderStrategy::Lookup,
        TranscoderStrategy::Rescale,
        TranscoderStrategy::Piecewise,
        TranscoderStrategy::General,
    ]
}

/// Pick the first applicable strategy from the table.
///
/// Falls back to `General` when nothing in the table applies.
pub fn select_strategy(
    dimensions: &[SampleDimension],
    sample_type: SampleType,
    table: &[TranscoderStrategy],
) -> TranscoderStrategy {
    for &strategy in table {
        if strategy_applicable(strategy, dimensions, sample_type) {
            return strategy;
        }
    }
    TranscoderStrategy::General
}

fn strategy_applicable(
    strategy: TranscoderStrategy,
    dimensions: &[SampleDimension],
    sample_type: SampleType,
) -> bool {
    match strategy {
        TranscoderStrategy::Identity => dimensions.iter().all(SampleDimension::is_identity),
        TranscoderStrategy::Lookup => {
            sample_type.is_integer()
                && dimensions.iter().all(|d| lookup_bounds(d).is_some())
        }
        TranscoderStrategy::Rescale => {
            dimensions.iter().all(|d| d.single_linear().is_some())
        }
        TranscoderStrategy::Piecewise => dimensions.iter().all(piecewise_applicable),
        TranscoderStrategy::General => true,
    }
}

/// Table origin and length when the band can be a lookup table.
fn lookup_bounds(dimension: &SampleDimension) -> Option<(i64, usize)> {
    let range = dimension.sample_range()?;
    if range.min.fract() != 0.0 || range.max.fract() != 0.0 {
        return None;
    }
    let origin = range.min as i64;
    let size = range.max as i64 - origin + 1;
    if size <= 0 || size > MAX_LOOKUP_SIZE {
        return None;
    }
    Some((origin, size as usize))
}

/// Piecewise needs every category linear and the mapping continuous where
/// quantitative categories meet; a discontinuity disqualifies the band.
fn piecewise_applicable(dimension: &SampleDimension) -> bool {
    if !dimension.has_categories() {
        return false;
    }
    let categories = dimension.categories();
    for category in categories {
        if let Some(transfer) = category.transfer {
            if transfer.linear_coefficients().is_none() {
                return false;
            }
        }
    }
    for pair in categories.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if let (Some(ta), Some(tb)) = (a.transfer, b.transfer) {
            // Adjacent quantitative ranges must agree at the junction.
            if b.range.min - a.range.max <= 1.0 {
                let left = ta.apply(b.range.min);
                let right = tb.apply(b.range.min);
                let tolerance = 1e-9 * left.abs().max(1.0);
                if (left - right).abs() > tolerance {
                    return false;
                }
            }
        }
    }
    true
}

/// Compiled per-band converter.
#[derive(Debug, Clone)]
enum BandConverter {
    Identity,
    Lookup { origin: i64, table: Vec<f64> },
    Rescale { scale: f64, offset: f64 },
    Piecewise(SampleDimension),
    General(SampleDimension),
    InverseGeneral(SampleDimension),
    /// Replacement for a band whose conversion could not be built: every
    /// sample maps to NaN. Poisons one band, not the whole coverage.
    Poisoned,
}

impl BandConverter {
    fn convert(&self, sample: f64) -> f64 {
        match self {
            Self::Identity => sample,
            Self::Lookup { origin, table } => {
                let index = sample.round() as i64 - origin;
                if index < 0 || index as usize >= table.len() {
                    f64::NAN
                } else {
                    table[index as usize]
                }
            }
            Self::Rescale { scale, offset } => sample * scale + offset,
            Self::Piecewise(dim) | Self::General(dim) => dim.apply(sample),
            Self::InverseGeneral(dim) => dim.apply_inverse(sample).unwrap_or(f64::NAN),
            Self::Poisoned => f64::NAN,
        }
    }
}

/// A compiled packed-to-geophysics (or inverse) conversion over all bands.
#[derive(Debug, Clone)]
pub struct SampleTranscoder {
    strategy: TranscoderStrategy,
    bands: Vec<BandConverter>,
}

impl SampleTranscoder {
    /// Compile the forward (packed to geophysics) conversion using the
    /// cheapest applicable strategy from the table.
    pub fn forward(
        dimensions: &[SampleDimension],
        sample_type: SampleType,
        table: &[TranscoderStrategy],
    ) -> Self {
        let strategy = select_strategy(dimensions, sample_type, table);
        debug!(?strategy, bands = dimensions.len(), "compiled forward transcoder");
        let bands = dimensions
            .iter()
            .map(|dim| match strategy {
                TranscoderStrategy::Identity => BandConverter::Identity,
                TranscoderStrategy::Lookup => match lookup_bounds(dim) {
                    Some((origin, size)) => {
                        let table = (0..size)
                            .map(|i| dim.apply((origin + i as i64) as f64))
                            .collect();
                        BandConverter::Lookup { origin, table }
                    }
                    None => BandConverter::General(dim.clone()),
                },
                TranscoderStrategy::Rescale => match dim.single_linear() {
                    Some((scale, offset)) => BandConverter::Rescale { scale, offset },
                    None => BandConverter::General(dim.clone()),
                },
                TranscoderStrategy::Piecewise => BandConverter::Piecewise(dim.clone()),
                TranscoderStrategy::General => BandConverter::General(dim.clone()),
            })
            .collect();
        Self { strategy, bands }
    }

    /// Compile the inverse (geophysics to packed) conversion.
    ///
    /// A band whose transfer functions cannot be inverted is replaced by a
    /// constant NaN converter rather than failing the whole coverage.
    pub fn inverse(dimensions: &[SampleDimension]) -> Self {
        let bands = dimensions
            .iter()
            .enumerate()
            .map(|(band, dim)| {
                if dim.is_invertible() {
                    BandConverter::InverseGeneral(dim.clone())
                } else {
                    warn!(band, name = dim.name(), "band poisoned: transfer function not invertible");
                    BandConverter::Poisoned
                }
            })
            .collect();
        Self {
            strategy: TranscoderStrategy::General,
            bands,
        }
    }

    /// The strategy this transcoder was compiled with.
    pub fn strategy(&self) -> TranscoderStrategy {
        self.strategy
    }

    /// Indices of bands replaced by the constant NaN converter.
    pub fn poisoned_bands(&self) -> Vec<usize> {
        self.bands
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, BandConverter::Poisoned))
            .map(|(i, _)| i)
            .collect()
    }

    /// Convert one sample in one band.
    pub fn convert(&self, band: usize, sample: f64) -> f64 {
        self.bands[band].convert(sample)
    }

    /// Convert a whole raster into a new banded raster of `target_type`.
    ///
    /// Integral target types get rounded, range-clamped values so the
    /// declared element type agrees with the contents; NaN passes through
    /// as the nodata marker.
    pub fn transcode(&self, raster: &dyn Raster, target_type: SampleType) -> Result<BandedRaster> {
        let (width, height) = (raster.width(), raster.height());
        let mut bands = Vec::with_capacity(self.bands.len());
        for (index, converter) in self.bands.iter().enumerate() {
            let mut data = Vec::with_capacity(width * height);
            for y in 0..height {
                for x in 0..width {
                    let value = converter.convert(raster.sample(x, y, index));
                    data.push(quantize(value, target_type));
                }
            }
            bands.push(data);
        }
        BandedRaster::new(width, height, target_type, bands)
    }
}

/// Fit a converted value to the target element type.
fn quantize(value: f64, target_type: SampleType) -> f64 {
    match target_type.value_range() {
        Some((lo, hi)) if value.is_finite() => value.round().clamp(lo, hi),
        _ => value,
    }
}

//! Per-band sample semantics: categories and transfer functions.
//!
//! A [`SampleDimension`] describes how the raw ("packed") values stored in
//! one raster band map to physical ("geophysics") quantities, as an
//! ordered set of disjoint sample sub-ranges. The packed-to-geophysics
//! direction is authoritative; the inverse is derived.

use serde::{Deserialize, Serialize};

use coverage_common::{CoverageError, Result};

/// An inclusive range of sample values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRange {
    pub min: f64,
    pub max: f64,
}

impl SampleRange {
    /// Create a range; fails on non-finite bounds or `min > max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(CoverageError::invalid_argument(
                "sample range bounds must be finite",
            ));
        }
        if min > max {
            return Err(CoverageError::invalid_argument(format!(
                "sample range has min {min} > max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// A range holding a single value.
    pub fn single(value: f64) -> Result<Self> {
        Self::new(value, value)
    }

    /// True if `value` lies in this range (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// True if the two ranges share any value.
    pub fn overlaps(&self, other: &SampleRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// Extent of the range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// An invertible monotonic transfer function from packed samples to
/// geophysics values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransferFunction {
    /// `value = sample * scale + offset`
    Linear { scale: f64, offset: f64 },
    /// `value = ln(sample) * scale + offset`
    Logarithmic { scale: f64, offset: f64 },
    /// `value = exp(sample) * scale + offset`
    Exponential { scale: f64, offset: f64 },
}

impl TransferFunction {
    /// The identity function.
    pub fn identity() -> Self {
        Self::Linear {
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// A pure rescale.
    pub fn linear(scale: f64, offset: f64) -> Self {
        Self::Linear { scale, offset }
    }

    /// Apply packed-to-geophysics.
    pub fn apply(self, sample: f64) -> f64 {
        match self {
            Self::Linear { scale, offset } => sample * scale + offset,
            Self::Logarithmic { scale, offset } => sample.ln() * scale + offset,
            Self::Exponential { scale, offset } => sample.exp() * scale + offset,
        }
    }

    /// Apply the derived geophysics-to-packed direction.
    ///
    /// Fails with `NonInvertibleTransform` when the function has no
    /// inverse (zero scale). Out-of-domain inputs produce NaN, not errors.
    pub fn apply_inverse(self, value: f64) -> Result<f64> {
        match self {
            Self::Linear { scale, offset } => {
                if scale == 0.0 {
                    Err(CoverageError::NonInvertibleTransform(
                        "linear transfer function with zero scale".into(),
                    ))
                } else {
                    Ok((value - offset) / scale)
                }
            }
            Self::Logarithmic { scale, offset } => {
                if scale == 0.0 {
                    Err(CoverageError::NonInvertibleTransform(
                        "logarithmic transfer function with zero scale".into(),
                    ))
                } else {
                    Ok(((value - offset) / scale).exp())
                }
            }
            Self::Exponential { scale, offset } => {
                if scale == 0.0 {
                    Err(CoverageError::NonInvertibleTransform(
                        "exponential transfer function with zero scale".into(),
                    ))
                } else {
                    Ok(((value - offset) / scale).ln())
                }
            }
        }
    }

    /// True for the identity function.
    pub fn is_identity(self) -> bool {
        matches!(self, Self::Linear { scale, offset } if scale == 1.0 && offset == 0.0)
    }

    /// The (scale, offset) pair when the function is linear.
    pub fn linear_coefficients(self) -> Option<(f64, f64)> {
        match self {
            Self::Linear { scale, offset } => Some((scale, offset)),
            _ => None,
        }
    }
}

/// A sub-range of sample values sharing one transfer function or one
/// qualitative meaning.
///
/// A category without a transfer function is qualitative ("no data",
/// "cloud", ...) and maps every sample in its range to NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub range: SampleRange,
    pub transfer: Option<TransferFunction>,
}

impl Category {
    /// A quantitative category applying `transfer` over `range`.
    pub fn quantitative(
        name: impl Into<String>,
        range: SampleRange,
        transfer: TransferFunction,
    ) -> Self {
        Self {
            name: name.into(),
            range,
            transfer: Some(transfer),
        }
    }

    /// A qualitative category mapping its whole range to NaN.
    pub fn qualitative(name: impl Into<String>, range: SampleRange) -> Self {
        Self {
            name: name.into(),
            range,
            transfer: None,
        }
    }

    /// True when the category carries a transfer function.
    pub fn is_quantitative(&self) -> bool {
        self.transfer.is_some()
    }

    /// Convert one packed sample falling in this category.
    pub fn apply(&self, sample: f64) -> f64 {
        match self.transfer {
            Some(t) => t.apply(sample),
            None => f64::NAN,
        }
    }

    /// Image of this category's range under its transfer function,
    /// ordered min before max. None for qualitative categories.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let t = self.transfer?;
        let a = t.apply(self.range.min);
        let b = t.apply(self.range.max);
        Some((a.min(b), a.max(b)))
    }
}

/// Per-band description of the packed-to-geophysics mapping.
///
/// Categories are disjoint and kept sorted by sample value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDimension {
    name: String,
    units: Option<String>,
    categories: Vec<Category>,
}

impl SampleDimension {
    /// Create a dimension, sorting categories and rejecting overlaps.
    pub fn new(
        name: impl Into<String>,
        units: Option<String>,
        mut categories: Vec<Category>,
    ) -> Result<Self> {
        categories.sort_by(|a, b| {
            a.range
                .min
                .partial_cmp(&b.range.min)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for pair in categories.windows(2) {
            if pair[0].range.overlaps(&pair[1].range) {
                return Err(CoverageError::invalid_argument(format!(
                    "categories '{}' and '{}' overlap",
                    pair[0].name, pair[1].name
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            units,
            categories,
        })
    }

    /// A band with no categories at all (plain imagery).
    pub fn without_categories(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: None,
            categories: Vec::new(),
        }
    }

    /// Band name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical units of the geophysics values, if any.
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// The sorted category list.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// True when at least one category is declared.
    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    /// The category whose range contains `sample`.
    pub fn category_for_sample(&self, sample: f64) -> Option<&Category> {
        self.categories.iter().find(|c| c.range.contains(sample))
    }

    /// Convert one packed sample to its geophysics value.
    ///
    /// Samples outside every category map to NaN.
    pub fn apply(&self, sample: f64) -> f64 {
        if !self.has_categories() {
            return sample;
        }
        match self.category_for_sample(sample) {
            Some(category) => category.apply(sample),
            None => f64::NAN,
        }
    }

    /// Convert one geophysics value back to a packed sample.
    ///
    /// NaN maps to the midpoint of the first qualitative category when one
    /// exists. Values outside every quantitative category's image map to
    /// NaN. Fails only when a required transfer function has no inverse.
    pub fn apply_inverse(&self, value: f64) -> Result<f64> {
        if !self.has_categories() {
            return Ok(value);
        }
        if value.is_nan() {
            return Ok(self
                .categories
                .iter()
                .find(|c| !c.is_quantitative())
                .map_or(f64::NAN, |c| (c.range.min + c.range.max) / 2.0));
        }
        for category in &self.categories {
            if let (Some(transfer), Some((lo, hi))) = (category.transfer, category.value_range()) {
                if value >= lo && value <= hi {
                    return transfer.apply_inverse(value);
                }
            }
        }
        Ok(f64::NAN)
    }

    /// True if packed and geophysics representations coincide: every
    /// category is quantitative with an identity transfer function, or
    /// there are no categories.
    pub fn is_identity(&self) -> bool {
        self.categories
            .iter()
            .all(|c| c.transfer.is_some_and(|t| t.is_identity()))
    }

    /// True if every transfer function has an inverse.
    pub fn is_invertible(&self) -> bool {
        self.categories.iter().filter_map(|c| c.transfer).all(|t| {
            let (TransferFunction::Linear { scale, .. }
            | TransferFunction::Logarithmic { scale, .. }
            | TransferFunction::Exponential { scale, .. }) = t;
            scale != 0.0
        })
    }

    /// Hull of all category sample ranges.
    pub fn sample_range(&self) -> Option<SampleRange> {
        let first = self.categories.first()?;
        let last = self.categories.last()?;
        Some(SampleRange {
            min: first.range.min,
            max: last.range.max,
        })
    }

    /// The single (scale, offset) pair shared by every category, when the
    /// whole band is one linear rescale.
    pub fn single_linear(&self) -> Option<(f64, f64)> {
        let mut coefficients = None;
        for category in &self.categories {
            let pair = category.transfer?.linear_coefficients()?;
            match coefficients {
                None => coefficients = Some(pair),
                Some(existing) if existing == pair => {}
                Some(_) => return None,
            }
        }
        coefficients
    }

    /// True if every band value fits an unsigned 16-bit representation.
    pub fn fits_unsigned(&self) -> bool {
        match self.sample_range() {
            Some(range) => range.min >= 0.0 && range.max <= u16::MAX as f64,
            None => true,
        }
    }
}

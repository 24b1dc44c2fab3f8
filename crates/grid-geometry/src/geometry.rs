//! General N-dimensional grid geometry.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use coverage_common::{CoverageError, CrsDescriptor, Envelope, PixelAnchor, Result};

use crate::extent::GridExtent;
use crate::mapper::GridToEnvelopeMapper;
use crate::transform::{transform_box, MathTransform};

/// Bit flags naming the four optional grid-geometry attributes.
///
/// [`GridGeometry::is_defined`] takes any combination of these; other bits
/// are invalid.
pub mod attributes {
    /// The coordinate reference system descriptor.
    pub const CRS: u8 = 1;
    /// The real-world envelope.
    pub const ENVELOPE: u8 = 2;
    /// The grid extent.
    pub const EXTENT: u8 = 4;
    /// The grid-to-CRS transform.
    pub const GRID_TO_CRS: u8 = 8;
    /// All four attributes.
    pub const ALL: u8 = CRS | ENVELOPE | EXTENT | GRID_TO_CRS;
}

/// An immutable bundle of {extent, grid-to-CRS transform, envelope, CRS}
/// where any subset may be absent.
///
/// Construction from any two of {extent, transform, envelope} derives the
/// third. Querying an absent attribute is an error, not a null return;
/// callers check [`GridGeometry::is_defined`] first. No partially-valid
/// geometry is ever returned: every consistency violation fails the
/// constructor.
#[derive(Debug, Clone)]
pub struct GridGeometry {
    extent: Option<GridExtent>,
    grid_to_crs: Option<Arc<dyn MathTransform>>,
    anchor: PixelAnchor,
    envelope: Option<Envelope>,
    crs: Option<CrsDescriptor>,
    resolution: OnceLock<Vec<f64>>,
    /// Transform re-anchored to the convention opposite `anchor`.
    other_anchor: OnceLock<Arc<dyn MathTransform>>,
}

impl GridGeometry {
    /// Build from an extent and a transform; derives the envelope by
    /// expanding the extent by half a cell on every side and transforming
    /// the corners.
    pub fn from_extent_and_transform(
        extent: GridExtent,
        grid_to_crs: Arc<dyn MathTransform>,
        anchor: PixelAnchor,
        crs: Option<CrsDescriptor>,
    ) -> Result<Self> {
        let dim = extent.dimension();
        if grid_to_crs.source_dim() != dim {
            return Err(CoverageError::mismatched_dimension(
                dim,
                grid_to_crs.source_dim(),
            ));
        }
        check_crs_dim(&crs, grid_to_crs.target_dim())?;

        // Cell coverage in center-anchored coordinates, shifted into the
        // transform's own anchoring before mapping.
        let shift = PixelAnchor::Center.translation_to(anchor);
        let lows: Vec<f64> = (0..dim)
            .map(|i| extent.low(i) as f64 - 0.5 + shift)
            .collect();
        let highs: Vec<f64> = (0..dim)
            .map(|i| extent.high(i) as f64 + 0.5 + shift)
            .collect();
        let envelope = transform_box(grid_to_crs.as_ref(), &lows, &highs).map_err(|e| {
            CoverageError::invalid_argument(format!("cannot transform extent corners: {e}"))
        })?;
        debug!(dim, "derived envelope from extent and transform");

        Ok(Self {
            extent: Some(extent),
            grid_to_crs: Some(grid_to_crs),
            anchor,
            envelope: Some(envelope),
            crs,
            resolution: OnceLock::new(),
            other_anchor: OnceLock::new(),
        })
    }

    /// Build from an envelope and a transform; derives the extent by
    /// inverting the transform and rounding outward (ENCLOSING: the extent
    /// grows, never shrinks, so it fully covers the envelope).
    pub fn from_envelope_and_transform(
        envelope: Envelope,
        grid_to_crs: Arc<dyn MathTransform>,
        anchor: PixelAnchor,
        crs: Option<CrsDescriptor>,
    ) -> Result<Self> {
        if grid_to_crs.target_dim() != envelope.dimension() {
            return Err(CoverageError::mismatched_dimension(
                envelope.dimension(),
                grid_to_crs.target_dim(),
            ));
        }
        check_crs_dim(&crs, grid_to_crs.target_dim())?;

        let inverse = grid_to_crs.inverse()?;
        let grid_box = transform_box(
            inverse.as_ref(),
            envelope.lower_corner(),
            envelope.upper_corner(),
        )?;

        // Shift into center-anchored coordinates, then round outward. A
        // cell i covers [i - 0.5, i + 0.5] in center coordinates.
        let shift = anchor.translation_to(PixelAnchor::Center);
        let dim = grid_box.dimension();
        let mut low = Vec::with_capacity(dim);
        let mut high = Vec::with_capacity(dim);
        for i in 0..dim {
            let a = grid_box.min(i) + shift;
            let b = grid_box.max(i) + shift;
            if !a.is_finite() || !b.is_finite() {
                return Err(CoverageError::invalid_geometry(format!(
                    "envelope maps to non-finite grid coordinates on axis {i}"
                )));
            }
            let lo = (a + 0.5).floor() as i64;
            let hi = ((b - 0.5).ceil() as i64).max(lo);
            low.push(lo);
            high.push(hi);
        }
        let extent = GridExtent::new(low, high)?;
        debug!(dim, "derived extent from envelope and transform");

        Ok(Self {
            extent: Some(extent),
            grid_to_crs: Some(grid_to_crs),
            anchor,
            envelope: Some(envelope),
            crs,
            resolution: OnceLock::new(),
            other_anchor: OnceLock::new(),
        })
    }

    /// Build from an extent and an envelope; derives the transform with
    /// the default [`GridToEnvelopeMapper`] heuristic.
    pub fn from_extent_and_envelope(
        extent: GridExtent,
        envelope: Envelope,
        crs: Option<CrsDescriptor>,
    ) -> Result<Self> {
        Self::from_extent_and_envelope_with_mapper(
            extent,
            envelope,
            crs,
            &GridToEnvelopeMapper::new(),
        )
    }

    /// Like [`Self::from_extent_and_envelope`] with an explicitly
    /// configured mapper.
    pub fn from_extent_and_envelope_with_mapper(
        extent: GridExtent,
        envelope: Envelope,
        crs: Option<CrsDescriptor>,
        mapper: &GridToEnvelopeMapper,
    ) -> Result<Self> {
        let transform = mapper.create_transform(&extent, &envelope, crs.as_ref())?;
        Ok(Self {
            extent: Some(extent),
            grid_to_crs: Some(Arc::new(transform)),
            anchor: PixelAnchor::Center,
            envelope: Some(envelope),
            crs,
            resolution: OnceLock::new(),
            other_anchor: OnceLock::new(),
        })
    }

    /// Build a geometry holding only an extent (no georeferencing).
    pub fn from_extent(extent: GridExtent) -> Self {
        Self {
            extent: Some(extent),
            grid_to_crs: None,
            anchor: PixelAnchor::Center,
            envelope: None,
            crs: None,
            resolution: OnceLock::new(),
            other_anchor: OnceLock::new(),
        }
    }

    /// Bit mask of the currently defined attributes.
    pub fn defined_mask(&self) -> u8 {
        let mut mask = 0;
        if self.crs.is_some() {
            mask |= attributes::CRS;
        }
        if self.envelope.is_some() {
            mask |= attributes::ENVELOPE;
        }
        if self.extent.is_some() {
            mask |= attributes::EXTENT;
        }
        if self.grid_to_crs.is_some() {
            mask |= attributes::GRID_TO_CRS;
        }
        mask
    }

    /// True if every attribute named by `mask` is defined.
    ///
    /// A pure predicate: it fails only on invalid mask bits, never on an
    /// undefined attribute.
    pub fn is_defined(&self, mask: u8) -> Result<bool> {
        if mask & !attributes::ALL != 0 {
            return Err(CoverageError::invalid_argument(format!(
                "invalid attribute mask: {mask:#06b}"
            )));
        }
        Ok(self.defined_mask() & mask == mask)
    }

    /// Number of grid dimensions.
    pub fn dimension(&self) -> usize {
        match (&self.extent, &self.grid_to_crs) {
            (Some(extent), _) => extent.dimension(),
            (None, Some(t)) => t.source_dim(),
            (None, None) => self.envelope.as_ref().map_or(0, Envelope::dimension),
        }
    }

    /// The grid extent.
    pub fn extent(&self) -> Result<&GridExtent> {
        self.extent
            .as_ref()
            .ok_or(CoverageError::incomplete("extent"))
    }

    /// The real-world envelope.
    pub fn envelope(&self) -> Result<&Envelope> {
        self.envelope
            .as_ref()
            .ok_or(CoverageError::incomplete("envelope"))
    }

    /// The coordinate reference system descriptor.
    pub fn crs(&self) -> Result<&CrsDescriptor> {
        self.crs.as_ref().ok_or(CoverageError::incomplete("crs"))
    }

    /// The grid-to-CRS transform in its native anchoring.
    pub fn grid_to_crs(&self) -> Result<Arc<dyn MathTransform>> {
        self.grid_to_crs
            .clone()
            .ok_or(CoverageError::incomplete("gridToCRS"))
    }

    /// The anchoring convention of the stored transform.
    pub fn anchor(&self) -> PixelAnchor {
        self.anchor
    }

    /// The grid-to-CRS transform re-anchored to `target`.
    ///
    /// The non-native variant is computed once and cached.
    pub fn grid_to_crs_anchored(&self, target: PixelAnchor) -> Result<Arc<dyn MathTransform>> {
        let native = self.grid_to_crs()?;
        if target == self.anchor {
            return Ok(native);
        }
        if let Some(cached) = self.other_anchor.get() {
            return Ok(cached.clone());
        }
        let delta = target.translation_to(self.anchor);
        let shifted: Arc<dyn MathTransform> = match native.as_affine() {
            Some(affine) => Arc::new(affine.pre_translate_all(delta)),
            None => Arc::new(AnchorShift {
                inner: native,
                delta,
            }),
        };
        Ok(self.other_anchor.get_or_init(|| shifted).clone())
    }

    /// Per-axis resolution of the transform, computed once and cached.
    ///
    /// For an affine transform this is the Euclidean norm of each column
    /// of the linear part. Non-affine transforms report NaN on every axis;
    /// use [`Self::estimated_resolution`] to opt into an estimate.
    pub fn resolution(&self) -> Result<&[f64]> {
        let transform = self.grid_to_crs()?;
        Ok(self.resolution.get_or_init(|| match transform.as_affine() {
            Some(affine) => affine.column_norms(),
            None => vec![f64::NAN; transform.source_dim()],
        }))
    }

    /// Resolution estimated from finite differences at the grid center.
    ///
    /// Valid for non-affine transforms too; requires the extent.
    pub fn estimated_resolution(&self) -> Result<Vec<f64>> {
        let transform = self.grid_to_crs()?;
        let extent = self.extent()?;
        let dim = extent.dimension();
        let center: Vec<f64> = (0..dim)
            .map(|i| (extent.low(i) + extent.high(i)) as f64 / 2.0)
            .collect();
        let origin = transform.transform(&center)?;
        let mut resolution = Vec::with_capacity(dim);
        for axis in 0..dim {
            let mut moved = center.clone();
            moved[axis] += 1.0;
            let image = transform.transform(&moved)?;
            let norm = origin
                .iter()
                .zip(&image)
                .map(|(a, b)| (b - a) * (b - a))
                .sum::<f64>()
                .sqrt();
            resolution.push(norm);
        }
        Ok(resolution)
    }

    /// Replace the extent, keeping transform, anchor and CRS. The envelope
    /// is re-derived when a transform is present. Used by slicing.
    pub(crate) fn with_extent(&self, extent: GridExtent) -> Result<Self> {
        match &self.grid_to_crs {
            Some(t) => Self::from_extent_and_transform(
                extent,
                t.clone(),
                self.anchor,
                self.crs.clone(),
            ),
            None => Ok(Self::from_extent(extent)),
        }
    }
}

impl PartialEq for GridGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.extent == other.extent
            && self.envelope == other.envelope
            && self.crs == other.crs
            && self.anchor == other.anchor
            && transforms_equal(&self.grid_to_crs, &other.grid_to_crs)
    }
}

/// Transform equality: pointer identity, or equal affine matrices.
pub(crate) fn transforms_equal(
    a: &Option<Arc<dyn MathTransform>>,
    b: &Option<Arc<dyn MathTransform>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            Arc::ptr_eq(a, b)
                || matches!((a.as_affine(), b.as_affine()), (Some(x), Some(y)) if x == y)
        }
        _ => false,
    }
}

fn check_crs_dim(crs: &Option<CrsDescriptor>, target_dim: usize) -> Result<()> {
    if let Some(crs) = crs {
        if crs.dimension() != target_dim {
            return Err(CoverageError::mismatched_dimension(
                target_dim,
                crs.dimension(),
            ));
        }
    }
    Ok(())
}

/// A non-affine transform with a uniform shift applied to every source
/// ordinate before delegating. Used for anchor conversion.
#[derive(Debug)]
struct AnchorShift {
    inner: Arc<dyn MathTransform>,
    delta: f64,
}

impl MathTransform for AnchorShift {
    fn source_dim(&self) -> usize {
        self.inner.source_dim()
    }

    fn target_dim(&self) -> usize {
        self.inner.target_dim()
    }

    fn transform(&self, src: &[f64]) -> Result<Vec<f64>> {
        let shifted: Vec<f64> = src.iter().map(|v| v + self.delta).collect();
        self.inner.transform(&shifted)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        Ok(Arc::new(PostShift {
            inner: self.inner.inverse()?,
            delta: -self.delta,
        }))
    }
}

/// Inverse counterpart of [`AnchorShift`]: shift applied after delegating.
#[derive(Debug)]
struct PostShift {
    inner: Arc<dyn MathTransform>,
    delta: f64,
}

impl MathTransform for PostShift {
    fn source_dim(&self) -> usize {
        self.inner.source_dim()
    }

    fn target_dim(&self) -> usize {
        self.inner.target_dim()
    }

    fn transform(&self, src: &[f64]) -> Result<Vec<f64>> {
        let mut out = self.inner.transform(src)?;
        for v in &mut out {
            *v += self.delta;
        }
        Ok(out)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        Ok(Arc::new(AnchorShift {
            inner: self.inner.inverse()?,
            delta: -self.delta,
        }))
    }
}

//! Two-dimensional specialization of [`GridGeometry`].

use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use nalgebra::DMatrix;

use coverage_common::{CoverageError, Envelope, PixelAnchor, Result};

use crate::extent::GridExtent;
use crate::geometry::GridGeometry;
use crate::transform::{AffineTransform, MathTransform};

/// A grid geometry with exactly two "active" grid axes (extent span > 1)
/// and the corresponding pair of CRS axes identified.
///
/// All remaining grid axes must span at most one cell: a "2.5D" slice of
/// an N-dimensional grid. By construction `grid_dimension_x <
/// grid_dimension_y` and `axis_dimension_x < axis_dimension_y`; callers
/// never need to sort.
#[derive(Debug, Clone)]
pub struct GridGeometry2D {
    geometry: GridGeometry,
    grid_dimension_x: usize,
    grid_dimension_y: usize,
    axis_dimension_x: usize,
    axis_dimension_y: usize,
    /// Center-anchored 2D sub-transform, absent when the full geometry has
    /// no transform.
    transform2d: Option<AffineTransform>,
    corner2d: OnceLock<AffineTransform>,
    inverse2d: OnceLock<AffineTransform>,
}

impl GridGeometry2D {
    /// Specialize a general geometry to 2D.
    ///
    /// Fails if more than two grid axes span > 1 cell, or if the transform
    /// cannot be separated into an independent 2D block over the two
    /// chosen grid axes.
    pub fn new(geometry: GridGeometry) -> Result<Self> {
        let (gx, gy) = Self::select_grid_axes(&geometry)?;

        let (transform2d, ax, ay) = match geometry.grid_to_crs() {
            Ok(full) => {
                let affine = full.as_affine().ok_or_else(|| {
                    CoverageError::invalid_geometry(
                        "cannot separate a non-affine transform into a 2D block",
                    )
                })?;
                let anchored = match geometry.anchor() {
                    PixelAnchor::Center => affine.clone(),
                    PixelAnchor::Corner => affine
                        .pre_translate_all(PixelAnchor::Center.translation_to(PixelAnchor::Corner)),
                };
                let (sub, ax, ay) = separate_2d_block(&anchored, gx, gy)?;
                (Some(sub), ax, ay)
            }
            Err(_) => (None, 0, 1),
        };

        Ok(Self {
            geometry,
            grid_dimension_x: gx,
            grid_dimension_y: gy,
            axis_dimension_x: ax,
            axis_dimension_y: ay,
            transform2d,
            corner2d: OnceLock::new(),
            inverse2d: OnceLock::new(),
        })
    }

    /// Convenience constructor for a natively 2D geometry.
    pub fn from_extent_and_transform(
        extent: GridExtent,
        grid_to_crs: Arc<dyn MathTransform>,
        anchor: PixelAnchor,
        crs: Option<coverage_common::CrsDescriptor>,
    ) -> Result<Self> {
        Self::new(GridGeometry::from_extent_and_transform(
            extent,
            grid_to_crs,
            anchor,
            crs,
        )?)
    }

    fn select_grid_axes(geometry: &GridGeometry) -> Result<(usize, usize)> {
        match geometry.extent() {
            Ok(extent) => {
                let wide = extent.wide_axes();
                match wide.len() {
                    0 => Ok((0, 1)),
                    1 => {
                        // Pair the single wide axis with the lowest other axis.
                        let w = wide[0];
                        let other = if w == 0 { 1 } else { 0 };
                        Ok((other.min(w), other.max(w)))
                    }
                    2 => Ok((wide[0], wide[1])),
                    n => Err(CoverageError::invalid_geometry(format!(
                        "{n} grid axes span more than one cell; a 2D slice allows at most two"
                    ))),
                }
            }
            Err(_) => Ok((0, 1)),
        }
    }

    /// Index of the first active grid axis (always < `grid_dimension_y`).
    pub fn grid_dimension_x(&self) -> usize {
        self.grid_dimension_x
    }

    /// Index of the second active grid axis.
    pub fn grid_dimension_y(&self) -> usize {
        self.grid_dimension_y
    }

    /// Index of the CRS axis paired with grid x (always < `axis_dimension_y`).
    pub fn axis_dimension_x(&self) -> usize {
        self.axis_dimension_x
    }

    /// Index of the CRS axis paired with grid y.
    pub fn axis_dimension_y(&self) -> usize {
        self.axis_dimension_y
    }

    /// The underlying N-dimensional geometry.
    pub fn general(&self) -> &GridGeometry {
        &self.geometry
    }

    /// The 2D extent over the two active grid axes.
    pub fn extent_2d(&self) -> Result<GridExtent> {
        let extent = self.geometry.extent()?;
        GridExtent::new(
            vec![
                extent.low(self.grid_dimension_x),
                extent.low(self.grid_dimension_y),
            ],
            vec![
                extent.high(self.grid_dimension_x),
                extent.high(self.grid_dimension_y),
            ],
        )
    }

    /// The envelope over the two identified CRS axes.
    pub fn envelope_2d(&self) -> Result<Envelope> {
        let envelope = self.geometry.envelope()?;
        Envelope::new_2d(
            envelope.min(self.axis_dimension_x),
            envelope.min(self.axis_dimension_y),
            envelope.max(self.axis_dimension_x),
            envelope.max(self.axis_dimension_y),
        )
    }

    /// The 2D grid-to-CRS transform in the requested anchoring.
    ///
    /// The corner variant is computed once and cached.
    pub fn grid_to_crs_2d(&self, anchor: PixelAnchor) -> Result<&AffineTransform> {
        let center = self
            .transform2d
            .as_ref()
            .ok_or(CoverageError::incomplete("gridToCRS"))?;
        match anchor {
            PixelAnchor::Center => Ok(center),
            PixelAnchor::Corner => Ok(self.corner2d.get_or_init(|| {
                center.pre_translate_all(PixelAnchor::Corner.translation_to(PixelAnchor::Center))
            })),
        }
    }

    /// The inverse 2D transform (CRS to fractional grid coordinates,
    /// center-anchored), computed once and cached.
    pub fn crs_to_grid_2d(&self) -> Result<&AffineTransform> {
        if let Some(cached) = self.inverse2d.get() {
            return Ok(cached);
        }
        let center = self.grid_to_crs_2d(PixelAnchor::Center)?;
        let inverse = center.inverse()?;
        let affine = inverse
            .as_affine()
            .ok_or_else(|| CoverageError::NonInvertibleTransform("expected affine inverse".into()))?
            .clone();
        Ok(self.inverse2d.get_or_init(|| affine))
    }
}

impl Deref for GridGeometry2D {
    type Target = GridGeometry;

    fn deref(&self) -> &GridGeometry {
        &self.geometry
    }
}

impl PartialEq for GridGeometry2D {
    fn eq(&self, other: &Self) -> bool {
        self.geometry == other.geometry
            && self.grid_dimension_x == other.grid_dimension_x
            && self.grid_dimension_y == other.grid_dimension_y
    }
}

/// Extract the independent 2D block of an affine transform over grid axes
/// (gx, gy).
///
/// Returns the 2D sub-transform and the sorted pair of target axes it
/// feeds. Fails when the chosen grid axes leak into other target axes'
/// dependencies or vice versa.
fn separate_2d_block(
    affine: &AffineTransform,
    gx: usize,
    gy: usize,
) -> Result<(AffineTransform, usize, usize)> {
    let source_dim = affine.source_dim();
    let target_dim = affine.target_dim();
    if gx >= source_dim || gy >= source_dim {
        return Err(CoverageError::mismatched_dimension(source_dim, gy + 1));
    }

    // Target axes that depend on either chosen grid axis.
    let mut targets = Vec::new();
    for t in 0..target_dim {
        if affine.element(t, gx) != 0.0 || affine.element(t, gy) != 0.0 {
            targets.push(t);
        }
    }
    if targets.len() != 2 {
        return Err(CoverageError::invalid_geometry(format!(
            "grid axes ({gx}, {gy}) feed {} CRS axes, expected exactly 2",
            targets.len()
        )));
    }

    // Those target axes must not depend on any other grid axis.
    for &t in &targets {
        for c in 0..source_dim {
            if c != gx && c != gy && affine.element(t, c) != 0.0 {
                return Err(CoverageError::invalid_geometry(format!(
                    "CRS axis {t} depends on grid axis {c}, outside the 2D block"
                )));
            }
        }
    }

    let (ax, ay) = (targets[0], targets[1]);
    let matrix = DMatrix::from_row_slice(
        3,
        3,
        &[
            affine.element(ax, gx),
            affine.element(ax, gy),
            affine.element(ax, source_dim),
            affine.element(ay, gx),
            affine.element(ay, gy),
            affine.element(ay, source_dim),
            0.0,
            0.0,
            1.0,
        ],
    );
    Ok((AffineTransform::new(matrix)?, ax, ay))
}

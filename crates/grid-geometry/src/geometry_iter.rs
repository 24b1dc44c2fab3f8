//! Lazy slicing of an N-dimensional geometry into 2D geometries.

use coverage_common::{CoverageError, Result};

use crate::geometry::GridGeometry;
use crate::geometry2d::GridGeometry2D;
use crate::iter::GridIterator;
use crate::transform::MathTransform;

/// Produces a lazy sequence of 2D geometry slices from an N-dimensional
/// geometry.
///
/// The two horizontal axes span every slice entirely; every other axis is
/// stepped one cell at a time, highest-index axis fastest (the order of
/// [`GridIterator`]). The horizontal axes are detected from the CRS axis
/// directions, or given explicitly.
#[derive(Debug)]
pub struct GridGeometryIterator {
    geometry: GridGeometry,
    extents: GridIterator,
}

impl GridGeometryIterator {
    /// Create an iterator with auto-detected horizontal axes.
    ///
    /// When the geometry carries a CRS and an affine transform, the
    /// horizontal axes are the grid axes feeding horizontally-directed CRS
    /// axes. Otherwise the conventional axes (0, 1) are used.
    pub fn new(geometry: GridGeometry) -> Result<Self> {
        let axes = detect_horizontal_axes(&geometry);
        Self::with_axes(geometry, axes)
    }

    /// Create an iterator slicing along explicit horizontal axes.
    pub fn with_axes(geometry: GridGeometry, axes: (usize, usize)) -> Result<Self> {
        let extent = geometry.extent()?.clone();
        let dim = extent.dimension();
        let (ax, ay) = axes;
        if ax == ay || ax >= dim || ay >= dim {
            return Err(CoverageError::invalid_argument(format!(
                "invalid horizontal axes ({ax}, {ay}) for a {dim}-dimensional extent"
            )));
        }
        let steps: Vec<i64> = (0..dim)
            .map(|i| if i == ax || i == ay { 0 } else { 1 })
            .collect();
        let extents = GridIterator::new(extent, steps)?;
        Ok(Self { geometry, extents })
    }
}

/// Grid axes feeding horizontally-directed CRS axes, when identifiable.
fn detect_horizontal_axes(geometry: &GridGeometry) -> (usize, usize) {
    if let (Ok(crs), Ok(transform)) = (geometry.crs(), geometry.grid_to_crs()) {
        if let Some(affine) = transform.as_affine() {
            let mut axes = Vec::new();
            for g in 0..affine.source_dim() {
                let horizontal = (0..affine.target_dim()).any(|t| {
                    affine.element(t, g) != 0.0 && crs.axis_direction(t).is_horizontal()
                });
                if horizontal {
                    axes.push(g);
                }
            }
            if axes.len() == 2 {
                return (axes[0], axes[1]);
            }
        }
    }
    (0, 1)
}

impl Iterator for GridGeometryIterator {
    type Item = Result<GridGeometry2D>;

    fn next(&mut self) -> Option<Self::Item> {
        let sub = self.extents.next()?;
        Some(
            self.geometry
                .with_extent(sub)
                .and_then(GridGeometry2D::new),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::GridExtent;
    use crate::transform::{AffineTransform, MathTransform};
    use coverage_common::PixelAnchor;
    use std::sync::Arc;

    fn geometry_3d(levels: i64) -> GridGeometry {
        let extent = GridExtent::new(vec![0, 0, 0], vec![9, 7, levels - 1]).unwrap();
        let transform: Arc<dyn MathTransform> = Arc::new(
            AffineTransform::from_scale_offset(&[1.0, -1.0, 50.0], &[0.5, 7.5, 0.0]).unwrap(),
        );
        GridGeometry::from_extent_and_transform(extent, transform, PixelAnchor::Center, None)
            .unwrap()
    }

    #[test]
    fn test_yields_one_slice_per_level() {
        let slices: Vec<_> = GridGeometryIterator::new(geometry_3d(4))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(slices.len(), 4);
        for (z, slice) in slices.iter().enumerate() {
            let extent = slice.general().extent().unwrap();
            assert_eq!(extent.low(2), z as i64);
            assert_eq!(extent.high(2), z as i64);
            assert_eq!(extent.size(0), 10);
            assert_eq!(extent.size(1), 8);
            assert_eq!(slice.grid_dimension_x(), 0);
            assert_eq!(slice.grid_dimension_y(), 1);
        }
    }

    #[test]
    fn test_slice_envelopes_track_levels() {
        let slices: Vec<_> = GridGeometryIterator::new(geometry_3d(2))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let env0 = slices[0].general().envelope().unwrap().clone();
        let env1 = slices[1].general().envelope().unwrap().clone();
        // Vertical axis scale is 50 per level.
        assert!((env1.center(2) - env0.center(2) - 50.0).abs() < 1e-9);
        // Horizontal coverage is identical.
        assert!((env0.min(0) - env1.min(0)).abs() < 1e-9);
        assert!((env0.max(1) - env1.max(1)).abs() < 1e-9);
    }

    #[test]
    fn test_detects_horizontal_axes_from_crs() {
        // Vertical axis comes first in grid order; CRS directions identify
        // axes 1 and 2 as the horizontal plane.
        let extent = GridExtent::new(vec![0, 0, 0], vec![2, 9, 7]).unwrap();
        let transform: Arc<dyn MathTransform> = Arc::new(
            AffineTransform::from_scale_offset(&[50.0, 1.0, -1.0], &[0.0, 0.5, 7.5]).unwrap(),
        );
        let crs = coverage_common::CrsDescriptor::new(
            "TEST:zxy",
            vec![
                coverage_common::AxisDirection::Up,
                coverage_common::AxisDirection::East,
                coverage_common::AxisDirection::North,
            ],
        );
        let geometry =
            GridGeometry::from_extent_and_transform(extent, transform, PixelAnchor::Center, Some(crs))
                .unwrap();
        let slices: Vec<_> = GridGeometryIterator::new(geometry)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].grid_dimension_x(), 1);
        assert_eq!(slices[0].grid_dimension_y(), 2);
    }

    #[test]
    fn test_explicit_axes() {
        let slices: Vec<_> = GridGeometryIterator::with_axes(geometry_3d(3), (0, 1))
            .unwrap()
            .collect();
        assert_eq!(slices.len(), 3);
    }

    #[test]
    fn test_rejects_bad_axes() {
        assert!(GridGeometryIterator::with_axes(geometry_3d(3), (0, 0)).is_err());
        assert!(GridGeometryIterator::with_axes(geometry_3d(3), (0, 9)).is_err());
    }

    #[test]
    fn test_flat_2d_geometry_yields_a_single_slice() {
        let extent = GridExtent::new_2d(10, 8).unwrap();
        let transform: Arc<dyn MathTransform> =
            Arc::new(AffineTransform::from_scale_offset(&[1.0, -1.0], &[0.5, 7.5]).unwrap());
        let geometry =
            GridGeometry::from_extent_and_transform(extent, transform, PixelAnchor::Center, None)
                .unwrap();
        let slices: Vec<_> = GridGeometryIterator::new(geometry)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].extent_2d().unwrap().size(0), 10);
    }
}

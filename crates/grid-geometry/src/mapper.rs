//! Inference of a grid-to-CRS transform from an extent and an envelope.

use nalgebra::DMatrix;
use tracing::debug;

use coverage_common::{AxisDirection, CoverageError, CrsDescriptor, Envelope, Result};

use crate::extent::GridExtent;
use crate::transform::AffineTransform;

/// Builds an axis-aligned affine transform mapping extent corners to
/// envelope corners.
///
/// Axis order and reversal are chosen by matching CRS axis directions to
/// the conventional grid orientation: column index increases rightward
/// (east), row index increases downward (south). This is an explicit
/// heuristic, not guaranteed correct for exotic CRS axis orders; the
/// defaults can be overridden per mapper.
///
/// The produced transform is pixel-center anchored.
#[derive(Debug, Clone, Default)]
pub struct GridToEnvelopeMapper {
    swap_xy: Option<bool>,
    flips: Option<Vec<bool>>,
}

impl GridToEnvelopeMapper {
    /// A mapper using the automatic axis-matching heuristic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force whether the first two grid axes are swapped, bypassing the
    /// CRS-direction heuristic.
    pub fn with_swap_xy(mut self, swap: bool) -> Self {
        self.swap_xy = Some(swap);
        self
    }

    /// Force the per-target-axis flip decisions, bypassing the heuristic.
    pub fn with_axis_flips(mut self, flips: Vec<bool>) -> Self {
        self.flips = Some(flips);
        self
    }

    /// Create the transform for the given extent and envelope.
    ///
    /// Fails if the extent and envelope (and CRS, when given) disagree on
    /// dimensionality.
    pub fn create_transform(
        &self,
        extent: &GridExtent,
        envelope: &Envelope,
        crs: Option<&CrsDescriptor>,
    ) -> Result<AffineTransform> {
        let dim = extent.dimension();
        if envelope.dimension() != dim {
            return Err(CoverageError::mismatched_dimension(
                dim,
                envelope.dimension(),
            ));
        }
        if let Some(crs) = crs {
            if crs.dimension() != dim {
                return Err(CoverageError::mismatched_dimension(dim, crs.dimension()));
            }
        }

        let swap = self.swap_xy.unwrap_or_else(|| auto_swap(crs, dim));
        let mut matrix = DMatrix::identity(dim + 1, dim + 1);
        for t in 0..dim {
            let g = grid_axis_for_target(t, swap);
            let flip = match &self.flips {
                Some(flips) => flips.get(t).copied().unwrap_or(false),
                None => auto_flip(g, crs.map(|c| c.axis_direction(t))),
            };
            let scale = envelope.span(t) / extent.size(g) as f64;
            let low = extent.low(g) as f64;
            matrix[(t, t)] = 0.0;
            if flip {
                matrix[(t, g)] = -scale;
                matrix[(t, dim)] = envelope.max(t) + (low - 0.5) * scale;
            } else {
                matrix[(t, g)] = scale;
                matrix[(t, dim)] = envelope.min(t) - (low - 0.5) * scale;
            }
        }
        debug!(dim, swap, "inferred grid-to-CRS transform from extent and envelope");
        AffineTransform::new(matrix)
    }
}

/// Grid axis feeding the given target axis: identity, with axes 0 and 1
/// exchanged when swapping.
fn grid_axis_for_target(target: usize, swap: bool) -> usize {
    match (target, swap) {
        (0, true) => 1,
        (1, true) => 0,
        (t, _) => t,
    }
}

/// Swap when the CRS puts the north-south axis first (latitude/longitude
/// axis order).
fn auto_swap(crs: Option<&CrsDescriptor>, dim: usize) -> bool {
    if dim < 2 {
        return false;
    }
    match crs {
        Some(crs) => {
            crs.axis_direction(0).absolute() == AxisDirection::North
                && crs.axis_direction(1).absolute() == AxisDirection::East
        }
        None => false,
    }
}

/// Flip decision for a target axis fed by grid axis `g`.
///
/// Grid columns conventionally point east and rows point south. A known
/// direction opposite to that convention flips the axis; an unknown
/// direction falls back to flipping row-fed axes only (north-up display).
fn auto_flip(g: usize, direction: Option<AxisDirection>) -> bool {
    let expected = match g {
        0 => AxisDirection::East,
        1 => AxisDirection::South,
        _ => AxisDirection::Other,
    };
    match direction {
        Some(d) if d == expected => false,
        Some(d) if d != AxisDirection::Other && d == expected.opposite() => true,
        _ => g == 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MathTransform;
    use coverage_common::PixelAnchor;

    fn global_extent_and_envelope() -> (GridExtent, Envelope) {
        let extent = GridExtent::new_2d(360, 180).unwrap();
        let envelope = Envelope::new_2d(-180.0, -90.0, 180.0, 90.0).unwrap();
        (extent, envelope)
    }

    // Golden tests: these pin the observable heuristic behavior.

    #[test]
    fn test_lon_lat_axis_order() {
        let (extent, envelope) = global_extent_and_envelope();
        let crs = CrsDescriptor::wgs84_2d();
        let t = GridToEnvelopeMapper::new()
            .create_transform(&extent, &envelope, Some(&crs))
            .unwrap();

        // Cell (0, 0) center maps to the north-west corner cell center.
        let p = t.transform(&[0.0, 0.0]).unwrap();
        assert!((p[0] - (-179.5)).abs() < 1e-9);
        assert!((p[1] - 89.5).abs() < 1e-9);

        // Last cell center maps to the south-east corner cell center.
        let p = t.transform(&[359.0, 179.0]).unwrap();
        assert!((p[0] - 179.5).abs() < 1e-9);
        assert!((p[1] - (-89.5)).abs() < 1e-9);
    }

    #[test]
    fn test_lat_lon_axis_order_swaps() {
        let (extent, envelope) = global_extent_and_envelope();
        // Same envelope spans but latitude-first axis order.
        let envelope = Envelope::new_2d(
            envelope.min(1),
            envelope.min(0),
            envelope.max(1),
            envelope.max(0),
        )
        .unwrap();
        let crs = CrsDescriptor::new(
            "EPSG:4326",
            vec![AxisDirection::North, AxisDirection::East],
        );
        let extent = GridExtent::new_2d(360, 180).unwrap();
        let t = GridToEnvelopeMapper::new()
            .create_transform(&extent, &envelope, Some(&crs))
            .unwrap();

        // Latitude comes first in the output, still north-up.
        let p = t.transform(&[0.0, 0.0]).unwrap();
        assert!((p[0] - 89.5).abs() < 1e-9);
        assert!((p[1] - (-179.5)).abs() < 1e-9);
    }

    #[test]
    fn test_no_crs_flips_rows_only() {
        let (extent, envelope) = global_extent_and_envelope();
        let t = GridToEnvelopeMapper::new()
            .create_transform(&extent, &envelope, None)
            .unwrap();
        let p = t.transform(&[0.0, 0.0]).unwrap();
        assert!((p[0] - (-179.5)).abs() < 1e-9);
        assert!((p[1] - 89.5).abs() < 1e-9);
    }

    #[test]
    fn test_south_axis_is_not_flipped() {
        let (extent, envelope) = global_extent_and_envelope();
        let crs = CrsDescriptor::new(
            "TEST:south",
            vec![AxisDirection::East, AxisDirection::South],
        );
        let t = GridToEnvelopeMapper::new()
            .create_transform(&extent, &envelope, Some(&crs))
            .unwrap();
        // Row 0 maps to the envelope minimum when the axis points south.
        let p = t.transform(&[0.0, 0.0]).unwrap();
        assert!((p[1] - (-89.5)).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_overrides_win() {
        let (extent, envelope) = global_extent_and_envelope();
        let crs = CrsDescriptor::wgs84_2d();
        let t = GridToEnvelopeMapper::new()
            .with_swap_xy(false)
            .with_axis_flips(vec![false, false])
            .create_transform(&extent, &envelope, Some(&crs))
            .unwrap();
        let p = t.transform(&[0.0, 0.0]).unwrap();
        assert!((p[1] - (-89.5)).abs() < 1e-9);
    }

    #[test]
    fn test_transform_is_center_anchored() {
        let (extent, envelope) = global_extent_and_envelope();
        let t = GridToEnvelopeMapper::new()
            .create_transform(&extent, &envelope, None)
            .unwrap();
        // Shifting to corner anchoring must land exactly on the envelope corner.
        let corner = t
            .pre_translate_all(PixelAnchor::Corner.translation_to(PixelAnchor::Center))
            .transform(&[0.0, 0.0])
            .unwrap();
        assert!((corner[0] - (-180.0)).abs() < 1e-9);
        assert!((corner[1] - 90.0).abs() < 1e-9);
    }
}

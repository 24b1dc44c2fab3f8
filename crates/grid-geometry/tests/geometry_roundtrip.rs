//! Integration tests for grid geometry derivations.
//!
//! These pin the contract between the three construction paths: deriving
//! an envelope from extent+transform, deriving an extent back from
//! envelope+transform (ENCLOSING rounding), and the definedness mask.

use std::sync::Arc;

use coverage_common::{CoverageError, CrsDescriptor, Envelope, PixelAnchor};
use grid_geometry::{attributes, AffineTransform, GridExtent, GridGeometry, MathTransform};

fn affine(scales: &[f64], offsets: &[f64]) -> Arc<dyn MathTransform> {
    Arc::new(AffineTransform::from_scale_offset(scales, offsets).unwrap())
}

#[test]
fn envelope_extent_roundtrip_recovers_extent() {
    let cases = [
        (GridExtent::new_2d(720, 360).unwrap(), [0.5, -0.5], [-179.75, 89.75]),
        (GridExtent::new(vec![-5, 3], vec![14, 40]).unwrap(), [2.0, 3.0], [10.0, -7.0]),
        (GridExtent::new(vec![0, 0], vec![0, 0]).unwrap(), [1.0, 1.0], [0.5, 0.5]),
    ];

    for (extent, scales, offsets) in cases {
        let transform = affine(&scales, &offsets);
        let forward = GridGeometry::from_extent_and_transform(
            extent.clone(),
            transform.clone(),
            PixelAnchor::Center,
            None,
        )
        .unwrap();
        let envelope = forward.envelope().unwrap().clone();

        let back = GridGeometry::from_envelope_and_transform(
            envelope,
            transform,
            PixelAnchor::Center,
            None,
        )
        .unwrap();
        assert_eq!(back.extent().unwrap(), &extent);
    }
}

#[test]
fn enclosing_rounding_never_shrinks() {
    // Envelopes strictly inside cell boundaries must still produce an
    // extent covering them entirely.
    let transform = affine(&[1.0, 1.0], &[0.5, 0.5]);
    let envelope = Envelope::new_2d(0.3, 0.3, 3.7, 2.2).unwrap();
    let geometry = GridGeometry::from_envelope_and_transform(
        envelope.clone(),
        transform.clone(),
        PixelAnchor::Center,
        None,
    )
    .unwrap();

    // Re-derive the envelope of the rounded extent: it must contain the
    // requested envelope.
    let grown = GridGeometry::from_extent_and_transform(
        geometry.extent().unwrap().clone(),
        transform,
        PixelAnchor::Center,
        None,
    )
    .unwrap();
    let grown_env = grown.envelope().unwrap();
    assert!(grown_env.min(0) <= envelope.min(0));
    assert!(grown_env.min(1) <= envelope.min(1));
    assert!(grown_env.max(0) >= envelope.max(0));
    assert!(grown_env.max(1) >= envelope.max(1));
}

/// Check that `is_defined(mask)` agrees with the getters for every one of
/// the 16 mask combinations.
fn assert_mask_consistency(geometry: &GridGeometry) {
    for mask in 0..=attributes::ALL {
        let defined = geometry.is_defined(mask).unwrap();
        let mut getters_ok = true;
        if mask & attributes::CRS != 0 {
            getters_ok &= geometry.crs().is_ok();
        }
        if mask & attributes::ENVELOPE != 0 {
            getters_ok &= geometry.envelope().is_ok();
        }
        if mask & attributes::EXTENT != 0 {
            getters_ok &= geometry.extent().is_ok();
        }
        if mask & attributes::GRID_TO_CRS != 0 {
            getters_ok &= geometry.grid_to_crs().is_ok();
        }
        assert_eq!(
            defined, getters_ok,
            "is_defined({mask:#06b}) disagrees with getters"
        );
    }
}

#[test]
fn is_defined_matches_getters_for_all_mask_combinations() {
    // Fully defined.
    let full = GridGeometry::from_extent_and_transform(
        GridExtent::new_2d(8, 8).unwrap(),
        affine(&[1.0, 1.0], &[0.0, 0.0]),
        PixelAnchor::Center,
        Some(CrsDescriptor::wgs84_2d()),
    )
    .unwrap();
    assert_mask_consistency(&full);
    assert!(full.is_defined(attributes::ALL).unwrap());

    // No CRS.
    let no_crs = GridGeometry::from_extent_and_transform(
        GridExtent::new_2d(8, 8).unwrap(),
        affine(&[1.0, 1.0], &[0.0, 0.0]),
        PixelAnchor::Center,
        None,
    )
    .unwrap();
    assert_mask_consistency(&no_crs);
    assert!(!no_crs.is_defined(attributes::CRS).unwrap());

    // Extent only.
    let bare = GridGeometry::from_extent(GridExtent::new_2d(8, 8).unwrap());
    assert_mask_consistency(&bare);
    assert!(bare.is_defined(attributes::EXTENT).unwrap());
    assert!(!bare.is_defined(attributes::EXTENT | attributes::ENVELOPE).unwrap());
}

#[test]
fn invalid_mask_bits_are_rejected() {
    let geometry = GridGeometry::from_extent(GridExtent::new_2d(2, 2).unwrap());
    for bad in [16u8, 32, 255] {
        assert!(matches!(
            geometry.is_defined(bad),
            Err(CoverageError::InvalidArgument(_))
        ));
    }
}

#[test]
fn mismatched_dimensions_fail_fast() {
    // 3D transform against a 2D extent.
    let transform = affine(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0]);
    let err = GridGeometry::from_extent_and_transform(
        GridExtent::new_2d(4, 4).unwrap(),
        transform,
        PixelAnchor::Center,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, CoverageError::MismatchedDimension { .. }));

    // CRS dimensionality must match the transform target.
    let err = GridGeometry::from_extent_and_transform(
        GridExtent::new_2d(4, 4).unwrap(),
        affine(&[1.0, 1.0], &[0.0, 0.0]),
        PixelAnchor::Center,
        Some(CrsDescriptor::new("TEST:1d", vec![coverage_common::AxisDirection::East])),
    )
    .unwrap_err();
    assert!(matches!(err, CoverageError::MismatchedDimension { .. }));
}

#[test]
fn extent_envelope_construction_defines_all_attributes() {
    let geometry = GridGeometry::from_extent_and_envelope(
        GridExtent::new_2d(360, 180).unwrap(),
        Envelope::new_2d(-180.0, -90.0, 180.0, 90.0).unwrap(),
        Some(CrsDescriptor::wgs84_2d()),
    )
    .unwrap();
    assert!(geometry.is_defined(attributes::ALL).unwrap());
    assert_mask_consistency(&geometry);

    // The inferred transform reproduces the envelope when round-tripped.
    let rebuilt = GridGeometry::from_extent_and_transform(
        geometry.extent().unwrap().clone(),
        geometry.grid_to_crs().unwrap(),
        geometry.anchor(),
        None,
    )
    .unwrap();
    let original = geometry.envelope().unwrap();
    let derived = rebuilt.envelope().unwrap();
    for axis in 0..2 {
        assert!((original.min(axis) - derived.min(axis)).abs() < 1e-9);
        assert!((original.max(axis) - derived.max(axis)).abs() < 1e-9);
    }
}

#[test]
fn corner_anchored_construction_roundtrips() {
    // Same geometry expressed corner-anchored: derived envelope matches.
    let center = affine(&[0.5, -0.5], &[-179.75, 89.75]);
    let corner = Arc::new(
        center
            .as_affine()
            .unwrap()
            .pre_translate_all(PixelAnchor::Corner.translation_to(PixelAnchor::Center)),
    );
    let from_center = GridGeometry::from_extent_and_transform(
        GridExtent::new_2d(720, 360).unwrap(),
        center,
        PixelAnchor::Center,
        None,
    )
    .unwrap();
    let from_corner = GridGeometry::from_extent_and_transform(
        GridExtent::new_2d(720, 360).unwrap(),
        corner,
        PixelAnchor::Corner,
        None,
    )
    .unwrap();
    let a = from_center.envelope().unwrap();
    let b = from_corner.envelope().unwrap();
    for axis in 0..2 {
        assert!((a.min(axis) - b.min(axis)).abs() < 1e-9);
        assert!((a.max(axis) - b.max(axis)).abs() < 1e-9);
    }
}

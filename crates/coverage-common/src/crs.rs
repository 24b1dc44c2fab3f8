//! Minimal coordinate reference system descriptors.
//!
//! The coverage core never parses CRS definitions; it only needs an
//! identifier for equality checks and the per-axis directions used when
//! inferring a grid-to-CRS transform from an extent and an envelope.

use serde::{Deserialize, Serialize};

/// Direction in which a CRS axis ordinate increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisDirection {
    East,
    West,
    North,
    South,
    Up,
    Down,
    /// Unknown or unhandled direction; the mapper heuristic leaves such
    /// axes in their natural orientation.
    Other,
}

impl AxisDirection {
    /// True for the two horizontal-plane direction pairs.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::East | Self::West | Self::North | Self::South)
    }

    /// The opposite direction, or `Other` if there is none.
    pub fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::West => Self::East,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Other => Self::Other,
        }
    }

    /// Collapse a direction to its positive representative.
    ///
    /// East/West both map to East, North/South to North, Up/Down to Up.
    pub fn absolute(self) -> Self {
        match self {
            Self::West => Self::East,
            Self::South => Self::North,
            Self::Down => Self::Up,
            other => other,
        }
    }
}

/// A coordinate reference system as seen by the coverage core: an opaque
/// identifier plus the ordered axis directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsDescriptor {
    /// Authority identifier, e.g. "EPSG:4326".
    pub id: String,
    /// Direction of each axis, in CRS axis order.
    pub axis_directions: Vec<AxisDirection>,
}

impl CrsDescriptor {
    /// Create a descriptor from an identifier and axis directions.
    pub fn new(id: impl Into<String>, axis_directions: Vec<AxisDirection>) -> Self {
        Self {
            id: id.into(),
            axis_directions,
        }
    }

    /// Conventional 2D geographic CRS with (east, north) axis order.
    pub fn wgs84_2d() -> Self {
        Self::new("EPSG:4326", vec![AxisDirection::East, AxisDirection::North])
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.axis_directions.len()
    }

    /// Direction of the given axis, `Other` when out of range.
    pub fn axis_direction(&self, axis: usize) -> AxisDirection {
        self.axis_directions
            .get(axis)
            .copied()
            .unwrap_or(AxisDirection::Other)
    }
}

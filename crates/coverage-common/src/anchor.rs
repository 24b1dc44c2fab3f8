//! Pixel anchoring conventions for grid-to-CRS transforms.

use serde::{Deserialize, Serialize};

/// Which point of a grid cell an integer index maps to under a
/// grid-to-CRS transform.
///
/// Every transform carries a fixed, explicit anchor; converting between the
/// two conventions is a pure half-cell translation in grid space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelAnchor {
    /// Integer indices map to cell centers. This is the default convention
    /// for evaluation and envelope computation.
    #[default]
    Center,
    /// Integer indices map to the lower-index corner of the cell.
    Corner,
}

impl PixelAnchor {
    /// Grid-space offset of this anchor relative to the cell center.
    pub fn offset(self) -> f64 {
        match self {
            Self::Center => 0.0,
            Self::Corner => -0.5,
        }
    }

    /// Translation to apply to grid coordinates expressed in `self`
    /// anchoring so they can be fed to a transform anchored at `target`.
    pub fn translation_to(self, target: PixelAnchor) -> f64 {
        self.offset() - target.offset()
    }
}

//! Interpolation kernels and fallback chains for coverage evaluation.
//!
//! Each kernel has a support domain in raster-local coordinates. A point
//! outside the primary kernel's domain is an evaluation error; a NaN
//! result inside the domain triggers the configured fallback instead.

use serde::{Deserialize, Serialize};

use coverage_common::{CoverageError, Result};

use crate::raster::Raster;

/// The interpolation kernels, by growing support footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKernel {
    /// Value of the nearest cell center.
    Nearest,
    /// Weighted mean of the four surrounding cell centers.
    Bilinear,
    /// Catmull-Rom spline over the surrounding 4x4 cell centers.
    Bicubic,
}

impl InterpolationKernel {
    /// True when `(x, y)` lies inside this kernel's support domain for a
    /// raster of the given size.
    ///
    /// Nearest covers the full cell area, bilinear needs a complete
    /// 2x2 neighborhood and bicubic a complete 4x4 one.
    pub fn contains(self, width: usize, height: usize, x: f64, y: f64) -> bool {
        let (w, h) = (width as f64, height as f64);
        match self {
            Self::Nearest => x >= -0.5 && x < w - 0.5 && y >= -0.5 && y < h - 0.5,
            Self::Bilinear => x >= 0.0 && x < w - 1.0 && y >= 0.0 && y < h - 1.0,
            Self::Bicubic => x >= 1.0 && x < w - 2.0 && y >= 1.0 && y < h - 2.0,
        }
    }

    /// Sample the kernel at `(x, y)`. The point must be inside the support
    /// domain; data gaps still surface as NaN.
    fn sample(self, raster: &dyn Raster, band: usize, x: f64, y: f64) -> f64 {
        match self {
            Self::Nearest => {
                let col = (x.round() as i64).clamp(0, raster.width() as i64 - 1) as usize;
                let row = (y.round() as i64).clamp(0, raster.height() as i64 - 1) as usize;
                raster.sample(col, row, band)
            }
            Self::Bilinear => {
                let x0 = x.floor() as usize;
                let y0 = y.floor() as usize;
                let xf = x - x0 as f64;
                let yf = y - y0 as f64;

                let v00 = raster.sample(x0, y0, band);
                let v10 = raster.sample(x0 + 1, y0, band);
                let v01 = raster.sample(x0, y0 + 1, band);
                let v11 = raster.sample(x0 + 1, y0 + 1, band);

                if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
                    return f64::NAN;
                }

                let top = v00 * (1.0 - xf) + v10 * xf;
                let bottom = v01 * (1.0 - xf) + v11 * xf;
                top * (1.0 - yf) + bottom * yf
            }
            Self::Bicubic => {
                let xi = x.floor() as usize;
                let yi = y.floor() as usize;
                let xf = x - xi as f64;
                let yf = y - yi as f64;

                let mut rows = [0.0f64; 4];
                for (j, row) in rows.iter_mut().enumerate() {
                    let py = yi + j - 1;
                    let mut values = [0.0f64; 4];
                    for (i, value) in values.iter_mut().enumerate() {
                        *value = raster.sample(xi + i - 1, py, band);
                        if value.is_nan() {
                            return f64::NAN;
                        }
                    }
                    *row = cubic_1d(values[0], values[1], values[2], values[3], xf);
                }
                cubic_1d(rows[0], rows[1], rows[2], rows[3], yf)
            }
        }
    }
}

/// 1D Catmull-Rom spline through four equally spaced samples.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

/// What to do when the primary kernel produces NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fallback {
    /// Let the NaN stand.
    None,
    /// Retry with nearest-neighbor sampling.
    Nearest,
    /// Retry with another full interpolator, which may chain further.
    Chain(Box<Interpolator>),
}

/// A kernel paired with its fallback policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolator {
    kernel: InterpolationKernel,
    fallback: Fallback,
}

impl Interpolator {
    pub fn new(kernel: InterpolationKernel, fallback: Fallback) -> Self {
        Self { kernel, fallback }
    }

    /// Nearest-neighbor sampling, no fallback.
    pub fn nearest() -> Self {
        Self::new(InterpolationKernel::Nearest, Fallback::None)
    }

    /// Bilinear with nearest-neighbor fallback on data gaps.
    pub fn bilinear() -> Self {
        Self::new(InterpolationKernel::Bilinear, Fallback::Nearest)
    }

    /// Bicubic falling back through bilinear to nearest.
    pub fn bicubic() -> Self {
        Self::new(
            InterpolationKernel::Bicubic,
            Fallback::Chain(Box::new(Self::bilinear())),
        )
    }

    pub fn kernel(&self) -> InterpolationKernel {
        self.kernel
    }

    /// Evaluate one band at raster-local `(x, y)`.
    ///
    /// The point is validated against the primary kernel's support domain;
    /// `world` is only used to report the failing coordinate. A NaN inside
    /// the domain walks the fallback chain and stands if nothing recovers.
    pub fn evaluate(
        &self,
        raster: &dyn Raster,
        band: usize,
        x: f64,
        y: f64,
        world: &[f64],
    ) -> Result<f64> {
        if !x.is_finite() || !y.is_finite() {
            return Err(CoverageError::point_outside(world));
        }
        if !self.kernel.contains(raster.width(), raster.height(), x, y) {
            return Err(CoverageError::point_outside(world));
        }
        Ok(self.sample_with_fallback(raster, band, x, y))
    }

    fn sample_with_fallback(&self, raster: &dyn Raster, band: usize, x: f64, y: f64) -> f64 {
        let value = self.kernel.sample(raster, band, x, y);
        if !value.is_nan() {
            return value;
        }
        match &self.fallback {
            Fallback::None => f64::NAN,
            Fallback::Nearest => {
                InterpolationKernel::Nearest.sample(raster, band, x, y)
            }
            Fallback::Chain(next) => {
                if next.kernel.contains(raster.width(), raster.height(), x, y) {
                    next.sample_with_fallback(raster, band, x, y)
                } else {
                    f64::NAN
                }
            }
        }
    }
}

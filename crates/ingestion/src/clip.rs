//! Clip a raster to a watershed bounding box.
//!
//! Each axis is resolved independently to an index window:
//! - start: first coordinate at or above the box minimum,
//! - end: first coordinate above the box maximum, kept in the window.
//!
//! Descending axes (north-up `y`) are resolved on their mirror image so the
//! same rule applies from the minimum side. Rows and columns keep their
//! native order.

use grid_common::{BoundingBox, Raster};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{axis} range [{min}, {max}] is outside the grid coordinates [{first}, {last}]")]
pub struct ClipRangeError {
    pub axis: &'static str,
    pub min: f64,
    pub max: f64,
    pub first: f64,
    pub last: f64,
}

/// Index window over one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisWindow {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    /// Coordinate at the minimum side of the window.
    pub corner: f64,
}

impl AxisWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Resolve `[min, max]` against strictly monotonic `coords`.
pub fn axis_window(
    axis: &'static str,
    coords: &[f64],
    min: f64,
    max: f64,
) -> Result<AxisWindow, ClipRangeError> {
    let n = coords.len();
    let descending = n > 1 && coords[0] > coords[n - 1];
    // Ascending view of the axis.
    let at = |i: usize| if descending { coords[n - 1 - i] } else { coords[i] };

    let out_of_range = || ClipRangeError {
        axis,
        min,
        max,
        first: coords.first().copied().unwrap_or(f64::NAN),
        last: coords.last().copied().unwrap_or(f64::NAN),
    };
    if n == 0 || max < at(0) || min > at(n - 1) {
        return Err(out_of_range());
    }

    let lo = (0..n).find(|&i| at(i) >= min).ok_or_else(out_of_range)?;
    let hi = (0..n).find(|&i| at(i) > max).unwrap_or(n - 1);
    let hi = hi.max(lo);
    let corner = at(lo);

    let (start, end) = if descending {
        (n - 1 - hi, n - lo)
    } else {
        (lo, hi + 1)
    };
    Ok(AxisWindow { start, end, corner })
}

/// A clipped (time, y, x) block with its lower-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedGrid {
    data: Vec<f32>,
    shape: [usize; 3],
    xll: f64,
    yll: f64,
}

impl ClippedGrid {
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape[1]
    }

    pub fn cols(&self) -> usize {
        self.shape[2]
    }

    pub fn xll(&self) -> f64 {
        self.xll
    }

    pub fn yll(&self) -> f64 {
        self.yll
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// One (rows, cols) layer.
    pub fn layer(&self, t: usize) -> Option<&[f32]> {
        let size = self.shape[1] * self.shape[2];
        self.data.get(t * size..(t + 1) * size)
    }
}

/// Cut `raster` to `bbox` over every time step.
pub fn clip(bbox: &BoundingBox, raster: &Raster) -> Result<ClippedGrid, ClipRangeError> {
    let xs = axis_window("x", raster.x(), bbox.min_x(), bbox.max_x())?;
    let ys = axis_window("y", raster.y(), bbox.min_y(), bbox.max_y())?;

    let [nt, _, nx] = raster.shape();
    let mut data = Vec::with_capacity(nt * ys.len() * xs.len());
    for t in 0..nt {
        let Some(layer) = raster.layer(t) else { break };
        for row in ys.start..ys.end {
            let offset = row * nx;
            data.extend_from_slice(&layer[offset + xs.start..offset + xs.end]);
        }
    }

    Ok(ClippedGrid {
        data,
        shape: [nt, ys.len(), xs.len()],
        xll: xs.corner,
        yll: ys.corner,
    })
}

//! Bounding box types used to clip grids to a watershed.

use serde::{Deserialize, Serialize};

/// A projected bounding box in the raster's coordinate units (meters for the
/// Albers grids produced by the pipeline).
///
/// Construction validates `min_x < max_x` and `min_y < max_y`, so a box that
/// exists is always usable by the clipper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoxBounds", into = "BoxBounds")]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BboxError> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(BboxError::NonFinite);
        }
        if min_x >= max_x {
            return Err(BboxError::InvalidXRange { min: min_x, max: max_x });
        }
        if min_y >= max_y {
            return Err(BboxError::InvalidYRange { min: min_y, max: max_y });
        }

        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }
}

/// On-disk shape of a bounding box in the project registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BoxBounds {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl TryFrom<BoxBounds> for BoundingBox {
    type Error = BboxError;

    fn try_from(b: BoxBounds) -> Result<Self, Self::Error> {
        BoundingBox::new(b.xmin, b.ymin, b.xmax, b.ymax)
    }
}

impl From<BoundingBox> for BoxBounds {
    fn from(b: BoundingBox) -> Self {
        Self {
            xmin: b.min_x,
            ymin: b.min_y,
            xmax: b.max_x,
            ymax: b.max_y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxError {
    #[error("Bounding box coordinates must be finite")]
    NonFinite,

    #[error("xmin ({min}) must be less than xmax ({max})")]
    InvalidXRange { min: f64, max: f64 },

    #[error("ymin ({min}) must be less than ymax ({max})")]
    InvalidYRange { min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let bbox = BoundingBox::new(-2140000.0, 2734000.0, -1920000.0, 2916000.0).unwrap();
        assert_eq!(bbox.min_x(), -2140000.0);
        assert_eq!(bbox.max_y(), 2916000.0);
        assert_eq!(bbox.min_y(), 2734000.0);
        assert_eq!(bbox.max_x(), -1920000.0);
    }

    #[test]
    fn test_inverted_x_rejected() {
        let result = BoundingBox::new(10.0, 0.0, 5.0, 10.0);
        assert_eq!(result, Err(BboxError::InvalidXRange { min: 10.0, max: 5.0 }));
    }

    #[test]
    fn test_zero_height_rejected() {
        let result = BoundingBox::new(0.0, 5.0, 10.0, 5.0);
        assert!(matches!(result, Err(BboxError::InvalidYRange { .. })));
    }

    #[test]
    fn test_nan_rejected() {
        let result = BoundingBox::new(f64::NAN, 0.0, 10.0, 10.0);
        assert_eq!(result, Err(BboxError::NonFinite));
    }
}

//! Geometry primitives for the two coordinate spaces the engine works in
//!
//! - Pixel space: the rendered raster. Origin top-left, y grows downward.
//! - PDF space: page user space in points (1/72 inch). Origin bottom-left,
//!   y grows upward.

use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};

/// A point on the rendered raster
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A point in page user space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfPoint {
    pub x: f64,
    pub y: f64,
}

impl PdfPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle on the raster, `(x, y)` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two arbitrary corners
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn top_left(&self) -> PixelPoint {
        PixelPoint::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> PixelPoint {
        PixelPoint::new(self.right(), self.bottom())
    }

    pub fn contains(&self, point: PixelPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn corner(&self, corner: Corner) -> PixelPoint {
        match corner {
            Corner::TopLeft => PixelPoint::new(self.x, self.y),
            Corner::TopRight => PixelPoint::new(self.right(), self.y),
            Corner::BottomLeft => PixelPoint::new(self.x, self.bottom()),
            Corner::BottomRight => PixelPoint::new(self.right(), self.bottom()),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// Rectangle in page user space, `(x, y)` is the lower-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(a: PdfPoint, b: PdfPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Grow the rectangle by `amount` on every side
    pub fn inflate(&self, amount: f64) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2.0,
            height: self.height + amount * 2.0,
        }
    }
}

/// One of the four resize handles of a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner, which stays fixed while this one is dragged
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// Page rotation, always a clockwise quarter turn count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Normalise any multiple of 90 degrees (negative or above 360 included)
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(AnnotateError::InvalidGeometry(format!(
                "rotation {} is not a multiple of 90",
                degrees
            )));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            _ => Rotation::ThreeQuarter,
        })
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    /// Whether the rendered raster swaps page width and height
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarter)
    }

    /// Rotate clockwise by a number of quarter turns (negative turns counter-clockwise)
    pub fn turned(self, quarter_turns: i64) -> Self {
        let degrees = (self.degrees() + quarter_turns * 90).rem_euclid(360);
        match degrees {
            0 => Rotation::None,
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            _ => Rotation::ThreeQuarter,
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = AnnotateError;

    fn try_from(value: i64) -> Result<Self> {
        Rotation::from_degrees(value)
    }
}

impl From<Rotation> for i64 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

//! Coordinate transforms between normalized page space and surface pixels
//!
//! Highlight polygons are stored in normalized, unrotated page space:
//! - Origin (0, 0) at the top-left of the page
//! - X increases to the right, Y increases downward
//! - Both axes run from 0.0 to 1.0 regardless of zoom
//!
//! Rotation is applied only when mapping onto a surface, so stored
//! coordinates never change when the user rotates the view. The surface
//! width and height passed in are those of the *rotated* viewport.

use serde::{Deserialize, Serialize};

/// Point in normalized page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Point on a rendering surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// View rotation, clockwise, in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "i32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Normalize any degree value into `[0, 360)`.
pub fn normalize_degrees(degrees: i32) -> i32 {
    ((degrees % 360) + 360) % 360
}

impl Rotation {
    /// Build a rotation from arbitrary degrees.
    ///
    /// Values are normalized into `[0, 360)` first; anything that is not a
    /// multiple of 90 snaps to the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = normalize_degrees(degrees);
        match ((normalized + 45) / 90) % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotated_right(self) -> Self {
        Self::from_degrees(self.degrees() as i32 + 90)
    }

    /// Rotate a quarter turn counter-clockwise.
    pub fn rotated_left(self) -> Self {
        Self::from_degrees(self.degrees() as i32 - 90)
    }

    /// Whether width and height trade places under this rotation.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        let normalized = normalize_degrees(degrees);
        if normalized % 90 != 0 {
            return Err(format!("rotation must be a multiple of 90 degrees, got {degrees}"));
        }
        Ok(Self::from_degrees(normalized))
    }
}

/// Map a normalized page point onto a surface of `width` x `height` pixels.
///
/// | rotation | x            | y            |
/// |----------|--------------|--------------|
/// | 0        | `x * W`      | `y * H`      |
/// | 90       | `(1 - y) * W`| `x * H`      |
/// | 180      | `(1 - x) * W`| `(1 - y) * H`|
/// | 270      | `y * W`      | `(1 - x) * H`|
pub fn to_surface(point: NormalizedPoint, width: f32, height: f32, rotation: Rotation) -> PixelPoint {
    let (u, v) = match rotation {
        Rotation::Deg0 => (point.x, point.y),
        Rotation::Deg90 => (1.0 - point.y, point.x),
        Rotation::Deg180 => (1.0 - point.x, 1.0 - point.y),
        Rotation::Deg270 => (point.y, 1.0 - point.x),
    };

    PixelPoint::new(u * width, v * height)
}

/// Inverse of [`to_surface`]: map a surface pixel back to normalized page space.
///
/// Used to normalize cursor positions. A zero-sized surface maps every
/// pixel to the surface origin instead of dividing by zero.
pub fn to_normalized(pixel: PixelPoint, width: f32, height: f32, rotation: Rotation) -> NormalizedPoint {
    let u = if width > 0.0 { pixel.x / width } else { 0.0 };
    let v = if height > 0.0 { pixel.y / height } else { 0.0 };

    match rotation {
        Rotation::Deg0 => NormalizedPoint::new(u, v),
        Rotation::Deg90 => NormalizedPoint::new(v, 1.0 - u),
        Rotation::Deg180 => NormalizedPoint::new(1.0 - u, 1.0 - v),
        Rotation::Deg270 => NormalizedPoint::new(1.0 - v, u),
    }
}

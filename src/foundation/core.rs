use crate::foundation::error::{GlassError, GlassResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Pixel dimensions of a drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Validated constructor; both sides must be non-zero.
    pub fn checked(width: u32, height: u32) -> GlassResult<Self> {
        if width == 0 || height == 0 {
            return Err(GlassError::validation("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn premultiplied(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let mul = |c: u8| ((u16::from(c) * a + 127) / 255) as u8;
        [mul(self.r), mul(self.g), mul(self.b), self.a]
    }
}

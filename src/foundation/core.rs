use crate::foundation::error::{QuadreelError, QuadreelResult};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Height and width of a raster region, in pixels.
///
/// Height comes first throughout the crate: regions are addressed in
/// (row, column) order, the same order the pixel data is laid out in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Resolution {
    pub height: u32,
    pub width: u32,
}

impl Resolution {
    pub fn new(height: u32, width: u32) -> QuadreelResult<Self> {
        if height == 0 || width == 0 {
            return Err(QuadreelError::validation(
                "Resolution height/width must be > 0",
            ));
        }
        Ok(Self { height, width })
    }

    pub fn area(self) -> u64 {
        u64::from(self.height) * u64::from(self.width)
    }
}

/// Straight-alpha RGBA8 (r,g,b NOT premultiplied by a).
///
/// The mosaic engine only fills and copies, it never blends, so straight
/// alpha is carried end-to-end and flattened once at the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    pub const BLACK: Self = Self::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn from_channels(px: [u8; 4]) -> Self {
        Self {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        }
    }

    pub const fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

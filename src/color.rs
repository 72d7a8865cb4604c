//! Colors, the element palette and the active paint source.

use crate::api::Paint;
use crate::error::{RenderError, Result};
use crate::geometry::Vec2;

/// RGB color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Rgb::new(
            ((hex >> 16) & 0xff) as f64 / 255.0,
            ((hex >> 8) & 0xff) as f64 / 255.0,
            (hex & 0xff) as f64 / 255.0,
        )
    }

    /// `#rrggbb` form used by document backends.
    pub fn to_hex_string(self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

/// Logical colors the layout engine refers to instead of raw RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorKey {
    Base,
    Background,
    Highlight,
    White,
    Black,
    Red,
    Green,
    Blue,
    DarkGreen,
    /// Element color by atomic number.
    Element(u32),
}

/// Jmol-style palette, indexed by atomic number minus one.
const ELEMENT_PALETTE: [u32; 54] = [
    0xFFFFFF, 0xD9FFFF, 0xCC80FF, 0xC2FF00, 0xFFB5B5, 0x909090, 0x3050F8, 0xFF0D0D, 0x90E050,
    0xB3E3F5, 0xAB5CF2, 0x8AFF00, 0xBFA6A6, 0xF0C8A0, 0xFF8000, 0xFFFF30, 0x1FF01F, 0x80D1E3,
    0x8F40D4, 0x3DFF00, 0xE6E6E6, 0xBFC2C7, 0xA6A6AB, 0x8A99C7, 0x9C7AC7, 0xE06633, 0xF090A0,
    0x50D050, 0xC88033, 0x7D80B0, 0xC28F8F, 0x668F8F, 0xBD80E3, 0xFFA100, 0xA62929, 0x5CB8D1,
    0x702EB0, 0x00FF00, 0x94FFFF, 0x94E0E0, 0x73C2C9, 0x54B5B5, 0x3B9E9E, 0x248F8F, 0x0A7D8C,
    0x006985, 0xC0C0C0, 0xFFD98F, 0xA67573, 0x668080, 0x9E63B5, 0xD47A00, 0x940094, 0x429EB0,
];

const UNKNOWN_ELEMENT: u32 = 0xFF1493;

/// Default color for an element label (atomic number). Labels outside the
/// palette share one fallback color.
pub fn element_color(label: u32) -> Rgb {
    let hex = label
        .checked_sub(1)
        .and_then(|idx| ELEMENT_PALETTE.get(idx as usize))
        .copied()
        .unwrap_or(UNKNOWN_ELEMENT);
    Rgb::from_hex(hex)
}

/// The paint source used by subsequent fills and strokes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternSource {
    active: Option<Paint>,
}

impl PatternSource {
    pub fn set_single(&mut self, color: Rgb) {
        self.active = Some(Paint::Solid(color));
    }

    pub fn set_gradient(&mut self, from: Rgb, to: Rgb, start: Vec2, end: Vec2) {
        self.active = Some(Paint::LinearGradient {
            from,
            to,
            start,
            end,
        });
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn replace(&mut self, paint: Option<Paint>) -> Option<Paint> {
        std::mem::replace(&mut self.active, paint)
    }

    pub fn get(&self) -> Option<&Paint> {
        self.active.as_ref()
    }

    pub fn require(&self) -> Result<&Paint> {
        self.active.as_ref().ok_or(RenderError::NoPaintSource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_colors_are_stable() {
        assert_eq!(element_color(8), element_color(8));
        assert_eq!(element_color(8), Rgb::from_hex(0xFF0D0D));
        assert_eq!(element_color(7), Rgb::from_hex(0x3050F8));
        assert_eq!(element_color(0), element_color(200));
    }

    #[test]
    fn hex_string_round_trips_channels() {
        assert_eq!(Rgb::from_hex(0x3050F8).to_hex_string(), "#3050f8");
        assert_eq!(Rgb::new(2.0, -1.0, 0.0).to_hex_string(), "#ff0000");
    }

    #[test]
    fn cleared_source_refuses_to_paint() {
        let mut source = PatternSource::default();
        assert!(matches!(source.require(), Err(RenderError::NoPaintSource)));
        source.set_single(Rgb::BLACK);
        assert_eq!(source.require().unwrap(), &Paint::Solid(Rgb::BLACK));
        source.set_gradient(Rgb::BLACK, Rgb::WHITE, Vec2::ZERO, Vec2::new(1.0, 0.0));
        assert!(matches!(
            source.get(),
            Some(Paint::LinearGradient { .. })
        ));
        source.clear();
        assert!(source.get().is_none());
    }
}

//! Packed ARGB color value

use serde::{Deserialize, Serialize};

/// A color stored as a packed 32-bit ARGB integer
///
/// Bits 24-31 hold alpha, 16-23 red, 8-15 green and 0-7 blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    argb: u32,
}

impl Color {
    /// Build a color from a packed ARGB value
    pub const fn from_argb(argb: i32) -> Self {
        Self { argb: argb as u32 }
    }

    /// Build an opaque color
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::from_rgba(red, green, blue, 0xff)
    }

    /// Build a color from its four channels
    pub const fn from_rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            argb: (alpha as u32) << 24 | (red as u32) << 16 | (green as u32) << 8 | blue as u32,
        }
    }

    /// The packed ARGB value
    pub const fn argb(&self) -> i32 {
        self.argb as i32
    }

    pub const fn alpha(&self) -> u8 {
        (self.argb >> 24) as u8
    }

    pub const fn red(&self) -> u8 {
        (self.argb >> 16) as u8
    }

    pub const fn green(&self) -> u8 {
        (self.argb >> 8) as u8
    }

    pub const fn blue(&self) -> u8 {
        self.argb as u8
    }
}

impl From<i32> for Color {
    fn from(argb: i32) -> Self {
        Color::from_argb(argb)
    }
}

//! Drawing surface abstraction
//!
//! Components draw through [`Surface`] in their own local coordinates, with
//! `(0, 0)` at the top-left corner of their rect. The shell provides an egui
//! backed implementation; tests record the calls.

use serde::{Deserialize, Serialize};

/// An sRGB colour, written as `#rgb` or `#rrggbb` in settings files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        match hex.len() {
            3 => Some(Self(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => {
                let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
                Some(Self(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => None,
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid colour: {}", value))
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
    }
}

/// Minimal drawing capability needed by the waveform view
pub trait Surface {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb);

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb);

    /// Vertical 1px line at column `x` from `y0` to `y1`
    fn vline(&mut self, x: f32, y0: f32, y1: f32, color: Rgb);
}

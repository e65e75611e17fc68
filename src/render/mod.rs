//! Render module - drawing surface and waveform view

mod painter;
mod surface;
mod waveform;

pub use painter::PainterSurface;
pub use surface::{Rgb, Surface};
pub use waveform::{draw, Theme, WaveformScene};

//! Scrolling waveform view
//!
//! Each visible chunk gets one vertical segment centred on the midline:
//! upwards by its left average, downwards by its right average, both scaled
//! by a fixed gain. The segment colour tells whether the chunk has already
//! been played in the current pass, is part of the loop selection, or
//! neither.

use serde::{Deserialize, Serialize};

use super::surface::{Rgb, Surface};
use crate::audio::Chunk;
use crate::looper::{Selection, Viewport};

/// Colour table for the waveform view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Rgb,
    pub base: Rgb,
    pub selection: Rgb,
    pub playback: Rgb,
    pub border: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgb(0x99, 0xcc, 0xff),
            base: Rgb(0x66, 0x99, 0xcc),
            selection: Rgb(0x33, 0x66, 0x99),
            playback: Rgb(0xcc, 0x00, 0x00),
            border: Rgb(0x66, 0x99, 0xcc),
        }
    }
}

/// Everything the view needs from the looper for one frame
pub struct WaveformScene<'a> {
    pub chunks: &'a [Chunk],
    pub viewport: &'a Viewport,
    pub selection: &'a Selection,
    /// `(loop start, current position)` while playing
    pub playhead: Option<(usize, usize)>,
    pub gain: f32,
}

impl WaveformScene<'_> {
    fn color_of(&self, index: usize, theme: &Theme) -> Rgb {
        match self.playhead {
            Some((start, position)) if index >= start && index <= position => theme.playback,
            _ if self.selection.contains(index) => theme.selection,
            _ => theme.base,
        }
    }
}

/// Draw the scene into a `width` x `height` area
pub fn draw(surface: &mut dyn Surface, scene: &WaveformScene<'_>, width: f32, height: f32, theme: &Theme) {
    surface.fill_rect(1.0, 1.0, width - 2.0, height - 2.0, theme.background);

    let middle = height * 0.5;
    let columns = width.max(0.0) as usize;
    let first = scene.viewport.translate_x(0);
    // The store may still be growing; work on this frame's length
    let count = scene.chunks.len();

    for column in 0..columns {
        let index = first + column;
        if index >= count {
            break;
        }
        let chunk = &scene.chunks[index];
        let up = (chunk.left_average * scene.gain).abs() * middle;
        let down = (chunk.right_average * scene.gain).abs() * middle;
        surface.vline(column as f32, middle - up, middle + down, scene.color_of(index, theme));
    }

    surface.stroke_rect(0.0, 0.0, width, height, theme.border);
}

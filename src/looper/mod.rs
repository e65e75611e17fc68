//! The looper: record, play, select and export
//!
//! [`Looper`] owns the sample store, the loop selection and the viewport and
//! moves between three modes:
//!
//! ```text
//!            start_recording            start_playing
//!   Idle ─────────────────▶ Recording ─────────────▶ Playing
//!    ▲ ◀──── stop_recording ───┘                        │
//!    └──────────────────── stop_playing ────────────────┘
//! ```
//!
//! `start_recording` is accepted from any mode and always begins with an
//! empty store. Audio flows in and out through [`Looper::process_input`] and
//! [`Looper::process_output`], each called once per fixed-size block by the
//! transport. Rendering and input handling are driven by the shell through
//! the [`Component`] trait.

mod selection;
mod viewport;

pub use selection::{SelectEnd, Selection};
pub use viewport::Viewport;

use std::time::Duration;

use crate::audio::{
    encode, AiffFormat, AverageRequest, Averager, AveragerError, EncodeError, SampleStore,
};
use crate::render::{self, Surface, Theme, WaveformScene};
use crate::ui::{self, Component, InputEvent, KeyCommand};

/// Transport mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Recording,
    Playing,
}

/// Fixed parameters of a looper session
#[derive(Debug, Clone)]
pub struct LooperConfig {
    /// Frames per audio block
    pub block_size: usize,
    /// Interleaved channels per frame
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Vertical scale applied to chunk averages when drawing
    pub waveform_gain: f32,
    pub export_file_name: String,
    pub theme: Theme,
    /// Mix captured input into the output
    pub monitor_input: bool,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            waveform_gain: 20.0,
            export_file_name: "loop.aiff".to_string(),
            theme: Theme::default(),
            monitor_input: false,
        }
    }
}

impl LooperConfig {
    /// Samples in one interleaved block
    pub fn block_len(&self) -> usize {
        self.block_size * self.channels as usize
    }
}

/// An encoded loop ready to be saved
#[derive(Debug, Clone)]
pub struct ExportedLoop {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Snapshot of the looper for status displays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LooperStatus {
    pub mode: Mode,
    pub position: usize,
    pub chunk_count: usize,
    pub selection: Option<(usize, usize)>,
    pub offset: usize,
    pub duration: Duration,
}

/// Loop recorder state machine
pub struct Looper {
    config: LooperConfig,
    store: SampleStore,
    selection: Selection,
    viewport: Viewport,
    mode: Mode,
    position: usize,
    averager: Averager,
    /// Last captured block, pending for the monitor mix
    monitor: Vec<f32>,
    width: f32,
    height: f32,
}

impl Looper {
    pub fn new(config: LooperConfig) -> Result<Self, AveragerError> {
        let averager = Averager::spawn()?;
        Ok(Self {
            config,
            store: SampleStore::new(),
            selection: Selection::new(),
            viewport: Viewport::new(0),
            mode: Mode::Idle,
            position: 0,
            averager,
            monitor: Vec::new(),
            width: 0.0,
            height: 0.0,
        })
    }

    pub fn config(&self) -> &LooperConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn status(&self) -> LooperStatus {
        let frames = self.store.count() * self.config.block_size;
        let duration = if self.config.sample_rate > 0 {
            Duration::from_secs_f64(frames as f64 / self.config.sample_rate as f64)
        } else {
            Duration::ZERO
        };
        LooperStatus {
            mode: self.mode,
            position: self.position,
            chunk_count: self.store.count(),
            selection: self
                .selection
                .is_active()
                .then(|| (self.selection.min(), self.selection.max())),
            offset: self.viewport.offset(),
            duration,
        }
    }

    // --- transport -------------------------------------------------------

    pub fn start_recording(&mut self) {
        if self.mode == Mode::Playing {
            self.stop_playing();
        }
        self.selection.clear();
        self.store.clear();
        self.viewport.reset();
        self.position = 0;
        self.mode = Mode::Recording;
        log::info!("Recording started");
    }

    pub fn stop_recording(&mut self) {
        if self.mode != Mode::Recording {
            return;
        }
        self.mode = Mode::Idle;
        log::info!("Recording stopped: {} chunks", self.store.count());
    }

    pub fn start_playing(&mut self) {
        self.stop_recording();
        self.mode = Mode::Playing;
        self.position = if self.selection.is_active() {
            self.selection.min()
        } else {
            0
        };
        log::debug!("Playing from chunk {}", self.position);
    }

    pub fn stop_playing(&mut self) {
        if self.mode != Mode::Playing {
            return;
        }
        self.mode = Mode::Idle;
        log::debug!("Playback stopped at chunk {}", self.position);
    }

    pub fn stop_anything(&mut self) {
        match self.mode {
            Mode::Playing => self.stop_playing(),
            Mode::Recording => self.stop_recording(),
            Mode::Idle => {}
        }
    }

    pub fn toggle(&mut self) {
        match self.mode {
            Mode::Recording => self.stop_recording(),
            Mode::Playing => self.stop_playing(),
            Mode::Idle => self.start_playing(),
        }
    }

    fn restart_if_playing(&mut self) {
        if self.mode == Mode::Playing {
            self.stop_playing();
            self.start_playing();
        }
    }

    // --- audio blocks ----------------------------------------------------

    /// Handle one captured block. Stored only while recording.
    ///
    /// The block is copied; the caller may reuse its buffer.
    pub fn process_input(&mut self, input: &[f32]) {
        if self.config.monitor_input {
            self.monitor.clear();
            self.monitor.extend_from_slice(input);
        }
        if self.mode != Mode::Recording || input.is_empty() {
            return;
        }
        let index = self.store.append(input);
        if let Some(chunk) = self.store.get(index) {
            let request = AverageRequest {
                generation: self.store.generation(),
                index,
                samples: chunk.samples.clone(),
            };
            if let Err(e) = self.averager.submit(request) {
                log::warn!("Could not queue chunk {} for averaging: {}", index, e);
            }
        }
        self.viewport.follow_recording(self.store.count());
    }

    /// Fill one output block: the loop while playing, otherwise silence,
    /// plus the pending monitor block when monitoring.
    pub fn process_output(&mut self, output: &mut [f32]) {
        self.play_block(output);
        if !self.monitor.is_empty() {
            for (out, input) in output.iter_mut().zip(&self.monitor) {
                *out += input;
            }
            self.monitor.clear();
        }
    }

    fn play_block(&mut self, output: &mut [f32]) {
        if self.mode != Mode::Playing {
            output.fill(0.0);
            return;
        }

        let count = self.store.count();
        match self.store.get(self.position) {
            Some(chunk) => {
                let n = chunk.samples.len().min(output.len());
                output[..n].copy_from_slice(&chunk.samples[..n]);
                output[n..].fill(0.0);
            }
            None => output.fill(0.0),
        }

        if self.selection.is_active() {
            self.position += 1;
            if self.position > self.selection.max() {
                self.position = self.selection.min();
            }
        } else if count > 0 {
            self.position = (self.position + 1) % count;
        }
        self.viewport.follow_playback(self.position, count);
    }

    /// Apply finished averager results. Returns how many were applied.
    pub fn poll_averages(&mut self) -> usize {
        let mut applied = 0;
        while let Some(response) = self.averager.try_recv() {
            match response.result {
                Ok((left, right)) => {
                    if self
                        .store
                        .apply_average(response.generation, response.index, left, right)
                    {
                        applied += 1;
                    } else {
                        log::debug!("Dropped stale average for chunk {}", response.index);
                    }
                }
                Err(e) => log::warn!("Averaging failed: {}", e),
            }
        }
        applied
    }

    // --- selection and scrolling -----------------------------------------

    /// Press on the waveform. A fine-adjust press does not start a drag.
    pub fn begin_select(&mut self, local_x: usize, fine_adjust: bool) -> bool {
        if fine_adjust {
            return false;
        }
        let index = self.viewport.translate_x(local_x);
        self.selection.begin(index, self.store.count());
        true
    }

    pub fn update_select(&mut self, local_x: usize) -> bool {
        if !self.selection.is_dragging() {
            return false;
        }
        let index = self.viewport.translate_x(local_x);
        self.selection.update(index, self.store.count());
        true
    }

    pub fn end_select(&mut self) -> bool {
        let was_active = self.selection.is_active();
        match self.selection.end() {
            SelectEnd::Ignored => false,
            SelectEnd::Activated => {
                self.restart_if_playing();
                true
            }
            SelectEnd::Deselected => {
                if was_active {
                    self.restart_if_playing();
                }
                true
            }
        }
    }

    /// Fine-adjust click: move the nearer selection edge to the column
    pub fn subselect(&mut self, local_x: usize) -> bool {
        let index = self.viewport.translate_x(local_x);
        let changed = self.selection.subselect(index, self.store.count());
        if changed && !self.selection.is_active() && self.selection.min() < self.selection.max() {
            self.selection.activate();
            self.restart_if_playing();
        }
        changed
    }

    pub fn deselect(&mut self) {
        let was_active = self.selection.is_active();
        self.selection.deselect();
        if was_active {
            self.restart_if_playing();
        }
    }

    pub fn scroll(&mut self, delta_x: i64, delta_y: i64) -> bool {
        self.viewport.scroll(delta_x, delta_y, self.store.count())
    }

    pub fn scroll_to_start(&mut self) {
        if self.mode != Mode::Recording {
            self.viewport.scroll_to_start();
        }
    }

    pub fn scroll_to_end(&mut self) {
        if self.mode != Mode::Recording {
            self.viewport.scroll_to_end(self.store.count());
        }
    }

    // --- export ----------------------------------------------------------

    /// Encode the whole take, or just the active selection.
    ///
    /// Returns `Ok(None)` when there is nothing to export.
    pub fn export(&self, selection_only: bool) -> Result<Option<ExportedLoop>, EncodeError> {
        let count = self.store.count();
        let (start, end) = if selection_only && self.selection.is_active() {
            let start = self.selection.min().min(count);
            (start, (self.selection.max() + 1).min(count))
        } else {
            (0, count)
        };

        if start >= end {
            log::info!("Nothing to export");
            return Ok(None);
        }

        let format = AiffFormat {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            bits_per_sample: self.config.bits_per_sample,
        };
        let bytes = encode(self.store.chunks(), start, end, &format)?;
        log::info!(
            "Encoded chunks {}..{} ({} bytes) as {}",
            start,
            end,
            bytes.len(),
            self.config.export_file_name
        );

        Ok(Some(ExportedLoop {
            file_name: self.config.export_file_name.clone(),
            bytes,
        }))
    }

    fn handle_key(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::Record => self.start_recording(),
            KeyCommand::TogglePlay => self.toggle(),
            KeyCommand::Stop => self.stop_anything(),
            KeyCommand::ScrollToStart => self.scroll_to_start(),
            KeyCommand::ScrollToEnd => self.scroll_to_end(),
        }
    }
}

impl Component for Looper {
    fn compute_rect(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.viewport
            .set_visible_width(ui::column(width), self.store.count());
    }

    fn render(&self, surface: &mut dyn Surface) {
        let playhead = (self.mode == Mode::Playing).then(|| {
            let start = if self.selection.is_active() {
                self.selection.min()
            } else {
                0
            };
            (start, self.position)
        });
        let scene = WaveformScene {
            chunks: self.store.chunks(),
            viewport: &self.viewport,
            selection: &self.selection,
            playhead,
            gain: self.config.waveform_gain,
        };
        render::draw(surface, &scene, self.width, self.height, &self.config.theme);
    }

    fn handle_input(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::MouseDown { x, modifiers, .. } => {
                self.begin_select(ui::column(x), modifiers.fine_adjust)
            }
            InputEvent::MouseMove { x, .. } => self.update_select(ui::column(x)),
            InputEvent::MouseUp { .. } => self.end_select(),
            InputEvent::Click { x, modifiers, .. } => {
                modifiers.fine_adjust && self.subselect(ui::column(x))
            }
            InputEvent::Wheel { delta_x, delta_y } => {
                self.scroll(delta_x.round() as i64, delta_y.round() as i64)
            }
            InputEvent::Key(command) => {
                self.handle_key(command);
                true
            }
        }
    }
}

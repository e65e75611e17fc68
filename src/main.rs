#![allow(dead_code)]

//! looprec - Audio Loop Recorder
//!
//! Records microphone input as a scrolling waveform, loops a selected range
//! and exports the loop as an AIFF file.
//!
//! ## Controls
//! - `R` record, `Space` play/pause, `Esc` stop
//! - Drag on the waveform to select a loop, click to clear it
//! - Shift-click to move the nearest loop edge
//! - Wheel to scroll, `Home`/`End` to jump to either end

use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui;

mod audio;
mod looper;
mod render;
mod settings;
mod ui;

use audio::{lock, AudioDevice, SharedLooper, Transport};
use looper::{Looper, Mode};
use render::PainterSurface;
use settings::Settings;
use ui::{Component, InputEvent, KeyCommand, Modifiers, PointerFrame, PointerState};

/// Sample rate assumed when no capture device could be opened
const FALLBACK_SAMPLE_RATE: u32 = 44100;

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting looprec");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 360.0])
            .with_title("looprec"),
        ..Default::default()
    };

    eframe::run_native(
        "looprec",
        options,
        Box::new(|cc| Ok(Box::new(LoopApp::new(cc)?))),
    )
}

struct LoopApp {
    looper: SharedLooper,
    _transport: Option<Transport>,
    device: Option<AudioDevice>,
    input_gain: f32,
    status: String,
    waveform_size: egui::Vec2,
    pointer: PointerState,
}

impl LoopApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Result<Self, audio::AveragerError> {
        let settings = Settings::load();
        let block_len = settings.looper_config(FALLBACK_SAMPLE_RATE).block_len();

        let opened = AudioDevice::open(block_len, settings.channels, settings.input_gain);
        let (device, io, status) = match opened {
            Ok((device, io)) => {
                let status = format!("{} → {}", device.input_name, device.output_name);
                (Some(device), Some(io), status)
            }
            Err(e) => {
                log::error!("Audio device unavailable: {}", e);
                (None, None, format!("Error: {}", e))
            }
        };

        let sample_rate = device
            .as_ref()
            .map(|d| d.sample_rate)
            .unwrap_or(FALLBACK_SAMPLE_RATE);
        let looper: SharedLooper = Arc::new(Mutex::new(Looper::new(
            settings.looper_config(sample_rate),
        )?));

        let transport = match io {
            Some(io) => match Transport::spawn(Arc::clone(&looper), io, block_len) {
                Ok(t) => Some(t),
                Err(e) => {
                    log::error!("Failed to start transport: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            looper,
            _transport: transport,
            device,
            input_gain: settings.input_gain,
            status,
            waveform_size: egui::Vec2::ZERO,
            pointer: PointerState::default(),
        })
    }

    fn export(&mut self, selection_only: bool) {
        // Encode under the lock, save without it
        let exported = lock(&self.looper).export(selection_only);
        match exported {
            Ok(Some(exported)) => {
                let Some(path) = rfd::FileDialog::new()
                    .set_file_name(&exported.file_name)
                    .add_filter("AIFF", &["aiff", "aif"])
                    .save_file()
                else {
                    return;
                };
                match std::fs::write(&path, &exported.bytes) {
                    Ok(()) => {
                        log::info!("Saved {}", path.display());
                        self.status = format!("Saved {}", path.display());
                    }
                    Err(e) => {
                        log::error!("Failed to save {}: {}", path.display(), e);
                        self.status = format!("Error: {}", e);
                    }
                }
            }
            Ok(None) => self.status = "Nothing to export".to_string(),
            Err(e) => {
                log::error!("Export failed: {}", e);
                self.status = format!("Error: {}", e);
            }
        }
    }

    fn waveform_panel(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let mut looper = lock(&self.looper);

        if rect.size() != self.waveform_size {
            self.waveform_size = rect.size();
            looper.compute_rect(rect.width(), rect.height());
        }

        let (pos, modifiers, pressed, released, wheel) = ui.input(|i| {
            (
                i.pointer.interact_pos(),
                Modifiers::from(i.modifiers),
                i.pointer.primary_pressed(),
                i.pointer.primary_released() || !i.pointer.primary_down(),
                i.raw_scroll_delta,
            )
        });

        let frame = PointerFrame {
            pos: pos.map(|p| {
                let local = p - rect.min;
                (local.x, local.y)
            }),
            modifiers,
            hovered: response.hovered(),
            pressed,
            released,
            dragged: response.dragged(),
            clicked: response.clicked(),
        };
        for event in self.pointer.events(&frame) {
            looper.handle_input(&event);
        }

        if response.hovered() && wheel != egui::Vec2::ZERO {
            looper.handle_input(&InputEvent::Wheel {
                delta_x: wheel.x,
                delta_y: wheel.y,
            });
        }

        looper.render(&mut PainterSurface::new(&painter, rect));
    }
}

impl eframe::App for LoopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        lock(&self.looper).poll_averages();

        let commands: Vec<KeyCommand> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        ..
                    } => KeyCommand::from_key(*key),
                    _ => None,
                })
                .collect()
        });
        if !commands.is_empty() {
            let mut looper = lock(&self.looper);
            for command in commands {
                looper.handle_input(&InputEvent::Key(command));
            }
        }

        let status = lock(&self.looper).status();

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("looprec");
                ui.separator();

                let has_device = self.device.is_some();

                let record_text = if status.mode == Mode::Recording {
                    "⏺ Recording"
                } else {
                    "⏺ Record"
                };
                if ui
                    .add_enabled(has_device, egui::Button::new(record_text))
                    .clicked()
                {
                    lock(&self.looper).start_recording();
                }

                let play_text = match status.mode {
                    Mode::Playing => "⏸ Pause",
                    _ => "▶ Play",
                };
                if ui
                    .add_enabled(has_device, egui::Button::new(play_text))
                    .clicked()
                {
                    lock(&self.looper).toggle();
                }

                if ui.button("⏹ Stop").clicked() {
                    lock(&self.looper).stop_anything();
                }

                ui.separator();

                if ui.button("💾 Export loop").clicked() {
                    self.export(false);
                }
                if ui
                    .add_enabled(status.selection.is_some(), egui::Button::new("💾 Export selection"))
                    .clicked()
                {
                    self.export(true);
                }

                ui.separator();

                ui.label("Gain:");
                if ui
                    .add_enabled(
                        has_device,
                        egui::Slider::new(&mut self.input_gain, 0.1..=50.0).logarithmic(true),
                    )
                    .changed()
                {
                    if let Some(device) = &self.device {
                        device.set_gain(self.input_gain);
                    }
                }

                ui.separator();
                ui.label(&self.status);
            });
        });

        // Bottom status line
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mode = match status.mode {
                    Mode::Idle => "Idle",
                    Mode::Recording => "Recording",
                    Mode::Playing => "Playing",
                };
                ui.small(format!("Mode: {}", mode));
                ui.separator();
                ui.small(format!("Length: {}", format_duration(status.duration)));
                ui.separator();
                ui.small(format!("Chunks: {}", status.chunk_count));
                ui.separator();
                match status.selection {
                    Some((min, max)) => ui.small(format!("Loop: {}–{}", min, max)),
                    None => ui.small("Loop: all"),
                };
                if status.mode == Mode::Playing {
                    ui.separator();
                    ui.small(format!("Position: {}", status.position));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.waveform_panel(ui);
        });
    }
}

/// Format a duration as MM:SS
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let mins = secs / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}", mins, secs)
}

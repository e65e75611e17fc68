//! Input contract between the shell and its components
//!
//! The shell does hit-testing and converts pointer positions into the
//! component's local coordinates. Components answer each event with whether
//! they consumed it, so a container can stop propagating it.

use eframe::egui;

use crate::render::Surface;

/// Modifier state relevant to the waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Fine-adjust (shift): clicks nudge selection edges instead of dragging
    pub fine_adjust: bool,
}

impl From<egui::Modifiers> for Modifiers {
    fn from(m: egui::Modifiers) -> Self {
        Self {
            fine_adjust: m.shift,
        }
    }
}

/// Keyboard commands understood by the looper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Record,
    TogglePlay,
    Stop,
    ScrollToStart,
    ScrollToEnd,
}

impl KeyCommand {
    pub fn from_key(key: egui::Key) -> Option<Self> {
        match key {
            egui::Key::R => Some(Self::Record),
            egui::Key::Space => Some(Self::TogglePlay),
            egui::Key::Escape => Some(Self::Stop),
            egui::Key::Home => Some(Self::ScrollToStart),
            egui::Key::End => Some(Self::ScrollToEnd),
            _ => None,
        }
    }
}

/// An input event in component-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseDown { x: f32, y: f32, modifiers: Modifiers },
    MouseMove { x: f32, y: f32 },
    MouseUp { x: f32, y: f32 },
    Click { x: f32, y: f32, modifiers: Modifiers },
    Wheel { delta_x: f32, delta_y: f32 },
    Key(KeyCommand),
}

/// Pointer facts for one UI frame, positions already component-local
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerFrame {
    /// `None` while the pointer is outside the window
    pub pos: Option<(f32, f32)>,
    pub modifiers: Modifiers,
    pub hovered: bool,
    pub pressed: bool,
    /// Primary button released this frame, or no longer down
    pub released: bool,
    pub dragged: bool,
    pub clicked: bool,
}

/// Turns per-frame pointer state into [`InputEvent`]s.
///
/// A press that started on the component always gets a matching
/// `MouseUp`, even when the button is released outside the window; the
/// last known position stands in for the missing one.
#[derive(Debug, Default)]
pub struct PointerState {
    pressed_here: bool,
    last: (f32, f32),
}

impl PointerState {
    pub fn events(&mut self, frame: &PointerFrame) -> Vec<InputEvent> {
        let mut events = Vec::new();
        if let Some(pos) = frame.pos {
            self.last = pos;
        }
        let (x, y) = self.last;
        let modifiers = frame.modifiers;

        if frame.pos.is_some() {
            if frame.pressed && frame.hovered {
                self.pressed_here = true;
                events.push(InputEvent::MouseDown { x, y, modifiers });
            }
            if frame.dragged {
                events.push(InputEvent::MouseMove { x, y });
            }
        }
        if frame.released && self.pressed_here {
            self.pressed_here = false;
            events.push(InputEvent::MouseUp { x, y });
        }
        if frame.pos.is_some() && frame.clicked {
            events.push(InputEvent::Click { x, y, modifiers });
        }
        events
    }
}

/// A rectangular piece of the UI
pub trait Component {
    /// Recompute layout for a new size
    fn compute_rect(&mut self, width: f32, height: f32);

    /// Draw the current state. Must not change it.
    fn render(&self, surface: &mut dyn Surface);

    /// Returns true when the event was consumed
    fn handle_input(&mut self, event: &InputEvent) -> bool;
}

/// Local x coordinate to a column index
pub fn column(x: f32) -> usize {
    if x.is_finite() && x > 0.0 {
        x.floor() as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_map() {
        assert_eq!(KeyCommand::from_key(egui::Key::R), Some(KeyCommand::Record));
        assert_eq!(KeyCommand::from_key(egui::Key::Space), Some(KeyCommand::TogglePlay));
        assert_eq!(KeyCommand::from_key(egui::Key::Escape), Some(KeyCommand::Stop));
        assert_eq!(KeyCommand::from_key(egui::Key::Home), Some(KeyCommand::ScrollToStart));
        assert_eq!(KeyCommand::from_key(egui::Key::End), Some(KeyCommand::ScrollToEnd));
        assert_eq!(KeyCommand::from_key(egui::Key::A), None);
    }

    #[test]
    fn test_pointer_drag_and_click_order() {
        let mut pointer = PointerState::default();
        let down = pointer.events(&PointerFrame {
            pos: Some((10.0, 5.0)),
            hovered: true,
            pressed: true,
            ..Default::default()
        });
        assert_eq!(
            down,
            vec![InputEvent::MouseDown {
                x: 10.0,
                y: 5.0,
                modifiers: Modifiers::default(),
            }]
        );

        let up = pointer.events(&PointerFrame {
            pos: Some((10.0, 5.0)),
            hovered: true,
            released: true,
            clicked: true,
            ..Default::default()
        });
        assert_eq!(
            up,
            vec![
                InputEvent::MouseUp { x: 10.0, y: 5.0 },
                InputEvent::Click {
                    x: 10.0,
                    y: 5.0,
                    modifiers: Modifiers::default(),
                },
            ]
        );
    }

    #[test]
    fn test_release_outside_window_ends_drag() {
        let mut pointer = PointerState::default();
        pointer.events(&PointerFrame {
            pos: Some((10.0, 5.0)),
            hovered: true,
            pressed: true,
            ..Default::default()
        });
        pointer.events(&PointerFrame {
            pos: Some((40.0, 5.0)),
            dragged: true,
            ..Default::default()
        });

        let up = pointer.events(&PointerFrame {
            pos: None,
            released: true,
            ..Default::default()
        });
        assert_eq!(up, vec![InputEvent::MouseUp { x: 40.0, y: 5.0 }]);

        // No second release for the same press
        let again = pointer.events(&PointerFrame {
            released: true,
            ..Default::default()
        });
        assert!(again.is_empty());
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut pointer = PointerState::default();
        let events = pointer.events(&PointerFrame {
            pos: Some((3.0, 3.0)),
            released: true,
            ..Default::default()
        });
        assert!(events.is_empty());
    }

    #[test]
    fn test_column() {
        assert_eq!(column(12.7), 12);
        assert_eq!(column(-3.0), 0);
        assert_eq!(column(f32::NAN), 0);
    }
}

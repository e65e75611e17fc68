//! egui backed drawing surface

use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};

use super::surface::{Rgb, Surface};

impl From<Rgb> for Color32 {
    fn from(c: Rgb) -> Self {
        Color32::from_rgb(c.0, c.1, c.2)
    }
}

/// Draws into an egui painter, offset to a component's rect
pub struct PainterSurface<'a> {
    painter: &'a egui::Painter,
    origin: Pos2,
}

impl<'a> PainterSurface<'a> {
    /// `rect` is the component's screen rect; drawing is clipped to it
    pub fn new(painter: &'a egui::Painter, rect: Rect) -> Self {
        Self {
            painter,
            // Half-pixel shift keeps 1px lines crisp
            origin: rect.min + Vec2::splat(0.5),
        }
    }

    fn pos(&self, x: f32, y: f32) -> Pos2 {
        self.origin + Vec2::new(x, y)
    }
}

impl Surface for PainterSurface<'_> {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let rect = Rect::from_min_size(self.pos(x, y), Vec2::new(width, height));
        self.painter.rect_filled(rect, 0.0, color);
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let rect = Rect::from_min_size(self.pos(x, y), Vec2::new(width, height));
        self.painter.rect_stroke(rect, 0.0, Stroke::new(1.0, color));
    }

    fn vline(&mut self, x: f32, y0: f32, y1: f32, color: Rgb) {
        self.painter
            .line_segment([self.pos(x, y0), self.pos(x, y1)], Stroke::new(1.0, color));
    }
}

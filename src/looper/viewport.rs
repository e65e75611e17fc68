//! Horizontal scroll window over the chunk sequence
//!
//! One screen column shows one chunk. Until there are more chunks than
//! columns the viewport is disabled and column `x` is chunk `x`. Once it is
//! enabled, column `x` is chunk `offset + x`.

/// Scroll state of the waveform view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    offset: usize,
    enabled: bool,
    visible_width: usize,
}

impl Viewport {
    pub fn new(visible_width: usize) -> Self {
        Self {
            offset: 0,
            enabled: false,
            visible_width,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn visible_width(&self) -> usize {
        self.visible_width
    }

    /// Largest offset that still keeps the view filled
    pub fn max_offset(&self, count: usize) -> usize {
        count.saturating_sub(self.visible_width)
    }

    /// Change the number of visible columns (window resize)
    pub fn set_visible_width(&mut self, width: usize, count: usize) {
        self.visible_width = width;
        if count > width {
            self.enabled = true;
        }
        self.offset = self.offset.min(self.max_offset(count));
    }

    /// Back to the start, scrolling disabled
    pub fn reset(&mut self) {
        self.offset = 0;
        self.enabled = false;
    }

    /// Screen column to absolute chunk index
    pub fn translate_x(&self, local_x: usize) -> usize {
        if self.enabled {
            self.offset + local_x
        } else {
            local_x
        }
    }

    /// Absolute chunk index to screen column, if it is on screen
    pub fn column_of(&self, index: usize) -> Option<usize> {
        let base = if self.enabled { self.offset } else { 0 };
        let column = index.checked_sub(base)?;
        (column < self.visible_width).then_some(column)
    }

    /// Wheel scroll. Positive `delta_x` moves the view towards the start.
    ///
    /// Returns whether the offset changed.
    pub fn scroll(&mut self, delta_x: i64, _delta_y: i64, count: usize) -> bool {
        if !self.enabled {
            return false;
        }
        let target = (self.offset as i64).saturating_sub(delta_x).max(0) as usize;
        let target = target.min(self.max_offset(count));
        let changed = target != self.offset;
        self.offset = target;
        changed
    }

    pub fn scroll_to_start(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_end(&mut self, count: usize) {
        self.offset = self.max_offset(count);
    }

    /// Keep the recording head in view: once the chunks overflow the view,
    /// the view follows the newest chunk.
    pub fn follow_recording(&mut self, count: usize) {
        if count > self.visible_width {
            self.enabled = true;
            self.offset = self.max_offset(count);
        }
    }

    /// Keep the playback position in view
    pub fn follow_playback(&mut self, position: usize, count: usize) {
        if position > self.offset + self.visible_width {
            self.enabled = true;
            self.offset = (position - self.visible_width).min(self.max_offset(count));
        } else if self.enabled && position < self.offset {
            self.offset = position.min(self.max_offset(count));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_disabled_and_enabled() {
        let mut viewport = Viewport::new(100);
        assert_eq!(viewport.translate_x(40), 40);

        viewport.follow_recording(150);
        assert!(viewport.is_enabled());
        assert_eq!(viewport.offset(), 50);
        assert_eq!(viewport.translate_x(40), 90);
        assert_eq!(viewport.column_of(90), Some(40));
        assert_eq!(viewport.column_of(10), None);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut viewport = Viewport::new(100);
        let count = 300;
        viewport.follow_recording(count);
        assert_eq!(viewport.offset(), 200);

        // Past the recorded head
        assert!(!viewport.scroll(-50, 0, count));
        assert_eq!(viewport.offset(), 200);

        assert!(viewport.scroll(30, 0, count));
        assert_eq!(viewport.offset(), 170);

        assert!(viewport.scroll(1000, 0, count));
        assert_eq!(viewport.offset(), 0);

        for delta in [-7, 13, -250, 400, -3, -90] {
            viewport.scroll(delta, 0, count);
            assert!(viewport.offset() <= viewport.max_offset(count));
        }
    }

    #[test]
    fn test_scroll_ignored_when_disabled() {
        let mut viewport = Viewport::new(100);
        assert!(!viewport.scroll(-10, 0, 50));
        assert_eq!(viewport.offset(), 0);
    }

    #[test]
    fn test_scroll_to_edges() {
        let mut viewport = Viewport::new(100);
        viewport.follow_recording(250);
        viewport.scroll_to_start();
        assert_eq!(viewport.offset(), 0);
        viewport.scroll_to_end(250);
        assert_eq!(viewport.offset(), 150);
    }

    #[test]
    fn test_follow_playback() {
        let mut viewport = Viewport::new(100);
        viewport.follow_recording(400);
        viewport.scroll_to_start();

        viewport.follow_playback(50, 400);
        assert_eq!(viewport.offset(), 0);

        viewport.follow_playback(101, 400);
        assert_eq!(viewport.offset(), 1);

        // Wrapped back behind the view
        viewport.follow_playback(0, 400);
        assert_eq!(viewport.offset(), 0);
    }

    #[test]
    fn test_resize_clamps_offset() {
        let mut viewport = Viewport::new(100);
        viewport.follow_recording(300);
        viewport.set_visible_width(250, 300);
        assert_eq!(viewport.offset(), 50);
        viewport.set_visible_width(400, 300);
        assert_eq!(viewport.offset(), 0);
    }
}

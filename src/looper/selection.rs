//! Loop selection over the chunk sequence
//!
//! A selection is an inclusive `[min, max]` range of chunk indices. While it
//! is active, playback loops inside it. Ranges are built by dragging on the
//! waveform, or adjusted edge by edge with fine-adjust clicks.
//!
//! All positions passed in here are absolute chunk indices: callers translate
//! screen columns through the viewport first.

/// Outcome of finishing a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectEnd {
    /// No drag was in progress
    Ignored,
    /// The drag collapsed to a point; the selection is cleared
    Deselected,
    /// The dragged range is now the active loop
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    anchor: usize,
    current: usize,
}

/// Inclusive loop range plus the drag in progress, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    min: usize,
    max: usize,
    active: bool,
    drag: Option<Drag>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether `index` lies inside an active selection
    pub fn contains(&self, index: usize) -> bool {
        self.active && index >= self.min && index <= self.max
    }

    /// Start a drag at `index`
    pub fn begin(&mut self, index: usize, count: usize) {
        let index = index.min(count);
        self.drag = Some(Drag {
            anchor: index,
            current: index,
        });
    }

    /// Move the free end of the drag
    pub fn update(&mut self, index: usize, count: usize) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        drag.current = index.min(count);
        self.min = drag.anchor.min(drag.current);
        self.max = drag.anchor.max(drag.current);
        self.check(count);
    }

    /// Finish the drag
    pub fn end(&mut self) -> SelectEnd {
        let Some(drag) = self.drag.take() else {
            return SelectEnd::Ignored;
        };
        if drag.anchor == drag.current {
            self.deselect();
            SelectEnd::Deselected
        } else {
            self.active = true;
            SelectEnd::Activated
        }
    }

    /// Fine adjust: pull the nearer edge to `index`.
    ///
    /// Outside the range the nearer bound is extended outward; inside it the
    /// bound closer to `index` moves in. Returns whether anything changed.
    pub fn subselect(&mut self, index: usize, count: usize) -> bool {
        let index = index.min(count);
        let before = (self.min, self.max);

        if index < self.min {
            self.min = index;
        } else if index > self.max {
            self.max = index;
        } else if index - self.min < self.max - index {
            self.min = index;
        } else {
            self.max = index;
        }

        self.check(count);
        (self.min, self.max) != before
    }

    /// Mark the current range as the active loop
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Collapse to an inactive, zeroed range
    pub fn deselect(&mut self) {
        self.min = 0;
        self.max = 0;
        self.active = false;
    }

    /// Drop any drag and selection (new recording)
    pub fn clear(&mut self) {
        self.drag = None;
        self.deselect();
    }

    fn check(&self, count: usize) {
        debug_assert!(self.min <= self.max, "selection min {} > max {}", self.min, self.max);
        debug_assert!(self.max <= count, "selection max {} > count {}", self.max, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_creates_range() {
        let mut selection = Selection::new();
        selection.begin(40, 100);
        selection.update(10, 100);
        assert_eq!((selection.min(), selection.max()), (10, 40));
        assert!(!selection.is_active());

        assert_eq!(selection.end(), SelectEnd::Activated);
        assert!(selection.is_active());
        assert!(selection.contains(25));
        assert!(!selection.contains(41));
    }

    #[test]
    fn test_click_without_drag_deselects() {
        let mut selection = Selection::new();
        selection.begin(10, 100);
        selection.update(30, 100);
        selection.end();

        selection.begin(50, 100);
        assert_eq!(selection.end(), SelectEnd::Deselected);
        assert!(!selection.is_active());
        assert_eq!((selection.min(), selection.max()), (0, 0));
    }

    #[test]
    fn test_range_is_clamped_to_count() {
        let mut selection = Selection::new();
        selection.begin(20, 50);
        selection.update(500, 50);
        assert_eq!((selection.min(), selection.max()), (20, 50));
    }

    #[test]
    fn test_end_without_begin() {
        let mut selection = Selection::new();
        assert_eq!(selection.end(), SelectEnd::Ignored);
    }

    #[test]
    fn test_subselect_extends_outward() {
        let mut selection = Selection::new();
        selection.begin(20, 100);
        selection.update(40, 100);
        selection.end();

        assert!(selection.subselect(5, 100));
        assert_eq!((selection.min(), selection.max()), (5, 40));
        assert!(selection.subselect(70, 100));
        assert_eq!((selection.min(), selection.max()), (5, 70));
    }

    #[test]
    fn test_subselect_nudges_nearer_bound() {
        let mut selection = Selection::new();
        selection.begin(20, 100);
        selection.update(60, 100);
        selection.end();

        selection.subselect(25, 100);
        assert_eq!((selection.min(), selection.max()), (25, 60));
        selection.subselect(55, 100);
        assert_eq!((selection.min(), selection.max()), (25, 55));
    }

    #[test]
    fn test_invariant_holds_over_mixed_input() {
        let count = 64;
        let mut selection = Selection::new();
        let steps: [(u8, usize); 12] = [
            (0, 10),
            (1, 90),
            (2, 0),
            (3, 3),
            (3, 200),
            (0, 63),
            (1, 1),
            (1, 64),
            (2, 0),
            (3, 30),
            (0, 7),
            (2, 0),
        ];
        for (op, x) in steps {
            match op {
                0 => selection.begin(x, count),
                1 => selection.update(x, count),
                2 => {
                    selection.end();
                }
                _ => {
                    selection.subselect(x, count);
                }
            }
            assert!(selection.min() <= selection.max());
            assert!(selection.max() <= count);
        }
    }
}

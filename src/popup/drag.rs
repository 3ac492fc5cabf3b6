use super::layout::{Point, Rect, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Pointer position at press.
        start: Point,
        /// Popup origin at press.
        origin: Point,
    },
}

/// Header drag for a single popup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn press(&mut self, pointer: Point, rect: Rect) {
        self.state = DragState::Dragging {
            start: pointer,
            origin: Point::new(rect.left, rect.top),
        };
    }

    /// New top-left for the popup, kept fully inside the viewport, or `None`
    /// when not dragging.
    pub fn drag_to(&self, pointer: Point, size: (f64, f64), viewport: Viewport) -> Option<Point> {
        let DragState::Dragging { start, origin } = self.state else {
            return None;
        };
        let (width, height) = size;
        let left = origin.x + (pointer.x - start.x);
        let top = origin.y + (pointer.y - start.y);
        Some(Point::new(
            left.min(viewport.width - width).max(0.0),
            top.min(viewport.height - height).max(0.0),
        ))
    }

    pub fn release(&mut self) {
        self.state = DragState::Idle;
    }
}

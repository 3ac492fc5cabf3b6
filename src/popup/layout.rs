use crate::models::Position;

/// Space kept free around a popup that would otherwise fill the viewport.
pub const VIEWPORT_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }
}

/// Explicit dimensions forced onto the popup by the oversize clamp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeClamp {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOutcome {
    pub rect: Rect,
    pub clamp: SizeClamp,
    pub size_clamped: bool,
    pub position_adjusted: bool,
}

fn centered(available: f64, extent: f64) -> f64 {
    (available - extent) / 2.0
}

fn resolve(requested: Position, available: f64, extent: f64) -> f64 {
    match requested {
        Position::Center => centered(available, extent),
        Position::Px(px) => f64::from(px),
    }
}

/// Compute the on-screen box of a popup.
///
/// `rendered` is the box as currently laid out. `remeasure` is called once
/// with the clamp that was applied (possibly none) and must return the box
/// after that clamp, since a narrower popup can grow taller.
pub fn compute_layout(
    rendered: Size,
    left: Position,
    top: Position,
    viewport: Viewport,
    remeasure: impl FnOnce(SizeClamp) -> Size,
) -> LayoutOutcome {
    // A limit at or below zero is not a usable length and is never applied.
    let max_width = viewport.width - VIEWPORT_MARGIN;
    let max_height = viewport.height - VIEWPORT_MARGIN;
    let mut clamp = SizeClamp::default();
    if max_width > 0.0 && rendered.width > max_width {
        clamp.width = Some(max_width);
    }
    if max_height > 0.0 && rendered.height > max_height {
        clamp.height = Some(max_height);
    }
    let size_clamped = clamp.width.is_some() || clamp.height.is_some();

    let size = remeasure(clamp);

    let mut x = resolve(left, viewport.width, size.width);
    let mut y = resolve(top, viewport.height, size.height);

    let mut position_adjusted = false;
    if x + size.width > viewport.width || x < 0.0 {
        x = centered(viewport.width, size.width);
        position_adjusted = true;
    }
    if y + size.height > viewport.height || y < 0.0 {
        y = if size.height < viewport.height {
            centered(viewport.height, size.height)
        } else {
            0.0
        };
        position_adjusted = true;
    }

    // Nothing had to move: honour the requested placement as given.
    if !size_clamped && !position_adjusted {
        x = resolve(left, viewport.width, size.width);
        y = resolve(top, viewport.height, size.height);
    }

    LayoutOutcome {
        rect: Rect {
            left: x,
            top: y,
            width: size.width,
            height: size.height,
        },
        clamp,
        size_clamped,
        position_adjusted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> Viewport {
        Viewport::new(1024.0, 768.0)
    }

    /// Apply a clamp without any reflow.
    fn clamped(size: Size, clamp: SizeClamp) -> Size {
        Size {
            width: clamp.width.unwrap_or(size.width),
            height: clamp.height.unwrap_or(size.height),
        }
    }

    fn fixed(size: Size) -> impl FnOnce(SizeClamp) -> Size {
        move |clamp| clamped(size, clamp)
    }

    #[test]
    fn centers_in_viewport() {
        let size = Size::new(300.0, 200.0);
        let out = compute_layout(size, Position::Center, Position::Center, desktop(), fixed(size));
        assert_eq!(out.rect.left, 362.0);
        assert_eq!(out.rect.top, (768.0 - 200.0) / 2.0);
        assert!(!out.size_clamped);
        assert!(!out.position_adjusted);
    }

    #[test]
    fn explicit_position_kept_when_it_fits() {
        let size = Size::new(300.0, 200.0);
        let out = compute_layout(size, Position::Px(100), Position::Px(40), desktop(), fixed(size));
        assert_eq!((out.rect.left, out.rect.top), (100.0, 40.0));
    }

    #[test]
    fn overflowing_position_recenters() {
        let size = Size::new(300.0, 200.0);
        let out = compute_layout(size, Position::Px(900), Position::Px(-10), desktop(), fixed(size));
        assert!(out.position_adjusted);
        assert_eq!(out.rect.left, 362.0);
        assert_eq!(out.rect.top, 284.0);
    }

    #[test]
    fn oversize_is_clamped_to_margin() {
        let size = Size::new(2000.0, 1500.0);
        let out = compute_layout(size, Position::Px(0), Position::Px(0), desktop(), fixed(size));
        assert!(out.size_clamped);
        assert_eq!(out.clamp.width, Some(1004.0));
        assert_eq!(out.clamp.height, Some(748.0));
        assert_eq!(out.rect.width, 1004.0);
        assert_eq!(out.rect.height, 748.0);
        assert_eq!((out.rect.left, out.rect.top), (0.0, 0.0));
    }

    #[test]
    fn reflow_taller_than_viewport_pins_top() {
        // Width clamp makes the content wrap into something taller than the
        // viewport, which the height check (done before reflow) missed.
        let out = compute_layout(
            Size::new(1100.0, 700.0),
            Position::Center,
            Position::Center,
            desktop(),
            |clamp| Size::new(clamp.width.unwrap_or(1100.0), 900.0),
        );
        assert_eq!(out.rect.width, 1004.0);
        assert_eq!(out.rect.height, 900.0);
        assert_eq!(out.rect.top, 0.0);
        assert_eq!(out.rect.left, 10.0);
        assert!(out.position_adjusted);
    }

    #[test]
    fn clamp_without_overflow_keeps_computed_position() {
        let size = Size::new(300.0, 760.0);
        let out = compute_layout(size, Position::Px(50), Position::Px(5), desktop(), fixed(size));
        assert!(out.size_clamped);
        assert_eq!(out.rect.height, 748.0);
        assert_eq!((out.rect.left, out.rect.top), (50.0, 5.0));
    }

    #[test]
    fn viewport_inside_margin_is_not_clamped() {
        let size = Size::new(300.0, 200.0);
        let out = compute_layout(
            size,
            Position::Center,
            Position::Center,
            Viewport::new(16.0, 16.0),
            fixed(size),
        );
        assert!(!out.size_clamped);
        assert_eq!(out.clamp, SizeClamp::default());
        assert_eq!((out.rect.width, out.rect.height), (300.0, 200.0));
        assert_eq!(out.rect.left, -142.0);
        assert_eq!(out.rect.top, 0.0);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect { left: 10.0, top: 10.0, width: 5.0, height: 5.0 };
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(!r.contains(Point::new(15.0, 12.0)));
    }
}

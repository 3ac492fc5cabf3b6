pub mod drag;
pub mod eligibility;
pub mod images;
pub mod layout;
pub mod markup;
pub mod measure;
pub mod stacking;

use chrono::{DateTime, Local};
use url::Url;

use crate::cookies::{suppression_key, CookieJar, SUPPRESSED_VALUE, SUPPRESSION_DAYS};
use crate::models::{Height, PopupConfig};
use drag::DragController;
use images::{refit_image, ImageFit, ImageState, LoadBarrier};
use layout::{Point, Rect, Size, Viewport};
use markup::{parse_content, ContentNode};
use measure::{Chrome, Measure};
use stacking::StackingContext;

/// Substring identifying an already-present icon font stylesheet.
pub const ICON_FONT_MARKER: &str = "font-awesome";
pub const DEFAULT_ICON_FONT_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/4.7.0/css/font-awesome.min.css";

// ─── Popup instance ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssLength {
    Auto,
    Px(f64),
}

/// Inline style of the popup root, as layout and drag leave it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupStyle {
    pub width: CssLength,
    pub height: CssLength,
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub z_index: u32,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupHandle(u64);

/// Region of a popup under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Header,
    CloseButton,
    Content,
    DontShowToday,
}

impl HitTarget {
    pub fn starts_drag(self) -> bool {
        matches!(self, HitTarget::Header | HitTarget::CloseButton)
    }
}

#[derive(Debug)]
pub struct Popup {
    handle: PopupHandle,
    config: PopupConfig,
    content: Vec<ContentNode>,
    images: Vec<ImageState>,
    barrier: LoadBarrier,
    style: PopupStyle,
    dont_show_today: bool,
    drag: DragController,
}

impl Popup {
    pub fn handle(&self) -> PopupHandle {
        self.handle
    }

    pub fn config(&self) -> &PopupConfig {
        &self.config
    }

    pub fn content(&self) -> &[ContentNode] {
        &self.content
    }

    pub fn images(&self) -> &[ImageState] {
        &self.images
    }

    pub fn style(&self) -> &PopupStyle {
        &self.style
    }

    pub fn dont_show_today(&self) -> bool {
        self.dont_show_today
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Sources of the images still waiting for a load or error report.
    pub fn pending_images(&self) -> Vec<(usize, &str)> {
        self.content
            .iter()
            .filter_map(|node| match node {
                ContentNode::Image { src, .. } => Some(src.as_str()),
                _ => None,
            })
            .enumerate()
            .filter(|(i, _)| matches!(self.images.get(*i), Some(ImageState::Loading)))
            .collect()
    }

    pub fn rect(&self, measure: &dyn Measure, viewport: Viewport) -> Rect {
        let size = measure.measure(self, viewport);
        Rect {
            left: self.style.left.unwrap_or(0.0),
            top: self.style.top.unwrap_or(0.0),
            width: size.width,
            height: size.height,
        }
    }
}

// ─── Manager ────────────────────────────────────────────────────────────────

/// The page: every popup in document order plus the shared state they use
/// (stacking counter, cookie jar, stylesheet links, viewport).
pub struct PopupManager {
    popups: Vec<Popup>,
    stylesheets: Vec<Url>,
    viewport: Viewport,
    stacking: StackingContext,
    cookies: CookieJar,
    measure: Box<dyn Measure>,
    text_selection: bool,
    pressed: Option<(PopupHandle, HitTarget)>,
    next_handle: u64,
}

impl PopupManager {
    pub fn new(viewport: Viewport, cookies: CookieJar, measure: Box<dyn Measure>) -> Self {
        Self {
            popups: Vec::new(),
            stylesheets: Vec::new(),
            viewport,
            stacking: StackingContext::default(),
            cookies,
            measure,
            text_selection: true,
            pressed: None,
            next_handle: 0,
        }
    }

    /// Add the icon font stylesheet unless one is already linked.
    /// Returns whether a link was added.
    pub fn ensure_icon_font(&mut self, url: &Url) -> bool {
        if self
            .stylesheets
            .iter()
            .any(|l| l.as_str().contains(ICON_FONT_MARKER))
        {
            return false;
        }
        tracing::debug!(%url, "linking icon font stylesheet");
        self.stylesheets.push(url.clone());
        true
    }

    pub fn add_stylesheet(&mut self, url: Url) {
        self.stylesheets.push(url);
    }

    pub fn stylesheets(&self) -> &[Url] {
        &self.stylesheets
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn cookie_path(&self) -> Option<&std::path::Path> {
        self.cookies.path()
    }

    pub fn popups(&self) -> &[Popup] {
        &self.popups
    }

    pub fn get(&self, handle: PopupHandle) -> Option<&Popup> {
        self.popups.iter().find(|p| p.handle == handle)
    }

    pub fn rect_of(&self, handle: PopupHandle) -> Option<Rect> {
        self.get(handle)
            .map(|p| p.rect(&*self.measure, self.viewport))
    }

    pub fn chrome(&self) -> Chrome {
        self.measure.chrome()
    }

    pub fn text_selection_enabled(&self) -> bool {
        self.text_selection
    }

    pub fn is_open(&self, popup_id: &str) -> bool {
        self.popups
            .iter()
            .any(|p| p.config.popup_id.as_deref() == Some(popup_id))
    }

    /// Visible popups, back to front.
    pub fn paint_order(&self) -> Vec<&Popup> {
        let mut visible: Vec<(usize, &Popup)> = self
            .popups
            .iter()
            .enumerate()
            .filter(|(_, p)| p.style.visible)
            .collect();
        visible.sort_by_key(|(i, p)| (p.style.z_index, *i));
        visible.into_iter().map(|(_, p)| p).collect()
    }

    pub fn front_most(&self) -> Option<PopupHandle> {
        self.paint_order().last().map(|p| p.handle)
    }

    pub fn back_most(&self) -> Option<PopupHandle> {
        self.paint_order().first().map(|p| p.handle)
    }

    fn index_of(&self, handle: PopupHandle) -> Option<usize> {
        self.popups.iter().position(|p| p.handle == handle)
    }

    // ── Factory ──────────────────────────────────────────────────────────

    /// Create a popup, or return `None` when it is outside its display
    /// period or suppressed for today.
    pub fn create_popup(
        &mut self,
        options: impl Into<PopupConfig>,
        now: DateTime<Local>,
    ) -> Option<PopupHandle> {
        let config: PopupConfig = options.into();
        let eligibility = eligibility::check(&config, &self.cookies, now);
        if !eligibility.is_eligible() {
            tracing::debug!(
                popup_id = config.popup_id.as_deref().unwrap_or("-"),
                ?eligibility,
                "popup not shown"
            );
            return None;
        }

        let content = parse_content(&config.content);
        let image_count = content
            .iter()
            .filter(|n| matches!(n, ContentNode::Image { .. }))
            .count();

        let footer_height = if config.show_today_option {
            self.measure.chrome().footer_height
        } else {
            0.0
        };
        let width = if config.auto_size {
            CssLength::Auto
        } else {
            CssLength::Px(f64::from(config.width))
        };
        let height = match (config.auto_size, config.height) {
            (false, Height::Px(h)) => CssLength::Px(f64::from(h) + footer_height),
            _ => CssLength::Auto,
        };

        let handle = PopupHandle(self.next_handle);
        self.next_handle += 1;
        let z_index = self.stacking.next();

        tracing::info!(
            handle = handle.0,
            title = %config.title,
            popup_id = config.popup_id.as_deref().unwrap_or("-"),
            images = image_count,
            z_index,
            "popup created"
        );

        self.popups.push(Popup {
            handle,
            config,
            content,
            images: vec![ImageState::Loading; image_count],
            barrier: LoadBarrier::new(image_count),
            style: PopupStyle {
                width,
                height,
                left: None,
                top: None,
                z_index,
                visible: false,
            },
            dont_show_today: false,
            drag: DragController::default(),
        });

        let index = self.popups.len() - 1;
        if self.popups[index].barrier.take_ready() {
            self.finish_initial_layout(index);
        }
        Some(handle)
    }

    // ── Images ───────────────────────────────────────────────────────────

    pub fn image_loaded(&mut self, handle: PopupHandle, image: usize, natural: Size) {
        let Some(index) = self.index_of(handle) else {
            return;
        };
        let popup = &mut self.popups[index];
        if !matches!(popup.images.get(image), Some(ImageState::Loading)) {
            return;
        }
        popup.images[image] = ImageState::Loaded {
            natural,
            fit: ImageFit::Natural,
        };
        self.refit_image(index, image);
        if self.popups[index].barrier.report(image) {
            self.finish_initial_layout(index);
        }
    }

    pub fn image_failed(&mut self, handle: PopupHandle, image: usize) {
        let Some(index) = self.index_of(handle) else {
            return;
        };
        let popup = &mut self.popups[index];
        if !matches!(popup.images.get(image), Some(ImageState::Loading)) {
            return;
        }
        tracing::debug!(handle = handle.0, image, "image failed to load");
        popup.images[image] = ImageState::Failed;
        if popup.barrier.report(image) {
            self.finish_initial_layout(index);
        }
    }

    fn refit_image(&mut self, index: usize, image: usize) {
        let viewport = self.viewport;
        let measure = &*self.measure;
        let popup = &mut self.popups[index];
        let content_width = measure.content_width(popup, viewport);
        if let Some(ImageState::Loaded { natural, fit }) = popup.images.get_mut(image) {
            *fit = refit_image(*fit, *natural, Some(content_width), viewport);
        }
    }

    fn refit_images(&mut self, index: usize) {
        for image in 0..self.popups[index].images.len() {
            self.refit_image(index, image);
        }
    }

    // ── Layout ───────────────────────────────────────────────────────────

    fn finish_initial_layout(&mut self, index: usize) {
        self.relayout(index);
        let popup = &mut self.popups[index];
        popup.style.visible = true;
        tracing::debug!(handle = popup.handle.0, "popup shown");
    }

    fn relayout(&mut self, index: usize) {
        let viewport = self.viewport;
        let measure = &*self.measure;
        let popup = &mut self.popups[index];
        let rendered = measure.measure(popup, viewport);
        let (left, top) = (popup.config.left, popup.config.top);

        let outcome = layout::compute_layout(rendered, left, top, viewport, |clamp| {
            if let Some(w) = clamp.width {
                popup.style.width = CssLength::Px(w);
            }
            if let Some(h) = clamp.height {
                popup.style.height = CssLength::Px(h);
            }
            measure.measure(popup, viewport)
        });

        if outcome.size_clamped || outcome.position_adjusted {
            tracing::debug!(
                handle = popup.handle.0,
                clamp_width = ?outcome.clamp.width,
                clamp_height = ?outcome.clamp.height,
                moved = outcome.position_adjusted,
                "popup constrained to viewport"
            );
        }
        popup.style.left = Some(outcome.rect.left);
        popup.style.top = Some(outcome.rect.top);
    }

    /// Viewport changed: lay every popup out again from scratch, then
    /// rescale its images.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for index in 0..self.popups.len() {
            self.relayout(index);
            self.refit_images(index);
        }
    }

    // ── Pointer ──────────────────────────────────────────────────────────

    pub fn hit_test(&self, point: Point) -> Option<(PopupHandle, HitTarget)> {
        let chrome = self.measure.chrome();
        self.paint_order().into_iter().rev().find_map(|popup| {
            let rect = popup.rect(&*self.measure, self.viewport);
            if !rect.contains(point) {
                return None;
            }
            let target = if point.y < rect.top + chrome.header_height {
                if point.x >= rect.right() - chrome.close_width {
                    HitTarget::CloseButton
                } else {
                    HitTarget::Header
                }
            } else if popup.config.show_today_option
                && point.y >= rect.bottom() - chrome.footer_height
            {
                HitTarget::DontShowToday
            } else {
                HitTarget::Content
            };
            Some((popup.handle, target))
        })
    }

    pub fn pointer_down(&mut self, point: Point) {
        let Some((handle, target)) = self.hit_test(point) else {
            self.pressed = None;
            return;
        };
        self.bring_to_front(handle);
        self.pressed = Some((handle, target));

        if target.starts_drag() {
            let Some(index) = self.index_of(handle) else {
                return;
            };
            let rect = self.popups[index].rect(&*self.measure, self.viewport);
            self.popups[index].drag.press(point, rect);
            self.text_selection = false;
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        let viewport = self.viewport;
        let measure = &*self.measure;
        for popup in self.popups.iter_mut().filter(|p| p.drag.is_dragging()) {
            let size = measure.measure(popup, viewport);
            if let Some(pos) = popup.drag.drag_to(point, (size.width, size.height), viewport) {
                popup.style.left = Some(pos.x);
                popup.style.top = Some(pos.y);
            }
        }
    }

    /// End any drag. A release over the region that was pressed is a click.
    pub fn pointer_up(&mut self, point: Point, now: DateTime<Local>) {
        for popup in &mut self.popups {
            popup.drag.release();
        }
        self.text_selection = true;

        let Some(pressed) = self.pressed.take() else {
            return;
        };
        if self.hit_test(point) != Some(pressed) {
            return;
        }
        match pressed.1 {
            HitTarget::CloseButton => {
                self.close(pressed.0, now);
            }
            HitTarget::DontShowToday => {
                self.toggle_dont_show_today(pressed.0);
            }
            HitTarget::Header | HitTarget::Content => {}
        }
    }

    pub fn bring_to_front(&mut self, handle: PopupHandle) {
        let Some(active) = self.index_of(handle) else {
            return;
        };
        let values = self.stacking.bring_to_front(self.popups.len(), active);
        for (popup, z) in self.popups.iter_mut().zip(values) {
            popup.style.z_index = z;
        }
    }

    // ── Close ────────────────────────────────────────────────────────────

    /// Flip the "don't show again today" box. Only popups showing the
    /// footer have one to click.
    pub fn toggle_dont_show_today(&mut self, handle: PopupHandle) -> Option<bool> {
        let index = self.index_of(handle)?;
        let popup = &mut self.popups[index];
        if !popup.config.show_today_option {
            return None;
        }
        popup.dont_show_today = !popup.dont_show_today;
        Some(popup.dont_show_today)
    }

    /// Remove the popup, first recording today's suppression if the box is
    /// checked. Returns whether a popup was removed.
    pub fn close(&mut self, handle: PopupHandle, now: DateTime<Local>) -> bool {
        let Some(index) = self.index_of(handle) else {
            return false;
        };
        let popup = self.popups.remove(index);
        if self.pressed.is_some_and(|(h, _)| h == handle) {
            self.pressed = None;
        }

        if let (true, Some(id)) = (popup.dont_show_today, popup.config.popup_id.as_deref()) {
            let key = suppression_key(id);
            match self
                .cookies
                .set(&key, SUPPRESSED_VALUE, SUPPRESSION_DAYS, now)
            {
                Ok(cookie) => {
                    tracing::info!(cookie = %cookie.to_set_cookie(), "popup hidden for today")
                }
                Err(e) => tracing::warn!(popup_id = id, error = %e, "could not persist suppression"),
            }
        }
        tracing::info!(handle = handle.0, "popup closed");
        true
    }
}

use super::layout::{Size, Viewport};

/// Space kept free around an image scaled down to the viewport.
pub const IMAGE_VIEWPORT_MARGIN: f64 = 40.0;

/// How an image is sized inside the popup content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageFit {
    Natural,
    /// Exactly the content width, height following the aspect ratio.
    /// `max_height` is a cap left behind by an earlier bounded fit.
    FillContent { width: f64, max_height: Option<f64> },
    /// Uniformly scaled upper bounds.
    Bounded { max_width: f64, max_height: f64 },
}

impl ImageFit {
    pub fn displayed_size(&self, natural: Size) -> Size {
        match *self {
            ImageFit::Natural => natural,
            ImageFit::FillContent { width, max_height } => {
                let height = if natural.width > 0.0 {
                    natural.height * width / natural.width
                } else {
                    0.0
                };
                Size::new(width, max_height.map_or(height, |m| height.min(m)))
            }
            ImageFit::Bounded {
                max_width,
                max_height,
            } => Size::new(natural.width.min(max_width), natural.height.min(max_height)),
        }
    }
}

/// Choose the fit for an image of `natural` size. `content_width` is the
/// inner width of the popup's content area, when known.
pub fn fit_image(natural: Size, content_width: Option<f64>, viewport: Viewport) -> ImageFit {
    if let Some(content_width) = content_width {
        if natural.width > content_width {
            return ImageFit::FillContent {
                width: content_width,
                max_height: None,
            };
        }
    }

    let avail_w = viewport.width - IMAGE_VIEWPORT_MARGIN;
    let avail_h = viewport.height - IMAGE_VIEWPORT_MARGIN;
    // No room at all: a negative bound would be invalid, so nothing is set.
    if avail_w <= 0.0 || avail_h <= 0.0 {
        return ImageFit::Natural;
    }
    if natural.width > avail_w || natural.height > avail_h {
        let ratio = (avail_w / natural.width).min(avail_h / natural.height);
        return ImageFit::Bounded {
            max_width: natural.width * ratio,
            max_height: natural.height * ratio,
        };
    }

    ImageFit::Natural
}

/// Fit an already-sized image again. Only the properties the new fit sets
/// are replaced: a `Natural` result changes nothing, and filling the content
/// width leaves an earlier height cap in place.
pub fn refit_image(
    previous: ImageFit,
    natural: Size,
    content_width: Option<f64>,
    viewport: Viewport,
) -> ImageFit {
    match fit_image(natural, content_width, viewport) {
        ImageFit::Natural => previous,
        ImageFit::FillContent { width, .. } => ImageFit::FillContent {
            width,
            max_height: match previous {
                ImageFit::Bounded { max_height, .. } => Some(max_height),
                ImageFit::FillContent { max_height, .. } => max_height,
                ImageFit::Natural => None,
            },
        },
        bounded => bounded,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
    Loading,
    Loaded { natural: Size, fit: ImageFit },
    Failed,
}

impl ImageState {
    pub fn displayed_size(&self) -> Option<Size> {
        match self {
            ImageState::Loaded { natural, fit } => Some(fit.displayed_size(*natural)),
            _ => None,
        }
    }
}

// ─── Load barrier ───────────────────────────────────────────────────────────

/// Counts image load/error reports and signals completion exactly once.
#[derive(Debug, Clone)]
pub struct LoadBarrier {
    reported: Vec<bool>,
    remaining: usize,
    fired: bool,
}

impl LoadBarrier {
    pub fn new(total: usize) -> Self {
        Self {
            reported: vec![false; total],
            remaining: total,
            fired: false,
        }
    }

    /// Record that image `index` settled (loaded or failed). Repeated or
    /// out-of-range reports are ignored. Returns `true` on the report that
    /// completes the set.
    pub fn report(&mut self, index: usize) -> bool {
        match self.reported.get_mut(index) {
            Some(seen) if !*seen => {
                *seen = true;
                self.remaining -= 1;
                self.take_ready()
            }
            _ => false,
        }
    }

    /// `true` exactly once, as soon as every image has reported. With no
    /// images this is the first call.
    pub fn take_ready(&mut self) -> bool {
        if self.fired || self.remaining > 0 {
            return false;
        }
        self.fired = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> Viewport {
        Viewport::new(1024.0, 768.0)
    }

    #[test]
    fn wider_than_content_fills_content() {
        let natural = Size::new(2000.0, 1000.0);
        let fit = fit_image(natural, Some(400.0), desktop());
        assert_eq!(
            fit,
            ImageFit::FillContent {
                width: 400.0,
                max_height: None
            }
        );
        assert_eq!(fit.displayed_size(natural), Size::new(400.0, 200.0));
    }

    #[test]
    fn taller_than_viewport_is_bounded_uniformly() {
        let natural = Size::new(300.0, 1456.0);
        let fit = fit_image(natural, Some(400.0), desktop());
        let ImageFit::Bounded { max_width, max_height } = fit else {
            panic!("expected bounded fit, got {fit:?}");
        };
        assert_eq!(max_height, 728.0);
        assert_eq!(max_width, 150.0);
    }

    #[test]
    fn without_content_width_falls_back_to_viewport() {
        let natural = Size::new(1968.0, 100.0);
        let fit = fit_image(natural, None, desktop());
        assert_eq!(
            fit,
            ImageFit::Bounded {
                max_width: 984.0,
                max_height: 50.0
            }
        );
    }

    #[test]
    fn small_image_untouched() {
        let natural = Size::new(120.0, 80.0);
        assert_eq!(fit_image(natural, Some(280.0), desktop()), ImageFit::Natural);
    }

    #[test]
    fn viewport_smaller_than_margin_sets_no_bound() {
        let natural = Size::new(300.0, 200.0);
        assert_eq!(
            fit_image(natural, None, Viewport::new(16.0, 16.0)),
            ImageFit::Natural
        );
    }

    #[test]
    fn refit_keeps_previous_fit_when_natural_suffices() {
        let natural = Size::new(300.0, 1456.0);
        let bounded = fit_image(natural, Some(400.0), desktop());
        let refit = refit_image(bounded, natural, Some(400.0), Viewport::new(2000.0, 2000.0));
        assert_eq!(refit, bounded);
    }

    #[test]
    fn fill_after_bound_keeps_height_cap() {
        let natural = Size::new(300.0, 1456.0);
        let bounded = fit_image(natural, Some(400.0), desktop());
        let refit = refit_image(bounded, natural, Some(200.0), desktop());
        assert_eq!(
            refit,
            ImageFit::FillContent {
                width: 200.0,
                max_height: Some(728.0)
            }
        );
        assert_eq!(refit.displayed_size(natural), Size::new(200.0, 728.0));

        let again = refit_image(refit, natural, Some(100.0), desktop());
        assert_eq!(
            again,
            ImageFit::FillContent {
                width: 100.0,
                max_height: Some(728.0)
            }
        );
    }

    #[test]
    fn barrier_fires_once_after_all_reports() {
        let mut barrier = LoadBarrier::new(3);
        assert!(!barrier.take_ready());
        assert!(!barrier.report(0));
        assert!(!barrier.report(0));
        assert!(!barrier.report(7));
        assert!(!barrier.report(2));
        assert!(!barrier.take_ready());
        assert!(barrier.report(1));
        assert!(!barrier.report(1));
        assert!(!barrier.take_ready());
    }

    #[test]
    fn empty_barrier_is_immediately_ready() {
        let mut barrier = LoadBarrier::new(0);
        assert!(barrier.take_ready());
        assert!(!barrier.take_ready());
    }
}

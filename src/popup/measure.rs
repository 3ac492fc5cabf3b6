use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use super::layout::{Size, Viewport};
use super::markup::{blocks, Block};
use super::{CssLength, Popup};

/// Fixed parts of the popup frame used for hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chrome {
    pub header_height: f64,
    pub footer_height: f64,
    pub close_width: f64,
}

/// Layout oracle: how big a popup renders at its current style.
pub trait Measure {
    fn measure(&self, popup: &Popup, viewport: Viewport) -> Size;

    /// Inner width of the content region.
    fn content_width(&self, popup: &Popup, viewport: Viewport) -> f64;

    fn chrome(&self) -> Chrome;
}

/// Box model used when there is no real layout engine: monospace text,
/// East Asian wide characters counted double.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub header_height: f64,
    pub footer_height: f64,
    pub padding: f64,
    pub close_width: f64,
}

impl Default for BoxMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 16.0,
            header_height: 16.0,
            footer_height: 32.0,
            padding: 8.0,
            close_width: 24.0,
        }
    }
}

impl BoxMetrics {
    fn text_width(&self, text: &str) -> f64 {
        text.width() as f64 * self.char_width
    }

    /// Number of lines `text` wraps to at `width` pixels.
    pub fn line_count(&self, text: &str, width: f64) -> usize {
        let chars_per_line = (width / self.char_width).floor().max(1.0) as usize;
        let mut lines = 0;
        let mut current = 0;
        for word in text.split(' ') {
            let w = word.width();
            if current == 0 {
                current = w;
            } else if current + 1 + w <= chars_per_line {
                current += 1 + w;
                continue;
            } else {
                lines += 1;
                current = w;
            }
            // Words longer than a line break mid-word.
            while current > chars_per_line {
                lines += 1;
                current -= chars_per_line;
            }
        }
        lines + 1
    }

    /// Width the popup takes when nothing constrains it.
    fn max_content_width(&self, popup: &Popup) -> f64 {
        let title = self.text_width(&popup.config().title) + self.close_width;
        let body = blocks(popup.content())
            .into_iter()
            .map(|block| match block {
                Block::Paragraph(text) => self.text_width(text),
                Block::Image { index, .. } => popup
                    .images()
                    .get(index)
                    .and_then(|s| s.displayed_size())
                    .map_or(0.0, |s| s.width),
            })
            .fold(0.0, f64::max);
        title.max(body) + 2.0 * self.padding
    }

    fn content_height(&self, popup: &Popup, content_width: f64) -> f64 {
        blocks(popup.content())
            .into_iter()
            .map(|block| match block {
                Block::Paragraph(text) => {
                    self.line_count(text, content_width) as f64 * self.line_height
                }
                Block::Image { index, .. } => popup
                    .images()
                    .get(index)
                    .and_then(|s| s.displayed_size())
                    .map_or(0.0, |s| s.height),
            })
            .sum()
    }

    fn box_width(&self, popup: &Popup, viewport: Viewport) -> f64 {
        match popup.style().width {
            CssLength::Px(w) => w,
            CssLength::Auto => self.max_content_width(popup).min(viewport.width),
        }
    }
}

impl Measure for BoxMetrics {
    fn measure(&self, popup: &Popup, viewport: Viewport) -> Size {
        let width = self.box_width(popup, viewport);
        let height = match popup.style().height {
            CssLength::Px(h) => h,
            CssLength::Auto => {
                let content_width = (width - 2.0 * self.padding).max(0.0);
                let footer = if popup.config().show_today_option {
                    self.footer_height
                } else {
                    0.0
                };
                self.header_height
                    + 2.0 * self.padding
                    + self.content_height(popup, content_width)
                    + footer
            }
        };
        Size::new(width, height)
    }

    fn content_width(&self, popup: &Popup, viewport: Viewport) -> f64 {
        (self.box_width(popup, viewport) - 2.0 * self.padding).max(0.0)
    }

    fn chrome(&self) -> Chrome {
        Chrome {
            header_height: self.header_height,
            footer_height: self.footer_height,
            close_width: self.close_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        let m = BoxMetrics::default();
        // 10 columns at 8px.
        assert_eq!(m.line_count("short", 80.0), 1);
        assert_eq!(m.line_count("hello there world", 80.0), 3);
        assert_eq!(m.line_count("abcdefghijklmnopqrstuvwxy", 80.0), 3);
    }

    #[test]
    fn wide_characters_count_double() {
        let m = BoxMetrics::default();
        assert_eq!(m.text_width("팝업"), 32.0);
        assert_eq!(m.line_count("오늘 하루 그만보기", 48.0), 4);
    }
}

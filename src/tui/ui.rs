use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::App;
use crate::popup::images::ImageState;
use crate::popup::markup::{blocks, Block as ContentBlock, DONT_SHOW_TODAY_LABEL};
use crate::popup::Popup;

const ACCENT: Color = Color::Cyan;
const HEADER_BG: Color = Color::DarkGray;
const DIM: Color = Color::DarkGray;
const DRAGGING: Color = Color::Yellow;
const BAD: Color = Color::Red;
const SPINNER: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

// ─── Main render ────────────────────────────────────────────────────────────

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    render_page(f, chunks[0]);

    let front = app.manager.front_most();
    let chrome = app.manager.chrome();
    for popup in app.manager.paint_order() {
        let Some(rect) = app.manager.rect_of(popup.handle()) else {
            continue;
        };
        let area = Rect {
            x: cells(rect.left, app.cell.width),
            y: cells(rect.top, app.cell.height),
            width: cells(rect.width, app.cell.width),
            height: cells(rect.height, app.cell.height),
        }
        .intersection(f.area());
        if area.is_empty() {
            continue;
        }
        // Same region the pointer treats as the close button.
        let close = Rect {
            x: cells(rect.right() - chrome.close_width, app.cell.width),
            y: cells(rect.top, app.cell.height),
            width: cells(chrome.close_width, app.cell.width),
            height: cells(chrome.header_height, app.cell.height).min(1),
        }
        .intersection(area);
        render_popup(f, popup, area, close, Some(popup.handle()) == front);
    }

    render_status_bar(f, app, chunks[1]);
}

/// Pixel offset or extent to whole cells, clamped at zero.
fn cells(px: f64, cell: f64) -> u16 {
    (px / cell).round().clamp(0.0, f64::from(u16::MAX)) as u16
}

// ─── Page ───────────────────────────────────────────────────────────────────

fn render_page(f: &mut Frame, area: Rect) {
    let page = Paragraph::new(vec![
        Line::from(Span::styled(
            " draggable-popup ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Drag popups by their title bar. Click × to close.",
            Style::default().fg(DIM),
        )),
    ]);
    f.render_widget(page, area);
}

// ─── Popup ──────────────────────────────────────────────────────────────────

fn render_popup(f: &mut Frame, popup: &Popup, area: Rect, close: Rect, focused: bool) {
    let border = if popup.is_dragging() {
        DRAGGING
    } else if focused {
        ACCENT
    } else {
        DIM
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" {} ", popup.config().title))
        .title_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);
    if !close.is_empty() {
        f.render_widget(
            Paragraph::new(Line::from("×").centered())
                .style(Style::default().fg(Color::White).bg(BAD)),
            close,
        );
    }

    let show_footer = popup.config().show_today_option && inner.height > 1;
    let (body, footer) = if show_footer {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);
        (parts[0], Some(parts[1]))
    } else {
        (inner, None)
    };

    f.render_widget(
        Paragraph::new(content_lines(popup)).wrap(Wrap { trim: true }),
        body,
    );

    if let Some(footer) = footer {
        let mark = if popup.dont_show_today() { "[x]" } else { "[ ]" };
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{mark} "), Style::default().fg(ACCENT)),
                Span::raw(DONT_SHOW_TODAY_LABEL),
            ])),
            footer,
        );
    }
}

fn content_lines(popup: &Popup) -> Vec<Line<'_>> {
    blocks(popup.content())
        .into_iter()
        .map(|block| match block {
            ContentBlock::Paragraph(text) => Line::from(text),
            ContentBlock::Image { index, src, alt } => {
                let label = alt.unwrap_or(src);
                match popup.images().get(index) {
                    Some(ImageState::Loaded { .. }) => {
                        let size = popup.images()[index]
                            .displayed_size()
                            .unwrap_or_default();
                        Line::from(Span::styled(
                            format!("[image {label} {:.0}×{:.0}]", size.width, size.height),
                            Style::default().fg(ACCENT),
                        ))
                    }
                    Some(ImageState::Failed) => Line::from(Span::styled(
                        format!("[image {label} unavailable]"),
                        Style::default().fg(BAD),
                    )),
                    _ => Line::from(Span::styled(
                        format!("[loading {label}…]"),
                        Style::default().fg(DIM),
                    )),
                }
            }
        })
        .collect()
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let loading = app
        .manager
        .popups()
        .iter()
        .any(|p| !p.pending_images().is_empty());
    let indicator = if !app.manager.text_selection_enabled() {
        Span::styled(" ✥ ", Style::default().fg(DRAGGING))
    } else if loading {
        let frame = SPINNER[(app.frame_count as usize) % SPINNER.len()];
        Span::styled(format!(" {frame} "), Style::default().fg(ACCENT))
    } else {
        Span::raw(" ")
    };
    let status = Paragraph::new(Line::from(vec![
        indicator,
        Span::styled(&app.status_message, Style::default().fg(Color::White)),
        Span::styled(
            format!(
                "  {} open  {:.0}×{:.0}px  q:quit  Esc:close  Space:don't show today  Tab:cycle  r:reopen  ",
                app.manager.popups().len(),
                app.manager.viewport().width,
                app.manager.viewport().height,
            ),
            Style::default().fg(DIM),
        ),
    ]))
    .style(Style::default().bg(HEADER_BG));

    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CellSize;
    use crate::cookies::CookieJar;
    use crate::models::{PopupOptions, Position};
    use crate::popup::layout::Viewport;
    use crate::popup::measure::BoxMetrics;
    use crate::popup::{HitTarget, PopupManager};
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;

    #[test]
    fn close_glyph_sits_on_close_hit_area() {
        let manager = PopupManager::new(
            Viewport::new(640.0, 384.0),
            CookieJar::in_memory(),
            Box::new(BoxMetrics::default()),
        );
        let options = PopupOptions {
            left: Some(Position::Px(80)),
            top: Some(Position::Px(64)),
            ..Default::default()
        };
        let mut app = App::new(manager, vec![options], CellSize::default(), PathBuf::from("."));
        app.open_configured();
        let handle = app.manager.front_most().unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let buffer = terminal.backend().buffer();

        // Popup spans columns 10..48; the close button is columns 45..48.
        assert_eq!(buffer[(46u16, 4u16)].symbol(), "×");
        for col in 45..48u16 {
            let point = app.to_px(col, 4);
            assert_eq!(
                app.manager.hit_test(point),
                Some((handle, HitTarget::CloseButton))
            );
        }
        assert_eq!(
            app.manager.hit_test(app.to_px(44, 4)),
            Some((handle, HitTarget::Header))
        );
    }

    #[test]
    fn cells_round_and_clamp() {
        assert_eq!(cells(362.0, 8.0), 45);
        assert_eq!(cells(-40.0, 8.0), 0);
    }

    #[test]
    fn renders_popup_title_and_footer() {
        let manager = PopupManager::new(
            Viewport::new(640.0, 384.0),
            CookieJar::in_memory(),
            Box::new(BoxMetrics::default()),
        );
        let options = PopupOptions {
            title: Some("Sale".into()),
            content: Some("Everything must go".into()),
            show_today_option: Some(true),
            popup_id: Some("sale".into()),
            ..Default::default()
        };
        let mut app = App::new(manager, vec![options], CellSize::default(), PathBuf::from("."));
        app.open_configured();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Sale"));
        assert!(text.contains("Everything must go"));
        assert!(text.contains("[ ]"));
    }
}

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::time::Duration;

use super::App;

pub fn poll_event(timeout: Duration) -> anyhow::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

pub fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => handle_key(app, key.code, key.modifiers),
        Event::Mouse(mouse) => handle_mouse(app, mouse),
        Event::Resize(cols, rows) => {
            let viewport = app.viewport_for(cols, rows);
            app.manager.resize(viewport);
        }
        _ => {}
    }
}

pub fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.running = false;
        }
        (KeyCode::Esc, _) => app.close_front(),
        (KeyCode::Char(' '), _) => app.toggle_front_checkbox(),
        (KeyCode::Tab, _) => app.cycle_focus(),
        (KeyCode::Char('r'), _) => app.open_configured(),
        _ => {}
    }
}

pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let point = app.to_px(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.manager.pointer_down(point),
        MouseEventKind::Drag(MouseButton::Left) => app.manager.pointer_move(point),
        MouseEventKind::Up(MouseButton::Left) => app.manager.pointer_up(point, Local::now()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CellSize;
    use crate::cookies::CookieJar;
    use crate::models::{PopupOptions, Position};
    use crate::popup::layout::Viewport;
    use crate::popup::measure::BoxMetrics;
    use crate::popup::PopupManager;
    use std::path::PathBuf;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn app_with_popup_at(left: i32, top: i32) -> App {
        let manager = PopupManager::new(
            Viewport::new(800.0, 480.0),
            CookieJar::in_memory(),
            Box::new(BoxMetrics::default()),
        );
        let options = PopupOptions {
            width: Some(200),
            left: Some(Position::Px(left)),
            top: Some(Position::Px(top)),
            ..Default::default()
        };
        let mut app = App::new(manager, vec![options], CellSize::default(), PathBuf::from("."));
        app.open_configured();
        app
    }

    #[test]
    fn mouse_drag_moves_popup_by_whole_cells() {
        let mut app = app_with_popup_at(80, 64);
        let handle = app.manager.front_most().unwrap();

        // Column 11 = 88px, row 4 = 64px: inside the header.
        handle_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 11, 4));
        handle_event(&mut app, mouse(MouseEventKind::Drag(MouseButton::Left), 16, 6));
        handle_event(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 16, 6));

        let rect = app.manager.rect_of(handle).unwrap();
        assert_eq!((rect.left, rect.top), (120.0, 96.0));
    }

    #[test]
    fn resize_event_updates_viewport() {
        let mut app = app_with_popup_at(0, 0);
        handle_event(&mut app, Event::Resize(50, 20));
        assert_eq!(app.manager.viewport(), Viewport::new(400.0, 320.0));
    }

    #[test]
    fn quit_keys() {
        let mut app = app_with_popup_at(0, 0);
        handle_key(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(!app.running);
    }
}

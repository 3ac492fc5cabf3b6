pub mod event;
pub mod ui;

use chrono::Local;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::assets::probe_image;
use crate::config::CellSize;
use crate::models::PopupOptions;
use crate::popup::layout::{Point, Size, Viewport};
use crate::popup::{PopupHandle, PopupManager};

// ─── Image probes ───────────────────────────────────────────────────────────

/// Outcome of reading one image's dimensions on a worker thread.
pub struct ImageProbe {
    pub handle: PopupHandle,
    pub index: usize,
    pub result: Result<Size, String>,
}

// ─── App State ──────────────────────────────────────────────────────────────

pub struct App {
    pub manager: PopupManager,
    pub running: bool,
    /// Popups from the config file, re-opened with `r`.
    pub configured: Vec<PopupOptions>,
    pub cell: CellSize,
    pub asset_root: PathBuf,

    pub status_message: String,

    image_tx: mpsc::UnboundedSender<ImageProbe>,
    image_rx: mpsc::UnboundedReceiver<ImageProbe>,

    // Incremented each frame.
    pub frame_count: u64,
}

impl App {
    pub fn new(
        manager: PopupManager,
        configured: Vec<PopupOptions>,
        cell: CellSize,
        asset_root: PathBuf,
    ) -> Self {
        let (image_tx, image_rx) = mpsc::unbounded_channel();
        Self {
            manager,
            running: true,
            configured,
            cell,
            asset_root,
            status_message: String::new(),
            image_tx,
            image_rx,
            frame_count: 0,
        }
    }

    /// Viewport in pixels for a terminal of `cols` x `rows`.
    pub fn viewport_for(&self, cols: u16, rows: u16) -> Viewport {
        Viewport::new(
            f64::from(cols) * self.cell.width,
            f64::from(rows) * self.cell.height,
        )
    }

    /// Pixel position of the top-left corner of a cell.
    pub fn to_px(&self, col: u16, row: u16) -> Point {
        Point::new(
            f64::from(col) * self.cell.width,
            f64::from(row) * self.cell.height,
        )
    }

    /// Run the factory for every configured popup that is not already on
    /// screen. Suppressed or out-of-period popups are skipped.
    pub fn open_configured(&mut self) {
        let now = Local::now();
        let mut opened = 0;
        let mut skipped = 0;
        for options in self.configured.clone() {
            let already_open = options
                .popup_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .is_some_and(|id| self.manager.is_open(id));
            if already_open {
                continue;
            }
            match self.manager.create_popup(options, now) {
                Some(handle) => {
                    opened += 1;
                    self.start_image_probes(handle);
                }
                None => skipped += 1,
            }
        }
        self.status_message = match (opened, skipped) {
            (0, 0) => "Nothing new to open.".into(),
            (o, 0) => format!("Opened {o} popup(s)."),
            (o, s) => format!("Opened {o} popup(s); {s} hidden by date or for today."),
        };
    }

    fn start_image_probes(&mut self, handle: PopupHandle) {
        let Some(popup) = self.manager.get(handle) else {
            return;
        };
        for (index, src) in popup.pending_images() {
            let src = src.to_string();
            let root = self.asset_root.clone();
            let tx = self.image_tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = probe_image(&src, &root).map_err(|e| e.to_string());
                let _ = tx.send(ImageProbe {
                    handle,
                    index,
                    result,
                });
            });
        }
    }

    /// Apply finished image probes without blocking. Returns `true` when
    /// anything arrived.
    pub fn poll_image_results(&mut self) -> bool {
        let mut any = false;
        while let Ok(probe) = self.image_rx.try_recv() {
            any = true;
            match probe.result {
                Ok(natural) => self.manager.image_loaded(probe.handle, probe.index, natural),
                Err(e) => {
                    tracing::warn!(index = probe.index, error = %e, "image load failed");
                    self.manager.image_failed(probe.handle, probe.index);
                }
            }
        }
        any
    }

    pub fn close_front(&mut self) {
        if let Some(handle) = self.manager.front_most() {
            self.manager.close(handle, Local::now());
            self.status_message = "Closed.".into();
        }
    }

    pub fn toggle_front_checkbox(&mut self) {
        let Some(handle) = self.manager.front_most() else {
            return;
        };
        self.status_message = match self.manager.toggle_dont_show_today(handle) {
            Some(true) => "Will stay hidden today once closed.".into(),
            Some(false) => "Will show again next time.".into(),
            None => "This popup has no \"don't show today\" option.".into(),
        };
    }

    pub fn cycle_focus(&mut self) {
        if let Some(handle) = self.manager.back_most() {
            self.manager.bring_to_front(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::CookieJar;
    use crate::popup::images::ImageState;
    use crate::popup::measure::BoxMetrics;
    use std::time::Duration;

    fn app(configured: Vec<PopupOptions>) -> App {
        let cell = CellSize::default();
        let manager = PopupManager::new(
            Viewport::new(800.0, 480.0),
            CookieJar::in_memory(),
            Box::new(BoxMetrics::default()),
        );
        App::new(manager, configured, cell, PathBuf::from("."))
    }

    #[test]
    fn cell_to_pixel_mapping() {
        let a = app(Vec::new());
        assert_eq!(a.viewport_for(100, 30), Viewport::new(800.0, 480.0));
        assert_eq!(a.to_px(3, 2), Point::new(24.0, 32.0));
    }

    #[test]
    fn reopen_does_not_duplicate_identified_popups() {
        let options = PopupOptions {
            popup_id: Some("welcome".into()),
            ..Default::default()
        };
        let mut a = app(vec![options, PopupOptions::default()]);
        a.open_configured();
        assert_eq!(a.manager.popups().len(), 2);
        a.open_configured();
        assert_eq!(a.manager.popups().len(), 3);
    }

    #[test]
    fn escape_closes_front_most() {
        let mut a = app(vec![PopupOptions::default(), PopupOptions::default()]);
        a.open_configured();
        let front = a.manager.front_most().unwrap();
        a.close_front();
        assert!(a.manager.get(front).is_none());
        assert_eq!(a.manager.popups().len(), 1);
    }

    #[tokio::test]
    async fn image_sizes_arrive_from_blocking_workers() {
        let dir = std::env::temp_dir().join(format!(
            "draggable-popup-images-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbImage::new(40, 30).save(dir.join("real.png")).unwrap();

        let options = PopupOptions {
            content: Some(r#"<img src="missing.png"><img src="real.png">"#.into()),
            ..Default::default()
        };
        let manager = PopupManager::new(
            Viewport::new(800.0, 480.0),
            CookieJar::in_memory(),
            Box::new(BoxMetrics::default()),
        );
        let mut a = App::new(manager, vec![options], CellSize::default(), dir.clone());
        a.open_configured();
        let handle = a.manager.popups()[0].handle();
        assert!(!a.manager.get(handle).unwrap().style().visible);

        for _ in 0..500 {
            a.poll_image_results();
            if a.manager.get(handle).unwrap().style().visible {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let popup = a.manager.get(handle).unwrap();
        assert!(popup.style().visible);
        assert_eq!(popup.images()[0], ImageState::Failed);
        assert!(matches!(
            popup.images()[1],
            ImageState::Loaded { natural, .. } if natural == Size::new(40.0, 30.0)
        ));
        assert!(popup.pending_images().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cycle_focus_raises_back_most() {
        let mut a = app(vec![PopupOptions::default(), PopupOptions::default()]);
        a.open_configured();
        let back = a.manager.back_most().unwrap();
        a.cycle_focus();
        assert_eq!(a.manager.front_most(), Some(back));
    }
}

mod assets;
mod config;
mod cookies;
mod logging;
mod models;
mod popup;
mod tui;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use url::Url;

use config::Config;
use cookies::CookieJar;
use popup::layout::Viewport;
use popup::PopupManager;
use tui::App;

/// Viewport used for `--markup`, where there is no terminal to measure.
const MARKUP_VIEWPORT: Viewport = Viewport {
    width: 1024.0,
    height: 768.0,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--init") {
        let path = Config::generate_default()?;
        println!("Generated config file at: {}", path.display());
        println!("Add [[popups]] entries, then run draggable-popup.");
        return Ok(());
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("draggable-popup: draggable popup windows in the terminal");
        println!();
        println!("USAGE:");
        println!("  draggable-popup            Show the configured popups");
        println!("  draggable-popup --init     Generate a default config file");
        println!("  draggable-popup --markup   Print the popups as an HTML page");
        println!();
        println!("CONFIG:");
        println!("  File: ~/.config/draggable-popup/config.toml");
        println!("  Or set DRAGGABLE_POPUP_CONFIG to a file path");
        println!();
        println!("CONTROLS:");
        println!("  Mouse drag on title   Move a popup");
        println!("  Click × / Esc         Close the front popup");
        println!("  Space                 Toggle \"don't show today\"");
        println!("  Tab                   Bring the back popup to front");
        println!("  r                     Re-open configured popups");
        println!("  q / Ctrl+C            Quit");
        return Ok(());
    }

    let log_path = logging::init_logging();
    let config = Config::load().with_context(|| {
        "Failed to load configuration.\n\
         Run `draggable-popup --init` to generate a config file."
    })?;
    let mut links = config.stylesheet_urls()?;
    links.push(config.icon_font_url()?);

    if args.iter().any(|a| a == "--markup") {
        print!("{}", render_markup(&config, &links));
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config, &links).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        if let Some(path) = log_path {
            eprintln!("Log: {}", path.display());
        }
    }

    Ok(())
}

/// Link the configured stylesheets, then the icon font unless one of them
/// already provides it. The icon font is always last in `links`.
fn link_stylesheets(manager: &mut PopupManager, links: &[Url]) {
    let Some((icon_font, rest)) = links.split_last() else {
        return;
    };
    for url in rest {
        manager.add_stylesheet(url.clone());
    }
    manager.ensure_icon_font(icon_font);
}

fn render_markup(config: &Config, links: &[Url]) -> String {
    let mut manager = PopupManager::new(
        MARKUP_VIEWPORT,
        CookieJar::load(),
        Box::new(config.metrics),
    );
    link_stylesheets(&mut manager, links);

    let root = Config::asset_root();
    let now = Local::now();
    for options in config.popups.iter().cloned() {
        let Some(handle) = manager.create_popup(options, now) else {
            continue;
        };
        let pending: Vec<(usize, String)> = manager
            .get(handle)
            .map(|p| {
                p.pending_images()
                    .into_iter()
                    .map(|(i, src)| (i, src.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        for (index, src) in pending {
            match assets::probe_image(&src, &root) {
                Ok(natural) => manager.image_loaded(handle, index, natural),
                Err(e) => {
                    tracing::warn!(error = %e, "image load failed");
                    manager.image_failed(handle, index);
                }
            }
        }
    }

    popup::markup::page_html(manager.stylesheets(), manager.popups())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
    links: &[Url],
) -> Result<()> {
    let size = terminal.size()?;
    let Config {
        cell,
        metrics,
        popups,
        ..
    } = config;

    let mut manager = PopupManager::new(Viewport::new(0.0, 0.0), CookieJar::load(), Box::new(metrics));
    link_stylesheets(&mut manager, links);
    if let Some(path) = manager.cookie_path() {
        tracing::info!(path = %path.display(), "cookie jar");
    }

    let mut app = App::new(manager, popups, cell, Config::asset_root());
    let viewport = app.viewport_for(size.width, size.height);
    app.manager.resize(viewport);
    app.open_configured();

    loop {
        app.frame_count = app.frame_count.wrapping_add(1);
        terminal.draw(|f| tui::ui::render(f, &mut app))?;

        if let Some(event) = tui::event::poll_event(Duration::from_millis(50))? {
            tui::event::handle_event(&mut app, event);
        }

        if !app.running {
            break;
        }

        // Apply finished image probes without blocking.
        app.poll_image_results();
    }

    Ok(())
}

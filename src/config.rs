use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::models::{Height, PopupOptions, Position};
use crate::popup::measure::BoxMetrics;
use crate::popup::DEFAULT_ICON_FONT_URL;

const CONFIG_ENV: &str = "DRAGGABLE_POPUP_CONFIG";

/// Pixel size of one terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CellSize {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 16.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_icon_font_url")]
    pub icon_font_url: String,
    /// Stylesheets linked before the icon font check. A link whose URL
    /// names the icon font already satisfies it.
    #[serde(default)]
    pub stylesheets: Vec<String>,
    #[serde(default)]
    pub cell: CellSize,
    #[serde(default)]
    pub metrics: BoxMetrics,
    #[serde(default)]
    pub popups: Vec<PopupOptions>,
}

fn default_icon_font_url() -> String {
    DEFAULT_ICON_FONT_URL.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            icon_font_url: default_icon_font_url(),
            stylesheets: Vec::new(),
            cell: CellSize::default(),
            metrics: BoxMetrics::default(),
            popups: sample_popups(),
        }
    }
}

fn sample_popups() -> Vec<PopupOptions> {
    vec![
        PopupOptions {
            title: Some("Welcome".into()),
            content: Some(
                "<p>Drag this window by its title bar.</p>\
                 <p>Tick the box below and close it to hide it until tomorrow.</p>"
                    .into(),
            ),
            width: Some(360),
            height: Some(Height::Auto),
            show_today_option: Some(true),
            popup_id: Some("welcome".into()),
            ..Default::default()
        },
        PopupOptions {
            title: Some("Notice".into()),
            content: Some("Pinned at (48, 48). Resize the terminal to see it re-laid out.".into()),
            top: Some(Position::Px(48)),
            left: Some(Position::Px(48)),
            auto_size: Some(true),
            ..Default::default()
        },
    ]
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config at {}", path.display()))?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                tracing::info!(path = %path.display(), popups = config.popups.len(), "config loaded");
                return Ok(config);
            }
        }

        tracing::info!("no config file, using built-in sample popups");
        Ok(Self::default())
    }

    pub fn generate_default() -> Result<PathBuf> {
        let path = Self::config_path().with_context(|| "Could not determine config directory")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(&Config::default())?;
        std::fs::write(&path, toml_str)?;
        Ok(path)
    }

    /// The icon font stylesheet to link, validated.
    pub fn icon_font_url(&self) -> Result<Url> {
        Url::parse(&self.icon_font_url)
            .with_context(|| format!("Invalid icon_font_url: {}", self.icon_font_url))
    }

    pub fn stylesheet_urls(&self) -> Result<Vec<Url>> {
        self.stylesheets
            .iter()
            .map(|s| Url::parse(s).with_context(|| format!("Invalid stylesheet URL: {s}")))
            .collect()
    }

    /// Directory that relative image paths in popup content resolve against.
    pub fn asset_root() -> PathBuf {
        Self::config_path()
            .filter(|p| p.exists())
            .and_then(|p| p.parent().map(|d| d.to_path_buf()))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default()
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("draggable-popup").join("config.toml"))
    }
}

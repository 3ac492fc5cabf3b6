use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Defaults ───────────────────────────────────────────────────────────────

pub const DEFAULT_TITLE: &str = "팝업 제목";
pub const DEFAULT_CONTENT: &str = "팝업 내용";
pub const DEFAULT_WIDTH: i32 = 300;

// ─── Lengths ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LengthError {
    #[error("expected a pixel value or \"{sentinel}\", got \"{value}\"")]
    Invalid { value: String, sentinel: &'static str },
    #[error("pixel value {0} is out of range")]
    OutOfRange(i64),
}

/// Accepts what a loosely-typed options object would: a bare number, a
/// sentinel keyword, or a string that starts with an integer ("120px").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLength {
    Number(i64),
    Float(f64),
    Text(String),
}

/// Leading-integer parse: optional sign, then digits, rest ignored.
fn parse_leading_int(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn to_px(raw: RawLength, sentinel: &'static str) -> Result<Option<i32>, LengthError> {
    let n = match raw {
        RawLength::Number(n) => n,
        RawLength::Float(f) => f.trunc() as i64,
        RawLength::Text(s) if s.trim() == sentinel => return Ok(None),
        RawLength::Text(s) => parse_leading_int(&s).ok_or_else(|| LengthError::Invalid {
            value: s.clone(),
            sentinel,
        })?,
    };
    i32::try_from(n).map(Some).map_err(|_| LengthError::OutOfRange(n))
}

/// Popup height: intrinsic (`"auto"`) or a fixed pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "RawLength", into = "RawLength")]
pub enum Height {
    #[default]
    Auto,
    Px(i32),
}

impl TryFrom<RawLength> for Height {
    type Error = LengthError;

    fn try_from(raw: RawLength) -> Result<Self, Self::Error> {
        Ok(to_px(raw, "auto")?.map_or(Height::Auto, Height::Px))
    }
}

impl From<Height> for RawLength {
    fn from(h: Height) -> Self {
        match h {
            Height::Auto => RawLength::Text("auto".into()),
            Height::Px(px) => RawLength::Number(px.into()),
        }
    }
}

/// Popup top/left: centered in the viewport or an explicit pixel offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "RawLength", into = "RawLength")]
pub enum Position {
    #[default]
    Center,
    Px(i32),
}

impl TryFrom<RawLength> for Position {
    type Error = LengthError;

    fn try_from(raw: RawLength) -> Result<Self, Self::Error> {
        Ok(to_px(raw, "center")?.map_or(Position::Center, Position::Px))
    }
}

impl From<Position> for RawLength {
    fn from(p: Position) -> Self {
        match p {
            Position::Center => RawLength::Text("center".into()),
            Position::Px(px) => RawLength::Number(px.into()),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Center => f.write_str("center"),
            Position::Px(px) => write!(f, "{px}"),
        }
    }
}

// ─── Options (as supplied by the caller) ────────────────────────────────────

/// Caller-supplied popup options. Every field is optional; missing fields
/// fall back to the defaults in [`PopupConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Height>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_size: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_today_option: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

// ─── Merged configuration ───────────────────────────────────────────────────

/// Settings of a single popup after defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupConfig {
    pub title: String,
    /// Markup; may contain `<img>` tags.
    pub content: String,
    pub width: i32,
    pub height: Height,
    pub top: Position,
    pub left: Position,
    pub auto_size: bool,
    pub show_today_option: bool,
    pub popup_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            content: DEFAULT_CONTENT.into(),
            width: DEFAULT_WIDTH,
            height: Height::Auto,
            top: Position::Center,
            left: Position::Center,
            auto_size: false,
            show_today_option: false,
            popup_id: None,
            start_date: None,
            end_date: None,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

impl PopupConfig {
    pub fn merge(options: PopupOptions) -> Self {
        let d = Self::default();
        Self {
            title: options.title.unwrap_or(d.title),
            content: options.content.unwrap_or(d.content),
            width: options.width.unwrap_or(d.width),
            height: options.height.unwrap_or(d.height),
            top: options.top.unwrap_or(d.top),
            left: options.left.unwrap_or(d.left),
            auto_size: options.auto_size.unwrap_or(d.auto_size),
            show_today_option: options.show_today_option.unwrap_or(d.show_today_option),
            popup_id: non_empty(options.popup_id),
            start_date: non_empty(options.start_date),
            end_date: non_empty(options.end_date),
        }
    }

    /// Whether closing this popup can persist a suppression record.
    pub fn can_suppress(&self) -> bool {
        self.show_today_option && self.popup_id.is_some()
    }
}

impl From<PopupOptions> for PopupConfig {
    fn from(options: PopupOptions) -> Self {
        Self::merge(options)
    }
}

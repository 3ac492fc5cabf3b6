use chrono::{DateTime, Days, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Value stored under `popup_<id>` when a popup is hidden for the day.
pub const SUPPRESSED_VALUE: &str = "hidden";
/// Lifetime of a suppression record.
pub const SUPPRESSION_DAYS: u64 = 1;

pub fn suppression_key(popup_id: &str) -> String {
    format!("popup_{popup_id}")
}

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("cookie store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cookie store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("expiry overflows the calendar")]
    ExpiryOutOfRange,
}

// ─── Cookie ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
}

impl Cookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// The `document.cookie` assignment a browser page would make.
    pub fn to_set_cookie(&self) -> String {
        format!(
            "{}={};expires={};path={}",
            self.name,
            self.value,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.path
        )
    }
}

// ─── On-disk payload ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CookieFile {
    saved_at: DateTime<Utc>,
    cookies: Vec<Cookie>,
}

fn default_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("draggable-popup").join("cookies.json"))
}

// ─── Jar ────────────────────────────────────────────────────────────────────

/// Name-keyed cookie store, optionally backed by a JSON file that is
/// rewritten on every `set`.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
    path: Option<PathBuf>,
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the jar from the platform data directory. Falls back to an
    /// in-memory jar when no data directory exists.
    pub fn load() -> Self {
        match default_path() {
            Some(path) => Self::load_from(path),
            None => {
                tracing::warn!("no data directory; suppression records will not persist");
                Self::in_memory()
            }
        }
    }

    /// A missing or unreadable file yields an empty jar bound to `path`.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cookies = read_file(&path)
            .map(|file| {
                file.cookies
                    .into_iter()
                    .map(|c| (c.name.clone(), c))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            cookies,
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Value of a live cookie; expired entries are invisible.
    pub fn get(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|c| !c.is_expired(now))
            .map(|c| c.value.as_str())
    }

    /// Store `name=value` expiring `expire_days` from `now` (same wall-clock
    /// time), path `/`. The in-memory entry is updated even if the file write
    /// fails.
    pub fn set(
        &mut self,
        name: &str,
        value: &str,
        expire_days: u64,
        now: DateTime<Local>,
    ) -> Result<Cookie, CookieError> {
        let expires = now
            .checked_add_days(Days::new(expire_days))
            .ok_or(CookieError::ExpiryOutOfRange)?
            .with_timezone(&Utc);
        let cookie = Cookie {
            name: name.to_string(),
            value: value.to_string(),
            expires,
            path: "/".into(),
        };
        self.cookies.insert(name.to_string(), cookie.clone());
        self.save(now.with_timezone(&Utc))?;
        Ok(cookie)
    }

    fn save(&mut self, now: DateTime<Utc>) -> Result<(), CookieError> {
        self.cookies.retain(|_, c| !c.is_expired(now));
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CookieFile {
            saved_at: now,
            cookies: self.cookies.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Option<CookieFile> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt cookie file");
            None
        }
    }
}

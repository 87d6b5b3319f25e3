//! The session credential slot.
//!
//! A single `auth_token` cookie holds the bearer credential. The API client,
//! the auth calls and the route guard all read it through the
//! [`CredentialStore`] they were handed, so tests can run against a
//! [`MemoryCookieStore`] while the binary persists to disk with
//! [`FileCookieStore`].

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SESSION_COOKIE_NAME: &str = "auth_token";
/// Seven days.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    pub path: String,
    pub max_age_secs: i64,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_age_secs: SESSION_MAX_AGE_SECS,
            same_site: SameSite::Lax,
            secure: false,
        }
    }
}

impl CookieAttributes {
    /// Session attributes with `Secure` set only for an encrypted transport.
    pub fn for_base_url(base_url: &Url) -> Self {
        Self {
            secure: base_url.scheme() == "https",
            ..Self::default()
        }
    }

    pub fn expired(mut self) -> Self {
        self.max_age_secs = 0;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub attributes: CookieAttributes,
    pub expires_at: DateTime<Utc>,
}

impl SessionCookie {
    pub fn new(value: impl Into<String>, attributes: CookieAttributes, now: DateTime<Utc>) -> Self {
        let expires_at = now + Duration::seconds(attributes.max_age_secs.max(0));
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            value: value.into(),
            attributes,
            expires_at,
        }
    }

    /// Renders the cookie in `Set-Cookie` form.
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, self.value),
            format!("Path={}", self.attributes.path),
            format!("Max-Age={}", self.attributes.max_age_secs),
            format!("SameSite={}", self.attributes.same_site),
        ];
        if self.attributes.secure {
            parts.push("Secure".to_string());
        }
        parts.join("; ")
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.attributes.max_age_secs > 0 && now < self.expires_at
    }

    /// The credential, if the cookie still carries a usable one.
    pub fn credential(&self, now: DateTime<Utc>) -> Option<String> {
        (self.is_live(now) && is_well_formed(&self.value)).then(|| self.value.clone())
    }
}

pub fn is_well_formed(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == ';' || c == ',')
}

/// The injected session context.
///
/// `get` never fails: unreadable storage means "signed out".
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, value: &str, attributes: CookieAttributes) -> io::Result<()>;
    fn remove(&self) -> io::Result<()>;

    /// Removes the credential only while it still equals `expected`.
    /// Returns whether anything was removed.
    fn remove_if_matches(&self, expected: &str) -> io::Result<bool> {
        if self.get().as_deref() != Some(expected) {
            return Ok(false);
        }
        self.remove()?;
        Ok(true)
    }

    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookie: Mutex<Option<SessionCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slot) = store.cookie.lock() {
            *slot = Some(SessionCookie::new(value, CookieAttributes::default(), Utc::now()));
        }
        store
    }

    pub fn cookie(&self) -> Option<SessionCookie> {
        self.cookie.lock().ok().and_then(|slot| slot.clone())
    }

    fn lock_slot(&self) -> io::Result<MutexGuard<'_, Option<SessionCookie>>> {
        self.cookie
            .lock()
            .map_err(|_| io::Error::other("session slot poisoned"))
    }
}

impl CredentialStore for MemoryCookieStore {
    fn get(&self) -> Option<String> {
        match self.cookie.lock() {
            Ok(slot) => slot.as_ref().and_then(|c| c.credential(Utc::now())),
            Err(_) => {
                warn!("Session slot poisoned, treating as signed out");
                None
            }
        }
    }

    fn set(&self, value: &str, attributes: CookieAttributes) -> io::Result<()> {
        let mut slot = self.lock_slot()?;
        *slot = Some(SessionCookie::new(value, attributes, Utc::now()));
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        let mut slot = self.lock_slot()?;
        expire(&mut slot);
        Ok(())
    }

    fn remove_if_matches(&self, expected: &str) -> io::Result<bool> {
        let mut slot = self.lock_slot()?;
        let current = slot.as_ref().and_then(|c| c.credential(Utc::now()));
        if current.as_deref() != Some(expected) {
            return Ok(false);
        }
        expire(&mut slot);
        Ok(true)
    }
}

fn expire(slot: &mut Option<SessionCookie>) {
    let attributes = slot
        .as_ref()
        .map(|c| c.attributes.clone())
        .unwrap_or_default()
        .expired();
    *slot = Some(SessionCookie::new("", attributes, Utc::now()));
}

/// Persists the session cookie as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    pub const FILE_NAME: &'static str = "session.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_cookie(&self) -> io::Result<Option<SessionCookie>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        let cookie = serde_json::from_str(&data).map_err(io::Error::other)?;
        Ok(Some(cookie))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Writes a sibling temp file readable only by the owner, then renames
    /// it over the slot so a reader never sees a half-written cookie.
    fn write_cookie(&self, cookie: &SessionCookie) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(cookie).map_err(io::Error::other)?;

        let temp = self.temp_path();
        // Leftovers keep their old mode, which `mode` would not reset.
        let _ = fs::remove_file(&temp);
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let written = options.open(&temp).and_then(|mut file| {
            file.write_all(data.as_bytes())?;
            file.sync_all()
        });
        if let Err(err) = written.and_then(|()| fs::rename(&temp, &self.path)) {
            let _ = fs::remove_file(&temp);
            return Err(err);
        }
        Ok(())
    }
}

impl CredentialStore for FileCookieStore {
    fn get(&self) -> Option<String> {
        match self.read_cookie() {
            Ok(cookie) => cookie.and_then(|c| c.credential(Utc::now())),
            Err(err) => {
                warn!("Failed to read session cookie {:?}: {err}", self.path);
                None
            }
        }
    }

    fn set(&self, value: &str, attributes: CookieAttributes) -> io::Result<()> {
        let cookie = SessionCookie::new(value, attributes, Utc::now());
        debug!("Storing session cookie: {}=<redacted>", cookie.name);
        self.write_cookie(&cookie)
    }

    fn remove(&self) -> io::Result<()> {
        let attributes = self
            .read_cookie()
            .ok()
            .flatten()
            .map(|c| c.attributes)
            .unwrap_or_default()
            .expired();
        self.write_cookie(&SessionCookie::new("", attributes, Utc::now()))
    }
}

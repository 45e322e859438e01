//! Session credentials.
//!
//! The library never touches the filesystem for credentials. Callers pass a
//! [`SessionStore`] into the extraction entry point; the CLI ships a
//! file-backed one, [`MemorySessionStore`] covers tests and embedding.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::source::SourceKind;
use crate::{Result, XtractorError};

const SESSION_HINT: &str = "Log in to x.com in a browser and import its cookies into the session store.";
const LOGIN_PATHS: &[&str] = &["/login", "/i/flow/login", "/i/flow/signup"];

/// One browser cookie, in the shape browser automation tools export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; `-1` marks a session cookie.
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_expires() -> f64 {
    -1.0
}

impl SessionCookie {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        let now = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default();
        self.expires > 0.0 && self.expires < now
    }

    /// URL a cookie jar should associate this cookie with.
    pub fn origin_url(&self) -> Option<Url> {
        let host = self.domain.trim_start_matches('.');
        if host.is_empty() {
            return None;
        }
        Url::parse(&format!("https://{}{}", host, self.path)).ok()
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    ///
    /// Domains without a leading dot are host-only and carry no `Domain` attribute.
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);
        if self.domain.starts_with('.') {
            header.push_str("; Domain=");
            header.push_str(&self.domain);
        }
        header.push_str("; Path=");
        header.push_str(&self.path);
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if let Some(same_site) = &self.same_site {
            header.push_str("; SameSite=");
            header.push_str(same_site);
        }
        header
    }
}

/// Opaque credential blob: the cookie list of a logged-in browser session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(Vec<SessionCookie>);

impl SessionCookies {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self(cookies)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Cookies that have not expired yet.
    pub fn live(&self) -> impl Iterator<Item = &SessionCookie> {
        let now = SystemTime::now();
        self.0.iter().filter(move |cookie| !cookie.is_expired(now))
    }
}

/// Storage for the credential blob, owned by the caller.
pub trait SessionStore: Send + Sync {
    /// Returns the stored blob, or `None` if nothing has been saved.
    fn load(&self) -> Result<Option<SessionCookies>>;

    fn save(&self, cookies: &SessionCookies) -> Result<()>;

    /// When the blob was last saved, if the store tracks it.
    fn saved_at(&self) -> Result<Option<SystemTime>> {
        Ok(None)
    }
}

/// In-memory [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<(SessionCookies, SystemTime)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookies(cookies: SessionCookies) -> Self {
        Self { inner: Mutex::new(Some((cookies, SystemTime::now()))) }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionCookies>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| XtractorError::SessionStoreError(e.to_string()))?;
        Ok(guard.as_ref().map(|(cookies, _)| cookies.clone()))
    }

    fn save(&self, cookies: &SessionCookies) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| XtractorError::SessionStoreError(e.to_string()))?;
        *guard = Some((cookies.clone(), SystemTime::now()));
        Ok(())
    }

    fn saved_at(&self) -> Result<Option<SystemTime>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| XtractorError::SessionStoreError(e.to_string()))?;
        Ok(guard.as_ref().map(|(_, at)| *at))
    }
}

/// Loads the session for a run.
///
/// Sources that need authentication fail with
/// [`XtractorError::SessionRequired`] when nothing usable is stored; other
/// sources get whatever the store holds.
pub fn require_session(kind: SourceKind, store: &dyn SessionStore) -> Result<Option<SessionCookies>> {
    let cookies = store.load()?.filter(|cookies| !cookies.is_empty());

    if kind.requires_session() && cookies.is_none() {
        return Err(XtractorError::SessionRequired { hint: SESSION_HINT.to_string() });
    }

    Ok(cookies)
}

/// The error raised when an authenticated navigation lands on a login page.
pub fn session_expired() -> XtractorError {
    XtractorError::SessionExpired { hint: SESSION_HINT.to_string() }
}

/// Whether `url` is a login or signup surface.
pub fn is_login_surface(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path();

    LOGIN_PATHS
        .iter()
        .any(|login| path == *login || path.starts_with(&format!("{login}/")))
}

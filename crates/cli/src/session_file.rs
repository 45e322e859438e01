//! Cookie blob persisted as a JSON file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use xtractor_core::{SessionCookies, SessionStore, XtractorError};

const COOKIE_FILE: &str = ".x-tractor-cookies.json";

/// [`SessionStore`] backed by a single JSON file. The file's modification
/// time doubles as the save timestamp.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.x-tractor-cookies.json`, or the working directory when there is no home.
    pub fn default_location() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(COOKIE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> XtractorError {
    XtractorError::SessionStoreError(format!("{}: {}", path.display(), err))
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> xtractor_core::Result<Option<SessionCookies>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(store_error(&self.path, err)),
        };

        let cookies = SessionCookies::from_json(&json).map_err(|err| store_error(&self.path, err))?;
        Ok(if cookies.is_empty() { None } else { Some(cookies) })
    }

    fn save(&self, cookies: &SessionCookies) -> xtractor_core::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| store_error(parent, err))?;
        }
        fs::write(&self.path, cookies.to_json()?).map_err(|err| store_error(&self.path, err))
    }

    fn saved_at(&self) -> xtractor_core::Result<Option<SystemTime>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.modified().ok()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(store_error(&self.path, err)),
        }
    }
}

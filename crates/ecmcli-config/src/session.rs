//! Saved login sessions, keyed by API site then username.
//!
//! ```json
//! { "https://www.cradlepointecm.com/": {
//!     "last_username": "ops@example.com",
//!     "sessions": { "ops@example.com": { "jwt": "..." } } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ConfigError, data_dir};

/// Default location of the session store.
pub fn sessions_path() -> PathBuf {
    data_dir().join("sessions.json")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredSession {
    pub jwt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteSessions {
    #[serde(default)]
    pub last_username: Option<String>,
    #[serde(default)]
    pub sessions: BTreeMap<String, StoredSession>,
}

/// File-backed store of JWTs.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    sites: BTreeMap<String, SiteSessions>,
}

impl SessionStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable one is logged and replaced on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sites = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), "ignoring corrupt session store: {e}");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), "cannot read session store: {e}");
                BTreeMap::new()
            }
        };
        Self { path, sites }
    }

    pub fn open_default() -> Self {
        Self::open(sessions_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Username of the most recent login on `site`.
    pub fn last_username(&self, site: &str) -> Option<&str> {
        self.sites.get(site)?.last_username.as_deref()
    }

    /// Saved token for `username` on `site`.
    pub fn token(&self, site: &str, username: &str) -> Option<&str> {
        self.sites
            .get(site)?
            .sessions
            .get(username)
            .map(|s| s.jwt.as_str())
    }

    /// Record a login (or, with `None`, a dropped session) for a user.
    pub fn record(&mut self, site: &str, username: &str, token: Option<&str>) {
        let entry = self.sites.entry(site.to_owned()).or_default();
        match token {
            Some(jwt) => {
                entry.last_username = Some(username.to_owned());
                entry.sessions.insert(
                    username.to_owned(),
                    StoredSession {
                        jwt: jwt.to_owned(),
                    },
                );
            }
            None => {
                entry.sessions.remove(username);
            }
        }
    }

    /// Forget everything saved for `username` on `site`.
    pub fn forget(&mut self, site: &str, username: &str) {
        if let Some(entry) = self.sites.get_mut(site) {
            entry.sessions.remove(username);
            if entry.last_username.as_deref() == Some(username) {
                entry.last_username = None;
            }
        }
    }

    /// Persist to disk, owner-readable only.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&self.sites)?;
        std::fs::write(&self.path, body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        debug!(path = %self.path.display(), "saved sessions");
        Ok(())
    }
}

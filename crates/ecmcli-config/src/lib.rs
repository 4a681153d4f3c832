//! Configuration for the `ecm` CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! the per-site session token store. The binary layers its `GlobalOpts`
//! flag overrides on top of what is resolved here.

mod session;

pub use session::{SessionStore, SiteSessions, StoredSession, sessions_path};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Keyring service all secrets are stored under.
pub const KEYRING_SERVICE: &str = "ecmcli";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password available for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("session store is corrupt: {0}")]
    Sessions(#[from] serde_json::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named ECM profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Remote fan-out concurrency.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_concurrency() -> usize {
    20
}

/// A named ECM profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API site, e.g. "https://www.cradlepointecm.com".
    pub site: Option<String>,

    /// Accounts (login) service URL.
    pub accounts_url: Option<String>,

    /// Login email.
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring).
    pub password: Option<String>,

    /// Default parent account scope, by id or name.
    pub account: Option<String>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
}

impl Profile {
    /// Parsed `site`, if set.
    pub fn site_url(&self) -> Result<Option<Url>, ConfigError> {
        parse_url("site", self.site.as_deref())
    }

    /// Parsed `accounts_url`, if set.
    pub fn accounts_url(&self) -> Result<Option<Url>, ConfigError> {
        parse_url("accounts_url", self.accounts_url.as_deref())
    }
}

fn parse_url(field: &str, value: Option<&str>) -> Result<Option<Url>, ConfigError> {
    value
        .map(|raw| {
            Url::parse(raw).map_err(|_| ConfigError::Validation {
                field: field.into(),
                reason: format!("invalid URL: {raw}"),
            })
        })
        .transpose()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "cradlepoint", "ecmcli")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ecmcli");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for state the CLI writes on its own (sessions, history).
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(dirs_fallback, |dirs| dirs.data_dir().to_path_buf())
}

/// Interactive session line history.
pub fn history_path() -> PathBuf {
    data_dir().join("history")
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load config from the canonical path and `ECM_` environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from a specific file plus environment.
///
/// Nested keys use a double underscore, e.g. `ECM_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ECM_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Write config to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

fn password_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Resolve a password without prompting: `ECM_PASSWORD`, then the
/// keyring, then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Ok(pw) = std::env::var("ECM_PASSWORD") {
        return Some(SecretString::from(pw));
    }

    if let Ok(entry) = password_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Some(SecretString::from(pw));
        }
    }

    profile
        .password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

/// Like [`resolve_password`] but a miss is an error.
pub fn require_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password(profile, profile_name).ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    password_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

/// Remove a profile's password from the keyring. Missing entries are fine.
pub fn delete_password(profile_name: &str) -> Result<(), ConfigError> {
    match password_entry(profile_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config_from(&dir.path().join("missing.toml")).expect("config");
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.concurrency, 20);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profiles_load_from_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "work"

[defaults]
output = "json"

[profiles.work]
site = "https://ecm.example.com"
username = "ops@example.com"
account = "Branches"
"#,
        )
        .expect("write");

        let cfg = load_config_from(&path).expect("config");
        assert_eq!(cfg.default_profile.as_deref(), Some("work"));
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.timeout, 30);
        let work = &cfg.profiles["work"];
        assert_eq!(work.username.as_deref(), Some("ops@example.com"));
        assert_eq!(
            work.site_url().expect("url").map(String::from).as_deref(),
            Some("https://ecm.example.com/")
        );
        assert!(work.accounts_url().expect("url").is_none());
    }

    #[test]
    fn invalid_site_is_rejected() {
        let profile = Profile {
            site: Some("not a url".into()),
            ..Profile::default()
        };
        assert!(matches!(
            profile.site_url(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                username: Some("lab@example.com".into()),
                timeout: Some(5),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).expect("save");

        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.profiles["lab"].timeout, Some(5));
        assert_eq!(
            loaded.profiles["lab"].username.as_deref(),
            Some("lab@example.com")
        );
    }
}

//! Translation of profiles + global flags into connection settings.
//!
//! Precedence for every setting is flag (or its `ECM_` env var), then the
//! active profile, then the built-in default.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use ecmcli_api::{DEFAULT_ACCOUNTS_URL, DEFAULT_SITE, TlsMode, TransportConfig};
use ecmcli_config::{Config, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything needed to open an ECM session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile_name: String,
    pub profile: Profile,
    pub site: Url,
    pub accounts_url: Url,
    pub transport: TransportConfig,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Parent account scope, by id or name.
    pub account: Option<String>,
    pub concurrency: usize,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve connection settings. A missing profile is only an error when
/// it was asked for by name.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Settings, CliError> {
    let profile_name = active_profile_name(global, config);
    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(config),
            });
        }
        None => Profile::default(),
    };

    let site = match global.api_site.as_deref() {
        Some(raw) => parse_url("api-site", raw)?,
        None => match profile.site_url()? {
            Some(url) => url,
            None => parse_url("site", DEFAULT_SITE)?,
        },
    };
    let accounts_url = match profile.accounts_url()? {
        Some(url) => url,
        None => parse_url("accounts_url", DEFAULT_ACCOUNTS_URL)?,
    };

    let insecure = global.insecure || profile.insecure.unwrap_or(config.defaults.insecure);
    let timeout = if global.timeout == DEFAULT_TIMEOUT_SECS {
        profile.timeout.unwrap_or(config.defaults.timeout)
    } else {
        global.timeout
    };
    let transport = TransportConfig {
        tls: if insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::System
        },
        timeout: Duration::from_secs(timeout),
        ..TransportConfig::default()
    };

    let username = global
        .api_username
        .clone()
        .or_else(|| profile.username.clone());
    let password = global
        .api_password
        .clone()
        .map(SecretString::from)
        .or_else(|| ecmcli_config::resolve_password(&profile, &profile_name));
    let account = global.account.clone().or_else(|| profile.account.clone());

    Ok(Settings {
        concurrency: config.defaults.concurrency.max(1),
        profile_name,
        profile,
        site,
        accounts_url,
        transport,
        username,
        password,
        account,
    })
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["ecm"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse").global
    }

    fn config_with_work() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "work".into(),
            Profile {
                site: Some("https://ecm.example.com".into()),
                username: Some("ops@example.com".into()),
                account: Some("Branches".into()),
                timeout: Some(5),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn defaults_without_profile() {
        let settings = resolve(&global(&[]), &Config::default()).expect("settings");
        assert_eq!(settings.site.as_str(), "https://www.cradlepointecm.com/");
        assert_eq!(settings.profile_name, "default");
        assert_eq!(settings.transport.timeout, Duration::from_secs(30));
        assert!(settings.account.is_none());
    }

    #[test]
    fn profile_values_apply() {
        let settings =
            resolve(&global(&["--profile", "work"]), &config_with_work()).expect("settings");
        assert_eq!(settings.site.as_str(), "https://ecm.example.com/");
        assert_eq!(settings.username.as_deref(), Some("ops@example.com"));
        assert_eq!(settings.account.as_deref(), Some("Branches"));
        assert_eq!(settings.transport.timeout, Duration::from_secs(5));
    }

    #[test]
    fn flags_override_profile() {
        let settings = resolve(
            &global(&[
                "--profile",
                "work",
                "--api-site",
                "https://other.example.com",
                "--api-username",
                "me@example.com",
                "--api-password",
                "hunter2",
                "--timeout",
                "9",
                "-k",
            ]),
            &config_with_work(),
        )
        .expect("settings");
        assert_eq!(settings.site.as_str(), "https://other.example.com/");
        assert_eq!(settings.username.as_deref(), Some("me@example.com"));
        assert_eq!(
            settings.password.as_ref().map(|p| p.expose_secret().to_owned()),
            Some("hunter2".to_owned())
        );
        assert_eq!(settings.transport.timeout, Duration::from_secs(9));
        assert!(matches!(settings.transport.tls, TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn unknown_named_profile_is_an_error() {
        let err = resolve(&global(&["--profile", "nope"]), &config_with_work())
            .expect_err("unknown profile");
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
    }
}

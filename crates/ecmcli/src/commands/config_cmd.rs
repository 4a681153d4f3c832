//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use ecmcli_api::DEFAULT_SITE;
use ecmcli_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::session::prompt_err;

const MASK: &str = "********";

/// Config with plaintext passwords masked, for display.
fn masked(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    CliError::ProfileNotFound {
        name,
        available: config::available_profiles(cfg),
    }
}

fn optional(value: String) -> Option<String> {
    let value = value.trim().to_owned();
    (!value.is_empty()).then_some(value)
}

/// Apply `key = value` to a profile.
fn set_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "site" => {
            profile.site = Some(value);
            profile.site_url()?;
        }
        "accounts_url" | "accounts-url" => {
            profile.accounts_url = Some(value);
            profile.accounts_url()?;
        }
        "username" => profile.username = optional(value),
        "account" => profile.account = optional(value),
        "insecure" => {
            profile.insecure = Some(value.parse().map_err(|_| CliError::Validation {
                field: "insecure".into(),
                reason: "must be 'true' or 'false'".into(),
            })?);
        }
        "timeout" => {
            profile.timeout = Some(value.parse().map_err(|_| CliError::Validation {
                field: "timeout".into(),
                reason: "must be a number (seconds)".into(),
            })?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: site, accounts_url, \
                     username, account, insecure, timeout"
                ),
            });
        }
    }
    Ok(())
}

fn init_wizard() -> Result<(), CliError> {
    let config_path = ecmcli_config::config_path();
    eprintln!("ECM CLI configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;
    let site: String = Input::new()
        .with_prompt("ECM API site")
        .default(DEFAULT_SITE.into())
        .interact_text()
        .map_err(prompt_err)?;
    let username: String = Input::new()
        .with_prompt("Username (email)")
        .interact_text()
        .map_err(prompt_err)?;

    let store_choices = &[
        "Store password in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Ask at login",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let password = if store_selection == 2 {
        None
    } else {
        let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
        if pass.is_empty() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "password cannot be empty".into(),
            });
        }
        if store_selection == 0 {
            ecmcli_config::store_password(&profile_name, &SecretString::from(pass))?;
            eprintln!("   ✓ Password stored in system keyring");
            None
        } else {
            Some(pass)
        }
    };

    let account: String = Input::new()
        .with_prompt("Account scope (blank for your own)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let profile = Profile {
        site: Some(site),
        username: optional(username),
        password,
        account: optional(account),
        ..Profile::default()
    };
    profile.site_url()?;

    let mut cfg = ecmcli_config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    ecmcli_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: ecm routers ls");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init_wizard(),

        ConfigCommand::Show => {
            let cfg = masked(ecmcli_config::load_config_or_default());
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| e.to_string()),
                |_| ecmcli_config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = ecmcli_config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_value(profile, &key, value)?;
            ecmcli_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = ecmcli_config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: ecm config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = ecmcli_config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            ecmcli_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = ecmcli_config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(profile_name, &cfg));
            }
            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            ecmcli_config::store_password(&profile_name, &SecretString::from(secret))?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn set_value_validates_keys() {
        let mut profile = Profile::default();
        set_value(&mut profile, "timeout", "12".into()).expect("timeout");
        set_value(&mut profile, "account", "Branches".into()).expect("account");
        set_value(&mut profile, "insecure", "true".into()).expect("insecure");
        assert_eq!(profile.timeout, Some(12));
        assert_eq!(profile.account.as_deref(), Some("Branches"));
        assert_eq!(profile.insecure, Some(true));

        assert!(set_value(&mut profile, "timeout", "soon".into()).is_err());
        assert!(set_value(&mut profile, "site", "not a url".into()).is_err());
        assert!(matches!(
            set_value(&mut profile, "colour", "red".into()),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn blank_account_clears_it() {
        let mut profile = Profile {
            account: Some("Branches".into()),
            ..Profile::default()
        };
        set_value(&mut profile, "account", "  ".into()).expect("account");
        assert!(profile.account.is_none());
    }

    #[test]
    fn passwords_are_masked() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        assert_eq!(masked(cfg).profiles["lab"].password.as_deref(), Some(MASK));
    }
}

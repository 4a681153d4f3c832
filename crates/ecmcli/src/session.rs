//! The authenticated ECM session shared by every command.
//!
//! Opens the client, replays a saved JWT when there is one, falls back to
//! a password login, and persists token changes to the session store.

use std::io::IsTerminal;
use std::sync::{Arc, Mutex, MutexGuard};

use dialoguer::Input;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use ecmcli_api::{ApiEvent, ApiListener, EcmClient, page_size_for_rows};
use ecmcli_config::SessionStore;

use crate::cli::GlobalOpts;
use crate::config::{self, Settings};
use crate::error::CliError;
use crate::output;
use crate::trace::TraceState;

/// Persists session token changes reported by the client.
struct SessionRecorder {
    store: Arc<Mutex<SessionStore>>,
}

impl ApiListener for SessionRecorder {
    fn on_event(&self, event: &ApiEvent) {
        if let ApiEvent::SessionChanged {
            site,
            username,
            token,
        } = event
        {
            let mut store = self.store.lock().expect("session store lock poisoned");
            store.record(site.as_str(), username, token.as_deref());
            if let Err(e) = store.save() {
                warn!(path = %store.path().display(), "cannot save session: {e}");
            }
        }
    }
}

/// Everything a command handler needs.
pub struct Context {
    pub client: Arc<EcmClient>,
    pub settings: Settings,
    pub trace: TraceState,
    pub color: bool,
    sessions: Arc<Mutex<SessionStore>>,
}

impl Context {
    /// Build the client from config and flags. Does not log in.
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = ecmcli_config::load_config_or_default();
        let settings = config::resolve(global, &cfg)?;
        let client = EcmClient::new(
            settings.site.clone(),
            settings.accounts_url.clone(),
            &settings.transport,
        )?;
        if let Ok((_, rows)) = crossterm::terminal::size() {
            client.set_page_size(page_size_for_rows(rows));
        }

        let sessions = Arc::new(Mutex::new(SessionStore::open_default()));
        client.add_listener(Arc::new(SessionRecorder {
            store: Arc::clone(&sessions),
        }));

        let ctx = Self {
            client: Arc::new(client),
            settings,
            trace: TraceState::default(),
            color: output::should_color(global.color),
            sessions,
        };
        if global.trace {
            ctx.trace.enable(&ctx.client, ctx.color)?;
        }
        Ok(ctx)
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.sessions.lock().expect("session store lock poisoned")
    }

    fn site_key(&self) -> String {
        self.client.site().as_str().to_owned()
    }

    /// Username of the last login on this site.
    pub fn last_username(&self) -> Option<String> {
        self.store().last_username(&self.site_key()).map(str::to_owned)
    }

    /// Log in without asking when possible: configured or last username,
    /// saved token, then configured password.
    pub async fn ensure_login(&self) -> Result<(), CliError> {
        if self.client.ident().is_some() {
            return Ok(());
        }
        let username = self
            .settings
            .username
            .clone()
            .or_else(|| self.last_username());
        if let Some(username) = username.as_deref() {
            if self.try_resume(username).await? {
                return self.apply_account_scope().await;
            }
        }
        let username = match username {
            Some(username) => username,
            None => self.prompt_username(None)?,
        };
        let password = match self.settings.password.clone() {
            Some(password) => password,
            None => self.prompt_password()?,
        };
        self.client.login(&username, &password).await?;
        self.apply_account_scope().await
    }

    /// Interactive login: asks for the username (defaulting to the last
    /// one), resumes a saved session for it, else asks for the password.
    pub async fn login(&self, username: Option<String>) -> Result<(), CliError> {
        let username = match username.or_else(|| self.settings.username.clone()) {
            Some(username) => username,
            None => self.prompt_username(self.last_username())?,
        };
        if self.try_resume(&username).await? {
            info!(username, "resumed saved session");
        } else {
            let password = match self.settings.password.clone() {
                Some(password) => password,
                None => self.prompt_password()?,
            };
            self.client.login(&username, &password).await?;
        }
        self.apply_account_scope().await
    }

    /// Drop the current session and its saved token.
    pub fn logout(&self) {
        let username = self.client.username();
        self.client.logout();
        if let Some(username) = username {
            let mut store = self.store();
            store.forget(&self.site_key(), &username);
            if let Err(e) = store.save() {
                warn!("cannot save session: {e}");
            }
        }
    }

    async fn try_resume(&self, username: &str) -> Result<bool, CliError> {
        let site = self.site_key();
        let token = self.store().token(&site, username).map(str::to_owned);
        let Some(token) = token else {
            return Ok(false);
        };
        match self.client.resume(username, &token).await {
            Ok(_) => {
                let mut store = self.store();
                store.record(&site, username, Some(&token));
                if let Err(e) = store.save() {
                    warn!("cannot save session: {e}");
                }
                Ok(true)
            }
            Err(e) if e.is_auth_failure() => {
                debug!(username, "saved session rejected: {e}");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_account_scope(&self) -> Result<(), CliError> {
        if let Some(account) = self.settings.account.as_deref() {
            let account = self.client.get_account(account).await?;
            debug!(id = %account.id, name = %account.name, "account scope");
            self.client.set_parent_account(Some(account.id));
        }
        Ok(())
    }

    fn prompt_username(&self, default: Option<String>) -> Result<String, CliError> {
        if !std::io::stdin().is_terminal() {
            return Err(CliError::NoCredentials {
                profile: self.settings.profile_name.clone(),
            });
        }
        let mut input = Input::<String>::new().with_prompt("Username");
        if let Some(default) = default {
            input = input.default(default);
        }
        input.interact_text().map_err(prompt_err)
    }

    fn prompt_password(&self) -> Result<SecretString, CliError> {
        if !std::io::stdin().is_terminal() {
            return Err(CliError::NoCredentials {
                profile: self.settings.profile_name.clone(),
            });
        }
        let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
        Ok(SecretString::from(password))
    }

    /// `user@host` label of the session.
    pub fn prompt_label(&self) -> String {
        let host = self.client.site().host_str().unwrap_or("ecm").to_owned();
        match self.client.username() {
            Some(user) => format!("{user}@{host}"),
            None => host,
        }
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ECM authentication
//
// Credentials are exchanged at the accounts service for a JWT cookie
// (`cpAccountsJwt`), which the API site then accepts. A saved JWT can be
// replayed to resume a session without the password.

use std::sync::Arc;

use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::client::{EcmClient, JWT_ACCOUNT_COOKIE, decode};
use crate::error::Error;
use crate::events::ApiEvent;
use crate::models::Ident;
use crate::query::Query;

const LOGIN_PATH: &str = "/api/internal/v1/users/login";
const AUTHORIZE_PATH: &str = "/api/internal/v1/users/oidc_authorize";

impl EcmClient {
    /// Log in with username (email) and password.
    ///
    /// `POST {accounts}/api/internal/v1/users/login` yields an OIDC state,
    /// which `GET .../oidc_authorize` trades for the JWT cookie.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Ident, Error> {
        info!(username, "logging in");
        self.reset_auth();

        let jar = Arc::new(Jar::default());
        let mut transport = self.transport().clone().without_redirects();
        transport.cookie_jar = Some(Arc::clone(&jar));
        let http = transport.build_client()?;

        let login_url = self.accounts_endpoint(LOGIN_PATH)?;
        let body = json!({
            "data": {
                "type": "login",
                "attributes": {
                    "email": username,
                    "password": password.expose_secret(),
                }
            }
        });
        debug!("POST {login_url}");
        let resp = http
            .post(login_url)
            .header(reqwest::header::CONTENT_TYPE, "application/vnd.api+json")
            .body(body.to_string())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Authentication {
                message: "Invalid login".into(),
            });
        }
        let reply: Value = resp.json().await?;
        let state = reply
            .pointer("/data/attributes/state")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Authentication {
                message: "login response missing OIDC state".into(),
            })?;

        let mut authorize_url = self.accounts_endpoint(AUTHORIZE_PATH)?;
        authorize_url
            .query_pairs_mut()
            .append_pair("redirect_url", self.accounts_url().as_str().trim_end_matches('/'))
            .append_pair("state", state);
        debug!("GET {authorize_url}");
        let resp = http.get(authorize_url.clone()).send().await?;
        let status = resp.status();
        let token = EcmClient::cookie(&jar, &authorize_url, JWT_ACCOUNT_COOKIE);
        let token = match token {
            Some(token) if status.is_success() || status.is_redirection() => token,
            _ => {
                return Err(Error::Authentication {
                    message: "Invalid login".into(),
                });
            }
        };

        self.start_session(username, &token);
        let ident = self.identify().await?;
        info!(username, "login succeeded");
        Ok(ident)
    }

    /// Resume a session from a saved JWT.
    pub async fn resume(&self, username: &str, jwt: &str) -> Result<Ident, Error> {
        debug!(username, "resuming session");
        {
            let mut session = self.session.write().expect("session lock poisoned");
            session.username = Some(username.to_owned());
            session.jwt = Some(jwt.to_owned());
        }
        self.set_jwt_cookie(Some(jwt));
        self.identify().await
    }

    fn start_session(&self, username: &str, token: &str) {
        {
            let mut session = self.session.write().expect("session lock poisoned");
            session.username = Some(username.to_owned());
            session.jwt = Some(token.to_owned());
        }
        self.set_jwt_cookie(Some(token));
        self.fire(&ApiEvent::SessionChanged {
            site: self.site().clone(),
            username: username.to_owned(),
            token: Some(token.to_owned()),
        });
    }

    /// Fetch and remember who we are (`GET login/`).
    pub async fn identify(&self) -> Result<Ident, Error> {
        let data = self.get_value("login", &Query::new()).await?;
        let empty = match &data {
            Value::Null => true,
            Value::Object(obj) => obj.is_empty(),
            _ => false,
        };
        if empty {
            self.reset_auth();
            return Err(Error::Unauthorized {
                message: "No valid sessions found".into(),
            });
        }
        let mut ident: Ident = decode(data)?;
        if ident.user.username.is_empty() {
            ident.user.username = ident.user.email.clone().unwrap_or_default();
        }
        self.session
            .write()
            .expect("session lock poisoned")
            .ident = Some(ident.clone());
        Ok(ident)
    }

    /// Forget the session: clears the cookie and notifies listeners so the
    /// stored token is dropped too.
    pub fn reset_auth(&self) {
        let username = {
            let mut session = self.session.write().expect("session lock poisoned");
            session.jwt = None;
            session.ident = None;
            session.username.clone()
        };
        self.set_jwt_cookie(None);
        self.clear_cache();
        if let Some(username) = username {
            debug!(username, "session reset");
            self.fire(&ApiEvent::SessionChanged {
                site: self.site().clone(),
                username,
                token: None,
            });
        }
    }

    /// Log out: drop the session and forget the username.
    pub fn logout(&self) {
        self.reset_auth();
        self.session
            .write()
            .expect("session lock poisoned")
            .username = None;
    }

    /// Identity of the logged-in user, if any.
    pub fn ident(&self) -> Option<Ident> {
        self.session
            .read()
            .expect("session lock poisoned")
            .ident
            .clone()
    }

    pub fn username(&self) -> Option<String> {
        self.session
            .read()
            .expect("session lock poisoned")
            .username
            .clone()
    }

    /// The current session JWT, if logged in.
    pub fn session_token(&self) -> Option<String> {
        self.session
            .read()
            .expect("session lock poisoned")
            .jwt
            .clone()
    }

    fn accounts_endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.accounts_url().as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }
}

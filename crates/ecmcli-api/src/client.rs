// ECM API HTTP client
//
// Wraps `reqwest::Client` with ECM URL construction, envelope unwrapping,
// HTML-entity decoding, account scoping, retries, and request events.
// Endpoint groups (routers, accounts, remote, ...) live in `resources/` as
// inherent methods to keep this module focused on transport mechanics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::events::{ApiEvent, ApiListener, ListenerId, Listeners, RequestOutcome};
use crate::models::{Envelope, Ident, Page};
use crate::query::Query;
use crate::transport::TransportConfig;

pub const DEFAULT_SITE: &str = "https://www.cradlepointecm.com";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.cradlepointecm.com";
pub const API_PREFIX: &str = "/api/v1";
pub(crate) const JWT_ACCOUNT_COOKIE: &str = "cpAccountsJwt";

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);
pub(crate) const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub username: Option<String>,
    pub jwt: Option<String>,
    pub ident: Option<Ident>,
}

/// HTTP client for the ECM v1 API.
///
/// Handles the `{ success, data, meta }` envelope, the optional
/// `parentAccount` scope, and session cookie tracking. Methods return the
/// unwrapped `data` payload.
pub struct EcmClient {
    http: reqwest::Client,
    transport: TransportConfig,
    jar: Option<Arc<Jar>>,
    site: Url,
    accounts_url: Url,
    parent_account: RwLock<Option<String>>,
    page_size: AtomicUsize,
    pub(crate) session: RwLock<SessionState>,
    listeners: Listeners,
    call_count: AtomicU64,
    cache: DashMap<String, Value>,
}

impl EcmClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// A cookie jar is added if the config lacks one; ECM sessions ride
    /// on the `cpAccountsJwt` cookie.
    pub fn new(site: Url, accounts_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let jar = config.cookie_jar.clone();
        let http = config.build_client()?;
        Ok(Self::build(http, config, jar, site, accounts_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// Without a cookie jar the session token cannot be tracked; useful for
    /// tests and one-shot calls.
    pub fn with_client(http: reqwest::Client, site: Url, accounts_url: Url) -> Self {
        Self::build(http, TransportConfig::default(), None, site, accounts_url)
    }

    fn build(
        http: reqwest::Client,
        transport: TransportConfig,
        jar: Option<Arc<Jar>>,
        site: Url,
        accounts_url: Url,
    ) -> Self {
        Self {
            http,
            transport,
            jar,
            site,
            accounts_url,
            parent_account: RwLock::new(None),
            page_size: AtomicUsize::new(DEFAULT_PAGE_SIZE),
            session: RwLock::new(SessionState::default()),
            listeners: Listeners::default(),
            call_count: AtomicU64::new(0),
            cache: DashMap::new(),
        }
    }

    pub fn site(&self) -> &Url {
        &self.site
    }

    pub fn accounts_url(&self) -> &Url {
        &self.accounts_url
    }

    pub(crate) fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── Scope & paging ───────────────────────────────────────────────

    /// Scope every request to a sub-account (`parentAccount=<id>`).
    pub fn set_parent_account(&self, account_id: Option<String>) {
        debug!(?account_id, "parent account scope");
        *self.parent_account.write().expect("scope lock poisoned") = account_id;
        self.cache.clear();
    }

    pub fn parent_account(&self) -> Option<String> {
        self.parent_account
            .read()
            .expect("scope lock poisoned")
            .clone()
    }

    /// Records fetched per page when the caller gives no limit.
    pub fn page_size(&self) -> usize {
        self.page_size.load(Ordering::Relaxed)
    }

    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size.max(1), Ordering::Relaxed);
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn ApiListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub(crate) fn fire(&self, event: &ApiEvent) {
        self.listeners.fire(event);
    }

    // ── Cookie handling ──────────────────────────────────────────────

    /// Read a cookie value the jar would send to `url`.
    pub(crate) fn cookie(jar: &Jar, url: &Url, name: &str) -> Option<String> {
        let header = jar.cookies(url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    pub(crate) fn set_jwt_cookie(&self, token: Option<&str>) {
        let Some(jar) = self.jar.as_ref() else {
            return;
        };
        let cookie = match token {
            Some(token) => format!("{JWT_ACCOUNT_COOKIE}={token}; Path=/"),
            None => format!("{JWT_ACCOUNT_COOKIE}=; Path=/; Max-Age=0"),
        };
        jar.add_cookie_str(&cookie, &self.site);
    }

    /// ECM rotates the session token occasionally; keep our copy in sync.
    fn check_session(&self) {
        let Some(jar) = self.jar.as_ref() else {
            return;
        };
        let Some(current) = Self::cookie(jar, &self.site, JWT_ACCOUNT_COOKIE) else {
            return;
        };
        let username = {
            let mut session = self.session.write().expect("session lock poisoned");
            if session.jwt.as_deref() == Some(current.as_str()) {
                return;
            }
            session.jwt = Some(current.clone());
            session.username.clone()
        };
        if let Some(username) = username {
            debug!("session token rotated");
            self.fire(&ApiEvent::SessionChanged {
                site: self.site.clone(),
                username,
                token: Some(current),
            });
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{site}/api/v1/{path}/`. Absolute URNs (`/api/v1/...`) are joined
    /// to the site as-is.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.site.as_str().trim_end_matches('/');
        let full = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}{API_PREFIX}/{}/", path.trim_matches('/'))
        };
        Ok(Url::parse(&full)?)
    }

    fn request_url(&self, path: &str, query: &Query) -> Result<Url, Error> {
        let mut url = self.api_url(path)?;
        let scope = self.parent_account();
        let has_params = query.iter().any(|(k, v)| k != "parentAccount" || !v.is_empty());
        if has_params || scope.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.iter() {
                if key == "parentAccount" && value.is_empty() {
                    continue;
                }
                pairs.append_pair(key, value);
            }
            if let Some(account) = scope.as_deref() {
                if !query.contains("parentAccount") {
                    pairs.append_pair("parentAccount", account);
                }
            }
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET and return the raw `data` payload.
    pub async fn get_value(&self, path: &str, query: &Query) -> Result<Value, Error> {
        Ok(self.execute(Method::GET, path, query, None).await?.data)
    }

    /// GET and deserialize the `data` payload.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T, Error> {
        let data = self.get_value(path, query).await?;
        decode(data)
    }

    /// GET one page of a list resource, keeping the paging metadata.
    pub async fn get_page(&self, path: &str, query: &Query) -> Result<Page<Value>, Error> {
        let envelope = self.execute(Method::GET, path, query, None).await?;
        let data = match envelope.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Ok(Page {
            data,
            meta: envelope.meta.unwrap_or_default(),
        })
    }

    /// GET a resource by its URN (`/api/v1/accounts/7/`).
    pub async fn get_urn(&self, urn: &str) -> Result<Value, Error> {
        self.get_value(urn, &Query::new()).await
    }

    /// GET a URN through the memo cache.
    pub async fn fetch_cached(&self, urn: &str) -> Result<Value, Error> {
        if let Some(hit) = self.cache.get(urn) {
            trace!(urn, "cache hit");
            return Ok(hit.clone());
        }
        let value = self.get_urn(urn).await?;
        self.cache.insert(urn.to_owned(), value.clone());
        Ok(value)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// POST a JSON body and return `data`.
    pub async fn post(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        query: &Query,
    ) -> Result<Value, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        Ok(self
            .execute(Method::POST, path, query, Some(Payload::Json(&body)))
            .await?
            .data)
    }

    /// POST a file as the `archive` part of a multipart form.
    pub async fn post_archive(
        &self,
        path: &str,
        file_name: &str,
        bytes: &[u8],
        query: &Query,
    ) -> Result<Value, Error> {
        let payload = Payload::Archive { file_name, bytes };
        Ok(self
            .execute(Method::POST, path, query, Some(payload))
            .await?
            .data)
    }

    /// PUT a JSON body and return `data`.
    pub async fn put(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        query: &Query,
    ) -> Result<Value, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        Ok(self
            .execute(Method::PUT, path, query, Some(Payload::Json(&body)))
            .await?
            .data)
    }

    pub async fn delete(&self, path: &str, query: &Query) -> Result<Value, Error> {
        Ok(self.execute(Method::DELETE, path, query, None).await?.data)
    }

    /// DELETE with a JSON body, used by detail collections such as the
    /// routers bound to a feature.
    pub async fn delete_with(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        query: &Query,
    ) -> Result<Value, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        Ok(self
            .execute(Method::DELETE, path, query, Some(Payload::Json(&body)))
            .await?
            .data)
    }

    /// Wrap session handling and events around one API call.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<Payload<'_>>,
    ) -> Result<Envelope, Error> {
        let url = self.request_url(path, query)?;
        let call_id = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.fire(&ApiEvent::RequestStarted {
            call_id,
            method: method.clone(),
            url: url.clone(),
        });
        let started = Instant::now();
        let result = self.send(method.clone(), url.clone(), body).await;

        if let Err(ref e) = result {
            if e.is_auth_failure() {
                self.reset_auth();
            }
        } else {
            self.check_session();
        }

        let outcome = match &result {
            Ok(envelope) => RequestOutcome::Ok {
                len: envelope.data.as_array().map(Vec::len),
            },
            Err(e) => RequestOutcome::Failed {
                error: e.to_string(),
            },
        };
        self.fire(&ApiEvent::RequestFinished {
            call_id,
            method,
            url,
            elapsed: started.elapsed(),
            outcome,
        });
        result
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Payload<'_>>,
    ) -> Result<Envelope, Error> {
        debug!("{method} {url}");
        let mut attempt = 0;
        let resp = loop {
            let mut builder = self.http.request(method.clone(), url.clone());
            match body {
                Some(Payload::Json(json)) => builder = builder.json(json),
                Some(Payload::Archive { file_name, bytes }) => {
                    let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_owned());
                    builder = builder.multipart(Form::new().part("archive", part));
                }
                None => {}
            }
            match builder.send().await {
                Ok(resp) => break resp,
                Err(e) => {
                    let err = self.transport_error(e);
                    if attempt < MAX_RETRIES && should_retry(&method, &err) {
                        attempt += 1;
                        warn!(attempt, "retrying {method} {url}: {err}");
                        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        };
        parse_envelope(resp).await
    }

    fn transport_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout {
                timeout: self.transport.timeout,
            }
        } else {
            Error::Transport(error)
        }
    }
}

/// Request body. The archive form is rebuilt for every attempt.
#[derive(Clone, Copy)]
enum Payload<'a> {
    Json(&'a Value),
    Archive { file_name: &'a str, bytes: &'a [u8] },
}

/// Connection failures are retried for any method. A timed out write may
/// already have been applied, so only reads are resent after a timeout.
fn should_retry(method: &Method, error: &Error) -> bool {
    let safe = *method == Method::GET || *method == Method::HEAD;
    error.is_unsent() || (safe && error.is_transient())
}

/// First `max` characters of a body, cut on a character boundary.
fn preview(body: &str, max: usize) -> &str {
    body.char_indices().nth(max).map_or(body, |(i, _)| &body[..i])
}

/// Deserialize `data` into a typed model.
pub(crate) fn decode<T: DeserializeOwned>(data: Value) -> Result<T, Error> {
    serde_json::from_value(data.clone()).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: data.to_string(),
    })
}

/// Decode HTML entities in every string of the tree; ECM stores text escaped.
pub(crate) fn unescape_html(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains('&') {
                if let Ok(decoded) = htmlescape::decode_html(s) {
                    *s = decoded;
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(unescape_html),
        Value::Object(obj) => obj.values_mut().for_each(unescape_html),
        _ => {}
    }
}

/// Parse the `{ success, data, meta }` envelope, mapping ECM error
/// envelopes onto [`Error`] variants.
async fn parse_envelope(resp: reqwest::Response) -> Result<Envelope, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    let parsed: Option<Value> = if body.trim().is_empty() {
        Some(Value::Null)
    } else {
        serde_json::from_str(&body).ok()
    };

    let Some(mut raw) = parsed else {
        let head = preview(&body, 200);
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized {
                message: "unauthorized".into(),
            });
        }
        if !status.is_success() {
            return Err(Error::Api {
                exception: format!("http_{}", status.as_u16()),
                message: head.to_owned(),
                status: status.as_u16(),
            });
        }
        return Err(Error::Deserialization {
            message: format!("response is not JSON (body preview: {head:?})"),
            body,
        });
    };

    unescape_html(&mut raw);

    // Bodies without an envelope (DELETE returns nothing) count as success.
    if !raw.is_object() || (raw.get("success").is_none() && raw.get("data").is_none()) {
        if status.is_success() {
            return Ok(Envelope {
                success: true,
                data: raw,
                meta: None,
                exception: None,
                message: None,
                error_code: None,
            });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized {
                message: "unauthorized".into(),
            });
        }
    }

    let envelope: Envelope = serde_json::from_value(raw).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.clone(),
    })?;

    if envelope.success && status.is_success() {
        return Ok(envelope);
    }
    Err(envelope_error(&envelope, status))
}

fn envelope_error(envelope: &Envelope, status: StatusCode) -> Error {
    let message = envelope.message.as_deref().unwrap_or("").trim().to_owned();
    if envelope.exception.as_deref() == Some("precondition_failed") && message == "must_accept_tos" {
        return Error::TosRequired;
    }
    let error_code = envelope.error_code.as_ref().map(|code| match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let exception = envelope
        .exception
        .clone()
        .or(error_code)
        .unwrap_or_else(|| format!("http_{}", status.as_u16()));
    if exception == "login_failure" || exception == "unauthorized" {
        return Error::Unauthorized { message: exception };
    }
    Error::Api {
        exception,
        message,
        status: status.as_u16(),
    }
}

impl Page<Value> {
    /// Deserialize every record of the page.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Page<T>, Error> {
        let data = self
            .data
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<T>, Error>>()?;
        Ok(Page {
            data,
            meta: self.meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> EcmClient {
        EcmClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://ecm.example.com").expect("url"),
            Url::parse("https://accounts.example.com").expect("url"),
        )
    }

    #[test]
    fn api_url_appends_trailing_slash() {
        let c = client();
        assert_eq!(
            c.api_url("routers").expect("url").as_str(),
            "https://ecm.example.com/api/v1/routers/"
        );
        assert_eq!(
            c.api_url("remote/status/wan").expect("url").as_str(),
            "https://ecm.example.com/api/v1/remote/status/wan/"
        );
        assert_eq!(
            c.api_url("/api/v1/accounts/7/").expect("url").as_str(),
            "https://ecm.example.com/api/v1/accounts/7/"
        );
    }

    #[test]
    fn parent_account_is_appended() {
        let c = client();
        c.set_parent_account(Some("42".into()));
        let url = c
            .request_url("routers", &Query::new().with("limit", 5))
            .expect("url");
        assert_eq!(url.query(), Some("limit=5&parentAccount=42"));
    }

    #[test]
    fn preview_stops_on_char_boundary() {
        let body = format!("{}’ tail", "x".repeat(199));
        let cut = preview(&body, 200);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with('’'));
        assert_eq!(preview("short", 200), "short");
    }

    #[test]
    fn writes_are_not_resent_after_timeout() {
        let timeout = Error::Timeout {
            timeout: Duration::from_secs(1),
        };
        assert!(should_retry(&Method::GET, &timeout));
        assert!(!should_retry(&Method::POST, &timeout));
        assert!(!should_retry(&Method::PUT, &timeout));
        assert!(!should_retry(&Method::DELETE, &timeout));
        assert!(!should_retry(&Method::GET, &Error::TosRequired));
    }

    #[test]
    fn html_entities_are_decoded_everywhere() {
        let mut value = json!({"name": "A &amp; B", "tags": ["&lt;x&gt;"], "n": 1});
        unescape_html(&mut value);
        assert_eq!(value, json!({"name": "A & B", "tags": ["<x>"], "n": 1}));
    }

    #[test]
    fn tos_envelope_maps_to_tos_required() {
        let env: Envelope = serde_json::from_value(json!({
            "success": false,
            "exception": "precondition_failed",
            "message": "must_accept_tos"
        }))
        .expect("envelope");
        assert!(matches!(
            envelope_error(&env, StatusCode::PRECONDITION_FAILED),
            Error::TosRequired
        ));
    }

    #[test]
    fn error_code_is_used_without_exception() {
        let env: Envelope = serde_json::from_value(json!({
            "success": false,
            "error_code": "login_failure"
        }))
        .expect("envelope");
        assert!(envelope_error(&env, StatusCode::UNAUTHORIZED).is_auth_failure());

        let env: Envelope = serde_json::from_value(json!({
            "success": false,
            "exception": "bad_request",
            "message": " name is required \n"
        }))
        .expect("envelope");
        match envelope_error(&env, StatusCode::BAD_REQUEST) {
            Error::Api {
                exception,
                message,
                status,
            } => {
                assert_eq!(exception, "bad_request");
                assert_eq!(message, "name is required");
                assert_eq!(status, 400);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `ecmcli-api` crate.
///
/// Covers authentication, transport, API envelope failures and lookups.
/// The CLI maps these into user-facing diagnostics with exit codes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (bad credentials, SSO rejected, missing JWT cookie).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login is bad or the session has expired.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The terms of service have not been accepted yet.
    #[error("Terms of service must be accepted before using ECM")]
    TosRequired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {}", readable(.timeout))]
    Timeout { timeout: Duration },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Error envelope returned by the ECM API.
    #[error("API error ({exception}): {message}")]
    Api {
        exception: String,
        message: String,
        status: u16,
    },

    /// A remote (router-side) call reported failure.
    #[error("Remote call failed ({exception}): {reason}")]
    Remote { exception: String, reason: String },

    /// Lookup by id or name found nothing.
    #[error("{resource} not found: {criteria}")]
    NotFound { resource: String, criteria: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

fn readable(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

impl Error {
    /// Returns `true` if logging in again might resolve this error.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Unauthorized { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// A timeout may mean the server acted on the request, so only
    /// callers with a safe method should retry one; see
    /// [`is_unsent`](Self::is_unsent).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the request never reached the server.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    /// Build a not-found error for a plural resource name (`routers` -> `Router`).
    pub fn not_found(resource: &str, criteria: &str) -> Self {
        let singular = resource.strip_suffix('s').unwrap_or(resource);
        let mut chars = singular.chars();
        let resource = chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect::<String>()
        });
        Self::NotFound {
            resource,
            criteria: criteria.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_singularizes_resource() {
        let err = Error::not_found("routers", "hq*");
        assert_eq!(err.to_string(), "Router not found: hq*");
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn sub_second_timeouts_keep_their_unit() {
        let err = Error::Timeout {
            timeout: Duration::from_millis(300),
        };
        assert_eq!(err.to_string(), "Request timed out after 300ms");
        assert!(err.is_transient());
        assert!(!err.is_unsent());
    }

    #[test]
    fn auth_failures_are_flagged() {
        let err = Error::Unauthorized {
            message: "login_failure".into(),
        };
        assert!(err.is_auth_failure());
        assert!(!Error::TosRequired.is_auth_failure());
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `ecmcli_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use ecmcli_api::Error as ApiError;
use ecmcli_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to ECM at {url}")]
    #[diagnostic(
        code(ecm::connection_failed),
        help(
            "Check your network connection and the API site.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS error talking to ECM: {message}")]
    #[diagnostic(
        code(ecm::tls_error),
        help("Use --insecure (-k) to accept an invalid certificate.")
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ecm::auth_failed),
        help(
            "Log in again with: ecm login\n\
             Or store a password with: ecm config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("Terms of service acceptance required")]
    #[diagnostic(
        code(ecm::tos_required),
        help("Review and accept them with: ecm tos accept")
    )]
    TosRequired,

    #[error("No credentials available for profile '{profile}'")]
    #[diagnostic(
        code(ecm::no_credentials),
        help(
            "Configure credentials with: ecm config init\n\
             Or pass --api-username / --api-password."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource} not found: {identifier}")]
    #[diagnostic(code(ecm::not_found))]
    NotFound {
        resource: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(ecm::api_error))]
    ApiError {
        code: String,
        message: String,
        status: u16,
    },

    #[error("Remote call failed: {message}")]
    #[diagnostic(code(ecm::remote))]
    Remote { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ecm::validation))]
    Validation { field: String, reason: String },

    #[error("{0}")]
    #[diagnostic(code(ecm::usage))]
    Usage(String),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ecm::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ecm config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(ecm::config))]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(ecm::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Aborted")]
    #[diagnostic(code(ecm::aborted))]
    Aborted,

    #[error("Interrupted")]
    #[diagnostic(code(ecm::interrupted))]
    Interrupted,

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {after}")]
    #[diagnostic(
        code(ecm::timeout),
        help("Increase the timeout with --timeout.")
    )]
    Timeout { after: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(ecm::json), help("Check the JSON value and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::TosRequired => exit_code::PERMISSION,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::ApiError { status: 403, .. } => exit_code::PERMISSION,
            Self::ApiError { status: 404, .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Usage(_) | Self::NonInteractiveRequiresYes { .. } => {
                exit_code::USAGE
            }
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    /// Whether a fresh login could fix this error.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }
}

// ── ApiError → CliError mapping ─────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication { message } | ApiError::Unauthorized { message } => {
                CliError::AuthFailed { message }
            }

            ApiError::TosRequired => CliError::TosRequired,

            ApiError::Transport(e) => {
                let url = e.url().map_or_else(|| "(unknown)".into(), ToString::to_string);
                CliError::ConnectionFailed {
                    url,
                    source: Box::new(e),
                }
            }

            ApiError::Timeout { timeout } => CliError::Timeout {
                after: humantime::format_duration(timeout).to_string(),
            },

            ApiError::Tls(message) => CliError::TlsError { message },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },

            ApiError::NotFound { resource, criteria } => CliError::NotFound {
                resource,
                identifier: criteria,
            },

            ApiError::Api {
                exception,
                message,
                status,
            } => CliError::ApiError {
                code: exception,
                message,
                status,
            },

            ApiError::Remote { exception, reason } => CliError::Remote {
                message: format!("{exception} ({reason})"),
            },

            ApiError::Deserialization { message, .. } => CliError::ApiError {
                code: "deserialization".into(),
                message,
                status: 0,
            },
        }
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `sconnect_api::Error` and `ConfigError` variants into user-facing
//! errors with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use sconnect_api::Error as ApiError;
use sconnect_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the dashboard API at {url}")]
    #[diagnostic(
        code(sconnect::connection_failed),
        help(
            "Check network access and the base URL.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: ApiError,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The dashboard rejected the API key")]
    #[diagnostic(
        code(sconnect::auth_failed),
        help(
            "Verify the key has access to this organization.\n\
             Run: sconnect config set-key --profile {profile}"
        )
    )]
    AuthFailed {
        profile: String,
        #[source]
        source: ApiError,
    },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(sconnect::no_credentials),
        help(
            "Configure credentials with: sconnect config init\n\
             Or set the MERAKI_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(
        code(sconnect::not_found),
        help("Run: sconnect sites list to see enrolled sites")
    )]
    NotFound(#[source] ApiError),

    // ── API ──────────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(sconnect::api_error))]
    Api(ApiError),

    #[error("Operation cancelled")]
    #[diagnostic(code(sconnect::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sconnect::validation))]
    Validation { field: String, reason: String },

    #[error("No organization selected")]
    #[diagnostic(
        code(sconnect::no_organization),
        help("Pass --org <ID>, set SCONNECT_ORG, or add organization_id to your profile.")
    )]
    NoOrganization,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sconnect::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sconnect config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(sconnect::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(sconnect::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Output ───────────────────────────────────────────────────────
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound(_) => exit_code::NOT_FOUND,
            Self::Cancelled => exit_code::CANCELLED,
            Self::Validation { .. }
            | Self::NoOrganization
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config(ConfigError::NoCredentials { .. }) => exit_code::AUTH,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap an API failure, attributing auth problems to `profile`.
    pub fn from_api(err: ApiError, profile: &str) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        if err.is_unauthorized() {
            return Self::AuthFailed {
                profile: profile.to_owned(),
                source: err,
            };
        }
        if err.is_not_found() {
            return Self::NotFound(err);
        }
        if let ApiError::Transport(e) = &err {
            if e.is_connect() || e.is_timeout() {
                let url = e.url().map(ToString::to_string).unwrap_or_default();
                return Self::ConnectionFailed { url, source: err };
            }
        }
        Self::Api(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

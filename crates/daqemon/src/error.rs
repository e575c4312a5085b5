//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use daqemon_config::ConfigError;
use daqemon_core::{CoreError, ReconcileError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// An apply ran to the end but some items failed.
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(daqemon::connection_failed),
        help(
            "{reason}\n\
             Check the server URL, or use --insecure (-k) for a self-signed certificate."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {millis}ms")]
    #[diagnostic(
        code(daqemon::timeout),
        help("Increase the ceiling with --timeout or check server responsiveness.")
    )]
    Timeout { millis: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(daqemon::auth_failed),
        help(
            "Verify the read/write API key of your Emoncms account.\n\
             Run: daqemon config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("No API key configured for server '{server}'")]
    #[diagnostic(
        code(daqemon::no_credentials),
        help(
            "Store one with: daqemon config set-key\n\
             Or set the DAQEMON_API_KEY environment variable."
        )
    )]
    NoCredentials { server: String },

    // ── Server ───────────────────────────────────────────────────────
    #[error("Server error: {message}")]
    #[diagnostic(code(daqemon::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    #[error("Unexpected response: {message}")]
    #[diagnostic(
        code(daqemon::decode),
        help("The server answered with something other than the expected JSON.")
    )]
    Decode { message: String },

    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(daqemon::unsupported))]
    Unsupported { operation: String },

    #[error("Node registration failed: {message}")]
    #[diagnostic(
        code(daqemon::node_registration),
        help("Check that the node id is unique on the server, then run: daqemon node register")
    )]
    NodeRegistration { message: String },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("No node id configured")]
    #[diagnostic(
        code(daqemon::no_node),
        help("Set client.nodeid in the local configuration ({path}).")
    )]
    NoNode { path: String },

    #[error("No inputs configured")]
    #[diagnostic(
        code(daqemon::no_channels),
        help("Add channels to the inputs section of the local configuration ({path}).")
    )]
    NoChannels { path: String },

    #[error(transparent)]
    #[diagnostic(code(daqemon::reconcile))]
    Reconcile(ReconcileError),

    #[error("{failed} of {total} items failed to apply")]
    #[diagnostic(
        code(daqemon::partial_apply),
        help("Inspect the failed rows above, then run: daqemon sync plan")
    )]
    PartialApply { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(daqemon::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(daqemon::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Cannot read local configuration {path}")]
    #[diagnostic(
        code(daqemon::local_config),
        help("{reason}\nPoint --config-file at the JSON document the daemon persists.")
    )]
    LocalConfig { path: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(daqemon::config),
        help("Check the file printed by: daqemon config path")
    )]
    Config { message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(daqemon::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(daqemon::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NodeRegistration { .. } => exit_code::CONFLICT,
            Self::Unsupported { .. } => exit_code::PERMISSION,
            Self::ApiError {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::PartialApply { .. } => exit_code::PARTIAL,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoNode { .. }
            | Self::NoChannels { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the local configuration path to errors that point at it.
    pub fn with_local_path(self, path: &std::path::Path) -> Self {
        let path = path.display().to_string();
        match self {
            Self::NoNode { .. } => Self::NoNode { path },
            Self::NoChannels { .. } => Self::NoChannels { path },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Timeout { timeout_ms } => CliError::Timeout { millis: timeout_ms },

            CoreError::Api {
                message,
                status: Some(401 | 403),
                ..
            } => CliError::AuthFailed { message },

            CoreError::Api {
                message, status, ..
            } => CliError::ApiError { message, status },

            CoreError::Decode { message } => CliError::Decode { message },

            CoreError::Unsupported { operation } => CliError::Unsupported { operation },

            CoreError::NodeRegistration { message } => CliError::NodeRegistration { message },

            CoreError::Template { message } => CliError::Validation {
                field: "template".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Reconcile(ReconcileError::NoNode) => CliError::NoNode {
                path: String::new(),
            },

            CoreError::Reconcile(ReconcileError::NoChannels) => CliError::NoChannels {
                path: String::new(),
            },

            CoreError::Reconcile(other) => CliError::Reconcile(other),

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<daqemon_api::Error> for CliError {
    fn from(err: daqemon_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { server } => CliError::NoCredentials { server },
            ConfigError::Local { path, source } => CliError::LocalConfig {
                path: path.display().to_string(),
                reason: source.to_string(),
            },
            ConfigError::Client(e) => e.into(),
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_become_auth_failures() {
        let err: CliError = CoreError::Api {
            message: "Unauthorized".into(),
            status: Some(401),
            code: None,
        }
        .into();
        assert!(matches!(err, CliError::AuthFailed { .. }));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn missing_node_is_a_usage_error_with_path() {
        let err: CliError = CoreError::from(ReconcileError::NoNode).into();
        let err = err.with_local_path(std::path::Path::new("/etc/daqemon/daqemon.json"));
        assert!(matches!(err, CliError::NoNode { ref path } if path == "/etc/daqemon/daqemon.json"));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn partial_apply_has_its_own_code() {
        let err = CliError::PartialApply { failed: 1, total: 4 };
        assert_eq!(err.exit_code(), exit_code::PARTIAL);
        assert_eq!(err.to_string(), "1 of 4 items failed to apply");
    }

    #[test]
    fn busy_state_machine_maps_through() {
        let err: CliError = CoreError::from(ReconcileError::NothingPlanned).into();
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        assert_eq!(err.to_string(), "Nothing planned; preview before applying");
    }
}

// ── Core error types ──
//
// User-facing errors from daqemon-core. Transport details (HTTP status
// text, raw bodies, JSON-RPC codes) are folded into domain variants by
// the `From<daqemon_api::Error>` impl.

use thiserror::Error;

use crate::reconcile::Phase;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Remote errors ────────────────────────────────────────────────
    #[error("Server error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
        /// JSON-RPC error code (if applicable).
        code: Option<i64>,
    },

    #[error("Unexpected response: {message}")]
    Decode { message: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Node registration failed: {message}")]
    NodeRegistration { message: String },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Misuse of the reconciliation state machine, or nothing to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Nothing planned; preview before applying")]
    NothingPlanned,

    #[error("Reconciliation already in progress ({phase})")]
    Busy { phase: Phase },

    #[error("No node id configured")]
    NoNode,

    #[error("No inputs configured")]
    NoChannels,
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<daqemon_api::Error> for CoreError {
    fn from(err: daqemon_api::Error) -> Self {
        use daqemon_api::Error as E;
        match err {
            E::NetworkTimeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            E::TransportFailure(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            E::HttpError {
                status,
                status_text,
                ..
            } => CoreError::Api {
                message: status_text,
                status: Some(status),
                code: None,
            },
            E::ProtocolError { message, code } => CoreError::Api {
                message,
                status: None,
                code,
            },
            E::DecodeError { message, .. } => CoreError::Decode { message },
            E::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            E::InvalidHeader(message) => CoreError::Config { message },
            E::UnsupportedOperation {
                composer,
                operation,
            } => CoreError::Unsupported {
                operation: format!("{operation} on {composer} resources"),
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn http_error_keeps_status() {
        let err: CoreError = daqemon_api::Error::HttpError {
            status: 404,
            status_text: "Not Found".into(),
            body: String::new(),
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(404), .. }));
        assert_eq!(err.to_string(), "Server error: Not Found");
    }

    #[test]
    fn busy_names_phase() {
        let err = ReconcileError::Busy {
            phase: Phase::Applying,
        };
        assert_eq!(err.to_string(), "Reconciliation already in progress (applying)");
    }
}

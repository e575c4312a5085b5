use thiserror::Error;

/// Top-level error type for the `daqemon-api` crate.
///
/// Covers every failure mode of both protocol bindings (REST and JSON-RPC)
/// and of the URL composers layered over them. `daqemon-core` maps these
/// into per-item status or user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The request did not complete within the binding's ceiling.
    #[error("Network timeout after {timeout_ms}ms")]
    NetworkTimeout { timeout_ms: u64 },

    /// No response status at all: connection refused, DNS failure, TLS
    /// handshake error or a request blocked before it reached the server.
    #[error("HTTP request error (no response status): {0}")]
    TransportFailure(String),

    /// The server answered with a status outside 2xx.
    #[error("{status_text}")]
    HttpError {
        status: u16,
        status_text: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// The body was advertised as JSON but failed to parse, or a typed
    /// payload did not have the expected shape. Carries the raw text.
    #[error("Decode error: {message}")]
    DecodeError { message: String, body: String },

    /// A JSON-RPC envelope was malformed or declared an application error.
    #[error("{message}")]
    ProtocolError { message: String, code: Option<i64> },

    // ── Request construction ────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value could not be encoded.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A URL composer was asked for an operation it does not support.
    #[error("Operation {operation} is not supported by the {composer} composer")]
    UnsupportedOperation {
        composer: &'static str,
        operation: String,
    },
}

impl Error {
    /// The raw response text attached for diagnostics, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::HttpError { body, .. } | Self::DecodeError { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Build a [`DecodeError`](Self::DecodeError) from a serde failure,
    /// keeping a short preview of the offending body in the message.
    pub(crate) fn decode(err: &serde_json::Error, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::DecodeError {
            message: format!("{err} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}

// Shared transport layer for both protocol bindings.
//
// One network primitive (`exchange`) sends a prepared request and hands back
// status, content type and raw text. The REST and JSON-RPC bindings each
// interpret that raw exchange according to their own rules.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::trace;

use crate::error::Error;

/// Default ceiling for REST calls against the metering server.
pub const REST_TIMEOUT: Duration = Duration::from_secs(2);

/// Default ceiling for JSON-RPC calls; the daemon may be scanning a bus.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const JSON: &str = "application/json";
pub(crate) const JSON_RPC: &str = "application/json-rpc";
pub(crate) const TEXT: &str = "text/plain";
pub(crate) const FORM: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// TLS verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Use the bundled root certificate store.
    #[default]
    System,
    /// Accept any certificate (self-signed LAN servers).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::rest()
    }
}

impl TransportConfig {
    /// Configuration for the REST binding (2 s ceiling).
    pub fn rest() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: REST_TIMEOUT,
        }
    }

    /// Configuration for the JSON-RPC binding (10 s ceiling).
    pub fn rpc() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: RPC_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("daqemon/", env!("CARGO_PKG_VERSION")));

        if self.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::TransportFailure(format!("failed to build HTTP client: {e}")))
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

// ── Request bodies ───────────────────────────────────────────────────

/// A request body.
///
/// Structured values are serialized to JSON text and sent as
/// `application/json`; text goes out as-is with a plain-text type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    /// Pre-encoded `application/x-www-form-urlencoded` text.
    Form(String),
}

impl Body {
    pub(crate) fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => JSON,
            Self::Text(_) => TEXT,
            Self::Form(_) => FORM,
        }
    }

    /// The serialized text, as seen by a computed auth policy.
    pub fn text(&self) -> String {
        match self {
            Self::Json(v) => v.to_string(),
            Self::Text(s) | Self::Form(s) => s.clone(),
        }
    }
}

// ── Response payloads ────────────────────────────────────────────────

/// A successful REST response.
///
/// The server only gets parsed JSON when it declared `application/json`
/// on a 200..=204 answer; everything else arrives as raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// The parsed value, if the server declared JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// Structured value, reparsing text answers.
    ///
    /// Some endpoints return JSON labelled as plain text; this recovers
    /// them. Text that does not parse is a [`Error::DecodeError`].
    pub fn into_json(self) -> Result<Value, Error> {
        match self {
            Self::Json(v) => Ok(v),
            Self::Text(text) => serde_json::from_str(&text).map_err(|e| Error::decode(&e, &text)),
        }
    }

    /// Decode into a typed value, reparsing text answers.
    pub fn decode<T: serde::de::DeserializeOwned>(self) -> Result<T, Error> {
        let value = self.into_json()?;
        let text = value.to_string();
        serde_json::from_value(value).map_err(|e| Error::decode(&e, &text))
    }

    /// Text form of the payload.
    pub fn into_text(self) -> String {
        match self {
            Self::Json(Value::String(s)) | Self::Text(s) => s,
            Self::Json(v) => v.to_string(),
        }
    }
}

// ── Exchange primitive ───────────────────────────────────────────────

/// Raw outcome of one HTTP exchange that produced a status line.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// Media type essence, lower-cased, parameters stripped.
    pub content_type: Option<String>,
    pub text: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 200..=204 are the statuses whose body may be parsed.
    pub fn is_parseable(&self) -> bool {
        (200..=204).contains(&self.status)
    }

    pub fn has_type(&self, essence: &str) -> bool {
        self.content_type.as_deref() == Some(essence)
    }

    pub fn into_http_error(self) -> Error {
        Error::HttpError {
            status: self.status,
            status_text: self.status_text,
            body: self.text,
        }
    }
}

/// Send a prepared request and collect the raw response.
pub(crate) async fn exchange(
    request: reqwest::RequestBuilder,
    timeout_ms: u64,
) -> Result<RawResponse, Error> {
    let resp = request
        .send()
        .await
        .map_err(|e| map_send_error(&e, timeout_ms))?;

    let status = resp.status();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_essence);
    let text = resp
        .text()
        .await
        .map_err(|e| map_send_error(&e, timeout_ms))?;
    trace!(status = status.as_u16(), body = %text, "response");

    Ok(RawResponse {
        status: status.as_u16(),
        status_text: status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), String::from),
        content_type,
        text,
    })
}

fn map_send_error(err: &reqwest::Error, timeout_ms: u64) -> Error {
    if err.is_timeout() {
        Error::NetworkTimeout { timeout_ms }
    } else {
        Error::TransportFailure(err.to_string())
    }
}

/// `"application/json; charset=utf-8"` -> `"application/json"`
pub(crate) fn media_essence(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// JSON-RPC 2.0 binding
//
// Every call is a POST of `{jsonrpc, method, params, id}` with content type
// `application/json-rpc`. Ids come from a per-client counter starting at 1.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::auth::AuthPolicy;
use crate::error::Error;
use crate::transport::{self, JSON, JSON_RPC, TransportConfig};

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Async JSON-RPC 2.0 client.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Url,
    auth: AuthPolicy,
    next_id: AtomicU64,
    timeout_ms: u64,
    expand_single_object: bool,
}

impl RpcClient {
    pub fn new(url: Url, auth: AuthPolicy, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            url,
            auth,
            next_id: AtomicU64::new(0),
            timeout_ms: transport.timeout_ms(),
            expand_single_object: false,
        })
    }

    /// Pass a lone object argument as named params instead of `[obj]`.
    pub fn expand_single_object(mut self, on: bool) -> Self {
        self.expand_single_object = on;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Id the next call will carry.
    pub fn peek_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) + 1
    }

    /// Call `method` with positional arguments and return the raw `result`.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, Error> {
        let params = self.params(args);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let request = Request {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        let text = serde_json::to_string(&request).map_err(|e| Error::decode(&e, method))?;
        trace!(body = %text, "rpc request");

        let (url, headers) = self.auth.apply(self.url.clone(), Some(&text));
        debug!(method, id, "POST {url}");

        let builder = self
            .http
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_RPC))
            .headers(headers)
            .body(text);
        let raw = transport::exchange(builder, self.timeout_ms).await?;

        if !raw.is_parseable() {
            return Err(raw.into_http_error());
        }
        if !(raw.has_type(JSON) || raw.has_type(JSON_RPC)) {
            return Err(Error::ProtocolError {
                message: format!(
                    "Invalid content type: {}",
                    raw.content_type.as_deref().unwrap_or("none")
                ),
                code: None,
            });
        }

        let envelope: Response =
            serde_json::from_str(&raw.text).map_err(|e| Error::decode(&e, &raw.text))?;
        if envelope.jsonrpc.as_deref() != Some("2.0") {
            return Err(Error::ProtocolError {
                message: "Not a valid JSON-RPC response".into(),
                code: None,
            });
        }
        if let Some(err) = envelope.error {
            return Err(Error::ProtocolError {
                message: err.message.unwrap_or_else(|| "JSON-RPC error".into()),
                code: err.code,
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Call `method` and decode the `result` into `T`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, args: Vec<Value>) -> Result<T, Error> {
        let result = self.invoke(method, args).await?;
        let text = result.to_string();
        serde_json::from_value(result).map_err(|e| Error::decode(&e, &text))
    }

    fn params(&self, mut args: Vec<Value>) -> Value {
        if self.expand_single_object && args.len() == 1 && args.first().is_some_and(Value::is_object) {
            return args.pop().unwrap_or(Value::Null);
        }
        Value::Array(args)
    }
}

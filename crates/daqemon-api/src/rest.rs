// REST binding
//
// Wraps `reqwest::Client` with a base URL, a pluggable auth policy and the
// metering server's response rules: only a 200..=204 answer declared as
// `application/json` is parsed, any other success resolves raw text, and
// everything else becomes an `Error::HttpError` carrying the body.

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::auth::AuthPolicy;
use crate::error::Error;
use crate::transport::{self, Body, JSON, Payload, TransportConfig};

/// Async REST client bound to one base URL and one auth policy.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthPolicy,
    timeout_ms: u64,
}

impl RestClient {
    /// Build from a `TransportConfig`.
    pub fn new(base_url: Url, auth: AuthPolicy, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            auth,
            timeout_ms: transport.timeout_ms(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthPolicy {
        &self.auth
    }

    /// Same transport and auth, different base URL.
    pub fn rebase(&self, base_url: Url) -> Self {
        Self {
            http: self.http.clone(),
            base_url,
            auth: self.auth.clone(),
            timeout_ms: self.timeout_ms,
        }
    }

    /// Join a relative path onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get(&self, url: Url) -> Result<Payload, Error> {
        self.request(Method::GET, url, None, None).await
    }

    pub async fn post(&self, url: Url, body: Body) -> Result<Payload, Error> {
        self.request(Method::POST, url, Some(body), None).await
    }

    /// Issue one request.
    ///
    /// POST carries the caller's headers when given, otherwise a content
    /// type matching the body. Other methods ask for JSON or text.
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Payload, Error> {
        let text = body.as_ref().map(Body::text);
        let (url, auth_headers) = self.auth.apply(url, text.as_deref());
        debug!("{method} {}", redact(&url));

        let mut builder = self.http.request(method.clone(), url);
        if method == Method::POST {
            match (headers, &body) {
                (Some(headers), _) => builder = builder.headers(headers),
                (None, Some(body)) => {
                    builder = builder.header(CONTENT_TYPE, HeaderValue::from_static(body.content_type()));
                }
                (None, None) => {}
            }
        } else {
            builder = builder.header(ACCEPT, HeaderValue::from_static("application/json, text/plain"));
            if let Some(headers) = headers {
                builder = builder.headers(headers);
            }
        }
        builder = builder.headers(auth_headers);
        if let Some(text) = text {
            builder = builder.body(text);
        }

        let raw = transport::exchange(builder, self.timeout_ms).await?;

        if !raw.is_success() {
            return Err(raw.into_http_error());
        }
        if raw.is_parseable() && raw.has_type(JSON) {
            return serde_json::from_str(&raw.text)
                .map(Payload::Json)
                .map_err(|e| Error::decode(&e, &raw.text));
        }
        Ok(Payload::Text(raw.text))
    }
}

/// Drop any `apikey` query value before a URL reaches the logs.
pub(crate) fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "apikey") {
        return url.to_string();
    }
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apikey" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redact_hides_apikey() {
        let url = Url::parse("http://h/feed/list.json?apikey=secret&x=1").unwrap();
        let shown = redact(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("x=1"));
    }

    #[test]
    fn redact_leaves_plain_urls() {
        let url = Url::parse("http://h/feed/list.json").unwrap();
        assert_eq!(redact(&url), "http://h/feed/list.json");
    }
}

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;

/// What a computed auth policy produces for one request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Send the request to this URL instead (e.g. with a signed query).
    Url(Url),
    /// Add these headers to the request.
    Headers(HeaderMap),
}

type ComputeFn = dyn Fn(&Url, Option<&str>) -> AuthOutcome + Send + Sync;

/// How a REST binding authenticates its requests.
#[derive(Clone, Default)]
pub enum AuthPolicy {
    /// Send requests unmodified.
    #[default]
    None,
    /// A fixed header set added to every request.
    Headers(HeaderMap),
    /// Computed per request from the target URL and the serialized body.
    Computed(Arc<ComputeFn>),
}

impl AuthPolicy {
    /// `Authorization: Bearer <key>`, the metering server's scheme.
    pub fn bearer(api_key: &SecretString) -> Result<Self, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| Error::InvalidHeader(format!("invalid API key header value: {e}")))?;
        value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(Self::Headers(headers))
    }

    /// A fixed set of `(name, value)` headers.
    pub fn headers<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(Self::Headers(headers))
    }

    pub fn computed(f: impl Fn(&Url, Option<&str>) -> AuthOutcome + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Resolve the effective URL and extra headers for one request.
    pub(crate) fn apply(&self, url: Url, body: Option<&str>) -> (Url, HeaderMap) {
        match self {
            Self::None => (url, HeaderMap::new()),
            Self::Headers(headers) => (url, headers.clone()),
            Self::Computed(f) => match f(&url, body) {
                AuthOutcome::Url(signed) => (signed, HeaderMap::new()),
                AuthOutcome::Headers(headers) => (url, headers),
            },
        }
    }
}

impl fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("AuthPolicy::None"),
            Self::Headers(h) => f
                .debug_tuple("AuthPolicy::Headers")
                .field(&h.keys().collect::<Vec<_>>())
                .finish(),
            Self::Computed(_) => f.write_str("AuthPolicy::Computed(..)"),
        }
    }
}

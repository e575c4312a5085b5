// Resource client for one remote resource family
//
// Binds a REST client (base URL + auth) to a URL composer. Every call is a
// GET: the metering server encodes writes in the query string.

use serde_json::Value;
use tracing::debug;
use url::Url;

use super::composer::{Operation, ResourceKey, UrlComposer};
use crate::error::Error;
use crate::rest::RestClient;
use crate::transport::Payload;

#[derive(Debug, Clone)]
pub struct ResourceClient {
    rest: RestClient,
    composer: UrlComposer,
}

impl ResourceClient {
    pub fn new(rest: RestClient, composer: UrlComposer) -> Self {
        Self { rest, composer }
    }

    pub fn base_url(&self) -> &Url {
        self.rest.base_url()
    }

    pub fn composer(&self) -> UrlComposer {
        self.composer
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// The URL `op` on `key` would hit, without sending anything.
    pub fn compose(&self, key: &ResourceKey, op: Operation, args: Option<&Value>) -> Result<Url, Error> {
        self.composer.compose(self.rest.base_url(), key, op, args)
    }

    /// `GET {base}list.json`
    pub async fn list(&self) -> Result<Payload, Error> {
        let url = self.rest.url("list.json")?;
        self.rest.get(url).await
    }

    pub async fn listshort(&self) -> Result<Payload, Error> {
        let url = self.compose(&"listshort".into(), Operation::Get, None)?;
        self.rest.get(url).await
    }

    pub async fn get(&self, key: impl Into<ResourceKey>) -> Result<Payload, Error> {
        let url = self.compose(&key.into(), Operation::Get, None)?;
        self.rest.get(url).await
    }

    pub async fn set(&self, key: impl Into<ResourceKey>, fields: &Value) -> Result<Payload, Error> {
        let key = key.into();
        debug!(%key, "updating resource");
        let url = self.compose(&key, Operation::Set, Some(fields))?;
        self.rest.get(url).await
    }

    pub async fn create(&self, instance: &Value) -> Result<Payload, Error> {
        let url = self.compose(&ResourceKey::Name(String::new()), Operation::Create, Some(instance))?;
        self.rest.get(url).await
    }

    pub async fn delete(&self, key: impl Into<ResourceKey>) -> Result<Payload, Error> {
        let url = self.compose(&key.into(), Operation::Delete, None)?;
        self.rest.get(url).await
    }
}

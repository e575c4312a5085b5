// Emoncms metering server API
//
// One `ResourceClient` per resource family, all sharing a single
// `reqwest::Client` and the bearer-token auth policy.

pub mod batch;
pub mod client;
pub mod composer;
mod inputs;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

pub use batch::{BatchEvent, CreateOutcome, value_as_id};
pub use client::ResourceClient;
pub use composer::{Operation, ResourceKey, UrlComposer};

use crate::auth::AuthPolicy;
use crate::error::Error;
use crate::rest::RestClient;
use crate::transport::TransportConfig;

/// Per-resource paths, relative to the server URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub feeds: String,
    pub inputs: String,
    pub processes: String,
    pub node: String,
    pub profiles: String,
    pub dashboard: String,
    /// `{0}` is the node id, `{1}` the JSON object of input values.
    pub submit: String,
    /// The input id is appended.
    pub setproc: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            feeds: "feed/".into(),
            inputs: "input/".into(),
            processes: "process/".into(),
            node: "device/".into(),
            profiles: "device/template/".into(),
            dashboard: "dashboard/".into(),
            submit: "input/post?node={0}&fulljson={1}".into(),
            setproc: "input/process/set?inputid=".into(),
        }
    }
}

/// Append a `/` to a server URL that has neither a query nor one already;
/// the per-resource paths are relative to it.
pub fn normalize_server_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if url.query().is_none() && !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// The metering server, one client per resource family.
#[derive(Debug, Clone)]
pub struct EmonApi {
    server: Url,
    endpoints: Endpoints,
    rest: RestClient,
    pub feeds: ResourceClient,
    pub inputs: ResourceClient,
    pub processes: ResourceClient,
    pub node: ResourceClient,
    pub profiles: ResourceClient,
    pub dashboard: ResourceClient,
}

impl EmonApi {
    /// Build against `server` with bearer-token auth.
    pub fn new(
        server: &str,
        api_key: &SecretString,
        endpoints: Endpoints,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let server = normalize_server_url(server)?;
        let rest = RestClient::new(server.clone(), AuthPolicy::bearer(api_key)?, transport)?;
        Self::from_rest(rest, endpoints)
    }

    /// Build from a prepared REST client whose base URL is the server root.
    pub fn from_rest(rest: RestClient, endpoints: Endpoints) -> Result<Self, Error> {
        let server = rest.base_url().clone();
        let family = |path: &str, composer: UrlComposer| -> Result<ResourceClient, Error> {
            Ok(ResourceClient::new(rest.rebase(server.join(path)?), composer))
        };
        Ok(Self {
            feeds: family(&endpoints.feeds, UrlComposer::Default)?,
            inputs: family(&endpoints.inputs, UrlComposer::Input)?,
            processes: family(&endpoints.processes, UrlComposer::Default)?,
            node: family(&endpoints.node, UrlComposer::Default)?,
            profiles: family(&endpoints.profiles, UrlComposer::Profile)?,
            dashboard: family(&endpoints.dashboard, UrlComposer::Default)?,
            server,
            endpoints,
            rest,
        })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `GET {server}version`
    pub async fn version(&self) -> Result<String, Error> {
        let url = self.server.join("version")?;
        Ok(self.rest.get(url).await?.into_text().trim().to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn server_url_gets_trailing_slash() {
        assert_eq!(
            normalize_server_url("https://emoncms.org/emon").unwrap().as_str(),
            "https://emoncms.org/emon/"
        );
        assert_eq!(
            normalize_server_url("https://emoncms.org/").unwrap().as_str(),
            "https://emoncms.org/"
        );
        assert_eq!(
            normalize_server_url("https://h/x?a=1").unwrap().as_str(),
            "https://h/x?a=1"
        );
    }

    #[test]
    fn families_join_onto_server() {
        let key: SecretString = "k".to_string().into();
        let api = EmonApi::new(
            "http://emon.local/emoncms",
            &key,
            Endpoints::default(),
            &TransportConfig::rest(),
        )
        .unwrap();
        assert_eq!(api.feeds.base_url().as_str(), "http://emon.local/emoncms/feed/");
        assert_eq!(
            api.profiles.base_url().as_str(),
            "http://emon.local/emoncms/device/template/"
        );
        assert_eq!(api.inputs.composer(), UrlComposer::Input);
    }
}

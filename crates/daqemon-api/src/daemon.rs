// Typed client for the DAQEMON daemon's JSON-RPC endpoint
//
// One method per daemon operation, each a thin wrapper over
// `RpcClient::invoke`. Response shapes are loosely typed: the daemon omits
// fields it has nothing to say about, so everything defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::Error;
use crate::rpc::RpcClient;

/// Whether the acquisition service is enabled at boot and running now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub running: bool,
}

/// Progress of a bus scan for slave ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// `false` while the scan is still running.
    #[serde(default)]
    pub done: Option<bool>,
    /// Percentage complete while running.
    #[serde(default)]
    pub stat: Option<u32>,
    #[serde(default)]
    pub ids: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortList {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// Answer to `saveconfig`: the configuration as the daemon accepted it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Number of samples waiting to be posted to the metering server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLength {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub queue: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Readings taken from one device during a `test` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub inputs: Vec<Value>,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Typed handle on the daemon.
#[derive(Debug)]
pub struct DaemonClient {
    rpc: RpcClient,
}

impl DaemonClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Invoke and decode; a `null` result decodes as an empty object.
    async fn call<T: DeserializeOwned>(&self, method: &str, args: Vec<Value>) -> Result<T, Error> {
        let result = match self.rpc.invoke(method, args).await? {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let text = result.to_string();
        serde_json::from_value(result).map_err(|e| Error::DecodeError {
            message: format!("{method}: {e}"),
            body: text,
        })
    }

    pub async fn status(&self) -> Result<ServiceStatus, Error> {
        self.call("status", vec![]).await
    }

    /// Start a scan, or poll a running one when `interfaces` is `None`.
    pub async fn scan(&self, interfaces: Option<&str>, count: Option<u32>) -> Result<ScanStatus, Error> {
        let mut args = Vec::new();
        if let Some(ifc) = interfaces {
            args.push(json!(ifc));
            if let Some(count) = count {
                args.push(json!(count));
            }
        }
        debug!(?interfaces, ?count, "scan");
        self.call("scan", args).await
    }

    pub async fn listports(&self) -> Result<PortList, Error> {
        self.call("listports", vec![]).await
    }

    /// Hand the full local configuration to the daemon. `persist` commits
    /// it to flash; otherwise it is staged.
    pub async fn saveconfig(&self, config: &Value, persist: bool) -> Result<SaveResult, Error> {
        self.call("saveconfig", vec![config.clone(), json!(persist)])
            .await
    }

    pub async fn erase(&self) -> Result<Ack, Error> {
        self.call("erase", vec![]).await
    }

    pub async fn enable(&self, on: bool) -> Result<ServiceStatus, Error> {
        self.call("enable", vec![json!(on)]).await
    }

    pub async fn start(&self, on: bool) -> Result<ServiceStatus, Error> {
        self.call("start", vec![json!(on)]).await
    }

    pub async fn restart(&self) -> Result<ServiceStatus, Error> {
        self.call("restart", vec![]).await
    }

    /// Read `inputs` once from the device at `slaveid`.
    pub async fn test(
        &self,
        interface: &Value,
        slaveid: u32,
        model: &str,
        inputs: &[String],
    ) -> Result<TestResult, Error> {
        let args = vec![interface.clone(), json!(slaveid), json!(model), json!(inputs)];
        self.call("test", args).await
    }

    pub async fn queuelen(&self) -> Result<QueueLength, Error> {
        self.call("queuelen", vec![]).await
    }

    /// Tell the daemon whether the server offers dashboards.
    pub async fn dashboards(&self, available: bool) -> Result<Ack, Error> {
        self.call("dashboards", vec![json!(available)]).await
    }

    /// Set the dashboard embedded in the admin panel.
    pub async fn dashboard(&self, url: &str) -> Result<Ack, Error> {
        self.call("dashboard", vec![json!(url)]).await
    }
}

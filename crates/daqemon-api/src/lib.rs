// daqemon-api: Async transport for the DAQEMON daemon (JSON-RPC) and the
// Emoncms metering server (REST)

pub mod auth;
pub mod daemon;
pub mod emon;
pub mod error;
pub mod rest;
pub mod rpc;
pub mod transport;

pub use auth::{AuthOutcome, AuthPolicy};
pub use daemon::{
    Ack, DaemonClient, PortList, QueueLength, SaveResult, ScanStatus, ServiceStatus, TestResult,
};
pub use emon::{
    BatchEvent, CreateOutcome, EmonApi, Endpoints, Operation, ResourceClient, ResourceKey,
    UrlComposer,
};
pub use error::Error;
pub use rest::RestClient;
pub use rpc::RpcClient;
pub use transport::{Body, Payload, TlsMode, TransportConfig};

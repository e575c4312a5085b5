// Input endpoints that sit outside the composer scheme
//
// Declaring inputs goes through the post endpoint, a node's input map is
// read by node id, and process lists are attached with a form-encoded POST.

use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use super::EmonApi;
use super::composer::encode;
use crate::error::Error;
use crate::transport::{Body, Payload};

impl EmonApi {
    /// Post values for `inputs` under `node`, creating any input the server
    /// has not seen. A `name -> null` map declares names without data.
    ///
    /// `GET {server}input/post?node={node}&fulljson={json}`
    pub async fn submit(&self, node: &str, inputs: &Value) -> Result<Payload, Error> {
        let path = self
            .endpoints
            .submit
            .replacen("{0}", &encode(node), 1)
            .replacen("{1}", &encode(&inputs.to_string()), 1);
        let url = self.server.join(&path)?;
        debug!(node, "submitting inputs");
        self.rest.get(url).await
    }

    /// The inputs of `node`, keyed by name.
    ///
    /// `GET {server}input/get/{node}`. Node ids are often numeric, so this
    /// bypasses the composer, which would read a numeric key as an input id.
    pub async fn node_inputs(&self, node: &str) -> Result<Payload, Error> {
        let url = self.inputs.base_url().join(&format!("get/{}", encode(node)))?;
        self.rest.get(url).await
    }

    /// Replace the process list attached to input `inputid`.
    ///
    /// `POST {server}input/process/set?inputid={id}` with
    /// `processlist=<encoding>` as the form body.
    pub async fn set_process_list(&self, inputid: i64, processlist: &str) -> Result<Payload, Error> {
        let url = self
            .server
            .join(&format!("{}{inputid}", self.endpoints.setproc))?;
        debug!(inputid, processlist, "setting process list");
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("processlist", processlist)
            .finish();
        self.rest.post(url, Body::Form(form)).await
    }
}

//! Typed access to the controller REST API.
//!
//! [`Controller`] turns raw [`ApiResponse`]s into the crate's error taxonomy:
//! transport faults, remote rejections, absence (`404`) and malformed bodies.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{PollPolicy, ProviderConfig};
use crate::error::{Error, Result};
use crate::model::Node;
use crate::resource::Deleted;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

/// API paths, relative to the `/v2` root.
pub mod paths {
    pub fn projects() -> String {
        "/projects".to_string()
    }

    pub fn project(project_id: &str) -> String {
        format!("/projects/{}", project_id)
    }

    pub fn project_open(project_id: &str) -> String {
        format!("/projects/{}/open", project_id)
    }

    pub fn compute_projects() -> String {
        "/compute/projects".to_string()
    }

    pub fn nodes(project_id: &str) -> String {
        format!("/projects/{}/nodes", project_id)
    }

    pub fn node(project_id: &str, node_id: &str) -> String {
        format!("/projects/{}/nodes/{}", project_id, node_id)
    }

    pub fn node_start(project_id: &str, node_id: &str) -> String {
        format!("/projects/{}/nodes/{}/start", project_id, node_id)
    }

    pub fn node_stop(project_id: &str, node_id: &str) -> String {
        format!("/projects/{}/nodes/{}/stop", project_id, node_id)
    }

    pub fn start_all(project_id: &str) -> String {
        format!("/projects/{}/nodes/start", project_id)
    }

    pub fn links(project_id: &str) -> String {
        format!("/projects/{}/links", project_id)
    }

    pub fn link(project_id: &str, link_id: &str) -> String {
        format!("/projects/{}/links/{}", project_id, link_id)
    }

    pub fn templates() -> String {
        "/templates".to_string()
    }

    pub fn template_instance(project_id: &str, template_id: &str) -> String {
        format!("/projects/{}/templates/{}", project_id, template_id)
    }
}

/// Handle to one controller. Cheap to share behind an `Arc`.
pub struct Controller {
    transport: Arc<dyn Transport>,
    poll: PollPolicy,
}

impl Controller {
    /// Connect over HTTP using the given configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let transport = HttpTransport::new(config).map_err(|source| Error::Transport {
            context: "failed to build HTTP client".to_string(),
            source,
        })?;
        info!("GNS3 provider configured with host: {}", config.host);
        Ok(Self::with_transport(Arc::new(transport), config.poll))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, poll: PollPolicy) -> Self {
        Self { transport, poll }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Issue a request; only transport faults are errors here.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        context: &str,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        self.transport
            .send(&request)
            .await
            .map_err(|source| Error::Transport {
                context: context.to_string(),
                source,
            })
    }

    /// `GET` a single record. `404` means absent.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<Option<T>> {
        let response = self.send(Method::Get, path, None, context).await?;
        match response.status {
            200 => decode(&response, context).map(Some),
            404 => {
                debug!(path, "resource not found on controller");
                Ok(None)
            }
            _ => Err(rejected(context, response)),
        }
    }

    /// `GET` a listing endpoint.
    pub async fn list<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<Vec<T>> {
        let response = self.send(Method::Get, path, None, context).await?;
        if response.status != 200 {
            return Err(rejected(context, response));
        }
        decode(&response, context)
    }

    /// `POST` a new resource; `201` and `200` both count as created.
    pub async fn create<B, T>(&self, path: &str, body: &B, context: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::Post, path, Some(body), context).await?;
        if !matches!(response.status, 200 | 201) {
            return Err(rejected(context, response));
        }
        decode(&response, context)
    }

    /// `PUT` an update; anything other than `200` is a rejection.
    pub async fn put<B>(&self, path: &str, body: &B, context: &str) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::Put, path, Some(body), context).await?;
        if response.status != 200 {
            return Err(rejected(context, response));
        }
        Ok(())
    }

    /// `PUT` an update to a resource that may have vanished. Returns `false`
    /// on `404`.
    pub async fn put_if_exists<B>(&self, path: &str, body: &B, context: &str) -> Result<bool>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::Put, path, Some(body), context).await?;
        match response.status {
            200 => Ok(true),
            404 => {
                debug!(path, "resource not found on controller");
                Ok(false)
            }
            _ => Err(rejected(context, response)),
        }
    }

    /// `DELETE` a resource; `404` means it was already gone.
    pub async fn delete(&self, path: &str, context: &str) -> Result<Deleted> {
        let response = self.send(Method::Delete, path, None, context).await?;
        match response.status {
            200 | 204 => Ok(Deleted::Removed),
            404 => Ok(Deleted::AlreadyGone),
            _ => Err(rejected(context, response)),
        }
    }

    /// `POST` an action endpoint and accept only the listed statuses.
    pub async fn action(
        &self,
        path: &str,
        body: Option<Value>,
        accepted: &[u16],
        context: &str,
    ) -> Result<u16> {
        let response = self.send(Method::Post, path, body, context).await?;
        if !accepted.contains(&response.status) {
            return Err(rejected(context, response));
        }
        Ok(response.status)
    }

    pub async fn get_node(&self, project_id: &str, node_id: &str) -> Result<Option<Node>> {
        self.fetch(&paths::node(project_id, node_id), "failed to read node")
            .await
    }

    pub async fn list_nodes(&self, project_id: &str) -> Result<Vec<Node>> {
        self.list(&paths::nodes(project_id), "failed to query nodes")
            .await
    }

    pub async fn start_node(&self, project_id: &str, node_id: &str) -> Result<()> {
        info!("Starting node {} in project {}", node_id, project_id);
        self.action(
            &paths::node_start(project_id, node_id),
            None,
            &[200, 204],
            "failed to start node",
        )
        .await?;
        Ok(())
    }

    /// Stop a node. `409` means it was not running and counts as success.
    pub async fn stop_node(&self, project_id: &str, node_id: &str) -> Result<()> {
        info!("Stopping node {} in project {}", node_id, project_id);
        let status = self
            .action(
                &paths::node_stop(project_id, node_id),
                None,
                &[200, 204, 409],
                "failed to stop node",
            )
            .await?;
        if status == 409 {
            debug!(node_id, "node already stopped");
        }
        Ok(())
    }

    pub async fn delete_node(&self, project_id: &str, node_id: &str) -> Result<Deleted> {
        info!("Deleting node {} in project {}", node_id, project_id);
        self.delete(&paths::node(project_id, node_id), "failed to delete node")
            .await
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse, context: &str) -> Result<T> {
    response.json().map_err(|e| Error::Malformed {
        context: context.to_string(),
        reason: e.to_string(),
    })
}

fn rejected(context: &str, response: ApiResponse) -> Error {
    Error::Rejected {
        context: context.to_string(),
        status: response.status,
        body: response.body,
    }
}

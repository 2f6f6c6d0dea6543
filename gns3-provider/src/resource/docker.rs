//! Docker container nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::info;

use super::{finish_node_create, Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::{self, ImportedId};
use crate::model::{CreateNodeRequest, Node};
use crate::updater::{NodeChanges, NodeUpdater};

fn default_compute_id() -> String {
    "local".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerSpec {
    pub project_id: String,
    pub name: String,
    #[serde(default = "default_compute_id")]
    pub compute_id: String,
    /// Image name; must already be available to the controller. Changing it
    /// requires replacing the node.
    pub image: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// `host_dir:container_dir` mappings.
    #[serde(default)]
    pub extra_volumes: Vec<String>,
    #[serde(default)]
    pub start: bool,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl DockerSpec {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            compute_id: default_compute_id(),
            image: image.into(),
            environment: BTreeMap::new(),
            extra_volumes: Vec::new(),
            start: false,
            x: None,
            y: None,
        }
    }

    /// Environment as the controller expects it: `K=V` pairs joined by commas.
    pub fn environment_string(&self) -> String {
        self.environment
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn create_request(&self) -> CreateNodeRequest {
        let mut props = Map::new();
        props.insert("image".into(), self.image.clone().into());
        props.insert("console_type".into(), "none".into());
        if !self.environment.is_empty() {
            props.insert("environment".into(), self.environment_string().into());
        }
        if !self.extra_volumes.is_empty() {
            props.insert("extra_volumes".into(), self.extra_volumes.clone().into());
        }

        let mut request = CreateNodeRequest::new(&self.name, "docker", &self.compute_id);
        request.x = self.x;
        request.y = self.y;
        request.properties = Some(props);
        request
    }

    pub fn changes_from(&self, prior: &DockerSpec) -> NodeChanges {
        let mut changes = NodeChanges::new();
        if prior.name != self.name {
            changes.rename(&self.name);
        }
        if prior.x != self.x {
            changes.set_x(self.x);
        }
        if prior.y != self.y {
            changes.set_y(self.y);
        }
        if prior.environment != self.environment {
            changes.set_property("environment", self.environment_string());
        }
        if prior.extra_volumes != self.extra_volumes {
            changes.set_property("extra_volumes", self.extra_volumes.clone());
        }
        if prior.start != self.start {
            changes.mark("start");
        }
        changes
    }
}

pub struct DockerNode {
    controller: Arc<Controller>,
}

impl DockerNode {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Resource for DockerNode {
    type Spec = DockerSpec;
    type State = Node;

    async fn create(&self, spec: &DockerSpec) -> Result<Node> {
        info!(
            "Creating Docker node {} ({}) in project {}",
            spec.name, spec.image, spec.project_id
        );
        let created: Node = self
            .controller
            .create(
                &paths::nodes(&spec.project_id),
                &spec.create_request(),
                "failed to create Docker node",
            )
            .await?;
        if created.node_id.is_empty() {
            return Err(Error::Malformed {
                context: "Docker node creation".to_string(),
                reason: "node_id not returned by controller".to_string(),
            });
        }
        finish_node_create(
            &self.controller,
            "Docker node",
            &spec.project_id,
            created,
            spec.start,
        )
        .await
    }

    async fn read(&self, spec: &DockerSpec, id: &str) -> Result<Option<Node>> {
        self.controller.get_node(&spec.project_id, id).await
    }

    async fn update(&self, id: &str, prior: &DockerSpec, desired: &DockerSpec) -> Result<Option<Node>> {
        let changes = desired.changes_from(prior);
        NodeUpdater::new(&self.controller)
            .update(&desired.project_id, id, &changes, desired.start)
            .await
    }

    async fn delete(&self, spec: &DockerSpec, id: &str) -> Result<Deleted> {
        self.controller.delete_node(&spec.project_id, id).await
    }

    fn import(&self, raw: &str) -> Result<ImportedId> {
        import::node(raw)
    }
}

//! Built-in nodes without hardware settings: cloud and ethernet switch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::{self, ImportedId};
use crate::model::{CreateNodeRequest, Node};
use crate::updater::NodeChanges;

fn default_compute_id() -> String {
    "local".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleNodeSpec {
    pub project_id: String,
    pub name: String,
    #[serde(default = "default_compute_id")]
    pub compute_id: String,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl SimpleNodeSpec {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            compute_id: default_compute_id(),
            x: None,
            y: None,
        }
    }

    fn changes_from(&self, prior: &SimpleNodeSpec) -> NodeChanges {
        let mut changes = NodeChanges::new();
        if prior.name != self.name {
            changes.rename(&self.name);
        }
        if prior.compute_id != self.compute_id {
            changes.set_compute_id(&self.compute_id);
        }
        if prior.x != self.x {
            changes.set_x(self.x);
        }
        if prior.y != self.y {
            changes.set_y(self.y);
        }
        changes
    }
}

/// A node kind created directly by `node_type`, updated with a plain `PUT`.
pub struct SimpleNode {
    controller: Arc<Controller>,
    node_type: &'static str,
}

impl SimpleNode {
    pub fn cloud(controller: Arc<Controller>) -> Self {
        Self {
            controller,
            node_type: "cloud",
        }
    }

    pub fn ethernet_switch(controller: Arc<Controller>) -> Self {
        Self {
            controller,
            node_type: "ethernet_switch",
        }
    }

    pub fn node_type(&self) -> &'static str {
        self.node_type
    }
}

#[async_trait]
impl Resource for SimpleNode {
    type Spec = SimpleNodeSpec;
    type State = Node;

    async fn create(&self, spec: &SimpleNodeSpec) -> Result<Node> {
        info!(
            "Creating {} node {} in project {}",
            self.node_type, spec.name, spec.project_id
        );
        let mut request = CreateNodeRequest::new(&spec.name, self.node_type, &spec.compute_id);
        request.x = spec.x;
        request.y = spec.y;

        let created: Node = self
            .controller
            .create(
                &paths::nodes(&spec.project_id),
                &request,
                &format!("failed to create {} node", self.node_type),
            )
            .await?;
        if created.node_id.is_empty() {
            return Err(Error::Malformed {
                context: format!("{} node creation", self.node_type),
                reason: "node_id not returned by controller".to_string(),
            });
        }
        Ok(created)
    }

    async fn read(&self, spec: &SimpleNodeSpec, id: &str) -> Result<Option<Node>> {
        self.controller.get_node(&spec.project_id, id).await
    }

    async fn update(
        &self,
        id: &str,
        prior: &SimpleNodeSpec,
        desired: &SimpleNodeSpec,
    ) -> Result<Option<Node>> {
        let changes = desired.changes_from(prior);
        if !changes.is_empty() {
            let found = self
                .controller
                .put_if_exists(
                    &paths::node(&desired.project_id, id),
                    &changes.to_update(None),
                    &format!("failed to update {} node", self.node_type),
                )
                .await?;
            if !found {
                warn!("Node {} vanished before update, clearing identity", id);
                return Ok(None);
            }
        }
        self.controller.get_node(&desired.project_id, id).await
    }

    async fn delete(&self, spec: &SimpleNodeSpec, id: &str) -> Result<Deleted> {
        self.controller.delete_node(&spec.project_id, id).await
    }

    fn import(&self, raw: &str) -> Result<ImportedId> {
        import::node(raw)
    }
}

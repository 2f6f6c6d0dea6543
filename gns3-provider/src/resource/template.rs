//! Nodes instantiated from a controller template (routers, appliances...).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{finish_node_create, Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::{self, ImportedId};
use crate::model::{Node, TemplateNodeRequest};
use crate::updater::NodeChanges;

fn default_compute_id() -> String {
    "local".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateNodeSpec {
    pub project_id: String,
    /// Changing the template requires replacing the node.
    pub template_id: String,
    pub name: String,
    #[serde(default = "default_compute_id")]
    pub compute_id: String,
    #[serde(default)]
    pub start: bool,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl TemplateNodeSpec {
    pub fn new(
        project_id: impl Into<String>,
        template_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            template_id: template_id.into(),
            name: name.into(),
            compute_id: default_compute_id(),
            start: false,
            x: None,
            y: None,
        }
    }
}

pub struct TemplateNode {
    controller: Arc<Controller>,
}

impl TemplateNode {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Resource for TemplateNode {
    type Spec = TemplateNodeSpec;
    type State = Node;

    async fn create(&self, spec: &TemplateNodeSpec) -> Result<Node> {
        info!(
            "Creating node {} from template {} in project {}",
            spec.name, spec.template_id, spec.project_id
        );
        let request = TemplateNodeRequest {
            name: spec.name.clone(),
            compute_id: spec.compute_id.clone(),
            x: spec.x,
            y: spec.y,
        };
        let created: Node = self
            .controller
            .create(
                &paths::template_instance(&spec.project_id, &spec.template_id),
                &request,
                "failed to create node from template",
            )
            .await?;
        if created.node_id.is_empty() {
            return Err(Error::Malformed {
                context: "template node creation".to_string(),
                reason: "node_id not returned by controller".to_string(),
            });
        }
        finish_node_create(
            &self.controller,
            "template node",
            &spec.project_id,
            created,
            spec.start,
        )
        .await
    }

    async fn read(&self, spec: &TemplateNodeSpec, id: &str) -> Result<Option<Node>> {
        self.controller.get_node(&spec.project_id, id).await
    }

    async fn update(
        &self,
        id: &str,
        prior: &TemplateNodeSpec,
        desired: &TemplateNodeSpec,
    ) -> Result<Option<Node>> {
        let mut changes = NodeChanges::new();
        if prior.name != desired.name {
            changes.rename(&desired.name);
        }
        if prior.compute_id != desired.compute_id {
            changes.set_compute_id(&desired.compute_id);
        }
        if prior.x != desired.x {
            changes.set_x(desired.x);
        }
        if prior.y != desired.y {
            changes.set_y(desired.y);
        }

        if !changes.is_empty() {
            let found = self
                .controller
                .put_if_exists(
                    &paths::node(&desired.project_id, id),
                    &changes.to_update(None),
                    "failed to update template node",
                )
                .await?;
            if !found {
                warn!("Node {} vanished before update, clearing identity", id);
                return Ok(None);
            }
        }
        if desired.start && !prior.start {
            self.controller.start_node(&desired.project_id, id).await?;
        }
        self.controller.get_node(&desired.project_id, id).await
    }

    async fn delete(&self, spec: &TemplateNodeSpec, id: &str) -> Result<Deleted> {
        self.controller.delete_node(&spec.project_id, id).await
    }

    fn import(&self, raw: &str) -> Result<ImportedId> {
        import::node(raw)
    }
}

//! Action resource that starts every node of a project.
//!
//! It has no remote counterpart: reading never touches the controller and
//! deleting only forgets the id. Updating re-triggers the start.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::ImportedId;
use crate::model::Identified;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAllSpec {
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAllState {
    pub id: String,
    pub project_id: String,
}

impl StartAllState {
    fn for_project(project_id: &str) -> Self {
        Self {
            id: format!("{}-start", project_id),
            project_id: project_id.to_string(),
        }
    }
}

impl Identified for StartAllState {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct StartAll {
    controller: Arc<Controller>,
}

impl StartAll {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Resource for StartAll {
    type Spec = StartAllSpec;
    type State = StartAllState;

    async fn create(&self, spec: &StartAllSpec) -> Result<StartAllState> {
        info!("Starting all nodes in project {}", spec.project_id);
        self.controller
            .action(
                &paths::start_all(&spec.project_id),
                Some(json!({})),
                &[200, 204],
                "failed to start all nodes",
            )
            .await?;
        Ok(StartAllState::for_project(&spec.project_id))
    }

    async fn read(&self, spec: &StartAllSpec, _id: &str) -> Result<Option<StartAllState>> {
        Ok(Some(StartAllState::for_project(&spec.project_id)))
    }

    async fn update(
        &self,
        _id: &str,
        _prior: &StartAllSpec,
        desired: &StartAllSpec,
    ) -> Result<Option<StartAllState>> {
        self.create(desired).await.map(Some)
    }

    async fn delete(&self, _spec: &StartAllSpec, _id: &str) -> Result<Deleted> {
        Ok(Deleted::Removed)
    }

    /// Imported by project id.
    fn import(&self, raw: &str) -> Result<ImportedId> {
        if raw.trim().is_empty() {
            return Err(Error::InvalidImportId {
                id: raw.to_string(),
                expected: "<project_id>",
            });
        }
        Ok(ImportedId {
            project_id: Some(raw.to_string()),
            id: StartAllState::for_project(raw).id,
        })
    }
}

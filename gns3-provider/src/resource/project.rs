//! Projects.
//!
//! A new project is registered on the controller, mirrored on the local
//! compute, then opened so nodes can be added to it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::{self, ImportedId};
use crate::model::{Project, ProjectRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub struct ProjectResource {
    controller: Arc<Controller>,
}

impl ProjectResource {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Resource for ProjectResource {
    type Spec = ProjectSpec;
    type State = Project;

    async fn create(&self, spec: &ProjectSpec) -> Result<Project> {
        info!("Creating project {}", spec.name);
        let request = ProjectRequest {
            name: spec.name.clone(),
            project_id: None,
        };
        let project: Project = self
            .controller
            .create(&paths::projects(), &request, "failed to create project")
            .await?;
        if project.project_id.is_empty() {
            return Err(Error::Malformed {
                context: "project creation".to_string(),
                reason: "project_id not returned by controller".to_string(),
            });
        }

        let project_id = project.project_id.clone();
        let finished: Result<()> = async {
            let compute = ProjectRequest {
                name: spec.name.clone(),
                project_id: Some(project_id.clone()),
            };
            self.controller
                .action(
                    &paths::compute_projects(),
                    Some(serde_json::to_value(&compute)?),
                    &[200, 201],
                    "failed to create project on compute",
                )
                .await?;
            self.controller
                .action(
                    &paths::project_open(&project_id),
                    None,
                    &[200, 201],
                    "failed to open project",
                )
                .await?;
            Ok(())
        }
        .await;
        finished.map_err(|e| Error::partially_created("project", project_id.clone(), e))?;

        Ok(project)
    }

    async fn read(&self, _spec: &ProjectSpec, id: &str) -> Result<Option<Project>> {
        if id.is_empty() {
            return Ok(None);
        }
        let project: Option<Project> = self
            .controller
            .fetch(&paths::project(id), "failed to read project")
            .await?;
        match project {
            Some(project) if project.project_id.is_empty() => {
                warn!(id, "controller returned a project without project_id");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn update(
        &self,
        id: &str,
        prior: &ProjectSpec,
        desired: &ProjectSpec,
    ) -> Result<Option<Project>> {
        if prior.name != desired.name {
            info!("Renaming project {} to {}", id, desired.name);
            let request = ProjectRequest {
                name: desired.name.clone(),
                project_id: None,
            };
            let found = self
                .controller
                .put_if_exists(&paths::project(id), &request, "failed to update project")
                .await?;
            if !found {
                warn!("Project {} vanished before update, clearing identity", id);
                return Ok(None);
            }
        }
        self.read(desired, id).await
    }

    async fn delete(&self, _spec: &ProjectSpec, id: &str) -> Result<Deleted> {
        info!("Deleting project {}", id);
        self.controller
            .delete(&paths::project(id), "failed to delete project")
            .await
    }

    fn import(&self, raw: &str) -> Result<ImportedId> {
        import::project(raw)
    }
}

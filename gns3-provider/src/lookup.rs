//! Resolve controller ids by name.

use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::model::{Identified, Link, Node, Project, Template};

/// Id of the template called `name`.
pub async fn template_id(controller: &Controller, name: &str) -> Result<String> {
    let templates: Vec<Template> = controller
        .list(&paths::templates(), "failed to query templates")
        .await?;
    let template = templates
        .into_iter()
        .find(|t| t.name == name)
        .ok_or_else(|| Error::NotFound {
            kind: "template",
            name: name.to_string(),
            scope: "controller".to_string(),
        })?;
    if template.id().is_empty() {
        return Err(Error::Malformed {
            context: "failed to query templates".to_string(),
            reason: format!("template '{}' has no id", name),
        });
    }
    Ok(template.id().to_string())
}

/// Id of the node called `name` in a project.
pub async fn node_id(controller: &Controller, project_id: &str, name: &str) -> Result<String> {
    let nodes: Vec<Node> = controller.list_nodes(project_id).await?;
    nodes
        .into_iter()
        .find(|n| n.name == name)
        .map(|n| n.node_id)
        .ok_or_else(|| Error::NotFound {
            kind: "node",
            name: name.to_string(),
            scope: format!("project {}", project_id),
        })
}

/// Id of the link called `name` in a project.
pub async fn link_id(controller: &Controller, project_id: &str, name: &str) -> Result<String> {
    let links: Vec<Link> = controller
        .list(&paths::links(project_id), "failed to query links")
        .await?;
    links
        .into_iter()
        .find(|l| l.name.as_deref() == Some(name))
        .map(|l| l.link_id)
        .ok_or_else(|| Error::NotFound {
            kind: "link",
            name: name.to_string(),
            scope: format!("project {}", project_id),
        })
}

/// Id of the first project the controller lists.
pub async fn first_project_id(controller: &Controller) -> Result<String> {
    let projects: Vec<Project> = controller
        .list(&paths::projects(), "failed to query projects")
        .await?;
    projects
        .into_iter()
        .map(|p| p.project_id)
        .find(|id| !id.is_empty())
        .ok_or_else(|| Error::NotFound {
            kind: "project",
            name: "*".to_string(),
            scope: "controller".to_string(),
        })
}

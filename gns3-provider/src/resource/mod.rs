//! Resource lifecycles.
//!
//! Each resource kind maps one declared entity to one controller resource.
//! The host framework decides when to call which operation and remembers the
//! last known spec so `update` can compute what changed.

pub mod docker;
pub mod link;
pub mod project;
pub mod qemu;
pub mod simple_node;
pub mod start_all;
pub mod template;

use async_trait::async_trait;

use crate::client::Controller;
use crate::error::{Error, Result};
use crate::import::ImportedId;
use crate::model::{Identified, Node};

pub use docker::{DockerNode, DockerSpec};
pub use link::{LinkResource, LinkSpec};
pub use project::{ProjectResource, ProjectSpec};
pub use qemu::{QemuNode, QemuSpec};
pub use simple_node::{SimpleNode, SimpleNodeSpec};
pub use start_all::{StartAll, StartAllSpec, StartAllState};
pub use template::{TemplateNode, TemplateNodeSpec};

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Removed,
    /// The controller no longer knew the resource; nothing to remove.
    AlreadyGone,
}

/// Create / read / update / delete for one resource kind.
///
/// `read` and `update` return `None` when the remote resource is gone: the
/// caller must forget the stored id rather than keep a stale reference.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Declared configuration.
    type Spec: Send + Sync;
    /// Remote representation; carries the controller-assigned id.
    type State: Identified + Send;

    async fn create(&self, spec: &Self::Spec) -> Result<Self::State>;

    async fn read(&self, spec: &Self::Spec, id: &str) -> Result<Option<Self::State>>;

    async fn update(
        &self,
        id: &str,
        prior: &Self::Spec,
        desired: &Self::Spec,
    ) -> Result<Option<Self::State>>;

    async fn delete(&self, spec: &Self::Spec, id: &str) -> Result<Deleted>;

    /// Parse an import identifier into the id and, where needed, its project.
    fn import(&self, raw: &str) -> Result<ImportedId>;
}

/// Start the freshly created node if requested, then refresh it.
///
/// The node already exists at this point, so a failure is reported as
/// [`Error::PartiallyCreated`] carrying its id.
pub(crate) async fn finish_node_create(
    controller: &Controller,
    kind: &'static str,
    project_id: &str,
    created: Node,
    start: bool,
) -> Result<Node> {
    let node_id = created.node_id.clone();
    let finished: Result<Node> = async {
        if start {
            controller.start_node(project_id, &node_id).await?;
        }
        Ok(controller
            .get_node(project_id, &node_id)
            .await?
            .unwrap_or(created))
    }
    .await;
    finished.map_err(|e| Error::partially_created(kind, node_id.clone(), e))
}

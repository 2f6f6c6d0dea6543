//! Links between two node ports.
//!
//! A link is only created once both endpoint nodes are listed by the
//! controller; freshly created nodes can take a moment to become visible.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::{self, ImportedId};
use crate::model::{Link, LinkEndpoint, LinkRequest};
use crate::poller::ReadinessPoller;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub project_id: String,
    pub node_a: LinkEndpoint,
    pub node_b: LinkEndpoint,
}

impl LinkSpec {
    pub fn new(project_id: impl Into<String>, node_a: LinkEndpoint, node_b: LinkEndpoint) -> Self {
        Self {
            project_id: project_id.into(),
            node_a,
            node_b,
        }
    }

    pub fn request(&self) -> LinkRequest {
        LinkRequest {
            nodes: [self.node_a.clone(), self.node_b.clone()],
        }
    }
}

pub struct LinkResource {
    controller: Arc<Controller>,
}

impl LinkResource {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }

    async fn wait_for_endpoints(&self, spec: &LinkSpec) -> Result<()> {
        let poller = ReadinessPoller::new(&self.controller);
        poller
            .wait_for_node(&spec.project_id, &spec.node_a.node_id)
            .await?;
        poller
            .wait_for_node(&spec.project_id, &spec.node_b.node_id)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for LinkResource {
    type Spec = LinkSpec;
    type State = Link;

    async fn create(&self, spec: &LinkSpec) -> Result<Link> {
        self.wait_for_endpoints(spec).await?;

        info!(
            "Creating link {}:{}/{} <-> {}:{}/{} in project {}",
            spec.node_a.node_id,
            spec.node_a.adapter_number,
            spec.node_a.port_number,
            spec.node_b.node_id,
            spec.node_b.adapter_number,
            spec.node_b.port_number,
            spec.project_id
        );
        let link: Link = self
            .controller
            .create(
                &paths::links(&spec.project_id),
                &spec.request(),
                "failed to create link",
            )
            .await?;
        if link.link_id.is_empty() {
            return Err(Error::Malformed {
                context: "link creation".to_string(),
                reason: "link_id not returned by controller".to_string(),
            });
        }
        Ok(link)
    }

    async fn read(&self, spec: &LinkSpec, id: &str) -> Result<Option<Link>> {
        self.controller
            .fetch(&paths::link(&spec.project_id, id), "failed to read link")
            .await
    }

    async fn update(&self, id: &str, prior: &LinkSpec, desired: &LinkSpec) -> Result<Option<Link>> {
        if prior != desired {
            info!("Updating link {} in project {}", id, desired.project_id);
            self.wait_for_endpoints(desired).await?;
            let found = self
                .controller
                .put_if_exists(
                    &paths::link(&desired.project_id, id),
                    &desired.request(),
                    "failed to update link",
                )
                .await?;
            if !found {
                warn!("Link {} vanished before update, clearing identity", id);
                return Ok(None);
            }
        }
        self.read(desired, id).await
    }

    async fn delete(&self, spec: &LinkSpec, id: &str) -> Result<Deleted> {
        info!("Deleting link {} in project {}", id, spec.project_id);
        self.controller
            .delete(&paths::link(&spec.project_id, id), "failed to delete link")
            .await
    }

    fn import(&self, raw: &str) -> Result<ImportedId> {
        import::link(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollPolicy;
    use crate::test_util::MockTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    const NODES: &str = "/projects/p1/nodes";
    const LINKS: &str = "/projects/p1/links";

    fn links(mock: &Arc<MockTransport>) -> LinkResource {
        LinkResource::new(Arc::new(Controller::with_transport(
            mock.clone(),
            PollPolicy::default(),
        )))
    }

    fn alpha_beta() -> LinkSpec {
        LinkSpec::new(
            "p1",
            LinkEndpoint::new("alpha", 0, 0),
            LinkEndpoint::new("beta", 0, 1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_waits_for_both_endpoints() {
        let mock = Arc::new(MockTransport::new());
        // alpha is listed from the start; beta only shows up on its third poll.
        mock.reply(Method::Get, NODES, 200, json!([{"node_id": "alpha"}]))
            .reply(Method::Get, NODES, 200, json!([{"node_id": "alpha"}]))
            .reply(Method::Get, NODES, 200, json!([{"node_id": "alpha"}]))
            .reply(
                Method::Get,
                NODES,
                200,
                json!([{"node_id": "alpha"}, {"node_id": "beta"}]),
            );
        mock.reply(
            Method::Post,
            LINKS,
            201,
            json!({"link_id": "l1", "nodes": [
                {"node_id": "alpha", "adapter_number": 0, "port_number": 0},
                {"node_id": "beta", "adapter_number": 0, "port_number": 1},
            ]}),
        );

        let start = Instant::now();
        let link = links(&mock).create(&alpha_beta()).await.unwrap();

        assert_eq!(link.link_id, "l1");
        let calls = mock.calls();
        let post = calls.iter().position(|c| c == "POST /projects/p1/links").unwrap();
        assert_eq!(post, 4);
        assert!(calls[..post].iter().all(|c| c == "GET /projects/p1/nodes"));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(
            mock.last_body(Method::Post, LINKS).unwrap(),
            json!({"nodes": [
                {"node_id": "alpha", "adapter_number": 0, "port_number": 0},
                {"node_id": "beta", "adapter_number": 0, "port_number": 1},
            ]})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_link_request_when_endpoint_never_appears() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(Method::Get, NODES, 200, json!([{"node_id": "alpha"}]));

        let err = links(&mock).create(&alpha_beta()).await.unwrap_err();

        assert!(matches!(err, Error::NotFoundAfterPolling { .. }));
        assert!(err.to_string().contains("beta"));
        assert_eq!(mock.count(Method::Post, LINKS), 0);
        assert_eq!(mock.count(Method::Get, NODES), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_link_id_is_malformed() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Get,
            NODES,
            200,
            json!([{"node_id": "alpha"}, {"node_id": "beta"}]),
        );
        mock.reply(Method::Post, LINKS, 201, json!({}));

        let err = links(&mock).create(&alpha_beta()).await.unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_unchanged_update_only_reads() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(Method::Get, "/projects/p1/links/l1", 200, json!({"link_id": "l1"}));

        let spec = alpha_beta();
        let link = links(&mock).update("l1", &spec, &spec).await.unwrap();

        assert_eq!(link.unwrap().link_id, "l1");
        assert_eq!(mock.calls(), vec!["GET /projects/p1/links/l1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_of_vanished_link_clears_identity() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Get,
            NODES,
            200,
            json!([{"node_id": "alpha"}, {"node_id": "beta"}]),
        );
        mock.reply(Method::Put, "/projects/p1/links/l1", 404, json!({}));

        let prior = alpha_beta();
        let desired = LinkSpec::new(
            "p1",
            LinkEndpoint::new("alpha", 0, 1),
            LinkEndpoint::new("beta", 0, 1),
        );
        let link = links(&mock).update("l1", &prior, &desired).await.unwrap();

        assert!(link.is_none());
        assert_eq!(mock.count(Method::Get, "/projects/p1/links/l1"), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_link_succeeds() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(Method::Delete, "/projects/p1/links/l1", 404, json!({}));

        let outcome = links(&mock).delete(&alpha_beta(), "l1").await.unwrap();
        assert_eq!(outcome, Deleted::AlreadyGone);
    }

    #[test]
    fn test_import_requires_project() {
        let mock = Arc::new(MockTransport::new());
        let imported = links(&mock).import("p1/l1").unwrap();
        assert_eq!(imported.project_id.as_deref(), Some("p1"));
        assert_eq!(imported.id, "l1");
        assert!(links(&mock).import("l1").is_err());
    }
}

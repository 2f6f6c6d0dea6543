//! Readiness poller.
//!
//! Links may only be created once both endpoint nodes are visible to the
//! controller. The poller lists a collection until the target id shows up,
//! sleeping `interval` between attempts. A transport fault, a rejected listing
//! or an undecodable body aborts the wait immediately.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{paths, Controller};
use crate::config::PollPolicy;
use crate::error::{Error, Result};
use crate::model::{Identified, Node};

pub struct ReadinessPoller<'a> {
    controller: &'a Controller,
    policy: PollPolicy,
}

impl<'a> ReadinessPoller<'a> {
    /// Poller using the controller's configured policy.
    pub fn new(controller: &'a Controller) -> Self {
        Self::with_policy(controller, controller.poll_policy())
    }

    pub fn with_policy(controller: &'a Controller, policy: PollPolicy) -> Self {
        Self { controller, policy }
    }

    /// Wait until `node_id` is listed in the project's nodes.
    pub async fn wait_for_node(&self, project_id: &str, node_id: &str) -> Result<Node> {
        self.wait_until_listed(
            "node",
            &paths::nodes(project_id),
            &format!("project {}", project_id),
            node_id,
        )
        .await
    }

    /// Wait until a record with id `target` appears in the listing at `path`.
    pub async fn wait_until_listed<T>(
        &self,
        kind: &'static str,
        path: &str,
        scope: &str,
        target: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned + Identified,
    {
        let attempts = self.policy.max_attempts.max(1);
        let context = format!("failed to query {}s in {}", kind, scope);

        for attempt in 1..=attempts {
            let records: Vec<T> = self.controller.list(path, &context).await?;
            if let Some(found) = records.into_iter().find(|r| r.id() == target) {
                debug!(kind, target, attempt, "resource listed by controller");
                return Ok(found);
            }

            debug!(kind, target, attempt, attempts, "resource not listed yet");
            if attempt < attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(Error::NotFoundAfterPolling {
            kind,
            target: target.to_string(),
            scope: scope.to_string(),
            attempts,
        })
    }
}

//! Stop / modify / restart protocol for mutable nodes.
//!
//! Some node properties can only be changed while the node is stopped, so an
//! update always runs the same sequence:
//!
//! 1. `GET` the live node (`404` ⇒ gone, identity must be cleared)
//! 2. `POST .../stop` if it reports `started` (`409` counts as stopped)
//! 3. overlay the changed properties onto the live property bag
//! 4. `PUT` the changed top-level fields plus the merged bag
//! 5. `POST .../start` if it was running or should be running
//! 6. `GET` again and hand back the refreshed node
//!
//! With no changes the whole sequence collapses into the final read.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::client::{paths, Controller};
use crate::error::Result;
use crate::model::{Node, NodeUpdate};

/// What to do with one key of the property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyChange {
    Set(Value),
    Remove,
}

/// The declared fields that differ between the last known and desired spec.
///
/// Top-level values are only sent when `Some`: a field that changed to
/// "unset" still counts as a change but is left out of the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChanges {
    changed: BTreeSet<String>,
    pub name: Option<String>,
    pub compute_id: Option<String>,
    pub console: Option<u16>,
    pub console_type: Option<String>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub properties: BTreeMap<String, PropertyChange>,
}

impl NodeChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Names of the declared fields that changed.
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// Record a change that has no payload of its own (e.g. the desired run state).
    pub fn mark(&mut self, field: &str) {
        self.changed.insert(field.to_string());
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.mark("name");
        self.name = Some(name.into());
    }

    pub fn set_compute_id(&mut self, compute_id: impl Into<String>) {
        self.mark("compute_id");
        self.compute_id = Some(compute_id.into());
    }

    pub fn set_console(&mut self, console: Option<u16>) {
        self.mark("console");
        self.console = console;
    }

    pub fn set_console_type(&mut self, console_type: impl Into<String>) {
        self.mark("console_type");
        self.console_type = Some(console_type.into());
    }

    pub fn set_x(&mut self, x: Option<i32>) {
        self.mark("x");
        self.x = x;
    }

    pub fn set_y(&mut self, y: Option<i32>) {
        self.mark("y");
        self.y = y;
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<Value>) {
        self.mark(key);
        self.properties
            .insert(key.to_string(), PropertyChange::Set(value.into()));
    }

    pub fn remove_property(&mut self, key: &str) {
        self.mark(key);
        self.properties
            .insert(key.to_string(), PropertyChange::Remove);
    }

    /// Set the key when a value is given, remove it otherwise.
    pub fn set_or_remove_property<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        match value {
            Some(value) => self.set_property(key, value),
            None => self.remove_property(key),
        }
    }

    /// Apply the property changes to a live bag. Untouched keys are kept.
    pub fn overlay(&self, bag: &mut Map<String, Value>) {
        for (key, change) in &self.properties {
            match change {
                PropertyChange::Set(value) => {
                    bag.insert(key.clone(), value.clone());
                }
                PropertyChange::Remove => {
                    bag.remove(key);
                }
            }
        }
    }

    /// Build the `PUT` body from the changed top-level fields and a bag.
    pub fn to_update(&self, properties: Option<Map<String, Value>>) -> NodeUpdate {
        NodeUpdate {
            name: self.name.clone(),
            compute_id: self.compute_id.clone(),
            console: self.console,
            console_type: self.console_type.clone(),
            x: self.x,
            y: self.y,
            properties,
        }
    }
}

/// Runs the update protocol against one controller.
pub struct NodeUpdater<'a> {
    controller: &'a Controller,
}

impl<'a> NodeUpdater<'a> {
    pub fn new(controller: &'a Controller) -> Self {
        Self { controller }
    }

    /// Apply `changes` to a node. Returns `None` when the node no longer exists.
    ///
    /// `run_after` requests a start after the update even if the node was
    /// stopped beforehand.
    pub async fn update(
        &self,
        project_id: &str,
        node_id: &str,
        changes: &NodeChanges,
        run_after: bool,
    ) -> Result<Option<Node>> {
        if changes.is_empty() {
            return self.controller.get_node(project_id, node_id).await;
        }

        let Some(live) = self
            .controller
            .fetch::<Node>(
                &paths::node(project_id, node_id),
                "failed to read node (pre-update)",
            )
            .await?
        else {
            warn!("Node {} vanished before update, clearing identity", node_id);
            return Ok(None);
        };

        let fields: Vec<&str> = changes.changed_fields().collect();
        info!(
            node_id,
            status = ?live.status,
            changed = ?fields,
            "Updating node"
        );

        let was_running = live.status.is_running();
        if was_running {
            self.controller.stop_node(project_id, node_id).await?;
        }

        let mut properties = live.properties;
        changes.overlay(&mut properties);

        let update = changes.to_update(Some(properties));
        self.controller
            .put(
                &paths::node(project_id, node_id),
                &update,
                "update node failed",
            )
            .await?;

        if was_running || run_after {
            self.controller.start_node(project_id, node_id).await?;
        }

        self.controller.get_node(project_id, node_id).await
    }
}

//! QEMU VM nodes.
//!
//! The only node kind whose hardware settings can change in place; updates go
//! through the [`NodeUpdater`] stop / modify / restart protocol.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::{finish_node_create, Deleted, Resource};
use crate::client::{paths, Controller};
use crate::error::{Error, Result};
use crate::import::{self, ImportedId};
use crate::model::{CreateNodeRequest, Node};
use crate::updater::{NodeChanges, NodeUpdater};

const HDA_DISK_INTERFACE: &str = "virtio";

fn default_adapter_type() -> String {
    "e1000".to_string()
}

fn default_console_type() -> String {
    "telnet".to_string()
}

fn default_one() -> u32 {
    1
}

fn default_ram() -> u32 {
    256
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QemuSpec {
    pub project_id: String,
    pub name: String,
    #[serde(default = "default_adapter_type")]
    pub adapter_type: String,
    #[serde(default = "default_one")]
    pub adapters: u32,
    pub bios_image: Option<String>,
    pub cdrom_image: Option<String>,
    /// Console TCP port; the controller picks one when unset.
    pub console: Option<u16>,
    #[serde(default = "default_console_type")]
    pub console_type: String,
    #[serde(default = "default_one")]
    pub cpus: u32,
    /// RAM in MB.
    #[serde(default = "default_ram")]
    pub ram: u32,
    pub mac_address: Option<String>,
    /// Extra QEMU command line options.
    pub options: Option<String>,
    /// Guest architecture (`x86_64`, `aarch64`, ...), selects the QEMU binary.
    pub platform: Option<String>,
    pub hda_disk_image: Option<String>,
    /// Start after create, and after every update.
    #[serde(default)]
    pub start_vm: bool,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl QemuSpec {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            adapter_type: default_adapter_type(),
            adapters: default_one(),
            bios_image: None,
            cdrom_image: None,
            console: None,
            console_type: default_console_type(),
            cpus: default_one(),
            ram: default_ram(),
            mac_address: None,
            options: None,
            platform: None,
            hda_disk_image: None,
            start_vm: false,
            x: None,
            y: None,
        }
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("adapter_type".into(), self.adapter_type.clone().into());
        props.insert("adapters".into(), self.adapters.into());
        props.insert("ram".into(), self.ram.into());
        props.insert("cpus".into(), self.cpus.into());
        let optional = [
            ("bios_image", &self.bios_image),
            ("cdrom_image", &self.cdrom_image),
            ("mac_address", &self.mac_address),
            ("options", &self.options),
            ("platform", &self.platform),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                props.insert(key.into(), value.clone().into());
            }
        }
        if let Some(image) = &self.hda_disk_image {
            props.insert("hda_disk_image".into(), image.clone().into());
            props.insert("hda_disk_interface".into(), HDA_DISK_INTERFACE.into());
        }
        props
    }

    /// Body of the create request.
    pub fn create_request(&self) -> CreateNodeRequest {
        let mut request = CreateNodeRequest::new(&self.name, "qemu", "local");
        request.console = self.console;
        request.console_type = Some(self.console_type.clone());
        request.x = self.x;
        request.y = self.y;
        request.properties = Some(self.properties());
        request
    }

    /// Fields that differ from `prior`, as updater changes.
    pub fn changes_from(&self, prior: &QemuSpec) -> NodeChanges {
        let mut changes = NodeChanges::new();

        if prior.name != self.name {
            changes.rename(&self.name);
        }
        if prior.console != self.console {
            changes.set_console(self.console);
        }
        if prior.console_type != self.console_type {
            changes.set_console_type(&self.console_type);
        }
        if prior.x != self.x {
            changes.set_x(self.x);
        }
        if prior.y != self.y {
            changes.set_y(self.y);
        }

        if prior.adapter_type != self.adapter_type {
            changes.set_property("adapter_type", self.adapter_type.clone());
        }
        if prior.adapters != self.adapters {
            changes.set_property("adapters", self.adapters);
        }
        if prior.cpus != self.cpus {
            changes.set_property("cpus", self.cpus);
        }
        if prior.ram != self.ram {
            changes.set_property("ram", self.ram);
        }

        let optional = [
            ("bios_image", &prior.bios_image, &self.bios_image),
            ("cdrom_image", &prior.cdrom_image, &self.cdrom_image),
            ("mac_address", &prior.mac_address, &self.mac_address),
            ("options", &prior.options, &self.options),
            ("platform", &prior.platform, &self.platform),
        ];
        for (key, before, after) in optional {
            if before != after {
                changes.set_or_remove_property(key, after.clone());
            }
        }

        if prior.hda_disk_image != self.hda_disk_image {
            match &self.hda_disk_image {
                Some(image) => {
                    changes.set_property("hda_disk_image", image.clone());
                    changes.set_property("hda_disk_interface", HDA_DISK_INTERFACE);
                }
                None => {
                    changes.remove_property("hda_disk_image");
                    changes.remove_property("hda_disk_interface");
                }
            }
        }

        if prior.start_vm != self.start_vm {
            changes.mark("start_vm");
        }

        changes
    }
}

pub struct QemuNode {
    controller: Arc<Controller>,
}

impl QemuNode {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Resource for QemuNode {
    type Spec = QemuSpec;
    type State = Node;

    async fn create(&self, spec: &QemuSpec) -> Result<Node> {
        info!("Creating QEMU node {} in project {}", spec.name, spec.project_id);

        let created: Node = self
            .controller
            .create(
                &paths::nodes(&spec.project_id),
                &spec.create_request(),
                "controller rejected QEMU node creation",
            )
            .await?;
        if created.node_id.is_empty() {
            return Err(Error::Malformed {
                context: "QEMU node creation".to_string(),
                reason: "node_id not returned by controller".to_string(),
            });
        }

        // The record is refreshed to pick up controller-assigned fields.
        finish_node_create(
            &self.controller,
            "QEMU node",
            &spec.project_id,
            created,
            spec.start_vm,
        )
        .await
    }

    async fn read(&self, spec: &QemuSpec, id: &str) -> Result<Option<Node>> {
        self.controller.get_node(&spec.project_id, id).await
    }

    async fn update(&self, id: &str, prior: &QemuSpec, desired: &QemuSpec) -> Result<Option<Node>> {
        let changes = desired.changes_from(prior);
        NodeUpdater::new(&self.controller)
            .update(&desired.project_id, id, &changes, desired.start_vm)
            .await
    }

    async fn delete(&self, spec: &QemuSpec, id: &str) -> Result<Deleted> {
        self.controller.delete_node(&spec.project_id, id).await
    }

    fn import(&self, raw: &str) -> Result<ImportedId> {
        import::node(raw)
    }
}

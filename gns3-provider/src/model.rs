//! Wire records exchanged with the controller.
//!
//! Optional scalars are `Option` and skipped when `None`, so an explicit zero
//! coordinate is sent while an unset one is left out of the payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Records that carry a controller-assigned identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Run state reported in a node's `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Started,
    #[default]
    Stopped,
    Suspended,
    Other(String),
}

impl NodeStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, NodeStatus::Started)
    }
}

impl From<String> for NodeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "started" => NodeStatus::Started,
            "stopped" => NodeStatus::Stopped,
            "suspended" => NodeStatus::Suspended,
            _ => NodeStatus::Other(s),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Started => "started".to_string(),
            NodeStatus::Stopped => "stopped".to_string(),
            NodeStatus::Suspended => "suspended".to_string(),
            NodeStatus::Other(s) => s,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node as reported by `GET /projects/{p}/nodes[/{id}]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, alias = "nodeId")]
    pub node_id: String,
    #[serde(default, alias = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "nodeType", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, alias = "computeId", skip_serializing_if = "Option::is_none")]
    pub compute_id: Option<String>,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<u16>,
    #[serde(default, alias = "consoleType", skip_serializing_if = "Option::is_none")]
    pub console_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    /// Kind-specific property bag; unknown keys are preserved verbatim.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

impl Identified for Node {
    fn id(&self) -> &str {
        &self.node_id
    }
}

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    #[serde(alias = "nodeId")]
    pub node_id: String,
    #[serde(alias = "adapterNumber")]
    pub adapter_number: u32,
    #[serde(alias = "portNumber")]
    pub port_number: u32,
}

impl LinkEndpoint {
    pub fn new(node_id: impl Into<String>, adapter_number: u32, port_number: u32) -> Self {
        Self {
            node_id: node_id.into(),
            adapter_number,
            port_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, alias = "linkId")]
    pub link_id: String,
    #[serde(default, alias = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<LinkEndpoint>,
}

impl Identified for Link {
    fn id(&self) -> &str {
        &self.link_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, alias = "projectId")]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Identified for Project {
    fn id(&self) -> &str {
        &self.project_id
    }
}

/// Template listing entry. Older controllers name the id field `id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, alias = "templateId", skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "templateType", skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
}

impl Identified for Template {
    fn id(&self) -> &str {
        self.template_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

/// Body of `POST /projects/{p}/nodes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateNodeRequest {
    pub name: String,
    pub node_type: String,
    pub compute_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl CreateNodeRequest {
    pub fn new(
        name: impl Into<String>,
        node_type: impl Into<String>,
        compute_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            compute_id: compute_id.into(),
            console: None,
            console_type: None,
            x: None,
            y: None,
            properties: None,
        }
    }
}

/// Body of `POST /projects/{p}/templates/{t}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateNodeRequest {
    pub name: String,
    pub compute_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

/// Body of `PUT /projects/{p}/nodes/{id}`; only the fields that are set are sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

/// Body of link create and update: exactly two ordered endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRequest {
    pub nodes: [LinkEndpoint; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

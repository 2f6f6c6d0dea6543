//! gns3-provider: reconciles declared GNS3 topologies against a running controller.
//!
//! Each declared entity (project, node, link) maps to one remote resource on the
//! controller's v2 REST API. This crate provides:
//! - [`Controller`]: typed request plumbing over a pluggable [`Transport`]
//! - [`ReadinessPoller`]: waits until nodes are listed before links are created
//! - [`NodeUpdater`]: the stop / modify / restart protocol for mutable nodes
//! - [`resource`]: create / read / update / delete per resource kind
//! - [`lookup`]: resolve ids by name (templates, nodes, links, projects)

pub mod client;
pub mod config;
pub mod error;
pub mod import;
pub mod lookup;
pub mod model;
pub mod poller;
pub mod resource;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
pub mod transport;
pub mod updater;

pub use client::Controller;
pub use config::{PollPolicy, ProviderConfig};
pub use error::{Error, Result};
pub use import::ImportedId;
pub use model::{Identified, Link, LinkEndpoint, Node, NodeStatus, Project, Template};
pub use poller::ReadinessPoller;
pub use resource::{Deleted, Resource};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
pub use updater::{NodeChanges, NodeUpdater, PropertyChange};

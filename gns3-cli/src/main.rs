use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gns3_provider::config::{DEFAULT_HOST, HOST_ENV};
use gns3_provider::resource::{
    DockerNode, LinkResource, ProjectResource, QemuNode, SimpleNode, StartAll, TemplateNode,
};
use gns3_provider::{lookup, Controller, Identified, Node, PollPolicy, ProviderConfig, Resource};

#[derive(Parser)]
#[command(name = "gns3ctl", version)]
#[command(about = "Manage GNS3 projects, nodes and links", long_about = None)]
struct Cli {
    /// Controller URL
    #[arg(long, env = HOST_ENV, default_value = DEFAULT_HOST)]
    host: String,

    /// Node listings issued while waiting for link endpoints
    #[arg(long, default_value = "10")]
    poll_attempts: u32,

    /// Delay between two node listings, in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Per-request timeout in seconds (unset = wait indefinitely)
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Projects
    Project {
        #[command(subcommand)]
        op: Op,
    },

    /// QEMU virtual machines
    Qemu {
        #[command(subcommand)]
        op: Op,
    },

    /// Docker containers
    Docker {
        #[command(subcommand)]
        op: Op,
    },

    /// Cloud nodes
    Cloud {
        #[command(subcommand)]
        op: Op,
    },

    /// Ethernet switches
    Switch {
        #[command(subcommand)]
        op: Op,
    },

    /// Nodes instantiated from a template
    Template {
        #[command(subcommand)]
        op: Op,
    },

    /// Links between node ports
    Link {
        #[command(subcommand)]
        op: Op,
    },

    /// Start every node of a project
    StartAll {
        #[command(subcommand)]
        op: Op,
    },

    /// Resolve an id by name
    Lookup {
        #[command(subcommand)]
        what: Lookup,
    },

    /// List the nodes of a project
    Nodes {
        /// Project ID
        project_id: String,
    },
}

#[derive(Subcommand)]
enum Op {
    /// Create the resource described by a JSON spec file
    Create { spec: PathBuf },

    /// Read the remote state
    Read { spec: PathBuf, id: String },

    /// Apply the difference between two spec files
    Update {
        id: String,
        prior: PathBuf,
        desired: PathBuf,
    },

    /// Delete the remote resource
    Delete { spec: PathBuf, id: String },

    /// Parse an import identifier
    Import { id: String },
}

#[derive(Subcommand)]
enum Lookup {
    /// Template ID by name
    Template { name: String },

    /// Node ID by name
    Node { project_id: String, name: String },

    /// Link ID by name
    Link { project_id: String, name: String },

    /// ID of the first project
    Project,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "TYPE")]
    node_type: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "CONSOLE")]
    console: String,
}

impl From<Node> for NodeRow {
    fn from(node: Node) -> Self {
        let console = match (node.console_type.as_deref(), node.console) {
            (Some(kind), Some(port)) => format!("{}:{}", kind, port),
            (None, Some(port)) => port.to_string(),
            _ => "-".to_string(),
        };
        Self {
            id: node.node_id,
            name: node.name,
            node_type: node.node_type.unwrap_or_else(|| "-".to_string()),
            status: String::from(node.status),
            console,
        }
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid spec file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run<R>(resource: R, op: Op) -> Result<()>
where
    R: Resource,
    R::Spec: DeserializeOwned,
    R::State: Serialize,
{
    match op {
        Op::Create { spec } => {
            let spec: R::Spec = load(&spec)?;
            let state = match resource.create(&spec).await {
                Ok(state) => state,
                Err(err) => {
                    // Keep the reference so the resource can be read, retried or deleted.
                    if let Some(id) = err.created_id() {
                        warn!("Resource {} exists on the controller but was not finished", id);
                        print_json(&serde_json::json!({"id": id, "complete": false}))?;
                    }
                    return Err(err.into());
                }
            };
            info!("Created resource {}", state.id());
            print_json(&state)?;
        }
        Op::Read { spec, id } => {
            let spec: R::Spec = load(&spec)?;
            match resource.read(&spec, &id).await? {
                Some(state) => print_json(&state)?,
                None => warn!("Resource {} no longer exists", id),
            }
        }
        Op::Update { id, prior, desired } => {
            let prior: R::Spec = load(&prior)?;
            let desired: R::Spec = load(&desired)?;
            match resource.update(&id, &prior, &desired).await? {
                Some(state) => print_json(&state)?,
                None => warn!("Resource {} no longer exists", id),
            }
        }
        Op::Delete { spec, id } => {
            let spec: R::Spec = load(&spec)?;
            let outcome = resource.delete(&spec, &id).await?;
            info!("Deleted resource {}: {:?}", id, outcome);
        }
        Op::Import { id } => {
            let imported = resource.import(&id)?;
            print_json(&serde_json::json!({
                "id": imported.id,
                "project_id": imported.project_id,
            }))?;
        }
    }
    Ok(())
}

async fn run_lookup(controller: &Controller, what: Lookup) -> Result<()> {
    let id = match what {
        Lookup::Template { name } => lookup::template_id(controller, &name).await?,
        Lookup::Node { project_id, name } => lookup::node_id(controller, &project_id, &name).await?,
        Lookup::Link { project_id, name } => lookup::link_id(controller, &project_id, &name).await?,
        Lookup::Project => lookup::first_project_id(controller).await?,
    };
    println!("{}", id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gns3ctl=info,gns3_provider=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ProviderConfig::new(cli.host).with_poll(PollPolicy {
        max_attempts: cli.poll_attempts,
        interval: Duration::from_millis(cli.poll_interval_ms),
    });
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    let controller =
        Arc::new(Controller::new(&config).context("failed to configure GNS3 controller client")?);

    match cli.command {
        Commands::Project { op } => run(ProjectResource::new(controller), op).await,
        Commands::Qemu { op } => run(QemuNode::new(controller), op).await,
        Commands::Docker { op } => run(DockerNode::new(controller), op).await,
        Commands::Cloud { op } => run(SimpleNode::cloud(controller), op).await,
        Commands::Switch { op } => run(SimpleNode::ethernet_switch(controller), op).await,
        Commands::Template { op } => run(TemplateNode::new(controller), op).await,
        Commands::Link { op } => run(LinkResource::new(controller), op).await,
        Commands::StartAll { op } => run(StartAll::new(controller), op).await,
        Commands::Lookup { what } => run_lookup(&controller, what).await,
        Commands::Nodes { project_id } => {
            let nodes = controller
                .list_nodes(&project_id)
                .await
                .with_context(|| format!("failed to list nodes of project {}", project_id))?;
            if nodes.is_empty() {
                println!("No nodes found");
            } else {
                let rows: Vec<NodeRow> = nodes.into_iter().map(NodeRow::from).collect();
                println!("{}", Table::new(rows));
            }
            Ok(())
        }
    }
}

//! In-process GNS3 controller for integration tests.
//!
//! Implements just enough of the v2 REST API to drive the provider over real
//! HTTP. Newly created nodes stay out of listings for a configurable number of
//! list requests, like a compute that is slow to register them.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use gns3_provider::{Controller, PollPolicy, ProviderConfig};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct ControllerState {
    pub projects: BTreeMap<String, Value>,
    pub nodes: BTreeMap<String, Value>,
    pub links: BTreeMap<String, Value>,
    /// Remaining node listings a node is hidden from.
    pub hidden: BTreeMap<String, u32>,
    /// Every request as `"METHOD /path"`, relative to `/v2`.
    pub calls: Vec<String>,
    pub hide_new_nodes_for: u32,
    next_id: u32,
}

impl ControllerState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

type Shared = Arc<Mutex<ControllerState>>;

fn record(state: &Shared, call: String) -> std::sync::MutexGuard<'_, ControllerState> {
    let mut guard = state.lock().unwrap();
    guard.calls.push(call);
    guard
}

fn not_found(what: &str) -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": format!("{} not found", what)})),
    )
}

async fn create_project(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut s = record(&state, "POST /projects".into());
    let id = s.next_id("project");
    let project = json!({"project_id": id, "name": body["name"], "status": "opened"});
    s.projects.insert(id, project.clone());
    (StatusCode::CREATED, Json(project))
}

async fn list_projects(State(state): State<Shared>) -> Reply {
    let s = record(&state, "GET /projects".into());
    let projects: Vec<Value> = s.projects.values().cloned().collect();
    (StatusCode::OK, Json(Value::Array(projects)))
}

async fn get_project(State(state): State<Shared>, Path(p): Path<String>) -> Reply {
    let s = record(&state, format!("GET /projects/{}", p));
    match s.projects.get(&p) {
        Some(project) => (StatusCode::OK, Json(project.clone())),
        None => not_found("project"),
    }
}

async fn update_project(
    State(state): State<Shared>,
    Path(p): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut s = record(&state, format!("PUT /projects/{}", p));
    match s.projects.get_mut(&p) {
        Some(project) => {
            project["name"] = body["name"].clone();
            (StatusCode::OK, Json(project.clone()))
        }
        None => not_found("project"),
    }
}

async fn delete_project(State(state): State<Shared>, Path(p): Path<String>) -> StatusCode {
    let mut s = record(&state, format!("DELETE /projects/{}", p));
    match s.projects.remove(&p) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn compute_project(State(state): State<Shared>, Json(_body): Json<Value>) -> Reply {
    let _guard = record(&state, "POST /compute/projects".into());
    (StatusCode::CREATED, Json(json!({})))
}

async fn open_project(State(state): State<Shared>, Path(p): Path<String>) -> Reply {
    let s = record(&state, format!("POST /projects/{}/open", p));
    match s.projects.get(&p) {
        Some(project) => (StatusCode::OK, Json(project.clone())),
        None => not_found("project"),
    }
}

async fn create_node(
    State(state): State<Shared>,
    Path(p): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut s = record(&state, format!("POST /projects/{}/nodes", p));
    let id = s.next_id("node");
    let mut node = body;
    node["node_id"] = json!(id);
    node["project_id"] = json!(p);
    node["status"] = json!("stopped");
    if node.get("properties").is_none() {
        node["properties"] = json!({});
    }
    let hide_for = s.hide_new_nodes_for;
    s.hidden.insert(id.clone(), hide_for);
    s.nodes.insert(id, node.clone());
    (StatusCode::CREATED, Json(node))
}

async fn list_nodes(State(state): State<Shared>, Path(p): Path<String>) -> Reply {
    let mut s = record(&state, format!("GET /projects/{}/nodes", p));
    let mut visible = Vec::new();
    let ids: Vec<String> = s.nodes.keys().cloned().collect();
    for id in ids {
        let remaining = s.hidden.get(&id).copied().unwrap_or(0);
        if remaining > 0 {
            s.hidden.insert(id.clone(), remaining - 1);
            continue;
        }
        if s.nodes[&id]["project_id"] == json!(p) {
            visible.push(s.nodes[&id].clone());
        }
    }
    (StatusCode::OK, Json(Value::Array(visible)))
}

async fn get_node(State(state): State<Shared>, Path((p, n)): Path<(String, String)>) -> Reply {
    let s = record(&state, format!("GET /projects/{}/nodes/{}", p, n));
    match s.nodes.get(&n) {
        Some(node) => (StatusCode::OK, Json(node.clone())),
        None => not_found("node"),
    }
}

async fn update_node(
    State(state): State<Shared>,
    Path((p, n)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    let mut s = record(&state, format!("PUT /projects/{}/nodes/{}", p, n));
    let Some(node) = s.nodes.get_mut(&n) else {
        return not_found("node");
    };
    if node["status"] == json!("started") && body.get("properties").is_some() {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "node must be stopped"})),
        );
    }
    if let Value::Object(fields) = body {
        for (key, value) in fields {
            node[key.as_str()] = value;
        }
    }
    (StatusCode::OK, Json(node.clone()))
}

async fn delete_node(State(state): State<Shared>, Path((p, n)): Path<(String, String)>) -> StatusCode {
    let mut s = record(&state, format!("DELETE /projects/{}/nodes/{}", p, n));
    match s.nodes.remove(&n) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

fn set_status(state: &Shared, call: String, n: &str, status: &str) -> Reply {
    let mut s = record(state, call);
    let Some(node) = s.nodes.get_mut(n) else {
        return not_found("node");
    };
    if status == "stopped" && node["status"] != json!("started") {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "node is not running"})),
        );
    }
    node["status"] = json!(status);
    (StatusCode::OK, Json(node.clone()))
}

async fn start_node(State(state): State<Shared>, Path((p, n)): Path<(String, String)>) -> Reply {
    set_status(&state, format!("POST /projects/{}/nodes/{}/start", p, n), &n, "started")
}

async fn stop_node(State(state): State<Shared>, Path((p, n)): Path<(String, String)>) -> Reply {
    set_status(&state, format!("POST /projects/{}/nodes/{}/stop", p, n), &n, "stopped")
}

async fn create_link(
    State(state): State<Shared>,
    Path(p): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut s = record(&state, format!("POST /projects/{}/links", p));
    let endpoints = body["nodes"].as_array().cloned().unwrap_or_default();
    if endpoints.len() != 2 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "a link needs two endpoints"})),
        );
    }
    for endpoint in &endpoints {
        let Some(id) = endpoint["node_id"].as_str() else {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "node_id missing"})));
        };
        if !s.nodes.contains_key(id) {
            return not_found("endpoint node");
        }
    }
    let id = s.next_id("link");
    let link = json!({"link_id": id, "project_id": p, "nodes": endpoints});
    s.links.insert(id, link.clone());
    (StatusCode::CREATED, Json(link))
}

async fn get_link(State(state): State<Shared>, Path((p, l)): Path<(String, String)>) -> Reply {
    let s = record(&state, format!("GET /projects/{}/links/{}", p, l));
    match s.links.get(&l) {
        Some(link) => (StatusCode::OK, Json(link.clone())),
        None => not_found("link"),
    }
}

async fn delete_link(State(state): State<Shared>, Path((p, l)): Path<(String, String)>) -> StatusCode {
    let mut s = record(&state, format!("DELETE /projects/{}/links/{}", p, l));
    match s.links.remove(&l) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/projects", post(create_project).get(list_projects))
        .route(
            "/projects/{p}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{p}/open", post(open_project))
        .route("/compute/projects", post(compute_project))
        .route("/projects/{p}/nodes", post(create_node).get(list_nodes))
        .route(
            "/projects/{p}/nodes/{n}",
            get(get_node).put(update_node).delete(delete_node),
        )
        .route("/projects/{p}/nodes/{n}/start", post(start_node))
        .route("/projects/{p}/nodes/{n}/stop", post(stop_node))
        .route("/projects/{p}/links", post(create_link))
        .route("/projects/{p}/links/{l}", get(get_link).delete(delete_link));
    Router::new().nest("/v2", api).with_state(state)
}

/// Mock controller bound to an ephemeral local port.
pub struct TestController {
    pub addr: SocketAddr,
    pub state: Shared,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestController {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(ControllerState::default()));
        let router = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Provider handle talking to this controller over HTTP.
    pub fn controller(&self) -> Arc<Controller> {
        let config = ProviderConfig::new(self.host())
            .with_poll(PollPolicy {
                max_attempts: 5,
                interval: Duration::from_millis(20),
            })
            .with_request_timeout(Duration::from_secs(5));
        Arc::new(Controller::new(&config).expect("Failed to build controller"))
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn hide_new_nodes_for(&self, listings: u32) {
        self.state.lock().unwrap().hide_new_nodes_for = listings;
    }

    pub fn node(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().nodes.get(id).cloned()
    }

    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

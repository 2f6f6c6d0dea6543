//! In-process transport for exercising provider logic without a controller.
//!
//! Replies are scripted per `(method, path)`. Each request consumes the next
//! scripted reply for its route; the last one is sticky and keeps answering.
//! Requests without a scripted route fail as transport faults so an unexpected
//! call never masquerades as a `404`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Response(ApiResponse),
    Fault(String),
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Script a JSON reply.
    pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.push(
            method,
            path,
            Reply::Response(ApiResponse::new(status, body.to_string())),
        )
    }

    /// Script a reply with an empty body (e.g. `204 No Content`).
    pub fn reply_empty(&self, method: Method, path: &str, status: u16) -> &Self {
        self.push(method, path, Reply::Response(ApiResponse::new(status, "")))
    }

    /// Script a transport fault.
    pub fn fault(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Reply::Fault(message.to_string()))
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// Requests rendered as `"METHOD /path"`, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    /// Number of requests received for one route.
    pub fn count(&self, method: Method, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Body of the last request sent to a route.
    pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        lock(&self.requests)
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        lock(&self.requests).push(request.clone());

        let reply = {
            let mut routes = lock(&self.routes);
            let queue = routes.get_mut(&(request.method, request.path.clone()));
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Fault(message)) => Err(TransportError::new(message)),
            None => Err(TransportError::new(format!(
                "no scripted reply for {} {}",
                request.method, request.path
            ))),
        }
    }
}

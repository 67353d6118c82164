//! Scripted transport for tests: canned responses, no network.

use haicor_types::{ApiTransport, TransportError};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Transport that replays queued responses.
///
/// POSTs pop from the create queue. GETs answer from the fixed path table first and
/// otherwise pop from the status queue. An exhausted queue answers with a request error.
#[derive(Default)]
pub struct ScriptedTransport {
    created: Mutex<VecDeque<Result<Value, TransportError>>>,
    statuses: Mutex<VecDeque<Result<Value, TransportError>>>,
    fixed: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
    posted: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(self, response: Value) -> Self {
        self.push(&self.created, Ok(response));
        self
    }

    pub fn on_create_error(self, err: TransportError) -> Self {
        self.push(&self.created, Err(err));
        self
    }

    pub fn then_status(self, response: Value) -> Self {
        self.push(&self.statuses, Ok(response));
        self
    }

    pub fn then_status_error(self, err: TransportError) -> Self {
        self.push(&self.statuses, Err(err));
        self
    }

    /// Always answer `GET path` with `response`.
    pub fn on_get(self, path: &str, response: Value) -> Self {
        lock(&self.fixed).insert(path.to_string(), response);
        self
    }

    /// Every call made so far, as `"GET /path"` / `"POST /path"`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Bodies of every POST so far.
    pub fn posted(&self) -> Vec<Value> {
        lock(&self.posted).clone()
    }

    /// Number of status polls made so far.
    pub fn status_calls(&self) -> usize {
        let fixed = lock(&self.fixed);
        lock(&self.calls)
            .iter()
            .filter_map(|c| c.strip_prefix("GET "))
            .filter(|p| !fixed.contains_key(*p))
            .count()
    }

    fn push(
        &self,
        queue: &Mutex<VecDeque<Result<Value, TransportError>>>,
        item: Result<Value, TransportError>,
    ) {
        lock(queue).push_back(item);
    }

    fn pop(
        queue: &Mutex<VecDeque<Result<Value, TransportError>>>,
        path: &str,
    ) -> Result<Value, TransportError> {
        lock(queue).pop_front().unwrap_or_else(|| {
            Err(TransportError::Request(format!(
                "no scripted response for {}",
                path
            )))
        })
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl ApiTransport for ScriptedTransport {
    async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        lock(&self.calls).push(format!("GET {}", path));
        if let Some(v) = lock(&self.fixed).get(path) {
            return Ok(v.clone());
        }
        Self::pop(&self.statuses, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        lock(&self.calls).push(format!("POST {}", path));
        lock(&self.posted).push(body.clone());
        Self::pop(&self.created, path)
    }
}

//! Scripted in-memory backend for tests.

use crate::remote::{Method, RemoteDataPort, RemoteFailure};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Reply {
    result: Result<Value, u16>,
    delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeRemote {
    queued: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    sticky: Mutex<HashMap<(Method, String), Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers the next matching request with `value`.
    pub fn reply(&self, method: Method, path: &str, value: Value) {
        self.reply_after(method, path, value, Duration::ZERO);
    }

    pub fn reply_after(&self, method: Method, path: &str, value: Value, delay: Duration) {
        self.push(method, path, Reply { result: Ok(value), delay });
    }

    /// Answers the next matching request with an HTTP error status.
    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.push(method, path, Reply { result: Err(status), delay: Duration::ZERO });
    }

    /// Answers every matching request with `value` once the queue for it is drained.
    pub fn always(&self, method: Method, path: &str, value: Value) {
        self.sticky.lock().unwrap().insert(
            (method, path.to_string()),
            Reply { result: Ok(value), delay: Duration::ZERO },
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Counts calls to `path`, with any query string.
    pub fn count(&self, method: Method, path: &str) -> usize {
        let with_query = format!("{path}?");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && (c.path == path || c.path.starts_with(&with_query)))
            .count()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.queued
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let key = (method, path.to_string());
        if let Some(reply) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return Some(reply);
        }
        self.sticky.lock().unwrap().get(&key).cloned()
    }
}

#[async_trait::async_trait]
impl RemoteDataPort for FakeRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> anyhow::Result<Value> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body,
        });

        let reply = self.next_reply(method, path).unwrap_or(Reply {
            result: Err(404),
            delay: Duration::ZERO,
        });

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        reply.result.map_err(|status| {
            RemoteFailure {
                method,
                path: path.to_string(),
                status,
                body: "{\"detail\": \"scripted failure\"}".to_string(),
            }
            .into()
        })
    }
}

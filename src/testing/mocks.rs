use crate::analysis::TransportFailure;
use crate::execution::RequestExecutor;
use crate::traits::Transport;
use crate::types::{ApiRequest, HttpResponse};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// One scripted answer from the mock transport
#[derive(Debug, Clone)]
pub struct MockReply {
    pub delay: Duration,
    pub outcome: MockOutcome,
}

#[derive(Debug, Clone)]
pub enum MockOutcome {
    Response { status: u16, body: String },
    ConnectFailure(String),
    InvalidRequest(String),
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, &body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: MockOutcome::Response {
                status,
                body: body.to_string(),
            },
        }
    }

    pub fn connect_failure(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: MockOutcome::ConnectFailure(message.to_string()),
        }
    }

    pub fn invalid_request(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: MockOutcome::InvalidRequest(message.to_string()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct MockState {
    scripts: HashMap<String, VecDeque<MockReply>>,
    requests: Vec<ApiRequest>,
}

/// Scripted transport for testing.
///
/// Replies queued for an endpoint are served in order; the last one keeps
/// repeating once the queue is down to it. Unscripted endpoints answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, endpoint: &str, reply: MockReply) -> Self {
        self.push(endpoint, reply);
        self
    }

    pub fn push(&self, endpoint: &str, reply: MockReply) {
        self.state
            .lock()
            .scripts
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Number of requests sent to `endpoint` so far
    pub fn attempts(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().requests.clone()
    }

    fn next_reply(&self, request: &ApiRequest) -> Option<MockReply> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        let script = state.scripts.get_mut(&request.endpoint)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportFailure> {
        let reply = self.next_reply(request).unwrap_or_else(|| {
            MockReply::json(404, json!({"error": format!("no mock for {}", request.endpoint)}))
        });

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.outcome {
            MockOutcome::Response { status, body } => Ok(HttpResponse::new(status, body)),
            MockOutcome::ConnectFailure(message) => Err(TransportFailure::Connect(message)),
            MockOutcome::InvalidRequest(message) => Err(TransportFailure::InvalidRequest(message)),
        }
    }
}

/// Executor over a mock transport
pub fn mock_executor(transport: &MockTransport) -> RequestExecutor<MockTransport> {
    RequestExecutor::new(transport.clone())
}

//! # Mock Framework
//!
//! Test doubles for the collaborators at the edges of the system.
//!
//! - [`MockAdapter`]: answers `retrieve` and `send` from queued expectations
//!   and records every request it receives.
//! - [`MockQueue`]: accepts or rejects enqueued actions and records them.
//! - [`MockAuthenticator`]: succeeds or fails authentication on demand.
//!
//! ```ignore
//! let adapter = MockAdapter::new();
//! adapter.expect_retrieve().return_ok(json!({"data": []}));
//! adapter.expect_send().return_err(Status::Error, "Server down");
//!
//! // hand `Arc::new(adapter.clone())` to a source, dispatch actions...
//! adapter.verify(); // every expectation was consumed
//! ```

use super::queue::Queue;
use crate::model::{Action, Envelope, Status};
use crate::source::{Adapter, Authenticator, Request};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// ADAPTER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Retrieve,
    Send,
}

struct Expectation {
    call: Call,
    response: Envelope,
}

#[derive(Default)]
struct AdapterState {
    expectations: VecDeque<Expectation>,
    requests: Vec<Request>,
    unexpected: Vec<String>,
}

/// An adapter answering from a queue of expectations, in order.
///
/// A call that doesn't match the next expectation gets an `error` envelope
/// and makes [`verify`](MockAdapter::verify) fail.
#[derive(Clone, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<AdapterState>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_retrieve(&self) -> ResponseBuilder {
        ResponseBuilder {
            call: Call::Retrieve,
            state: self.state.clone(),
        }
    }

    pub fn expect_send(&self) -> ResponseBuilder {
        ResponseBuilder {
            call: Call::Send,
            state: self.state.clone(),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.state).requests.clone()
    }

    /// Panics unless every expectation was consumed by a matching call.
    pub fn verify(&self) {
        let state = lock(&self.state);
        if !state.unexpected.is_empty() {
            panic!("Unexpected adapter calls: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }

    fn answer(&self, call: Call, request: &Request) -> Envelope {
        let mut state = lock(&self.state);
        state.requests.push(request.clone());
        match state.expectations.pop_front() {
            Some(expectation) if expectation.call == call => expectation.response,
            other => {
                state
                    .unexpected
                    .push(format!("{call:?} while expecting {:?}", other.map(|e| e.call)));
                Envelope::error(format!("Unexpected {call:?} request"))
            }
        }
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn retrieve(&self, request: &Request) -> Envelope {
        self.answer(Call::Retrieve, request)
    }

    async fn send(&self, request: &Request) -> Envelope {
        self.answer(Call::Send, request)
    }
}

/// Builder for `retrieve` and `send` expectations.
pub struct ResponseBuilder {
    call: Call,
    state: Arc<Mutex<AdapterState>>,
}

impl ResponseBuilder {
    /// Answers with `{status: ok, data}`.
    pub fn return_ok(self, data: Value) {
        self.return_envelope(Envelope::ok(data));
    }

    /// Answers with a failure envelope.
    pub fn return_err(self, status: Status, message: &str) {
        let mut envelope = Envelope::error(message);
        envelope.status = status;
        self.return_envelope(envelope);
    }

    pub fn return_envelope(self, response: Envelope) {
        lock(&self.state).expectations.push_back(Expectation {
            call: self.call,
            response,
        });
    }
}

// =============================================================================
// QUEUE
// =============================================================================

#[derive(Default)]
struct QueueState {
    answers: VecDeque<bool>,
    enqueued: Vec<(Action, Option<i64>)>,
}

/// A queue backend answering from a list of accept/reject decisions.
/// Calls beyond the configured answers are rejected.
#[derive(Clone, Default)]
pub struct MockQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_enqueue(&self) -> EnqueueBuilder {
        EnqueueBuilder {
            state: self.state.clone(),
        }
    }

    /// Every `(action, timestamp)` pair handed to the queue.
    pub fn enqueued(&self) -> Vec<(Action, Option<i64>)> {
        lock(&self.state).enqueued.clone()
    }

    pub fn verify(&self) {
        let state = lock(&self.state);
        if !state.answers.is_empty() {
            panic!("Not all expectations were met. {} remaining", state.answers.len());
        }
    }
}

#[async_trait]
impl Queue for MockQueue {
    async fn enqueue(&self, action: Action, timestamp: Option<i64>) -> bool {
        let mut state = lock(&self.state);
        state.enqueued.push((action, timestamp));
        state.answers.pop_front().unwrap_or(false)
    }
}

/// Builder for `enqueue` expectations.
pub struct EnqueueBuilder {
    state: Arc<Mutex<QueueState>>,
}

impl EnqueueBuilder {
    pub fn accept(self) {
        lock(&self.state).answers.push_back(true);
    }

    pub fn reject(self) {
        lock(&self.state).answers.push_back(false);
    }
}

// =============================================================================
// AUTHENTICATOR
// =============================================================================

/// An authenticator that starts unauthenticated and succeeds (or fails) the
/// first time it is asked to authenticate.
#[derive(Debug)]
pub struct MockAuthenticator {
    succeeds: bool,
    authenticated: AtomicBool,
    headers: Map<String, Value>,
}

impl MockAuthenticator {
    pub fn new(succeeds: bool) -> Self {
        Self {
            succeeds,
            authenticated: AtomicBool::new(false),
            headers: Map::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), Value::String(value.to_string()));
        self
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn authenticate(&self) -> bool {
        self.authenticated.store(self.succeeds, Ordering::SeqCst);
        self.succeeds
    }

    fn headers(&self) -> Map<String, Value> {
        if self.is_authenticated() {
            self.headers.clone()
        } else {
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RawRequest, Request};
    use serde_json::json;

    fn request() -> Request {
        let raw = RawRequest::new("GET", Map::new());
        Request {
            action: raw.action,
            data: None,
            endpoint: None,
            params: raw.params,
            headers: Map::new(),
            auth: None,
            ident: None,
        }
    }

    #[tokio::test]
    async fn answers_expectations_in_order() {
        let mock = MockAdapter::new();
        mock.expect_retrieve().return_ok(json!([{"id": "ent1"}]));
        mock.expect_send().return_err(Status::NotFound, "Gone");

        let first = mock.retrieve(&request()).await;
        let second = mock.send(&request()).await;

        assert_eq!(first.data, Some(json!([{"id": "ent1"}])));
        assert_eq!(second.status, Status::NotFound);
        assert_eq!(mock.requests().len(), 2);
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected adapter calls")]
    async fn verify_fails_on_mismatched_call() {
        let mock = MockAdapter::new();
        mock.expect_retrieve().return_ok(json!({}));

        let response = mock.send(&request()).await;

        assert_eq!(response.status, Status::Error);
        mock.verify();
    }

    #[tokio::test]
    async fn queue_records_and_answers() {
        let queue = MockQueue::new();
        queue.expect_enqueue().accept();

        assert!(queue.enqueue(Action::new("GET", json!({})), Some(1)).await);
        assert!(!queue.enqueue(Action::new("SET", json!({})), None).await);
        assert_eq!(queue.enqueued().len(), 2);
        queue.verify();
    }
}

//! Request/response correlation and event handler dispatch.
//!
//! Every correlated request gets a fresh id and a pending entry holding its
//! continuation. A response removes the entry and runs the continuation once;
//! later responses with the same id find nothing and are dropped. Unsolicited
//! events bypass the pending map and go to the handler registered by name.
//!
//! Locks are only held while touching the maps. Transport posts, continuations
//! and handlers all run unlocked, so any of them may call back into the engine.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{SdkError, SdkResult};

use super::transport::Transport;
use super::types::{CorrelationId, InboundMessage, OutboundMessage, ResponseConvention};

/// Continuation run with the outcome of a correlated request.
type Continuation = Box<dyn FnOnce(SdkResult<Vec<Value>>) + Send>;

/// Callback for unsolicited host events.
pub type EventHandler = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// A request sent to the host and still waiting for its response.
struct PendingRequest {
    func: String,
    convention: ResponseConvention,
    created_at: Instant,
    continuation: Continuation,
}

#[derive(Default)]
struct EngineState {
    next_id: CorrelationId,
    pending: HashMap<CorrelationId, PendingRequest>,
    handlers: HashMap<String, EventHandler>,
}

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Settled the pending request with this id.
    Resolved(CorrelationId),
    /// Delivered to the handler registered under this name.
    Delivered(String),
    /// Nothing was waiting for it.
    Dropped,
}

/// Deferred result of a correlated request.
///
/// Resolves when the host responds, or with [`SdkError::TornDown`] if the
/// session is torn down first.
#[derive(Debug)]
pub struct PendingCall {
    id: CorrelationId,
    receiver: oneshot::Receiver<SdkResult<Vec<Value>>>,
}

impl PendingCall {
    /// Correlation id of the outbound request.
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Take the result without waiting; `None` while still pending.
    pub fn try_take(&mut self) -> Option<SdkResult<Vec<Value>>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(SdkError::TornDown)),
        }
    }
}

impl Future for PendingCall {
    type Output = SdkResult<Vec<Value>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SdkError::TornDown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Pending requests taken out of an engine by [`CorrelationEngine::drain`].
#[must_use = "drained requests wait forever unless rejected"]
pub(crate) struct Drained(Vec<PendingRequest>);

impl Drained {
    /// Settle every drained request with [`SdkError::TornDown`].
    pub(crate) fn reject(self) {
        if !self.0.is_empty() {
            tracing::info!(count = self.0.len(), "Rejecting pending requests on teardown");
        }
        for pending in self.0 {
            (pending.continuation)(Err(SdkError::TornDown));
        }
    }
}

/// Correlates outbound requests with inbound responses.
pub struct CorrelationEngine {
    transport: Arc<dyn Transport>,
    state: Mutex<EngineState>,
}

impl CorrelationEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Send a request whose response follows the error-first convention.
    pub fn request(&self, func: &str, args: Vec<Value>) -> SdkResult<PendingCall> {
        self.request_with(func, args, ResponseConvention::ErrorFirst)
    }

    /// Send a request whose response arguments are delivered untouched.
    pub fn request_raw(&self, func: &str, args: Vec<Value>) -> SdkResult<PendingCall> {
        self.request_with(func, args, ResponseConvention::Raw)
    }

    fn request_with(
        &self,
        func: &str,
        args: Vec<Value>,
        convention: ResponseConvention,
    ) -> SdkResult<PendingCall> {
        let (sender, receiver) = oneshot::channel();
        let continuation: Continuation = Box::new(move |result| {
            // The caller may have dropped the PendingCall; nothing to notify then.
            let _ = sender.send(result);
        });
        let id = self.send_tracked(func, args, convention, continuation)?;
        Ok(PendingCall { id, receiver })
    }

    /// Send an error-first request and run `callback` with its outcome.
    pub fn request_with_callback<F>(
        &self,
        func: &str,
        args: Vec<Value>,
        callback: F,
    ) -> SdkResult<CorrelationId>
    where
        F: FnOnce(SdkResult<Vec<Value>>) + Send + 'static,
    {
        self.send_tracked(func, args, ResponseConvention::ErrorFirst, Box::new(callback))
    }

    fn send_tracked(
        &self,
        func: &str,
        args: Vec<Value>,
        convention: ResponseConvention,
        continuation: Continuation,
    ) -> SdkResult<CorrelationId> {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.pending.insert(
                id,
                PendingRequest {
                    func: func.to_string(),
                    convention,
                    created_at: Instant::now(),
                    continuation,
                },
            );
            id
        };

        tracing::debug!(id, func, "Sending request to host");
        let message = OutboundMessage {
            id: Some(id),
            func: func.to_string(),
            args,
        };

        if let Err(e) = self.transport.post(message) {
            // The error is reported to the caller directly; the continuation is dropped unrun.
            self.state.lock().pending.remove(&id);
            tracing::warn!(id, func, error = %e, "Transport refused request");
            return Err(e.into());
        }

        Ok(id)
    }

    /// Fire-and-forget post with no id and no waiter.
    pub fn post(&self, func: &str, args: Vec<Value>) -> SdkResult<()> {
        tracing::debug!(func, "Posting message to host");
        self.transport.post(OutboundMessage {
            id: None,
            func: func.to_string(),
            args,
        })?;
        Ok(())
    }

    /// Register the handler for `name`, replacing any previous one.
    pub fn register_handler(&self, name: &str, handler: EventHandler) {
        let replaced = self
            .state
            .lock()
            .handlers
            .insert(name.to_string(), handler)
            .is_some();
        tracing::debug!(name, replaced, "Registered handler");
    }

    /// Remove the handler for `name`; returns whether one was registered.
    pub fn remove_handler(&self, name: &str) -> bool {
        self.state.lock().handlers.remove(name).is_some()
    }

    /// Route an inbound message to its waiter or handler.
    pub fn dispatch(&self, message: InboundMessage) -> Dispatch {
        if let Some(id) = message.id {
            let pending = self.state.lock().pending.remove(&id);
            let Some(pending) = pending else {
                tracing::debug!(id, "No pending request for response, dropping");
                return Dispatch::Dropped;
            };

            tracing::debug!(
                id,
                func = %pending.func,
                elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
                "Resolving pending request"
            );
            let result = pending.convention.interpret(message.args);
            (pending.continuation)(result);
            return Dispatch::Resolved(id);
        }

        let Some(func) = message.func else {
            tracing::debug!("Inbound message has neither id nor func, dropping");
            return Dispatch::Dropped;
        };

        let handler = self.state.lock().handlers.get(&func).cloned();
        match handler {
            Some(handler) => {
                tracing::debug!(func = %func, "Delivering event to handler");
                handler(message.args);
                Dispatch::Delivered(func)
            }
            None => {
                tracing::debug!(func = %func, "No handler registered for event, dropping");
                Dispatch::Dropped
            }
        }
    }

    /// Reject every pending request, clear all handlers and restart id allocation.
    pub fn reset(&self) {
        self.drain().reject();
    }

    /// Clear all state and hand back the pending requests without running them.
    ///
    /// Lets a caller reset the engine under its own lock and reject the
    /// requests after releasing it.
    pub(crate) fn drain(&self) -> Drained {
        let mut state = self.state.lock();
        state.handlers.clear();
        state.next_id = 0;
        Drained(state.pending.drain().map(|(_, pending)| pending).collect())
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Age of the oldest pending request.
    pub fn oldest_pending_age(&self) -> Option<Duration> {
        self.state
            .lock()
            .pending
            .values()
            .map(|p| p.created_at.elapsed())
            .max()
    }

    /// Names with a registered handler, sorted.
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

//! The seam to the host transport.
//!
//! The concrete channel (postMessage, framed or frameless) lives outside this
//! crate. It implements [`Transport`] for outbound traffic and feeds inbound
//! traffic to [`Session::handle_message`](crate::Session::handle_message).

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use super::types::OutboundMessage;

/// Errors a transport can report when handing off a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Deliver messages to the host.
pub trait Transport: Send + Sync {
    fn post(&self, message: OutboundMessage) -> Result<(), TransportError>;
}

/// In-memory transport that records every message it is given.
///
/// Useful for tests and for hosts that drain messages in batches.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every message posted so far, in post order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    /// Remove and return the recorded messages.
    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Most recently posted message.
    pub fn last(&self) -> Option<OutboundMessage> {
        self.sent.lock().last().cloned()
    }

    /// Make subsequent posts fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }
}

impl Transport for RecordingTransport {
    fn post(&self, message: OutboundMessage) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent.lock().push(message);
        Ok(())
    }
}

//! Messaging layer between the app and its host.
//!
//! ```text
//! CorrelationEngine
//! ├── transport: Arc<dyn Transport>      outbound posts
//! ├── pending: HashMap<id, PendingRequest>  request/response
//! └── handlers: HashMap<name, EventHandler> unsolicited events
//! ```
//!
//! Requests reach the transport in call order. Responses may come back in any
//! order and are matched purely by correlation id.

mod engine;
mod transport;
mod types;

pub use engine::{CorrelationEngine, Dispatch, EventHandler, PendingCall};
pub use transport::{RecordingTransport, Transport, TransportError};
pub use types::{decode_first, CorrelationId, InboundMessage, OutboundMessage, ResponseConvention};

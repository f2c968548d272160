//! Hostlink - capability negotiation and message correlation for embedded apps.
//!
//! An app embedded in a host (as an iframe, webview or child window) talks to
//! that host over an asynchronous message channel. Hostlink runs the handshake,
//! learns what the host supports, and correlates requests with responses.
//!
//! # Architecture
//!
//! - [`session`] - Initialization lifecycle and the per-session state
//! - [`messaging`] - Correlation engine, message envelopes, transport trait
//! - [`runtime`] - Capability runtime and back-compat synthesis for older hosts
//! - [`context`] - Frame contexts and the allow-list guard
//! - [`capabilities`] - Capability adapters (dialog, location)
//! - [`config`] / [`logging`] - Configuration file and tracing setup
//!
//! # Example
//!
//! ```ignore
//! use hostlink::{capabilities::location, SdkConfig, Session};
//!
//! let session = Session::new(transport, SdkConfig::load());
//! session.initialize()?.await?;
//!
//! if session.is_supported(location::CAPABILITY) {
//!     let here = location::get_location(&session, Some(Default::default()))?.await?;
//! }
//! ```

pub mod capabilities;
pub mod config;
pub mod context;
pub mod logging;
pub mod messaging;
pub mod runtime;
pub mod session;
pub mod version;

mod error;

/// Version of this library, sent to the host during the handshake.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types for convenience
pub use config::SdkConfig;
pub use context::{FrameContext, HostClientType};
pub use error::{ErrorCode, SdkError, SdkErrorPayload, SdkResult};
pub use messaging::{InboundMessage, OutboundMessage, Transport, TransportError};
pub use runtime::{CapabilityTree, Runtime};
pub use session::{HostHandshake, LifecycleState, RuntimeSource, Session};

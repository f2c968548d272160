//! Session - owns all per-initialization SDK state.
//!
//! The Session is responsible for:
//! - The initialization lifecycle (handshake, teardown)
//! - The frame context and host client type reported by the host
//! - Publishing the capability runtime
//! - Gating every request, post and handler registration on initialization
//!
//! There is no process-wide state: each `Session` is independent, so several can
//! coexist (one per embedded frame, one per test).

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::config::SdkConfig;
use crate::context::{ensure_context, FrameContext, HostClientType};
use crate::error::{SdkError, SdkResult};
use crate::messaging::{
    CorrelationEngine, CorrelationId, Dispatch, EventHandler, InboundMessage, PendingCall,
    Transport,
};
use crate::runtime::{generate_back_compat_runtime, Runtime};

/// Name of the handshake request sent to the host.
pub const INITIALIZE_FUNC: &str = "initialize";

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not initialized; everything except `initialize` fails.
    Uninitialized,
    /// Handshake in flight.
    Initializing,
    /// Ready for capability calls.
    Initialized,
}

/// Where the runtime for a session comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeSource {
    /// Host-declared capability runtime.
    Declared(Runtime),
    /// Synthesize from the host's highest supported version.
    BackCompat { version: String },
}

/// What the host reports in answer to the handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct HostHandshake {
    pub frame_context: FrameContext,
    pub host_client_type: HostClientType,
    /// Runtime config as JSON text; `None` for hosts that predate it.
    pub runtime_config: Option<String>,
    pub client_supported_sdk_version: Option<String>,
}

impl HostHandshake {
    /// Parse the handshake response arguments:
    /// `[frameContext, hostClientType, runtimeConfig?, clientSupportedSdkVersion?]`.
    pub fn from_args(args: Vec<Value>) -> SdkResult<Self> {
        let mut args = args.into_iter();

        let frame_context = args
            .next()
            .ok_or_else(|| SdkError::Handshake("missing frame context".to_string()))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| SdkError::Handshake(format!("invalid frame context: {}", e)))
            })?;
        let host_client_type = args
            .next()
            .ok_or_else(|| SdkError::Handshake("missing host client type".to_string()))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| SdkError::Handshake(format!("invalid host client type: {}", e)))
            })?;
        let runtime_config = args.next().and_then(|v| v.as_str().map(str::to_string));
        let client_supported_sdk_version = args.next().and_then(|v| v.as_str().map(str::to_string));

        Ok(Self {
            frame_context,
            host_client_type,
            runtime_config,
            client_supported_sdk_version,
        })
    }
}

/// Host facts established by initialization.
#[derive(Debug, Clone)]
struct HostInfo {
    frame_context: FrameContext,
    host_client_type: HostClientType,
}

#[derive(Debug)]
struct Lifecycle {
    state: LifecycleState,
    /// Bumped on every handshake start so a stale handshake cannot undo a newer one.
    generation: u64,
    host: Option<HostInfo>,
}

struct SessionInner {
    config: SdkConfig,
    engine: CorrelationEngine,
    lifecycle: Mutex<Lifecycle>,
    runtime: RwLock<Arc<Runtime>>,
}

/// Handle to one SDK session. Cloning is cheap and shares the session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("frame_context", &self.frame_context())
            .field("pending", &self.inner.engine.pending_count())
            .finish()
    }
}

impl Session {
    /// Create an uninitialized session talking over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: SdkConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                engine: CorrelationEngine::new(transport),
                lifecycle: Mutex::new(Lifecycle {
                    state: LifecycleState::Uninitialized,
                    generation: 0,
                    host: None,
                }),
                runtime: RwLock::new(Arc::new(Runtime::uninitialized())),
            }),
        }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.lock().state
    }

    pub fn frame_context(&self) -> Option<FrameContext> {
        self.inner.lifecycle.lock().host.as_ref().map(|h| h.frame_context)
    }

    pub fn host_client_type(&self) -> Option<HostClientType> {
        self.inner
            .lifecycle
            .lock()
            .host
            .as_ref()
            .map(|h| h.host_client_type)
    }

    /// Snapshot of the current runtime. It never changes under the caller.
    pub fn runtime(&self) -> Arc<Runtime> {
        self.inner.runtime.read().clone()
    }

    /// Whether a capability path is supported; always false when not initialized.
    pub fn is_supported(&self, path: &str) -> bool {
        self.state() == LifecycleState::Initialized && self.runtime().is_supported(path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Initialization
    // ─────────────────────────────────────────────────────────────────────────

    /// Start the handshake with the host.
    ///
    /// The `initialize` request is posted before this returns; the returned
    /// future completes initialization once the host answers. On any failure
    /// the session goes back to `Uninitialized`.
    pub fn initialize(&self) -> SdkResult<impl Future<Output = SdkResult<()>> + Send + 'static> {
        let generation = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.state != LifecycleState::Uninitialized {
                return Err(SdkError::AlreadyInitialized);
            }
            lifecycle.state = LifecycleState::Initializing;
            lifecycle.generation += 1;
            lifecycle.generation
        };
        tracing::info!("Starting host handshake");

        let call = match self
            .inner
            .engine
            .request_raw(INITIALIZE_FUNC, vec![Value::from(crate::VERSION)])
        {
            Ok(call) => call,
            Err(e) => {
                self.abort_initializing(generation);
                return Err(e);
            }
        };

        let session = self.clone();
        Ok(async move {
            let outcome = match call.await {
                Ok(args) => HostHandshake::from_args(args).and_then(|h| session.complete_initialize(h)),
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "Host handshake failed");
                session.abort_initializing(generation);
            }
            outcome
        })
    }

    fn abort_initializing(&self, generation: u64) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state == LifecycleState::Initializing && lifecycle.generation == generation {
            lifecycle.state = LifecycleState::Uninitialized;
        }
    }

    /// Complete initialization from a handshake the host already provided.
    ///
    /// A missing or unparseable runtime config falls back to back-compat
    /// synthesis from the reported (or configured default) host version.
    pub fn complete_initialize(&self, handshake: HostHandshake) -> SdkResult<()> {
        let source = match handshake.runtime_config.as_deref().map(Runtime::from_json) {
            Some(Ok(runtime)) => RuntimeSource::Declared(runtime),
            other => {
                if let Some(Err(e)) = other {
                    tracing::warn!(error = %e, "Host runtime config unusable, synthesizing one");
                }
                let version = handshake
                    .client_supported_sdk_version
                    .clone()
                    .unwrap_or_else(|| self.inner.config.compat.default_host_version.clone());
                RuntimeSource::BackCompat { version }
            }
        };

        self.initialize_with_runtime(handshake.frame_context, handshake.host_client_type, source)
    }

    /// Complete initialization with explicit host facts.
    pub fn initialize_with_runtime(
        &self,
        frame_context: FrameContext,
        host_client_type: HostClientType,
        source: RuntimeSource,
    ) -> SdkResult<()> {
        let runtime = match source {
            RuntimeSource::Declared(runtime) => runtime,
            RuntimeSource::BackCompat { version } => {
                generate_back_compat_runtime(&version, host_client_type)
            }
        };

        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state == LifecycleState::Initialized {
            return Err(SdkError::AlreadyInitialized);
        }
        *self.inner.runtime.write() = Arc::new(runtime);
        lifecycle.host = Some(HostInfo {
            frame_context,
            host_client_type,
        });
        lifecycle.state = LifecycleState::Initialized;
        drop(lifecycle);

        tracing::info!(
            frame_context = %frame_context,
            host = ?host_client_type,
            "Session initialized"
        );
        Ok(())
    }

    /// Tear the session down to a pristine `Uninitialized` state.
    ///
    /// Pending requests are rejected with [`SdkError::TornDown`] and every
    /// handler is dropped. Calling this on an uninitialized session is a no-op.
    pub fn teardown(&self) {
        let drained = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.state == LifecycleState::Uninitialized {
                return;
            }
            lifecycle.state = LifecycleState::Uninitialized;
            lifecycle.host = None;
            *self.inner.runtime.write() = Arc::new(Runtime::uninitialized());
            self.inner.engine.drain()
        };
        tracing::info!("Session torn down");
        // Continuations may call back into the session, so they run unlocked.
        drained.reject();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────────────────────

    /// Fail unless initialized; returns the current frame context.
    pub fn ensure_initialized(&self) -> SdkResult<FrameContext> {
        let lifecycle = self.inner.lifecycle.lock();
        match (&lifecycle.state, &lifecycle.host) {
            (LifecycleState::Initialized, Some(host)) => Ok(host.frame_context),
            _ => Err(SdkError::NotInitialized),
        }
    }

    /// Lifecycle check followed by the frame context check.
    pub fn ensure_allowed(&self, allowed: &[FrameContext]) -> SdkResult<Arc<Runtime>> {
        let current = self.ensure_initialized()?;
        ensure_context(current, allowed)?;
        Ok(self.runtime())
    }

    /// Lifecycle, frame context and capability support checks, in that order.
    pub fn ensure_capability(&self, allowed: &[FrameContext], capability: &str) -> SdkResult<Arc<Runtime>> {
        let runtime = self.ensure_allowed(allowed)?;
        if !runtime.is_supported(capability) {
            return Err(SdkError::not_supported(capability));
        }
        Ok(runtime)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Runtime publication
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the live runtime with a host-declared one.
    pub fn apply_runtime_config(&self, runtime: Runtime) -> SdkResult<()> {
        let lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != LifecycleState::Initialized {
            return Err(SdkError::NotInitialized);
        }
        *self.inner.runtime.write() = Arc::new(runtime);
        drop(lifecycle);

        tracing::debug!("Applied runtime config");
        Ok(())
    }

    /// Replace the live runtime with one synthesized for a legacy host.
    pub fn apply_back_compat_runtime(
        &self,
        highest_supported_version: &str,
        host_client_type: HostClientType,
    ) -> SdkResult<()> {
        self.apply_runtime_config(generate_back_compat_runtime(
            highest_supported_version,
            host_client_type,
        ))
    }

    /// Update the frame context, e.g. after the app is re-parented.
    pub fn set_frame_context(&self, frame_context: FrameContext) -> SdkResult<()> {
        let mut guard = self.inner.lifecycle.lock();
        let lifecycle = &mut *guard;
        match (&lifecycle.state, lifecycle.host.as_mut()) {
            (LifecycleState::Initialized, Some(host)) => {
                host.frame_context = frame_context;
                Ok(())
            }
            _ => Err(SdkError::NotInitialized),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messaging
    // ─────────────────────────────────────────────────────────────────────────

    /// Send an error-first request and get a future for its response.
    pub fn request(&self, func: &str, args: Vec<Value>) -> SdkResult<PendingCall> {
        self.ensure_initialized()?;
        self.inner.engine.request(func, args)
    }

    /// Send an error-first request and run `callback` with its outcome.
    pub fn request_with_callback<F>(&self, func: &str, args: Vec<Value>, callback: F) -> SdkResult<CorrelationId>
    where
        F: FnOnce(SdkResult<Vec<Value>>) + Send + 'static,
    {
        self.ensure_initialized()?;
        self.inner.engine.request_with_callback(func, args, callback)
    }

    /// Fire-and-forget post.
    pub fn post(&self, func: &str, args: Vec<Value>) -> SdkResult<()> {
        self.ensure_initialized()?;
        self.inner.engine.post(func, args)
    }

    /// Register the handler for host events named `name`, replacing any previous one.
    pub fn register_handler<F>(&self, name: &str, handler: F) -> SdkResult<()>
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        self.ensure_initialized()?;
        let handler: EventHandler = Arc::new(handler);
        self.inner.engine.register_handler(name, handler);
        Ok(())
    }

    /// Remove the handler for `name`; returns whether one was registered.
    pub fn remove_handler(&self, name: &str) -> SdkResult<bool> {
        self.ensure_initialized()?;
        Ok(self.inner.engine.remove_handler(name))
    }

    /// Feed a message received from the host.
    pub fn handle_message(&self, message: InboundMessage) -> Dispatch {
        self.inner.engine.dispatch(message)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.engine.pending_count()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.inner.engine.handler_names()
    }
}
